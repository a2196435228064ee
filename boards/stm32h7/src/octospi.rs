//! OCTOSPI1 at register level.
//!
//! The HAL sets up clocks and the device configuration, then hands the
//! peripheral over.  It has no memory-mapped mode, and its indirect
//! transfers are limited to the FIFO, so commands are driven here directly.
//!
//! A command is programmed in indirect write mode.  Without a data phase it
//! starts as soon as the instruction (or address) register is written.  With
//! one, nothing is clocked until the data phase begins: [`OctoSpi::transmit`]
//! feeds the FIFO, [`OctoSpi::receive`] switches to indirect read and
//! re-triggers, and [`OctoSpi::memory_mapped`] switches to memory-mapped
//! mode.

use core::ptr;

use boot::hw::{HwResult, MemoryMappedConfig};
use boot::{CommandFrame, HwError, OctoSpi};
use hal::pac::OCTOSPI1;
use stm32h7xx_hal as hal;

use crate::config::POLLS_PER_MS;

// CR
const CR_EN: u32 = 1 << 0;
const CR_ABORT: u32 = 1 << 1;
const CR_TCEN: u32 = 1 << 3;
const CR_FMODE_SHIFT: u32 = 28;
const CR_FMODE: u32 = 0b11 << CR_FMODE_SHIFT;

const FMODE_INDIRECT_WRITE: u32 = 0b00;
const FMODE_INDIRECT_READ: u32 = 0b01;
const FMODE_MEMORY_MAPPED: u32 = 0b11;

// SR and FCR
const SR_TEF: u32 = 1 << 0;
const SR_TCF: u32 = 1 << 1;
const SR_FTF: u32 = 1 << 2;
const SR_BUSY: u32 = 1 << 5;

// CCR
const CCR_ADMODE_SHIFT: u32 = 8;
const CCR_ADSIZE_24: u32 = 0b10 << 12;
const CCR_DMODE_SHIFT: u32 = 24;

const TCR_DCYC: u32 = 0x1f;

pub struct Ospi1 {
    regs: OCTOSPI1,
    /// Address of the pending data phase, used to re-trigger it.
    pending: Option<Option<u32>>,
}

impl Ospi1 {
    pub fn new(regs: OCTOSPI1) -> Self {
        regs.cr.modify(|r, w| unsafe { w.bits(r.bits() | CR_EN) });
        Ospi1 { regs, pending: None }
    }

    fn status(&self) -> u32 {
        self.regs.sr.read().bits()
    }

    fn clear_flags(&mut self) {
        self.regs.fcr.write(|w| unsafe { w.bits(SR_TEF | SR_TCF) });
    }

    fn set_fmode(&mut self, fmode: u32) {
        self.regs
            .cr
            .modify(|r, w| unsafe { w.bits((r.bits() & !CR_FMODE) | (fmode << CR_FMODE_SHIFT)) });
    }

    /// Wait for any of `flags`, failing on a transfer error.
    fn wait(&mut self, flags: u32, timeout_ms: u32) -> HwResult {
        let mut budget = timeout_ms.saturating_mul(POLLS_PER_MS);
        loop {
            let sr = self.status();
            if sr & SR_TEF != 0 {
                self.clear_flags();
                return Err(HwError::Error);
            }
            if sr & flags != 0 {
                return Ok(());
            }
            if budget == 0 {
                return Err(HwError::Timeout);
            }
            budget -= 1;
        }
    }

    fn wait_idle(&mut self, timeout_ms: u32) -> HwResult {
        let mut budget = timeout_ms.saturating_mul(POLLS_PER_MS);
        while self.status() & SR_BUSY != 0 {
            if budget == 0 {
                return Err(HwError::Busy);
            }
            budget -= 1;
        }
        Ok(())
    }

    fn complete(&mut self, timeout_ms: u32) -> HwResult {
        self.wait(SR_TCF, timeout_ms)?;
        self.clear_flags();
        Ok(())
    }

    /// Start the pending data phase in the current mode.
    fn trigger(&mut self, address: Option<u32>) {
        match address {
            Some(address) => self.regs.ar.write(|w| unsafe { w.bits(address) }),
            None => {
                let ir = self.regs.ir.read().bits();
                self.regs.ir.write(|w| unsafe { w.bits(ir) });
            }
        }
    }

    fn fifo(&self) -> *mut u8 {
        &self.regs.dr as *const _ as *mut u8
    }
}

fn ccr(frame: &CommandFrame) -> u32 {
    let mut ccr = frame.instruction_mode.bits();
    if frame.has_address() {
        ccr |= (frame.address_mode.bits() << CCR_ADMODE_SHIFT) | CCR_ADSIZE_24;
    }
    ccr | (frame.data_mode.bits() << CCR_DMODE_SHIFT)
}

impl OctoSpi for Ospi1 {
    fn is_memory_mapped(&self) -> bool {
        (self.regs.cr.read().bits() & CR_FMODE) >> CR_FMODE_SHIFT == FMODE_MEMORY_MAPPED
    }

    fn command(&mut self, frame: &CommandFrame, timeout_ms: u32) -> HwResult {
        self.wait_idle(timeout_ms)?;
        self.clear_flags();
        self.pending = None;
        self.set_fmode(FMODE_INDIRECT_WRITE);

        self.regs.ccr.write(|w| unsafe { w.bits(ccr(frame)) });
        self.regs
            .tcr
            .write(|w| unsafe { w.bits(u32::from(frame.dummy_cycles) & TCR_DCYC) });
        if frame.has_data() && frame.data_len > 0 {
            self.regs.dlr.write(|w| unsafe { w.bits(frame.data_len as u32 - 1) });
        }
        self.regs.ir.write(|w| unsafe { w.bits(u32::from(frame.instruction)) });
        let address = frame.has_address().then_some(frame.address);

        if frame.has_data() {
            self.pending = Some(address);
            return Ok(());
        }
        if let Some(address) = address {
            self.regs.ar.write(|w| unsafe { w.bits(address) });
        }
        self.complete(timeout_ms)
    }

    fn transmit(&mut self, data: &[u8], timeout_ms: u32) -> HwResult {
        let address = self.pending.take().ok_or(HwError::Error)?;
        // Without an address the instruction write already started it.
        if address.is_some() {
            self.trigger(address);
        }
        for byte in data {
            self.wait(SR_FTF, timeout_ms)?;
            unsafe { ptr::write_volatile(self.fifo(), *byte) };
        }
        self.complete(timeout_ms)
    }

    fn receive(&mut self, data: &mut [u8], timeout_ms: u32) -> HwResult {
        let address = self.pending.take().ok_or(HwError::Error)?;
        self.set_fmode(FMODE_INDIRECT_READ);
        self.trigger(address);
        for byte in data.iter_mut() {
            self.wait(SR_FTF | SR_TCF, timeout_ms)?;
            *byte = unsafe { ptr::read_volatile(self.fifo() as *const u8) };
        }
        self.complete(timeout_ms)
    }

    fn memory_mapped(&mut self, config: &MemoryMappedConfig) -> HwResult {
        self.pending.take().ok_or(HwError::Error)?;
        self.wait_idle(1)?;
        match config.timeout {
            Some(timeout) => {
                self.regs.lptr.write(|w| unsafe { w.bits(u32::from(timeout)) });
                self.regs.cr.modify(|r, w| unsafe { w.bits(r.bits() | CR_TCEN) });
            }
            None => self.regs.cr.modify(|r, w| unsafe { w.bits(r.bits() & !CR_TCEN) }),
        }
        self.set_fmode(FMODE_MEMORY_MAPPED);
        Ok(())
    }

    fn abort(&mut self) {
        self.regs.cr.modify(|r, w| unsafe { w.bits(r.bits() | CR_ABORT) });
        let mut budget = POLLS_PER_MS;
        while self.regs.cr.read().bits() & CR_ABORT != 0 && budget > 0 {
            budget -= 1;
        }
        self.pending = None;
        self.set_fmode(FMODE_INDIRECT_WRITE);
        self.clear_flags();
    }
}
