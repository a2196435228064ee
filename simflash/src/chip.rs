//! A serial NOR chip.
//!
//! Only the command set the bootloader path touches is modelled: identify,
//! status, write enable, the single/dual/quad reads, page program and erase.
//! Programming can only clear bits, erasing sets them back to 0xff, and both
//! need the write enable latch.  Operations complete instantly, so the busy
//! bit never shows.

use anyhow::{anyhow, Result};
use boot::frame::ADDRESS_MASK;
use boot::HwError;

use crate::styles::ChipStyle;

pub const WRITE_STATUS: u8 = 0x01;
pub const PAGE_PROGRAM: u8 = 0x02;
pub const READ: u8 = 0x03;
pub const WRITE_DISABLE: u8 = 0x04;
pub const READ_STATUS: u8 = 0x05;
pub const WRITE_ENABLE: u8 = 0x06;
pub const FAST_READ: u8 = 0x0b;
pub const SECTOR_ERASE: u8 = 0x20;
pub const QUAD_PROGRAM: u8 = 0x32;
pub const DUAL_OUTPUT_READ: u8 = 0x3b;
pub const CHIP_ERASE: u8 = 0x60;
pub const ENABLE_RESET: u8 = 0x66;
pub const QUAD_OUTPUT_READ: u8 = 0x6b;
pub const RESET: u8 = 0x99;
pub const JEDEC_ID: u8 = 0x9f;
pub const DUAL_IO_READ: u8 = 0xbb;
pub const BLOCK_ERASE: u8 = 0xd8;
pub const QUAD_IO_READ: u8 = 0xeb;
pub const QUAD_IO_READ_ALT: u8 = 0xec;

const STATUS_WEL: u8 = 0x02;

type ChipResult = core::result::Result<(), HwError>;

pub struct NorChip {
    style: &'static ChipStyle,
    memory: Box<[u8]>,
    write_enabled: bool,
}

impl NorChip {
    /// A blank (fully erased) chip.
    pub fn new(style: &'static ChipStyle) -> NorChip {
        NorChip {
            style,
            memory: vec![0xff; style.capacity].into_boxed_slice(),
            write_enabled: false,
        }
    }

    pub fn style(&self) -> &'static ChipStyle {
        self.style
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Address of the backing memory.  It never moves for the life of the
    /// chip.
    pub fn base(&self) -> usize {
        self.memory.as_ptr() as usize
    }

    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Put `data` at `offset`, as a factory programmer would.
    pub fn install(&mut self, data: &[u8], offset: usize) -> Result<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= self.memory.len())
            .ok_or_else(|| anyhow!("{} bytes at {:#x} do not fit in {}", data.len(), offset, self.style.name))?;
        self.memory[offset..end].copy_from_slice(data);
        Ok(())
    }

    pub fn is_read(op: u8) -> bool {
        matches!(
            op,
            READ | FAST_READ
                | DUAL_OUTPUT_READ
                | QUAD_OUTPUT_READ
                | DUAL_IO_READ
                | QUAD_IO_READ
                | QUAD_IO_READ_ALT
        )
    }

    /// A command without a data phase.
    pub fn control(&mut self, op: u8, address: u32) -> ChipResult {
        match op {
            WRITE_ENABLE => self.write_enabled = true,
            WRITE_DISABLE => self.write_enabled = false,
            ENABLE_RESET => (),
            RESET => self.write_enabled = false,
            SECTOR_ERASE => self.erase(address, self.style.sector_size)?,
            BLOCK_ERASE => self.erase(address, self.style.block_size)?,
            CHIP_ERASE | 0xc7 => self.erase(0, self.memory.len())?,
            _ => return Err(HwError::Error),
        }
        Ok(())
    }

    /// Data phase of a command that reads from the chip.
    pub fn read_out(&self, op: u8, address: u32, data: &mut [u8]) -> ChipResult {
        match op {
            JEDEC_ID => {
                for (i, b) in data.iter_mut().enumerate() {
                    *b = self.style.jedec[i % self.style.jedec.len()];
                }
            }
            READ_STATUS => {
                let status = if self.write_enabled { STATUS_WEL } else { 0 };
                data.fill(status);
            }
            op if Self::is_read(op) => {
                let start = self.index(address);
                for (i, b) in data.iter_mut().enumerate() {
                    *b = self.memory[(start + i) % self.memory.len()];
                }
            }
            _ => return Err(HwError::Error),
        }
        Ok(())
    }

    /// Data phase of a command that writes to the chip.
    pub fn write_in(&mut self, op: u8, address: u32, data: &[u8]) -> ChipResult {
        match op {
            PAGE_PROGRAM | QUAD_PROGRAM => self.program(address, data),
            WRITE_STATUS => {
                self.write_enabled = false;
                Ok(())
            }
            _ => Err(HwError::Error),
        }
    }

    /// One single-line full-duplex exchange.  `rx` receives whatever the chip
    /// drives while `tx` is clocked out, zero during the command header.
    pub fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> ChipResult {
        let (&op, rest) = tx.split_first().ok_or(HwError::Error)?;
        rx.fill(0);
        let address = |rest: &[u8]| -> core::result::Result<u32, HwError> {
            match rest {
                [a, b, c, ..] => Ok(u32::from_be_bytes([0, *a, *b, *c])),
                _ => Err(HwError::Error),
            }
        };
        match op {
            JEDEC_ID | READ_STATUS => self.read_out(op, 0, &mut rx[1..]),
            READ => self.read_out(op, address(rest)?, &mut rx[4..]),
            // One dummy byte after the address.
            FAST_READ => {
                if tx.len() < 5 {
                    return Err(HwError::Error);
                }
                self.read_out(op, address(rest)?, &mut rx[5..])
            }
            PAGE_PROGRAM => {
                let address = address(rest)?;
                self.write_in(op, address, &tx[4..])
            }
            SECTOR_ERASE | BLOCK_ERASE => self.control(op, address(rest)?),
            WRITE_ENABLE | WRITE_DISABLE | ENABLE_RESET | RESET | CHIP_ERASE | 0xc7 => self.control(op, 0),
            // Multi-line commands can't run over one line.
            _ => Err(HwError::Error),
        }
    }

    fn index(&self, address: u32) -> usize {
        (address & ADDRESS_MASK) as usize % self.memory.len()
    }

    fn program(&mut self, address: u32, data: &[u8]) -> ChipResult {
        if !self.write_enabled {
            return Err(HwError::Error);
        }
        let page = self.style.page_size;
        let start = self.index(address);
        let page_base = start - start % page;
        for (i, byte) in data.iter().enumerate() {
            let at = page_base + (start - page_base + i) % page;
            self.memory[at] &= byte;
        }
        self.write_enabled = false;
        Ok(())
    }

    fn erase(&mut self, address: u32, size: usize) -> ChipResult {
        if !self.write_enabled {
            return Err(HwError::Error);
        }
        let start = self.index(address);
        let start = start - start % size;
        self.memory[start..start + size].fill(0xff);
        self.write_enabled = false;
        Ok(())
    }
}
