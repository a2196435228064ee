//! SPI2 as a full-duplex byte bus.

use boot::hw::HwResult;
use boot::{HwError, SpiBus};
use embedded_hal::spi::FullDuplex;
use hal::pac::SPI2;
use hal::spi::{Enabled, Spi};
use stm32h7xx_hal as hal;

use crate::config::POLLS_PER_MS;

pub struct Spi2Bus {
    spi: Spi<SPI2, Enabled, u8>,
}

impl Spi2Bus {
    pub fn new(spi: Spi<SPI2, Enabled, u8>) -> Self {
        Spi2Bus { spi }
    }
}

/// Retry `op` until it stops blocking, for at most `budget` polls.
fn poll<T, E>(budget: &mut u32, mut op: impl FnMut() -> nb::Result<T, E>) -> Result<T, HwError> {
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(nb::Error::Other(_)) => return Err(HwError::Error),
            Err(nb::Error::WouldBlock) if *budget == 0 => return Err(HwError::Timeout),
            Err(nb::Error::WouldBlock) => *budget -= 1,
        }
    }
}

impl SpiBus for Spi2Bus {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], timeout_ms: u32) -> HwResult {
        if tx.len() != rx.len() {
            return Err(HwError::Error);
        }
        let mut budget = timeout_ms.saturating_mul(POLLS_PER_MS);
        for (out, into) in tx.iter().zip(rx.iter_mut()) {
            poll(&mut budget, || self.spi.send(*out))?;
            *into = poll(&mut budget, || self.spi.read())?;
        }
        Ok(())
    }
}
