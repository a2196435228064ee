//! Hardware seams.
//!
//! The transports only touch hardware through these traits, so the same code
//! runs against the real peripherals and against the simulator.

use core::marker::PhantomData;

use crate::frame::CommandFrame;
use crate::Error;

/// Default timeout for controller command, transmit and receive calls.
pub const OSPI_TIMEOUT_MS: u32 = 5000;

/// Status of a failed peripheral call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HwError {
    Error,
    Busy,
    Timeout,
}

impl HwError {
    /// Report this status as `kind`, unless it was a timeout.
    pub fn into_error(self, kind: Error) -> Error {
        match self {
            HwError::Timeout => Error::Timeout,
            HwError::Error | HwError::Busy => kind,
        }
    }
}

pub type HwResult = core::result::Result<(), HwError>;

/// Settings for continuous memory-mapped reads.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryMappedConfig {
    /// Release chip-select after this many idle clocks.  `None` keeps the
    /// read running forever.
    pub timeout: Option<u16>,
}

impl MemoryMappedConfig {
    pub const UNBOUNDED: MemoryMappedConfig = MemoryMappedConfig { timeout: None };
}

/// A multi-line (octo/quad SPI) flash controller.
pub trait OctoSpi {
    /// Read the live configuration and report whether the controller is in
    /// memory-mapped mode.
    fn is_memory_mapped(&self) -> bool;

    /// Issue `frame`.  Frames without a data phase run to completion here;
    /// frames with one wait for the following [`transmit`](OctoSpi::transmit),
    /// [`receive`](OctoSpi::receive) or
    /// [`memory_mapped`](OctoSpi::memory_mapped).
    fn command(&mut self, frame: &CommandFrame, timeout_ms: u32) -> HwResult;

    fn transmit(&mut self, data: &[u8], timeout_ms: u32) -> HwResult;

    fn receive(&mut self, data: &mut [u8], timeout_ms: u32) -> HwResult;

    /// Switch into memory-mapped mode using the previously issued frame.
    fn memory_mapped(&mut self, config: &MemoryMappedConfig) -> HwResult;

    /// Abort whatever is running and return to command mode.
    fn abort(&mut self);
}

/// A full-duplex byte bus.  `tx` and `rx` have the same length.
pub trait SpiBus {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], timeout_ms: u32) -> HwResult;
}

/// The global interrupt enable.
pub trait Interrupts {
    /// Disable interrupts, returning whether they were enabled before.
    fn disable() -> bool;

    fn enable();

    fn restore(was_enabled: bool) {
        if was_enabled {
            Self::enable();
        }
    }
}

/// Interrupts stay disabled while this is alive.
pub struct IrqGuard<I: Interrupts> {
    was_enabled: bool,
    _irq: PhantomData<I>,
}

impl<I: Interrupts> IrqGuard<I> {
    pub fn new() -> Self {
        IrqGuard {
            was_enabled: I::disable(),
            _irq: PhantomData,
        }
    }
}

impl<I: Interrupts> Default for IrqGuard<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Interrupts> Drop for IrqGuard<I> {
    fn drop(&mut self) {
        I::restore(self.was_enabled);
    }
}
