//! Serial flash transport contract.
//!
//! A generic serial flash driver (probe, identify, erase, program, retry)
//! talks to its chips only through the types in this crate.  Each physical
//! chip has one [`Flash`] registry entry, keyed by a [`DeviceIndex`], and the
//! board installs a transport implementing [`Spi`] into that entry before the
//! driver issues any command.
//!
//! The driver owns retry and backoff.  Transports report failures through
//! [`Error`] and never retry on their own.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// Transport failure kinds, as seen by the driver's retry layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A write failed, or an operation was attempted while disallowed (for
    /// example any command while the device is memory-mapped).
    Write,
    /// Issuing a command or receiving its data failed.
    Read,
    /// A bounded hardware wait ran out.
    Timeout,
    /// Scratch space for a transfer could not be obtained.
    Allocation,
    /// An unsupported setting was supplied (bus width, dummy cycles, device).
    Configuration,
}

pub type Result<T> = core::result::Result<T, Error>;

impl NorFlashError for Error {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

/// The flash devices a board can carry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceIndex {
    /// The execute-in-place flash behind the multi-line controller.
    Main = 0,
    /// The auxiliary single-line flash.
    Ext = 1,
}

impl TryFrom<usize> for DeviceIndex {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        match index {
            0 => Ok(DeviceIndex::Main),
            1 => Ok(DeviceIndex::Ext),
            _ => Err(Error::Configuration),
        }
    }
}

/// Structured read descriptor, filled in by the driver once the chip has been
/// identified.  Line counts are raw values; the transport validates them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadCmdFormat {
    pub instruction: u8,
    pub instruction_lines: u8,
    pub address_lines: u8,
    pub data_lines: u8,
    pub dummy_cycles: u8,
}

impl ReadCmdFormat {
    /// Plain `READ` (0x03), everything on one line.
    pub const fn single_line() -> Self {
        Self {
            instruction: 0x03,
            instruction_lines: 1,
            address_lines: 1,
            data_lines: 1,
            dummy_cycles: 0,
        }
    }
}

/// Transport implementation for one flash device.
pub trait Spi {
    /// Send `write` (instruction, optional 24-bit address, then payload) and,
    /// if `read` is not empty, receive `read.len()` bytes afterwards.
    fn write_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<()>;

    /// Whether [`Spi::qspi_read`] is available on this transport.
    fn supports_qspi_read(&self) -> bool {
        false
    }

    /// Read `read.len()` bytes at `addr` using a structured descriptor.
    fn qspi_read(&mut self, addr: u32, format: &ReadCmdFormat, read: &mut [u8]) -> Result<()> {
        let _ = (addr, format, read);
        Err(Error::Configuration)
    }

    fn lock(&mut self);
    fn unlock(&mut self);
}

/// Retry budget handed to the driver along with the transport.
#[derive(Debug, Copy, Clone)]
pub struct Retry {
    /// Called between retries.
    pub delay: fn(),
    /// Number of retries before giving up.
    pub times: u32,
}

impl Retry {
    /// No retries at all.  Used until a transport is registered.
    pub const NONE: Retry = Retry { delay: no_delay, times: 0 };
}

fn no_delay() {}

/// One entry of the flash device registry.
pub struct Flash<S> {
    pub index: DeviceIndex,
    pub name: &'static str,
    /// The registered transport, `None` until the board installs one.
    pub spi: Option<S>,
    pub retry: Retry,
    /// Structured read descriptor, once the driver has chosen one.
    pub read_cmd_format: Option<ReadCmdFormat>,
}

impl<S> Flash<S> {
    pub const fn new(index: DeviceIndex, name: &'static str) -> Self {
        Flash {
            index,
            name,
            spi: None,
            retry: Retry::NONE,
            read_cmd_format: None,
        }
    }
}

impl<S: Spi> Flash<S> {
    /// The registered transport.
    pub fn spi(&mut self) -> Result<&mut S> {
        self.spi.as_mut().ok_or(Error::Configuration)
    }

    /// Run `f` against the transport between `lock()` and `unlock()`.
    pub fn locked<R>(&mut self, f: impl FnOnce(&mut S) -> Result<R>) -> Result<R> {
        let spi = self.spi()?;
        spi.lock();
        let result = f(spi);
        spi.unlock();
        result
    }
}

/// Check that `offset .. offset + length` lies inside a window of `capacity`
/// bytes.
pub fn check_window(capacity: usize, offset: usize, length: usize) -> Result<()> {
    if length > capacity || offset > capacity - length {
        return Err(Error::Read);
    }
    Ok(())
}
