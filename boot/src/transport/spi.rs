//! Transport for the auxiliary flash on a plain single-line SPI bus.
//!
//! Every call is one full-duplex transfer: the write bytes go out first,
//! followed by [`DUMMY_BYTE`] for every byte to read, and the read bytes are
//! whatever came back during that tail.

use embedded_hal::digital::v2::OutputPin;

use crate::hw::{HwError, IrqGuard, SpiBus};
use crate::{Error, Platform, Result};

/// Sent while clocking in read data.
pub const DUMMY_BYTE: u8 = 0xff;

/// Timeout for one full-duplex transfer.
pub const TRANSFER_TIMEOUT_MS: u32 = 1000;

/// Default capacity of each scratch buffer.  Covers a page program (4 + 256
/// bytes); boards that let the driver read whole sectors pick a larger `N`.
pub const SCRATCH_SIZE: usize = 512;

type Scratch<const N: usize> = heapless::Vec<u8, N>;

/// `N` bounds `write.len() + read.len()` of a single transfer.
pub struct SpiTransport<P: Platform, const N: usize = SCRATCH_SIZE> {
    bus: P::Spi,
    cs: P::Pin,
}

impl<P: Platform, const N: usize> SpiTransport<P, N> {
    pub fn new(bus: P::Spi, cs: P::Pin) -> Self {
        SpiTransport { bus, cs }
    }

    pub fn bus(&self) -> &P::Spi {
        &self.bus
    }

    pub fn chip_select(&self) -> &P::Pin {
        &self.cs
    }

    /// Write `write`, then read `read.len()` bytes, as a single transfer.
    ///
    /// Both empty is refused with [`Error::Write`].  A bus timeout is reported
    /// as [`Error::Timeout`] so the driver can tell a stalled bus from a
    /// broken configuration.
    pub fn write_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        let total = write.len() + read.len();
        if total == 0 {
            return Err(Error::Write);
        }

        let (tx, mut rx) = match Self::scratch(write, total) {
            Some(buffers) => buffers,
            None => {
                error!("sfud: no scratch space for a {} byte transfer", total);
                return Err(Error::Allocation);
            }
        };

        let _irq = IrqGuard::<P::Irq>::new();
        self.cs.set_low().map_err(|_| Error::Write)?;
        let status = self.bus.transfer(&tx, &mut rx, TRANSFER_TIMEOUT_MS);
        let released = self.cs.set_high().map_err(|_| Error::Write);

        match status {
            Ok(()) => {
                released?;
                read.copy_from_slice(&rx[write.len()..]);
                Ok(())
            }
            Err(HwError::Timeout) => {
                warn!("sfud: spi transfer timed out");
                Err(Error::Timeout)
            }
            Err(e) => Err(e.into_error(Error::Write)),
        }
    }

    /// Send buffer (payload then dummy fill) and an equally sized receive
    /// buffer.
    fn scratch(write: &[u8], total: usize) -> Option<(Scratch<N>, Scratch<N>)> {
        let mut tx = Scratch::<N>::new();
        tx.extend_from_slice(write).ok()?;
        tx.resize(total, DUMMY_BYTE).ok()?;
        let mut rx = Scratch::<N>::new();
        rx.resize(total, 0).ok()?;
        Some((tx, rx))
    }
}
