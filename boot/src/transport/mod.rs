//! Transport registration.
//!
//! Each flash device gets exactly one transport for the life of the program.
//! The board builds them all up front into [`Transports`], and
//! [`device_transport_init`] moves the right one into the device's registry
//! entry, tagged by kind.

mod octo;
mod spi;

pub use octo::{OctoTransport, ReadCause};
pub use spi::{SpiTransport, DUMMY_BYTE, SCRATCH_SIZE, TRANSFER_TIMEOUT_MS};

use spiflash::{DeviceIndex, Flash, Retry, Spi};

use crate::hw::Interrupts;
use crate::{Error, Platform, ReadCmdFormat, Result};

/// Retries before the driver gives up, about 60 seconds at 100us each.
pub const RETRY_TIMES: u32 = 60 * 10_000;

/// A registered transport.  The variant is fixed by the device index at
/// registration time.  `N` is the scratch capacity of the SPI variant.
pub enum Transport<P: Platform, const N: usize = SCRATCH_SIZE> {
    Octo(OctoTransport<P>),
    Spi(SpiTransport<P, N>),
}

impl<P: Platform, const N: usize> Transport<P, N> {
    pub fn as_octo(&self) -> Option<&OctoTransport<P>> {
        match self {
            Transport::Octo(t) => Some(t),
            Transport::Spi(_) => None,
        }
    }

    pub fn as_spi(&self) -> Option<&SpiTransport<P, N>> {
        match self {
            Transport::Spi(t) => Some(t),
            Transport::Octo(_) => None,
        }
    }
}

impl<P: Platform, const N: usize> Spi for Transport<P, N> {
    fn write_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        match self {
            Transport::Octo(t) => t.write_then_read(write, read),
            Transport::Spi(t) => t.write_read(write, read),
        }
    }

    fn supports_qspi_read(&self) -> bool {
        matches!(self, Transport::Octo(_))
    }

    fn qspi_read(&mut self, addr: u32, format: &ReadCmdFormat, read: &mut [u8]) -> Result<()> {
        match self {
            Transport::Octo(t) => t.fast_read(addr, format, read),
            Transport::Spi(_) => Err(Error::Configuration),
        }
    }

    fn lock(&mut self) {
        P::Irq::disable();
    }

    fn unlock(&mut self) {
        P::Irq::enable();
    }
}

/// The transports of every device, each handed out once.
pub struct Transports<P: Platform, const N: usize = SCRATCH_SIZE> {
    main: Option<OctoTransport<P>>,
    ext: Option<SpiTransport<P, N>>,
}

impl<P: Platform, const N: usize> Transports<P, N> {
    pub fn new(main: Option<OctoTransport<P>>, ext: Option<SpiTransport<P, N>>) -> Self {
        Transports { main, ext }
    }
}

/// Install the transport for `flash.index` along with its retry budget.
///
/// Must be called once per device before the driver touches it.  Registering
/// a device twice, or one the board has no transport for, is a configuration
/// error.
pub fn device_transport_init<P: Platform, const N: usize>(
    flash: &mut Flash<Transport<P, N>>,
    transports: &mut Transports<P, N>,
) -> Result<()> {
    let transport = match flash.index {
        DeviceIndex::Main => transports.main.take().map(Transport::Octo),
        DeviceIndex::Ext => transports.ext.take().map(Transport::Spi),
    };
    let transport = match transport {
        Some(t) => t,
        None => {
            error!("sfud: no transport left for {}", flash.name);
            return Err(Error::Configuration);
        }
    };

    flash.spi = Some(transport);
    flash.retry = Retry {
        delay: P::retry_delay,
        times: RETRY_TIMES,
    };
    info!("sfud: {} transport registered", flash.name);
    Ok(())
}
