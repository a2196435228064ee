//! Memory-mapped (execute-in-place) mode.
//!
//! Entering memory-mapped mode issues the continuous read command once and
//! leaves the controller streaming; from then on the flash is plain memory in
//! the mapped window.  This happens once, after the driver has configured the
//! chip and before the boot handoff.  Exit exists for diagnostics.

use embedded_storage::nor_flash::{ErrorType, ReadNorFlash};

use crate::frame::CommandFrame;
use crate::hw::{IrqGuard, MemoryMappedConfig, OctoSpi, OSPI_TIMEOUT_MS};
use crate::transport::{OctoTransport, Transport};
use crate::{Error, Flash, MappedFlash, Platform, ReadCmdFormat, Result};

/// Operating mode of the multi-line controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Command,
    MemoryMapped,
}

impl<P: Platform> OctoTransport<P> {
    /// Issue the continuous read described by `format` and switch into
    /// memory-mapped mode, with no idle timeout.
    ///
    /// On failure the controller is left in command mode.
    pub fn enter_memory_mapped(&mut self, format: &ReadCmdFormat) -> Result<()> {
        if self.mode() == Mode::MemoryMapped {
            error!("xip: already memory mapped");
            return Err(Error::Write);
        }

        // The data length doesn't matter once the read is continuous.
        let frame = CommandFrame::fast_read(format, 0, 0)?;

        let _irq = IrqGuard::<P::Irq>::new();
        if let Err(e) = self.ospi.command(&frame, OSPI_TIMEOUT_MS) {
            error!("xip: read command failed: {:?}", e);
            return Err(Error::Read);
        }
        if let Err(e) = self.ospi.memory_mapped(&MemoryMappedConfig::UNBOUNDED) {
            error!("xip: memory mapped switch failed: {:?}", e);
            return Err(Error::Read);
        }
        info!("xip: memory mapped at {:#x}", self.get_base());
        Ok(())
    }

    /// Abort the continuous read and return to command mode.  Best effort,
    /// and harmless when already in command mode.
    pub fn exit_memory_mapped(&mut self) {
        let _irq = IrqGuard::<P::Irq>::new();
        self.ospi.abort();
        debug!("xip: back in command mode");
    }
}

/// Switch the main flash into memory-mapped mode, using the read descriptor
/// the driver stored in `flash`.
///
/// The returned view borrows the transport, so nothing can issue commands
/// while it is alive.
pub fn enter_xip<P: Platform, const N: usize>(flash: &mut Flash<Transport<P, N>>) -> Result<XipFlash<'_, P>> {
    let format = flash.read_cmd_format.ok_or(Error::Configuration)?;
    match flash.spi.as_mut() {
        Some(Transport::Octo(transport)) => {
            transport.enter_memory_mapped(&format)?;
            Ok(XipFlash { transport, format })
        }
        _ => {
            error!("xip: {} is not behind the multi-line controller", flash.name);
            Err(Error::Configuration)
        }
    }
}

/// The main flash while memory-mapped.
pub struct XipFlash<'a, P: Platform> {
    transport: &'a mut OctoTransport<P>,
    format: ReadCmdFormat,
}

impl<'a, P: Platform> XipFlash<'a, P> {
    pub fn transport(&self) -> &OctoTransport<P> {
        self.transport
    }

    /// Leave memory-mapped mode, giving the transport back to command use.
    pub fn exit(self) {
        self.transport.exit_memory_mapped();
    }
}

impl<'a, P: Platform> ErrorType for XipFlash<'a, P> {
    type Error = Error;
}

impl<'a, P: Platform> ReadNorFlash for XipFlash<'a, P> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<()> {
        self.transport.fast_read(offset, &self.format, bytes)
    }

    fn capacity(&self) -> usize {
        self.transport.window()
    }
}

impl<'a, P: Platform> MappedFlash for XipFlash<'a, P> {
    fn get_base(&self) -> usize {
        self.transport.get_base()
    }
}
