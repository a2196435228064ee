//! Transport for the main flash, behind the multi-line controller.
//!
//! The controller is either in command mode, where this transport issues
//! frames, or in memory-mapped mode, where the flash shows up as plain memory
//! at `mapped_base` and every command is refused.  The mode is read back from
//! the controller before each operation, never cached.

use core::slice;

use embedded_hal::digital::v2::OutputPin;
use spiflash::check_window;

use crate::frame::{CommandFrame, LegacyCommand};
use crate::hw::{IrqGuard, OctoSpi, OSPI_TIMEOUT_MS};
use crate::xip::Mode;
use crate::{Error, MappedFlash, Platform, ReadCmdFormat, Result};

/// Which step of a fast read failed.  Both surface as [`Error::Read`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadCause {
    Command,
    Receive,
}

pub struct OctoTransport<P: Platform> {
    pub(crate) ospi: P::Octo,
    mapped_base: usize,
    window: usize,
    cs: Option<P::Pin>,
    last_read_failure: Option<ReadCause>,
}

impl<P: Platform> OctoTransport<P> {
    /// Bind a controller to its memory-mapped window.  `cs` is only needed
    /// when chip-select is a discrete pin rather than the controller's own.
    ///
    /// # Safety
    ///
    /// `mapped_base .. mapped_base + window` must be readable memory, holding
    /// the flash contents, whenever the controller reports memory-mapped mode.
    pub unsafe fn new(ospi: P::Octo, mapped_base: usize, window: usize, cs: Option<P::Pin>) -> Self {
        OctoTransport {
            ospi,
            mapped_base,
            window,
            cs,
            last_read_failure: None,
        }
    }

    /// Current controller mode, read from the controller.
    pub fn mode(&self) -> Mode {
        if self.ospi.is_memory_mapped() {
            Mode::MemoryMapped
        } else {
            Mode::Command
        }
    }

    pub fn controller(&self) -> &P::Octo {
        &self.ospi
    }

    /// Size of the memory-mapped window in bytes.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Cause of the most recent failed [`fast_read`](Self::fast_read).
    pub fn last_read_failure(&self) -> Option<ReadCause> {
        self.last_read_failure
    }

    /// Send a raw single-line command buffer, then receive `read.len()` bytes
    /// if `read` is not empty.
    ///
    /// Refused with [`Error::Write`] while memory-mapped: a command would
    /// corrupt fetches already in flight from the window.
    pub fn write_then_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        if self.mode() == Mode::MemoryMapped {
            error!("sfud: should not write while memory mapped");
            return Err(Error::Write);
        }

        let cmd = LegacyCommand::decode(write, read.len())?;

        let _irq = IrqGuard::<P::Irq>::new();
        self.select()?;
        let result = self.send_then_recv(&cmd, read);
        let released = self.deselect();
        result.and(released)
    }

    fn send_then_recv(&mut self, cmd: &LegacyCommand<'_>, read: &mut [u8]) -> Result<()> {
        self.ospi
            .command(&cmd.frame, OSPI_TIMEOUT_MS)
            .map_err(|e| e.into_error(Error::Read))?;

        if !read.is_empty() {
            self.ospi
                .receive(read, OSPI_TIMEOUT_MS)
                .map_err(|e| e.into_error(Error::Read))?;
        } else if !cmd.transmit.is_empty() {
            self.ospi
                .transmit(cmd.transmit, OSPI_TIMEOUT_MS)
                .map_err(|e| e.into_error(Error::Write))?;
        }
        Ok(())
    }

    /// Read `read.len()` bytes at `addr` using the structured descriptor.
    ///
    /// While memory-mapped the data is already visible in the window, so it
    /// is copied from there and no command is issued.
    pub fn fast_read(&mut self, addr: u32, format: &ReadCmdFormat, read: &mut [u8]) -> Result<()> {
        if self.mode() == Mode::MemoryMapped {
            return self.read_mapped(addr as usize, read);
        }

        let frame = CommandFrame::fast_read(format, addr, read.len())?;

        let _irq = IrqGuard::<P::Irq>::new();
        if let Err(e) = self.ospi.command(&frame, OSPI_TIMEOUT_MS) {
            error!("sfud: fast read command failed: {:?}", e);
            self.last_read_failure = Some(ReadCause::Command);
            return Err(Error::Read);
        }
        if let Err(e) = self.ospi.receive(read, OSPI_TIMEOUT_MS) {
            error!("sfud: fast read receive failed: {:?}", e);
            self.last_read_failure = Some(ReadCause::Receive);
            return Err(Error::Read);
        }
        self.last_read_failure = None;
        Ok(())
    }

    /// Copy straight out of the memory-mapped window.
    pub(crate) fn read_mapped(&self, offset: usize, read: &mut [u8]) -> Result<()> {
        check_window(self.window, offset, read.len())?;
        // SAFETY: in window, and the window is readable while memory-mapped
        // (contract of `new`).
        let memory = unsafe { slice::from_raw_parts((self.mapped_base + offset) as *const u8, read.len()) };
        read.copy_from_slice(memory);
        Ok(())
    }

    fn select(&mut self) -> Result<()> {
        match self.cs.as_mut() {
            Some(cs) => cs.set_low().map_err(|_| Error::Write),
            None => Ok(()),
        }
    }

    fn deselect(&mut self) -> Result<()> {
        match self.cs.as_mut() {
            Some(cs) => cs.set_high().map_err(|_| Error::Write),
            None => Ok(()),
        }
    }
}

impl<P: Platform> MappedFlash for OctoTransport<P> {
    fn get_base(&self) -> usize {
        self.mapped_base
    }
}
