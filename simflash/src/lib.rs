//! Simulated hardware
//!
//! Host-side stand-ins for everything the bootloader core touches: a serial
//! NOR chip, the multi-line controller in front of the main flash (with a
//! memory-mapped window that is really readable), a single-line bus and
//! chip-select for the auxiliary flash, the global interrupt line, and a CPU
//! that records the boot handoff instead of performing it.
//!
//! Peripheral models are shared handles: cloning one gives another view of
//! the same device, so a test can inspect a controller after the transport
//! has taken ownership of it.

use boot::transport::{device_transport_init, Transport, Transports};
use boot::{DeviceIndex, Flash, OctoTransport, Platform, SpiTransport};

pub mod chip;
pub mod cpu;
pub mod gen;
pub mod irq;
pub mod octo;
pub mod spi;
pub mod styles;

pub use chip::NorChip;
pub use cpu::{expect_jump, Jumped, SimCpu, Step};
pub use irq::SimIrq;
pub use octo::{SimOcto, Stage};
pub use spi::{Event, PinFault, SimPin, SimSpi, Trace};

pub struct SimPlatform;

impl Platform for SimPlatform {
    type Octo = SimOcto;
    type Spi = SimSpi;
    type Pin = SimPin;
    type Irq = SimIrq;

    fn retry_delay() {}
}

pub type SimFlash = Flash<Transport<SimPlatform>>;

pub fn octo_transport(octo: SimOcto, cs: Option<SimPin>) -> OctoTransport<SimPlatform> {
    let (base, window) = (octo.base(), octo.window());
    // SAFETY: the window is the chip's own memory, which lives as long as any
    // handle to the controller.
    unsafe { OctoTransport::new(octo, base, window, cs) }
}

pub fn spi_transport(spi: SimSpi, cs: SimPin) -> SpiTransport<SimPlatform> {
    SpiTransport::new(spi, cs)
}

/// A board with a main and an auxiliary flash.
pub struct SimBoard {
    pub octo: SimOcto,
    pub spi: SimSpi,
    pub trace: Trace,
}

impl SimBoard {
    pub fn new(main: NorChip, ext: NorChip) -> SimBoard {
        let trace = Trace::new();
        SimBoard {
            octo: SimOcto::new(main),
            spi: SimSpi::new(ext, trace.clone()),
            trace,
        }
    }

    pub fn transports(&self) -> Transports<SimPlatform> {
        Transports::new(
            Some(octo_transport(self.octo.clone(), None)),
            Some(spi_transport(self.spi.clone(), SimPin::new(self.trace.clone()))),
        )
    }

    /// Both registry entries, with their transports installed.
    pub fn register(&self) -> boot::Result<(SimFlash, SimFlash)> {
        let mut transports = self.transports();
        let mut main = Flash::new(DeviceIndex::Main, "main");
        let mut ext = Flash::new(DeviceIndex::Ext, "ext");
        device_transport_init(&mut main, &mut transports)?;
        device_transport_init(&mut ext, &mut transports)?;
        Ok((main, ext))
    }
}
