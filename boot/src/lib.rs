//! Transport and boot-handoff core for an execute-in-place bootloader.
//!
//! The main application lives in external serial flash behind a multi-line
//! flash controller.  This crate implements the serial flash driver's
//! transport contract ([`spiflash::Spi`]) on top of that controller and on a
//! secondary single-line bus, switches the controller into memory-mapped
//! mode once the driver is done with it, and hands control to the image.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[macro_use]
mod fmt;

pub mod frame;
pub mod handoff;
pub mod hw;
pub mod transport;
pub mod width;
pub mod xip;

pub use frame::CommandFrame;
pub use handoff::{BootTarget, Cpu};
pub use hw::{HwError, Interrupts, OctoSpi, SpiBus};
pub use spiflash::{DeviceIndex, Error, Flash, ReadCmdFormat, Result};
pub use transport::{device_transport_init, OctoTransport, SpiTransport, Transport, Transports};
pub use width::PhaseMode;
pub use xip::{enter_xip, Mode, XipFlash};

/// The hardware a board provides.  One implementation exists per board (and
/// one for the simulator), so every component is generic over the same set.
pub trait Platform {
    /// The multi-line controller in front of the main flash.
    type Octo: OctoSpi;
    /// The single-line bus in front of the auxiliary flash.
    type Spi: SpiBus;
    /// Discrete chip-select pins.
    type Pin: embedded_hal::digital::v2::OutputPin;
    /// The global interrupt line.
    type Irq: Interrupts;

    /// Delay between driver retries, about 100 microseconds.
    fn retry_delay() {
        for _ in 0..2400 {
            core::hint::spin_loop();
        }
    }
}

/// Some kinds of flash can be mapped into memory.  This is needed for XIP devices.
pub trait MappedFlash {
    /// Return the base address of this flash, as mapped into memory.
    fn get_base(&self) -> usize;
}
