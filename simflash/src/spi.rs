//! Simulated single-line bus and chip-select pin.
//!
//! Both write into a shared [`Trace`], which is how the tests see that the
//! transfer happened between select and deselect.

use std::cell::RefCell;
use std::rc::Rc;

use boot::hw::HwResult;
use boot::{HwError, SpiBus};
use embedded_hal::digital::v2::OutputPin;

use crate::chip::NorChip;
use crate::irq;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    Select,
    Deselect,
    Transfer { len: usize, masked: bool },
}

#[derive(Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<Event>>>);

impl Trace {
    pub fn new() -> Trace {
        Trace::default()
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Error of a pin that won't drive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PinFault;

/// A chip-select line, active low.  Starts deselected.
pub struct SimPin {
    trace: Trace,
    release_fails: bool,
}

impl SimPin {
    pub fn new(trace: Trace) -> SimPin {
        SimPin {
            trace,
            release_fails: false,
        }
    }

    /// A pin that reports an error every time it is released.  The release
    /// is still traced.
    pub fn failing_release(trace: Trace) -> SimPin {
        SimPin {
            trace,
            release_fails: true,
        }
    }
}

impl OutputPin for SimPin {
    type Error = PinFault;

    fn set_low(&mut self) -> Result<(), PinFault> {
        self.trace.push(Event::Select);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        self.trace.push(Event::Deselect);
        if self.release_fails {
            return Err(PinFault);
        }
        Ok(())
    }
}

struct SpiState {
    chip: NorChip,
    trace: Trace,
    last_tx: Vec<u8>,
    last_rx: Vec<u8>,
    last_timeout: u32,
    fault: Option<HwError>,
}

#[derive(Clone)]
pub struct SimSpi(Rc<RefCell<SpiState>>);

impl SimSpi {
    pub fn new(chip: NorChip, trace: Trace) -> SimSpi {
        SimSpi(Rc::new(RefCell::new(SpiState {
            chip,
            trace,
            last_tx: Vec::new(),
            last_rx: Vec::new(),
            last_timeout: 0,
            fault: None,
        })))
    }

    pub fn install(&self, data: &[u8], offset: usize) -> anyhow::Result<()> {
        self.0.borrow_mut().chip.install(data, offset)
    }

    pub fn with_chip<R>(&self, f: impl FnOnce(&NorChip) -> R) -> R {
        f(&self.0.borrow().chip)
    }

    /// Bytes sent by the last transfer.
    pub fn last_tx(&self) -> Vec<u8> {
        self.0.borrow().last_tx.clone()
    }

    /// Bytes received by the last successful transfer.
    pub fn last_rx(&self) -> Vec<u8> {
        self.0.borrow().last_rx.clone()
    }

    pub fn last_timeout(&self) -> u32 {
        self.0.borrow().last_timeout
    }

    /// Fail the next transfer with `error`.
    pub fn fail(&self, error: HwError) {
        self.0.borrow_mut().fault = Some(error);
    }
}

impl SpiBus for SimSpi {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], timeout_ms: u32) -> HwResult {
        let mut st = self.0.borrow_mut();
        st.trace.push(Event::Transfer {
            len: tx.len(),
            masked: !irq::enabled(),
        });
        st.last_tx = tx.to_vec();
        st.last_timeout = timeout_ms;
        if let Some(error) = st.fault.take() {
            return Err(error);
        }
        if tx.len() != rx.len() {
            return Err(HwError::Error);
        }
        st.chip.exchange(tx, rx)?;
        st.last_rx = rx.to_vec();
        Ok(())
    }
}
