//! Simulated multi-line controller.
//!
//! Frames are executed against a [`NorChip`].  Memory-mapped mode is real in
//! the sense that matters: the window is the chip's own backing memory, so a
//! pointer read at [`SimOcto::base`] sees the flash contents.  While mapped,
//! every command is refused with `Busy`, like a controller whose FMODE field
//! says memory-mapped.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use boot::hw::{HwResult, MemoryMappedConfig};
use boot::{CommandFrame, HwError, OctoSpi};

use crate::chip::NorChip;
use crate::irq;

/// Where an injected fault fires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Command,
    Transmit,
    Receive,
    MemoryMapped,
}

struct OctoState {
    chip: NorChip,
    mapped: Option<MemoryMappedConfig>,
    pending: Option<CommandFrame>,
    /// Every accepted command, with whether interrupts were masked at the
    /// time.
    commands: Vec<(CommandFrame, bool)>,
    fault: Option<(Stage, HwError)>,
    aborts: usize,
}

impl OctoState {
    fn check(&mut self, stage: Stage) -> HwResult {
        match self.fault {
            Some((at, error)) if at == stage => {
                self.fault = None;
                Err(error)
            }
            _ => Ok(()),
        }
    }

    /// The frame a data phase belongs to.
    fn data_phase(&mut self, len: usize) -> Result<CommandFrame, HwError> {
        match self.pending.take() {
            Some(frame) if frame.has_data() && frame.data_len == len => Ok(frame),
            _ => Err(HwError::Error),
        }
    }
}

/// Handles are cheap clones sharing one controller, so a test can keep one
/// after the transport has taken the other.
#[derive(Clone)]
pub struct SimOcto(Rc<RefCell<OctoState>>);

impl SimOcto {
    pub fn new(chip: NorChip) -> SimOcto {
        SimOcto(Rc::new(RefCell::new(OctoState {
            chip,
            mapped: None,
            pending: None,
            commands: Vec::new(),
            fault: None,
            aborts: 0,
        })))
    }

    /// Start of the memory-mapped window.
    pub fn base(&self) -> usize {
        self.0.borrow().chip.base()
    }

    pub fn window(&self) -> usize {
        self.0.borrow().chip.capacity()
    }

    pub fn install(&self, data: &[u8], offset: usize) -> Result<()> {
        self.0.borrow_mut().chip.install(data, offset)
    }

    pub fn with_chip<R>(&self, f: impl FnOnce(&NorChip) -> R) -> R {
        f(&self.0.borrow().chip)
    }

    /// Accepted commands, oldest first.
    pub fn commands(&self) -> Vec<CommandFrame> {
        self.0.borrow().commands.iter().map(|(frame, _)| *frame).collect()
    }

    /// Whether every accepted command ran with interrupts masked.
    pub fn all_masked(&self) -> bool {
        self.0.borrow().commands.iter().all(|(_, masked)| *masked)
    }

    pub fn aborts(&self) -> usize {
        self.0.borrow().aborts
    }

    pub fn mapped_config(&self) -> Option<MemoryMappedConfig> {
        self.0.borrow().mapped
    }

    /// Fail the next call at `stage` with `error`.
    pub fn fail(&self, stage: Stage, error: HwError) {
        self.0.borrow_mut().fault = Some((stage, error));
    }
}

impl OctoSpi for SimOcto {
    fn is_memory_mapped(&self) -> bool {
        self.0.borrow().mapped.is_some()
    }

    fn command(&mut self, frame: &CommandFrame, _timeout_ms: u32) -> HwResult {
        let mut st = self.0.borrow_mut();
        if st.mapped.is_some() {
            return Err(HwError::Busy);
        }
        st.check(Stage::Command)?;
        st.commands.push((*frame, !irq::enabled()));
        if frame.has_data() {
            st.pending = Some(*frame);
            Ok(())
        } else {
            st.pending = None;
            st.chip.control(frame.instruction, frame.address)
        }
    }

    fn transmit(&mut self, data: &[u8], _timeout_ms: u32) -> HwResult {
        let mut st = self.0.borrow_mut();
        st.check(Stage::Transmit)?;
        let frame = st.data_phase(data.len())?;
        st.chip.write_in(frame.instruction, frame.address, data)
    }

    fn receive(&mut self, data: &mut [u8], _timeout_ms: u32) -> HwResult {
        let mut st = self.0.borrow_mut();
        st.check(Stage::Receive)?;
        let frame = st.data_phase(data.len())?;
        st.chip.read_out(frame.instruction, frame.address, data)
    }

    fn memory_mapped(&mut self, config: &MemoryMappedConfig) -> HwResult {
        let mut st = self.0.borrow_mut();
        st.check(Stage::MemoryMapped)?;
        match st.pending.take() {
            Some(frame) if frame.has_data() && NorChip::is_read(frame.instruction) => {
                st.mapped = Some(*config);
                Ok(())
            }
            _ => Err(HwError::Error),
        }
    }

    fn abort(&mut self) {
        let mut st = self.0.borrow_mut();
        st.aborts += 1;
        st.mapped = None;
        st.pending = None;
    }
}
