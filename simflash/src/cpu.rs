//! A CPU that records the handoff instead of performing it.
//!
//! [`SimCpu::start`] can't return, so it records the step and unwinds with a
//! [`Jumped`] payload; [`expect_jump`] catches it.

use std::panic::{self, AssertUnwindSafe};

use boot::handoff::Cpu;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    DisableMpu,
    DisableDcache,
    DisableIcache,
    DisableInterrupts,
    EnableInterrupts,
    StopSystick,
    ClearBank(usize),
    Start {
        stack_top: u32,
        vector_table: usize,
        entry: u32,
    },
}

/// Unwind payload of a simulated jump.
#[derive(Debug)]
pub struct Jumped(pub u32);

#[derive(Default)]
pub struct SimCpu {
    pub steps: Vec<Step>,
}

impl SimCpu {
    pub fn new() -> SimCpu {
        SimCpu::default()
    }
}

impl Cpu for SimCpu {
    fn disable_mpu(&mut self) {
        self.steps.push(Step::DisableMpu);
    }

    fn disable_dcache(&mut self) {
        self.steps.push(Step::DisableDcache);
    }

    fn disable_icache(&mut self) {
        self.steps.push(Step::DisableIcache);
    }

    fn disable_interrupts(&mut self) {
        self.steps.push(Step::DisableInterrupts);
    }

    fn enable_interrupts(&mut self) {
        self.steps.push(Step::EnableInterrupts);
    }

    fn stop_systick(&mut self) {
        self.steps.push(Step::StopSystick);
    }

    fn clear_interrupt_bank(&mut self, bank: usize) {
        self.steps.push(Step::ClearBank(bank));
    }

    unsafe fn start(&mut self, stack_top: u32, vector_table: usize, entry: u32) -> ! {
        self.steps.push(Step::Start {
            stack_top,
            vector_table,
            entry,
        });
        panic::resume_unwind(Box::new(Jumped(entry)))
    }
}

/// Run `f`, which should end in a simulated jump.  Returns the entry address,
/// or `None` if `f` returned normally.  Any other panic passes through.
pub fn expect_jump<R>(f: impl FnOnce() -> R) -> Option<u32> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => None,
        Err(payload) => match payload.downcast::<Jumped>() {
            Ok(jumped) => Some(jumped.0),
            Err(other) => panic::resume_unwind(other),
        },
    }
}
