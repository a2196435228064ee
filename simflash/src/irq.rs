//! Simulated global interrupt line, one per test thread.

use std::cell::Cell;

use boot::Interrupts;

thread_local! {
    static ENABLED: Cell<bool> = Cell::new(true);
    static DISABLES: Cell<usize> = Cell::new(0);
}

pub struct SimIrq;

impl Interrupts for SimIrq {
    fn disable() -> bool {
        DISABLES.with(|d| d.set(d.get() + 1));
        ENABLED.with(|e| e.replace(false))
    }

    fn enable() {
        ENABLED.with(|e| e.set(true));
    }
}

pub fn enabled() -> bool {
    ENABLED.with(|e| e.get())
}

/// Number of times interrupts have been disabled on this thread.
pub fn disables() -> usize {
    DISABLES.with(|d| d.get())
}
