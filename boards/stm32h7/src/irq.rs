//! The global interrupt line.

use boot::Interrupts;
use cortex_m::register::primask;

pub struct GlobalIrq;

impl Interrupts for GlobalIrq {
    fn disable() -> bool {
        let was_enabled = primask::read().is_inactive();
        cortex_m::interrupt::disable();
        was_enabled
    }

    fn enable() {
        unsafe { cortex_m::interrupt::enable() }
    }
}
