//! Cortex-M7 side of the boot handoff.

use core::arch::asm;
use core::ptr;

use boot::handoff::Cpu;
use cortex_m::asm::{dsb, isb};
use cortex_m::peripheral::SCB;
use cortex_m::Peripherals;

/// Owns the core peripherals for the handoff.
pub struct CortexM {
    p: Peripherals,
}

impl CortexM {
    pub fn new(p: Peripherals) -> Self {
        CortexM { p }
    }
}

impl Cpu for CortexM {
    fn disable_mpu(&mut self) {
        dsb();
        unsafe { self.p.MPU.ctrl.write(0) };
        dsb();
        isb();
    }

    fn disable_dcache(&mut self) {
        self.p.SCB.disable_dcache(&mut self.p.CPUID);
    }

    fn disable_icache(&mut self) {
        self.p.SCB.disable_icache();
    }

    fn disable_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    fn enable_interrupts(&mut self) {
        unsafe { cortex_m::interrupt::enable() }
    }

    fn stop_systick(&mut self) {
        let syst = &mut self.p.SYST;
        unsafe {
            syst.csr.write(0);
            syst.rvr.write(0);
            syst.cvr.write(0);
        }
    }

    fn clear_interrupt_bank(&mut self, bank: usize) {
        unsafe {
            self.p.NVIC.icer[bank].write(0xffff_ffff);
            self.p.NVIC.icpr[bank].write(0xffff_ffff);
        }
    }

    unsafe fn start(&mut self, stack_top: u32, vector_table: usize, entry: u32) -> ! {
        // From `msr msp` on, nothing may touch the stack: the switch, CONTROL,
        // VTOR and the branch stay in one block.
        asm!(
            "msr msp, {sp}",
            "msr control, {zero}",
            "isb",
            "str {vt}, [{vtor}]",
            "dsb",
            "isb",
            "blx {entry}",
            // An image that returns lands here.
            "1:",
            "b 1b",
            sp = in(reg) stack_top,
            zero = in(reg) 0u32,
            vt = in(reg) vector_table,
            vtor = in(reg) ptr::addr_of!((*SCB::PTR).vtor),
            entry = in(reg) entry,
            options(noreturn),
        );
    }
}
