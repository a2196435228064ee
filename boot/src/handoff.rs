//! Handing control to the application image.
//!
//! The image sits at the start of the memory-mapped window and begins with
//! its vector table: a stack pointer and the reset handler address.  The
//! handoff latches those values into static storage, tears the core back
//! down to something resembling reset, and jumps.  Nothing comes back.
//!
//! The CPU side effects go through [`Cpu`] so the sequence itself can be
//! exercised off target.

use core::convert::Infallible;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use byteorder::{ByteOrder, LittleEndian};
use embedded_storage::nor_flash::ReadNorFlash;

use crate::MappedFlash;

/// Bytes of image header: initial stack pointer, then entry address.
pub const IMAGE_HEADER_LEN: usize = 8;

/// Interrupt controller banks of 32 lines each.
pub const NVIC_BANKS: usize = 8;

/// Where the application starts.
///
/// The vector table is an address in the memory map, kept at full width so a
/// window the core cannot address is never silently truncated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootTarget {
    pub stack_top: u32,
    pub vector_table: usize,
    pub entry: u32,
}

impl BootTarget {
    /// Decode an image header.  The vector table is the image itself, at
    /// `base`.
    pub fn from_header(base: usize, header: &[u8; IMAGE_HEADER_LEN]) -> BootTarget {
        BootTarget {
            stack_top: LittleEndian::read_u32(&header[0..4]),
            vector_table: base,
            entry: LittleEndian::read_u32(&header[4..8]),
        }
    }

    /// Read the header from the start of a memory-mapped flash.
    pub fn read<F: ReadNorFlash + MappedFlash>(flash: &mut F) -> Result<BootTarget, F::Error> {
        let mut header = [0u8; IMAGE_HEADER_LEN];
        flash.read(0, &mut header)?;
        Ok(Self::from_header(flash.get_base(), &header))
    }
}

/// Core-level effects of the handoff.
pub trait Cpu {
    fn disable_mpu(&mut self);
    fn disable_dcache(&mut self);
    fn disable_icache(&mut self);
    fn disable_interrupts(&mut self);
    fn enable_interrupts(&mut self);
    /// Stop SysTick and zero its reload and current value.
    fn stop_systick(&mut self);
    /// Disable and unpend the 32 interrupt lines of `bank`.
    fn clear_interrupt_bank(&mut self, bank: usize);

    /// Load the main stack pointer, return to privileged thread mode on the
    /// main stack, point the vector table at `vector_table` and branch to
    /// `entry`, as one uninterrupted step.  If the image ever returns, spin.
    ///
    /// # Safety
    ///
    /// Everything on the current stack is lost.  `vector_table` must hold a
    /// valid vector table and `entry` must be executable.
    unsafe fn start(&mut self, stack_top: u32, vector_table: usize, entry: u32) -> !;
}

static STACK_TOP: AtomicU32 = AtomicU32::new(0);
static VECTOR_TABLE: AtomicUsize = AtomicUsize::new(0);
static ENTRY: AtomicU32 = AtomicU32::new(0);

fn latch(target: &BootTarget) {
    STACK_TOP.store(target.stack_top, Ordering::SeqCst);
    VECTOR_TABLE.store(target.vector_table, Ordering::SeqCst);
    ENTRY.store(target.entry, Ordering::SeqCst);
}

/// The target most recently latched by [`quiesce`].
pub fn latched() -> BootTarget {
    BootTarget {
        stack_top: STACK_TOP.load(Ordering::SeqCst),
        vector_table: VECTOR_TABLE.load(Ordering::SeqCst),
        entry: ENTRY.load(Ordering::SeqCst),
    }
}

/// The core after [`quiesce`]: protection and caches off, no interrupt
/// enabled or pending, target latched.
pub struct Quiesced(());

/// Latch `target`, then bring the core back to a reset-like state.
///
/// No step can fail or be undone, so none report anything.
pub fn quiesce<C: Cpu>(cpu: &mut C, target: &BootTarget) -> Quiesced {
    latch(target);
    info!(
        "boot: sp {:#x}, vector table {:#x}, entry {:#x}",
        target.stack_top,
        target.vector_table,
        target.entry
    );

    cpu.disable_mpu();
    cpu.disable_dcache();
    cpu.disable_icache();
    cpu.disable_interrupts();
    cpu.stop_systick();
    for bank in 0..NVIC_BANKS {
        cpu.clear_interrupt_bank(bank);
    }
    cpu.enable_interrupts();
    Quiesced(())
}

impl Quiesced {
    /// Switch stacks and jump to the latched entry.
    ///
    /// # Safety
    ///
    /// The latched target must describe a valid image.
    pub unsafe fn transfer<C: Cpu>(self, cpu: &mut C) -> ! {
        // Locals do not survive the stack switch, so the values come from the
        // latch and no code of ours runs after `start` moves the stack.
        cpu.start(
            STACK_TOP.load(Ordering::SeqCst),
            VECTOR_TABLE.load(Ordering::SeqCst),
            ENTRY.load(Ordering::SeqCst),
        )
    }
}

/// Hand control to the image described by the three addresses.
///
/// # Safety
///
/// The addresses must describe a valid, mapped image.  Nothing after this
/// call runs.
pub unsafe fn boot<C: Cpu>(cpu: &mut C, stack_top: u32, vector_table: usize, entry: u32) -> ! {
    let target = BootTarget {
        stack_top,
        vector_table,
        entry,
    };
    quiesce(cpu, &target).transfer(cpu)
}

/// Read the image header out of `flash` and boot it.  Returns only if the
/// header could not be read.
///
/// # Safety
///
/// As for [`boot`]: the flash must hold a valid image.
pub unsafe fn chain<F, C>(flash: &mut F, cpu: &mut C) -> Result<Infallible, F::Error>
where
    F: ReadNorFlash + MappedFlash,
    C: Cpu,
{
    let target = BootTarget::read(flash)?;
    boot(cpu, target.stack_top, target.vector_table, target.entry)
}
