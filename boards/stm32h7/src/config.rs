//! Board configuration.

use spiflash::ReadCmdFormat;

/// System clock.
pub const SYS_CLOCK_MHZ: u32 = 400;

/// OCTOSPI1 kernel clock.
pub const OSPI_CLOCK_MHZ: u32 = 50;

/// Where OCTOSPI1 maps the main flash.
pub const OSPI_BASE: usize = 0x9000_0000;

/// Size of the main flash, and so of the mapped window.  The controller only
/// sees 24 bits of address.
pub const MAIN_FLASH_SIZE: usize = 16 * 1024 * 1024;

/// Quad I/O fast read, 1-4-4 with 6 dummy cycles.  Used for the mapped
/// window.
pub const MAIN_FAST_READ: ReadCmdFormat = ReadCmdFormat {
    instruction: 0xeb,
    instruction_lines: 1,
    address_lines: 4,
    data_lines: 4,
    dummy_cycles: 6,
};

/// SPI2 clock for the auxiliary flash.
pub const SPI_CLOCK_MHZ: u32 = 10;

/// Scratch capacity of the auxiliary flash transport: one 4 KiB sector read
/// in a single transfer, plus the command and address.
pub const EXT_SCRATCH_SIZE: usize = 4096 + 4;

/// Status polls per millisecond of timeout.  Rough; each poll is a register
/// read plus loop overhead at `SYS_CLOCK_MHZ`.
pub const POLLS_PER_MS: u32 = 20_000;

/// Cycles between heartbeat toggles.
pub const HEARTBEAT_CYCLES: u32 = 100_000_000;
