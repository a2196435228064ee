//! Chip styles
//!
//! The serial NOR parts found next to these microcontrollers mostly share one
//! command set and differ in identity and size.  Each style here is one such
//! part.

use crate::chip::NorChip;

/// The geometry and identity of one part.
pub struct ChipStyle {
    pub name: &'static str,
    /// Manufacturer, memory type, capacity, as returned by `0x9f`.
    pub jedec: [u8; 3],
    pub capacity: usize,
    pub page_size: usize,
    pub sector_size: usize,
    pub block_size: usize,
}

impl ChipStyle {
    pub fn build(&'static self) -> NorChip {
        NorChip::new(self)
    }
}

/// Winbond 16Mbit, the usual quad part on evaluation boards.
pub static W25Q16JV: ChipStyle = ChipStyle {
    name: "W25Q16JV",
    jedec: [0xef, 0x40, 0x15],
    capacity: 2 * 1024 * 1024,
    page_size: 256,
    sector_size: 4 * 1024,
    block_size: 64 * 1024,
};

/// Macronix 32Mbit.
pub static MX25L3233F: ChipStyle = ChipStyle {
    name: "MX25L3233F",
    jedec: [0xc2, 0x20, 0x16],
    capacity: 4 * 1024 * 1024,
    page_size: 256,
    sector_size: 4 * 1024,
    block_size: 64 * 1024,
};

/// GigaDevice 16Mbit.
pub static GD25Q16: ChipStyle = ChipStyle {
    name: "GD25Q16",
    jedec: [0xc8, 0x40, 0x15],
    capacity: 2 * 1024 * 1024,
    page_size: 256,
    sector_size: 4 * 1024,
    block_size: 64 * 1024,
};

pub static ALL_CHIPS: [&ChipStyle; 3] = [&W25Q16JV, &MX25L3233F, &GD25Q16];

/// Every style, each as a freshly erased chip.
pub fn all_chips() -> impl Iterator<Item = NorChip> {
    ALL_CHIPS.iter().map(|style| style.build())
}
