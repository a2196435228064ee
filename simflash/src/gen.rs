//! Image generation.
//!
//! Test images are a vector table header (initial stack pointer, entry
//! address, both little endian) followed by pseudo-random bytes standing in
//! for the code.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use anyhow::{anyhow, Result};
use boot::handoff::IMAGE_HEADER_LEN;

pub struct GeneratedImage {
    pub data: Vec<u8>,
}

pub struct GenBuilder {
    /// Total size of the image, header included.
    size: usize,
    /// Seed for the PRNG
    seed: usize,
    stack_top: u32,
    entry: u32,
}

impl Default for GenBuilder {
    fn default() -> Self {
        GenBuilder {
            size: 76_137,
            seed: 1,
            stack_top: 0x2400_0400,
            entry: 0x7000_0201,
        }
    }
}

impl GenBuilder {
    pub fn size(&mut self, size: usize) -> &mut Self {
        self.size = size;
        self
    }

    pub fn seed(&mut self, seed: usize) -> &mut Self {
        self.seed = seed;
        self
    }

    pub fn stack_top(&mut self, stack_top: u32) -> &mut Self {
        self.stack_top = stack_top;
        self
    }

    pub fn entry(&mut self, entry: u32) -> &mut Self {
        self.entry = entry;
        self
    }

    pub fn build(&self) -> Result<GeneratedImage> {
        if self.size < IMAGE_HEADER_LEN {
            return Err(anyhow!("image of {} bytes has no room for a header", self.size));
        }

        let mut data = vec![0u8; self.size];
        let mut rng = Xoshiro256Plus::seed_from_u64(self.seed as u64);
        rng.fill_bytes(&mut data[IMAGE_HEADER_LEN..]);

        data[0..4].copy_from_slice(&self.stack_top.to_le_bytes());
        data[4..8].copy_from_slice(&self.entry.to_le_bytes());

        Ok(GeneratedImage { data })
    }
}

#[cfg(test)]
mod tester {
    use boot::BootTarget;

    use crate::styles;

    use super::GenBuilder;

    #[test]
    fn test_gen() {
        let img = GenBuilder::default().seed(7).build().unwrap();
        let mut chip = styles::W25Q16JV.build();
        chip.install(&img.data, 0).unwrap();

        let header = chip.memory()[..8].try_into().unwrap();
        let target = BootTarget::from_header(0x9000_0000, header);
        assert_eq!(target.stack_top, 0x2400_0400);
        assert_eq!(target.entry, 0x7000_0201);

        let again = GenBuilder::default().seed(7).build().unwrap();
        assert_eq!(img.data, again.data);
        assert!(GenBuilder::default().size(4).build().is_err());
    }
}
