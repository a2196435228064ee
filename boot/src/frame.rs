//! Command frames.
//!
//! A [`CommandFrame`] describes one controller command: instruction, optional
//! 24-bit address, optional data phase and the dummy cycles between them.
//! Frames come from one of two places:
//!
//! - A structured read descriptor ([`ReadCmdFormat`]), used for fast reads and
//!   for the memory-mapped read command.  Widths are taken from the
//!   descriptor.
//! - A raw byte buffer in the driver's single-line convention: byte 0 is the
//!   instruction, bytes 1..4 a big-endian address if present, the rest is
//!   payload (for writes) or dummy bytes (for reads).  Everything is on one
//!   line.
//!
//! Alternate bytes, data strobe and DTR are never used, and the instruction is
//! sent with every command.

use byteorder::{BigEndian, ByteOrder};

use crate::width::PhaseMode;
use crate::{Error, ReadCmdFormat, Result};

/// Addresses are always 24 bits wide.
pub const ADDRESS_BITS: u8 = 24;
pub const ADDRESS_MASK: u32 = 0x00ff_ffff;

/// Largest dummy cycle count the controller can encode.
pub const MAX_DUMMY_CYCLES: u8 = 31;

/// Instruction plus 3 address bytes.
const LEGACY_HEADER_LEN: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandFrame {
    pub instruction: u8,
    pub instruction_mode: PhaseMode,
    /// Only meaningful when `address_mode` is not `None`, zero otherwise.
    pub address: u32,
    pub address_mode: PhaseMode,
    pub data_mode: PhaseMode,
    /// Bytes in the data phase.
    pub data_len: usize,
    /// Zero when there is no data phase.
    pub dummy_cycles: u8,
}

impl CommandFrame {
    fn new(
        instruction: (u8, PhaseMode),
        address: (u32, PhaseMode),
        data: (usize, PhaseMode),
        dummy_cycles: u8,
    ) -> Result<CommandFrame> {
        if dummy_cycles > MAX_DUMMY_CYCLES {
            return Err(Error::Configuration);
        }
        let (address, address_mode) = address;
        let (data_len, data_mode) = data;
        Ok(CommandFrame {
            instruction: instruction.0,
            instruction_mode: instruction.1,
            address: if address_mode.is_none() { 0 } else { address & ADDRESS_MASK },
            address_mode,
            data_mode,
            data_len,
            dummy_cycles: if data_mode.is_none() { 0 } else { dummy_cycles },
        })
    }

    /// Build a read of `data_len` bytes at `address` from a structured
    /// descriptor.
    pub fn fast_read(format: &ReadCmdFormat, address: u32, data_len: usize) -> Result<CommandFrame> {
        CommandFrame::new(
            (format.instruction, PhaseMode::from_lines(format.instruction_lines)?),
            (address, PhaseMode::from_lines(format.address_lines)?),
            (data_len, PhaseMode::from_lines(format.data_lines)?),
            format.dummy_cycles,
        )
    }

    pub fn has_address(&self) -> bool {
        !self.address_mode.is_none()
    }

    pub fn has_data(&self) -> bool {
        !self.data_mode.is_none()
    }
}

/// A command decoded from a raw single-line buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LegacyCommand<'a> {
    pub frame: CommandFrame,
    /// Bytes to transmit after the frame.  Always empty for reads.
    pub transmit: &'a [u8],
}

impl<'a> LegacyCommand<'a> {
    /// Decode `write`, followed by a receive phase of `read_len` bytes if that
    /// is not zero.
    ///
    /// A buffer of 2 or 3 bytes would carry a truncated address and is
    /// rejected.  For reads, bytes past the address are dummy bytes and turn
    /// into 8 dummy cycles each.
    pub fn decode(write: &'a [u8], read_len: usize) -> Result<LegacyCommand<'a>> {
        let (&instruction, _) = write.split_first().ok_or(Error::Write)?;

        let (address, header_len) = match write.len() {
            1 => ((0, PhaseMode::None), 1),
            2 | 3 => return Err(Error::Read),
            _ => (
                (BigEndian::read_u24(&write[1..LEGACY_HEADER_LEN]), PhaseMode::OneLine),
                LEGACY_HEADER_LEN,
            ),
        };
        let trailing = &write[header_len..];
        let instruction = (instruction, PhaseMode::OneLine);

        if read_len > 0 {
            let dummy_cycles = u8::try_from(trailing.len() * 8).map_err(|_| Error::Configuration)?;
            let frame = CommandFrame::new(
                instruction,
                address,
                (read_len, PhaseMode::OneLine),
                dummy_cycles,
            )?;
            Ok(LegacyCommand { frame, transmit: &[] })
        } else {
            let data_mode = if trailing.is_empty() {
                PhaseMode::None
            } else {
                PhaseMode::OneLine
            };
            let frame = CommandFrame::new(instruction, address, (trailing.len(), data_mode), 0)?;
            Ok(LegacyCommand { frame, transmit: trailing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_IO: ReadCmdFormat = ReadCmdFormat {
        instruction: 0xeb,
        instruction_lines: 1,
        address_lines: 4,
        data_lines: 4,
        dummy_cycles: 6,
    };

    #[test]
    fn fast_read_frame() {
        let frame = CommandFrame::fast_read(&QUAD_IO, 0x0012_3456, 64).unwrap();
        assert_eq!(frame.instruction, 0xeb);
        assert_eq!(frame.instruction_mode, PhaseMode::OneLine);
        assert_eq!(frame.address, 0x0012_3456);
        assert_eq!(frame.address_mode, PhaseMode::FourLines);
        assert_eq!(frame.data_mode, PhaseMode::FourLines);
        assert_eq!(frame.data_len, 64);
        assert_eq!(frame.dummy_cycles, 6);

        // Deterministic.
        assert_eq!(frame, CommandFrame::fast_read(&QUAD_IO, 0x0012_3456, 64).unwrap());
    }

    #[test]
    fn fast_read_masks_address() {
        let frame = CommandFrame::fast_read(&QUAD_IO, 0xff12_3456, 1).unwrap();
        assert_eq!(frame.address, 0x0012_3456);
    }

    #[test]
    fn fast_read_without_address() {
        let format = ReadCmdFormat { address_lines: 0, ..QUAD_IO };
        let frame = CommandFrame::fast_read(&format, 0x1234, 4).unwrap();
        assert!(!frame.has_address());
        assert_eq!(frame.address, 0);
    }

    #[test]
    fn fast_read_rejects_bad_widths() {
        for bad in [3u8, 5, 6, 7, 16] {
            let formats = [
                ReadCmdFormat { instruction_lines: bad, ..QUAD_IO },
                ReadCmdFormat { address_lines: bad, ..QUAD_IO },
                ReadCmdFormat { data_lines: bad, ..QUAD_IO },
            ];
            for format in &formats {
                assert_eq!(CommandFrame::fast_read(format, 0, 8), Err(Error::Configuration));
            }
        }
    }

    #[test]
    fn fast_read_rejects_dummy_overflow() {
        let format = ReadCmdFormat { dummy_cycles: 32, ..QUAD_IO };
        assert_eq!(CommandFrame::fast_read(&format, 0, 8), Err(Error::Configuration));
    }

    #[test]
    fn legacy_instruction_only() {
        let cmd = LegacyCommand::decode(&[0x06], 0).unwrap();
        assert_eq!(cmd.frame.instruction, 0x06);
        assert_eq!(cmd.frame.instruction_mode, PhaseMode::OneLine);
        assert!(!cmd.frame.has_address());
        assert!(!cmd.frame.has_data());
        assert_eq!(cmd.frame.data_len, 0);
        assert!(cmd.transmit.is_empty());
    }

    #[test]
    fn legacy_read_without_address() {
        let cmd = LegacyCommand::decode(&[0x9f], 3).unwrap();
        assert!(!cmd.frame.has_address());
        assert_eq!(cmd.frame.data_mode, PhaseMode::OneLine);
        assert_eq!(cmd.frame.data_len, 3);
        assert_eq!(cmd.frame.dummy_cycles, 0);
    }

    #[test]
    fn legacy_address_is_big_endian() {
        let cmd = LegacyCommand::decode(&[0x03, 0x12, 0x34, 0x56], 16).unwrap();
        assert_eq!(cmd.frame.address, 0x0012_3456);
        assert_eq!(cmd.frame.address_mode, PhaseMode::OneLine);
        assert_eq!(cmd.frame.data_len, 16);
        assert_eq!(cmd.frame.dummy_cycles, 0);
    }

    #[test]
    fn legacy_truncated_address() {
        assert_eq!(LegacyCommand::decode(&[0x03, 0x12], 4), Err(Error::Read));
        assert_eq!(LegacyCommand::decode(&[0x03, 0x12, 0x34], 0), Err(Error::Read));
    }

    #[test]
    fn legacy_empty() {
        assert_eq!(LegacyCommand::decode(&[], 4), Err(Error::Write));
    }

    #[test]
    fn legacy_dummy_bytes() {
        // Fast read (0x0b) carries one dummy byte after the address.
        let cmd = LegacyCommand::decode(&[0x0b, 0x00, 0x10, 0x00, 0xff], 8).unwrap();
        assert_eq!(cmd.frame.dummy_cycles, 8);
        assert_eq!(cmd.frame.address, 0x1000);
        assert!(cmd.transmit.is_empty());

        // SFDP read with three dummy bytes.
        let cmd = LegacyCommand::decode(&[0x5a, 0, 0, 0, 0xff, 0xff, 0xff], 8).unwrap();
        assert_eq!(cmd.frame.dummy_cycles, 24);

        // Four dummy bytes don't fit.
        let cmd = LegacyCommand::decode(&[0x5a, 0, 0, 0, 0xff, 0xff, 0xff, 0xff], 8);
        assert_eq!(cmd, Err(Error::Configuration));
    }

    #[test]
    fn legacy_write_payload() {
        let buf = [0x02, 0x00, 0x01, 0x00, 0xde, 0xad, 0xbe, 0xef];
        let cmd = LegacyCommand::decode(&buf, 0).unwrap();
        assert_eq!(cmd.frame.address, 0x100);
        assert_eq!(cmd.frame.data_mode, PhaseMode::OneLine);
        assert_eq!(cmd.frame.data_len, 4);
        assert_eq!(cmd.frame.dummy_cycles, 0);
        assert_eq!(cmd.transmit, &[0xde, 0xad, 0xbe, 0xef]);

        // Sector erase: address, no data.
        let cmd = LegacyCommand::decode(&[0x20, 0x00, 0x10, 0x00], 0).unwrap();
        assert!(cmd.frame.has_address());
        assert!(!cmd.frame.has_data());
        assert!(cmd.transmit.is_empty());
    }
}
