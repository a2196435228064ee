//! Line-width mapping.
//!
//! Every phase of a command (instruction, address, data) is clocked over 0, 1,
//! 2, 4 or 8 lines.  The driver describes widths as raw line counts; the
//! controller wants a phase mode.  Anything else is a configuration error.

use crate::{Error, Result};

/// Controller phase mode for one phase of a command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhaseMode {
    /// The phase is skipped.
    None,
    OneLine,
    TwoLines,
    FourLines,
    EightLines,
}

/// Line count for each mode, in register encoding order.
const MODES: [(u8, PhaseMode); 5] = [
    (0, PhaseMode::None),
    (1, PhaseMode::OneLine),
    (2, PhaseMode::TwoLines),
    (4, PhaseMode::FourLines),
    (8, PhaseMode::EightLines),
];

impl PhaseMode {
    /// Map a line count onto a phase mode.
    pub fn from_lines(lines: u8) -> Result<PhaseMode> {
        MODES
            .iter()
            .find(|(n, _)| *n == lines)
            .map(|(_, mode)| *mode)
            .ok_or(Error::Configuration)
    }

    /// Number of lines this phase uses.
    pub const fn lines(self) -> u8 {
        match self {
            Self::None => 0,
            Self::OneLine => 1,
            Self::TwoLines => 2,
            Self::FourLines => 4,
            Self::EightLines => 8,
        }
    }

    /// The 3-bit `xMODE` field value of an OCTOSPI-style controller.
    pub const fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::OneLine => 1,
            Self::TwoLines => 2,
            Self::FourLines => 3,
            Self::EightLines => 4,
        }
    }

    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl TryFrom<u8> for PhaseMode {
    type Error = Error;

    fn try_from(lines: u8) -> Result<Self> {
        PhaseMode::from_lines(lines)
    }
}
