//! Sources of systematic variations and their compact encoding.
//!
//! All sources are statistically independent. Sources prefixed with `BTag` are related to
//! b-tagging uncertainties; the JEC uncertainty affects b-tagging as well.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported sources of systematic variations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystType {
    /// No variation.
    Nominal,
    /// Jet energy corrections.
    #[serde(rename = "JEC")]
    Jec,
    /// Purity of the heavy-flavour calibration sample.
    BTagPurityHF,
    /// Purity of the light-flavour calibration sample.
    BTagPurityLF,
    /// First statistical component, heavy flavour.
    BTagStatHF1,
    /// Second statistical component, heavy flavour.
    BTagStatHF2,
    /// First statistical component, light flavour.
    BTagStatLF1,
    /// Second statistical component, light flavour.
    BTagStatLF2,
    /// First charm uncertainty.
    BTagCharmUnc1,
    /// Second charm uncertainty.
    BTagCharmUnc2,
}

impl SystType {
    /// All sources, in encoding order.
    pub const ALL: [SystType; 10] = [
        SystType::Nominal,
        SystType::Jec,
        SystType::BTagPurityHF,
        SystType::BTagPurityLF,
        SystType::BTagStatHF1,
        SystType::BTagStatHF2,
        SystType::BTagStatLF1,
        SystType::BTagStatLF2,
        SystType::BTagCharmUnc1,
        SystType::BTagCharmUnc2,
    ];

    /// Sources that only affect the b-tagging scale factors.
    pub const BTAG: [SystType; 8] = [
        SystType::BTagPurityHF,
        SystType::BTagPurityLF,
        SystType::BTagStatHF1,
        SystType::BTagStatHF2,
        SystType::BTagStatLF1,
        SystType::BTagStatLF2,
        SystType::BTagCharmUnc1,
        SystType::BTagCharmUnc2,
    ];

    /// Stable name used in configuration files and messages.
    pub fn as_str(self) -> &'static str {
        match self {
            SystType::Nominal => "Nominal",
            SystType::Jec => "JEC",
            SystType::BTagPurityHF => "BTagPurityHF",
            SystType::BTagPurityLF => "BTagPurityLF",
            SystType::BTagStatHF1 => "BTagStatHF1",
            SystType::BTagStatHF2 => "BTagStatHF2",
            SystType::BTagStatLF1 => "BTagStatLF1",
            SystType::BTagStatLF2 => "BTagStatLF2",
            SystType::BTagCharmUnc1 => "BTagCharmUnc1",
            SystType::BTagCharmUnc2 => "BTagCharmUnc2",
        }
    }

    fn index(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for SystType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SystType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Validation(format!("unknown systematic source '{s}'")))
    }
}

/// Direction of a systematic variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystDirection {
    /// +1 sigma.
    Up,
    /// -1 sigma.
    Down,
}

impl SystDirection {
    /// Both directions.
    pub const BOTH: [SystDirection; 2] = [SystDirection::Up, SystDirection::Down];
}

impl fmt::Display for SystDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystDirection::Up => f.write_str("Up"),
            SystDirection::Down => f.write_str("Down"),
        }
    }
}

/// A (source, direction) pair packed into one comparable integer: `2 * source + direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32")]
pub struct SystCode(u32);

impl SystCode {
    /// Code of the nominal configuration.
    pub const NOMINAL: SystCode = SystCode(0);

    /// Encode a variation as given, without normalisation.
    pub fn encode(kind: SystType, direction: SystDirection) -> Self {
        SystCode(2 * kind.index() + direction as u32)
    }

    /// Encode a variation, mapping `(Nominal, Down)` onto `(Nominal, Up)`.
    ///
    /// The nominal configuration has no direction, so a single code serves both.
    pub fn normalized(kind: SystType, direction: SystDirection) -> Self {
        match kind {
            SystType::Nominal => Self::NOMINAL,
            _ => Self::encode(kind, direction),
        }
    }

    /// Decode back into the source and direction.
    pub fn decode(self) -> (SystType, SystDirection) {
        let kind = SystType::ALL[(self.0 / 2) as usize];
        let direction = if self.0 % 2 == 0 { SystDirection::Up } else { SystDirection::Down };
        (kind, direction)
    }

    /// Raw integer value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for SystCode {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        if (value / 2) as usize >= SystType::ALL.len() {
            return Err(Error::Validation(format!("systematic code {value} out of range")));
        }
        Ok(SystCode(value))
    }
}

impl fmt::Display for SystCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, direction) = self.decode();
        match kind {
            SystType::Nominal => write!(f, "{kind}"),
            _ => write!(f, "{kind}{direction}"),
        }
    }
}
