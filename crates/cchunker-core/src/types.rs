use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CchunkError, Result};

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * KIB;

/// Width of the rolling-hash window in bytes.
pub const WINDOW_SIZE: usize = 64;

/// A chunk produced by a [`ChunkSource`](crate::chunk::ChunkSource).
///
/// The bytes borrow the caller's scratch buffer and are only valid until the
/// next call into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub data: &'a [u8],
    /// Absolute offset of the first byte in the input stream.
    pub offset: u64,
    /// Fingerprint at the cut point (0 for engines without one).
    pub cut: u64,
}

impl Chunk<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Chunk size bounds handed to a chunk engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeProfile {
    pub min_size: usize,
    pub max_size: usize,
    /// A cut is placed where the low `average_bits` bits of the fingerprint are zero.
    pub average_bits: u32,
}

impl SizeProfile {
    pub const SMALL: SizeProfile = SizeProfile {
        min_size: 512 * KIB,
        max_size: 8 * MIB,
        average_bits: 20,
    };

    pub const STANDARD: SizeProfile = SizeProfile {
        min_size: 512 * KIB,
        max_size: 16 * MIB,
        average_bits: 22,
    };

    pub const LARGE: SizeProfile = SizeProfile {
        min_size: MIB,
        max_size: 32 * MIB,
        average_bits: 23,
    };

    pub fn validate(&self) -> Result<()> {
        if self.min_size < WINDOW_SIZE {
            return Err(CchunkError::InvalidProfile(format!(
                "min size {} is smaller than the {WINDOW_SIZE} byte hash window",
                self.min_size
            )));
        }
        if self.min_size >= self.max_size {
            return Err(CchunkError::InvalidProfile(format!(
                "min size {} must be below max size {}",
                self.min_size, self.max_size
            )));
        }
        if !(1..=32).contains(&self.average_bits)
            || (1u64 << self.average_bits) > self.max_size as u64
        {
            return Err(CchunkError::InvalidProfile(format!(
                "average bits {} do not fit under max size {}",
                self.average_bits, self.max_size
            )));
        }
        Ok(())
    }

    /// Mask tested against the fingerprint.
    pub fn split_mask(&self) -> u64 {
        (1u64 << self.average_bits) - 1
    }
}

impl Default for SizeProfile {
    fn default() -> Self {
        SizeProfile::STANDARD
    }
}

/// Named size profile selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Small,
    #[default]
    Standard,
    Large,
}

impl ProfileKind {
    /// Resolve the `small`/`large` switches. Setting both is rejected.
    pub fn from_flags(small: bool, large: bool) -> Result<Option<Self>> {
        match (small, large) {
            (true, true) => Err(CchunkError::InvalidProfile(
                "small and large chunks are mutually exclusive".to_string(),
            )),
            (true, false) => Ok(Some(ProfileKind::Small)),
            (false, true) => Ok(Some(ProfileKind::Large)),
            (false, false) => Ok(None),
        }
    }

    pub fn size_profile(self) -> SizeProfile {
        match self {
            ProfileKind::Small => SizeProfile::SMALL,
            ProfileKind::Standard => SizeProfile::STANDARD,
            ProfileKind::Large => SizeProfile::LARGE,
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Small => write!(f, "small"),
            ProfileKind::Standard => write!(f, "standard"),
            ProfileKind::Large => write!(f, "large"),
        }
    }
}

impl std::str::FromStr for ProfileKind {
    type Err = CchunkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(ProfileKind::Small),
            "standard" => Ok(ProfileKind::Standard),
            "large" => Ok(ProfileKind::Large),
            _ => Err(CchunkError::InvalidProfile(format!("unknown profile {s:?}"))),
        }
    }
}

/// How strictly captured processor output is checked in reduction mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineCheck {
    /// Output must be exactly one `\n`-terminated line.
    #[default]
    Strict,
    /// Output is appended to the summary as-is.
    Off,
}

/// Result of a single-level run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitStats {
    pub chunks: u64,
    pub bytes: u64,
}

/// Result of a reduction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceStats {
    /// Number of levels run, including the terminal one.
    pub levels: u64,
    /// Chunk count of the terminal level (0 or 1).
    pub final_chunks: u64,
    /// Size of the final summary written to the output.
    pub summary_bytes: u64,
}
