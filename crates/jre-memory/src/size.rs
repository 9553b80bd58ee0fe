use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;
pub const TB: u64 = 1024 * GB;

/// An immutable quantity of memory in bytes.
///
/// Parses `<integer><unit>` where the unit is empty (bytes) or one of the
/// binary multipliers understood by the JVM (`K`, `M`, `G`, `T`, with optional
/// `B`/`iB` suffixes, case-insensitive). Formats back into the same grammar, see
/// the [`fmt::Display`] impl.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemorySize(u64);

impl MemorySize {
    pub const ZERO: MemorySize = MemorySize(0);

    #[must_use]
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Convenience constructor used heavily by thresholds and tests.
    #[must_use]
    pub const fn from_mib(mebibytes: u64) -> Self {
        Self(mebibytes.saturating_mul(MB))
    }

    #[must_use]
    pub const fn bytes(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemorySizeError {
    #[error("memory size is empty")]
    Empty,

    #[error("memory size `{input}` is negative")]
    Negative { input: String },

    #[error("memory size `{input}` must start with a whole number of units")]
    InvalidNumber { input: String },

    #[error("memory size `{input}` has unknown unit `{unit}` (expected K, M, G or T)")]
    UnknownUnit { input: String, unit: String },

    #[error("memory size `{input}` does not fit in 64 bits")]
    Overflow { input: String },
}

impl FromStr for MemorySize {
    type Err = MemorySizeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(MemorySizeError::Empty);
        }
        if input.starts_with('-') {
            return Err(MemorySizeError::Negative {
                input: input.to_owned(),
            });
        }

        let split = input
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(input.len());
        let (digits, unit) = input.split_at(split);
        if digits.is_empty() {
            return Err(MemorySizeError::InvalidNumber {
                input: input.to_owned(),
            });
        }

        let value = digits.parse::<u64>().map_err(|_| MemorySizeError::Overflow {
            input: input.to_owned(),
        })?;

        let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "b" => 1,
            "k" | "kb" | "kib" => KB,
            "m" | "mb" | "mib" => MB,
            "g" | "gb" | "gib" => GB,
            "t" | "tb" | "tib" => TB,
            _ if unit.starts_with('.') => {
                return Err(MemorySizeError::InvalidNumber {
                    input: input.to_owned(),
                })
            }
            _ => {
                return Err(MemorySizeError::UnknownUnit {
                    input: input.to_owned(),
                    unit: unit.to_owned(),
                })
            }
        };

        value
            .checked_mul(multiplier)
            .map(MemorySize)
            .ok_or_else(|| MemorySizeError::Overflow {
                input: input.to_owned(),
            })
    }
}

impl fmt::Display for MemorySize {
    /// Formats using the largest of `G`, `M` and `K` that divides the value.
    ///
    /// Values that are not a whole number of kibibytes are rounded down to one,
    /// so a formatted heap size never exceeds the quantity it was derived from.
    /// Anything under 1 KiB prints as a bare byte count.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        if bytes < KB {
            return write!(f, "{bytes}");
        }

        let bytes = bytes - bytes % KB;
        if bytes % GB == 0 {
            write!(f, "{}G", bytes / GB)
        } else if bytes % MB == 0 {
            write!(f, "{}M", bytes / MB)
        } else {
            write!(f, "{}K", bytes / KB)
        }
    }
}

impl Mul<f64> for MemorySize {
    type Output = MemorySize;

    /// Scales the quantity, rounding down to whole bytes.
    ///
    /// Ratios up to `1.0` never produce a quantity larger than `self`.
    ///
    /// # Panics
    ///
    /// Panics when `ratio` is negative, NaN or infinite.
    fn mul(self, ratio: f64) -> MemorySize {
        assert!(
            ratio.is_finite() && ratio >= 0.0,
            "memory ratio must be finite and non-negative, got {ratio}"
        );

        // `as` saturates at `u64::MAX` for out-of-range floats.
        let scaled = (self.0 as f64 * ratio).floor() as u64;
        if ratio <= 1.0 {
            MemorySize(scaled.min(self.0))
        } else {
            MemorySize(scaled)
        }
    }
}

impl Serialize for MemorySize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for MemorySize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bytes(u64),
            Human(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bytes(value) => Ok(MemorySize(value)),
            Repr::Human(value) => value.parse().map_err(serde::de::Error::custom),
        }
    }
}
