//! Version tokens for JRE artifacts and wildcard version selection.
//!
//! Repository indexes key artifacts by versions such as `1.8.0_sr5fp10` or
//! `8.0.7.20`. A configuration asks for a [`VersionPattern`] such as `1.8.+`,
//! which resolves to the highest indexed version it matches.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("version is empty")]
    Empty,

    #[error("version `{input}` has an invalid component `{component}`")]
    InvalidComponent { input: String, component: String },

    #[error("version `{input}` has an empty qualifier")]
    EmptyQualifier { input: String },

    #[error("version pattern `{input}` may only use `+` as its last component")]
    WildcardNotLast { input: String },
}

/// A dotted numeric version with an optional qualifier (`1.8.0_sr5fp10`).
///
/// Ordering compares numeric components first, treating missing trailing
/// components as `0` (so `1.8 == 1.8.0`), then the qualifier: no qualifier
/// sorts before any qualifier, and qualifiers compare lexicographically.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    qualifier: Option<String>,
    raw: String,
}

impl Version {
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    fn component(&self, idx: usize) -> u64 {
        self.components.get(idx).copied().unwrap_or(0)
    }

    /// Components with trailing zeros removed; equal versions share this form.
    fn significant_components(&self) -> &[u64] {
        let len = self
            .components
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |idx| idx + 1);
        &self.components[..len]
    }
}

fn split_qualifier(input: &str) -> (&str, Option<&str>) {
    match input.find(['_', '-']) {
        Some(idx) => (&input[..idx], Some(&input[idx + 1..])),
        None => (input, None),
    }
}

fn parse_component(input: &str, component: &str) -> Result<u64, VersionError> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidComponent {
            input: input.to_owned(),
            component: component.to_owned(),
        });
    }
    component
        .parse()
        .map_err(|_| VersionError::InvalidComponent {
            input: input.to_owned(),
            component: component.to_owned(),
        })
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let (numeric, qualifier) = split_qualifier(input);
        if qualifier == Some("") {
            return Err(VersionError::EmptyQualifier {
                input: input.to_owned(),
            });
        }

        let components = numeric
            .split('.')
            .map(|component| parse_component(input, component))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            components,
            qualifier: qualifier.map(str::to_owned),
            raw: input.to_owned(),
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|idx| self.component(idx).cmp(&other.component(idx)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_components().hash(state);
        self.qualifier.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// A version requirement: either an exact [`Version`] or a prefix ending in `+`.
///
/// `+` alone matches every version; `1.8.+` matches `1.8`, `1.8.0_sr5` and
/// `1.8.1` but not `1.9.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPattern {
    Exact(Version),
    Prefix { components: Vec<u64>, raw: String },
}

impl VersionPattern {
    /// The pattern matching every version.
    pub fn any() -> Self {
        Self::Prefix {
            components: Vec::new(),
            raw: "+".to_owned(),
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(expected) => expected == version,
            Self::Prefix { components, .. } => components
                .iter()
                .enumerate()
                .all(|(idx, &expected)| version.component(idx) == expected),
        }
    }

    /// The highest candidate matching this pattern.
    pub fn resolve<'a>(&self, candidates: impl IntoIterator<Item = &'a Version>) -> Option<&'a Version> {
        candidates
            .into_iter()
            .filter(|candidate| self.matches(candidate))
            .max()
    }
}

impl Default for VersionPattern {
    fn default() -> Self {
        Self::any()
    }
}

impl FromStr for VersionPattern {
    type Err = VersionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }
        if !input.contains('+') {
            return input.parse().map(Self::Exact);
        }

        let prefix = if input == "+" {
            ""
        } else {
            input
                .strip_suffix(".+")
                .filter(|prefix| !prefix.contains('+'))
                .ok_or_else(|| VersionError::WildcardNotLast {
                    input: input.to_owned(),
                })?
        };

        let components = if prefix.is_empty() {
            Vec::new()
        } else {
            prefix
                .split('.')
                .map(|component| parse_component(input, component))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self::Prefix {
            components,
            raw: input.to_owned(),
        })
    }
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(version) => version.fmt(f),
            Self::Prefix { raw, .. } => f.write_str(raw),
        }
    }
}

impl Serialize for VersionPattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}
