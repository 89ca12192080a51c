use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{NebulaError, NebulaResult};

/// A release version of the game, `major.minor[.revision]`.
///
/// Only release versions are understood; snapshots and pre-releases are
/// rejected because no loader generation targets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MinecraftVersion {
    major: u32,
    minor: u32,
    revision: Option<u32>,
}

impl MinecraftVersion {
    pub fn new(major: u32, minor: u32, revision: Option<u32>) -> Self {
        Self {
            major,
            minor,
            revision,
        }
    }

    pub fn parse(raw: &str) -> NebulaResult<Self> {
        let invalid = || NebulaError::InvalidVersion(raw.to_string());

        let parts = raw
            .trim()
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<NebulaResult<Vec<u32>>>()?;

        match parts.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor, None)),
            [major, minor, revision] => Ok(Self::new(*major, *minor, Some(*revision))),
            _ => Err(invalid()),
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// `1.x` release whose minor component lies in `range`.
    pub fn minor_in(&self, range: std::ops::RangeInclusive<u32>) -> bool {
        self.major == 1 && range.contains(&self.minor)
    }
}

impl fmt::Display for MinecraftVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Some(r) => write!(f, "{}.{}.{}", self.major, self.minor, r),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

impl FromStr for MinecraftVersion {
    type Err = NebulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MinecraftVersion {
    type Error = NebulaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MinecraftVersion> for String {
    fn from(value: MinecraftVersion) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_and_three_component_versions() {
        let v = MinecraftVersion::parse("1.12.2").unwrap();
        assert_eq!((v.major(), v.minor(), v.revision()), (1, 12, Some(2)));
        assert_eq!(v.to_string(), "1.12.2");

        let v: MinecraftVersion = "1.16".parse().unwrap();
        assert_eq!(v.revision(), None);
        assert_eq!(v.to_string(), "1.16");
    }

    #[test]
    fn rejects_snapshots_and_garbage() {
        for raw in ["21w13a", "1.17-pre1", "1", "1.2.3.4", ""] {
            assert!(MinecraftVersion::parse(raw).is_err(), "{raw} should fail");
        }
    }

    #[test]
    fn minor_ranges_only_apply_to_major_one() {
        let v = MinecraftVersion::parse("1.7.10").unwrap();
        assert!(v.minor_in(7..=12));
        assert!(!v.minor_in(13..=20));
        assert!(!MinecraftVersion::new(2, 8, None).minor_in(7..=12));
    }

    #[test]
    fn orders_numerically() {
        let a = MinecraftVersion::parse("1.9.4").unwrap();
        let b = MinecraftVersion::parse("1.10").unwrap();
        assert!(a < b);
    }
}
