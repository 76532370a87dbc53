use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Timestamp;

/// A protocol release version packed as major.minor.patch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version(pub u32);

impl Version {
    pub fn new(major: u8, minor: u8, patch: u16) -> Self {
        Version(((major as u32) << 24) | ((minor as u32) << 16) | patch as u32)
    }

    pub fn major(&self) -> u8 {
        (self.0 >> 24) as u8
    }
    pub fn minor(&self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }
    pub fn patch(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// A hardfork version only tracks major.minor; patch releases never fork.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HardforkVersion(pub Version);

impl HardforkVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        HardforkVersion(Version::new(major, minor, 0))
    }
}

impl fmt::Display for HardforkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0.major(), self.0.minor())
    }
}

/// The version this build speaks.
pub const BLOCKCHAIN_VERSION: Version = Version(1 << 16); // 0.1.0

pub fn blockchain_hardfork_version() -> HardforkVersion {
    HardforkVersion::new(BLOCKCHAIN_VERSION.major(), BLOCKCHAIN_VERSION.minor())
}

/// Block header extension slots. A producer attaches a version vote when its
/// running version differs from the last one it reported, or a hardfork vote
/// while a fork is pending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockHeaderExtension {
    Void,
    Version(Version),
    HardforkVersionVote(HardforkVersion, Timestamp),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_packing() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 2);
        assert_eq!(v.patch(), 3);
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn hardfork_versions_order_by_release() {
        assert!(HardforkVersion::new(0, 1) < HardforkVersion::new(0, 2));
        assert!(HardforkVersion::new(0, 9) < HardforkVersion::new(1, 0));
    }
}
