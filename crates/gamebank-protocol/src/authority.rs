use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{AccountName, PublicKey};

/// A threshold-weighted set of keys and accounts. The authority is satisfied
/// when the summed weights of provided keys (and recursively satisfied
/// account members) reach `weight_threshold`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: BTreeMap<AccountName, u16>,
    pub key_auths: BTreeMap<PublicKey, u16>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    pub fn single_key(key: PublicKey) -> Self {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key, 1);
        Authority {
            weight_threshold: 1,
            account_auths: BTreeMap::new(),
            key_auths,
        }
    }

    /// An authority no signature set can ever satisfy.
    pub fn impossible() -> Self {
        Authority {
            weight_threshold: 1,
            account_auths: BTreeMap::new(),
            key_auths: BTreeMap::new(),
        }
    }

    pub fn num_auths(&self) -> usize {
        self.account_auths.len() + self.key_auths.len()
    }

    /// True when no combination of members can reach the threshold.
    pub fn is_impossible(&self) -> bool {
        let total: u64 = self
            .account_auths
            .values()
            .chain(self.key_auths.values())
            .map(|w| *w as u64)
            .sum();
        total < self.weight_threshold as u64
    }

    /// Structural validity: bounded membership, valid member names, nonzero
    /// threshold and weights.
    pub fn is_valid(&self) -> bool {
        if self.weight_threshold == 0 {
            return false;
        }
        if self.num_auths() > crate::config::MAX_AUTHORITY_MEMBERSHIP {
            return false;
        }
        if self.account_auths.keys().any(|name| !name.is_valid()) {
            return false;
        }
        if self
            .account_auths
            .values()
            .chain(self.key_auths.values())
            .any(|w| *w == 0)
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_key_is_satisfiable() {
        let auth = Authority::single_key(PublicKey([1u8; 33]));
        assert!(auth.is_valid());
        assert!(!auth.is_impossible());
    }

    #[test]
    fn empty_authority_is_impossible() {
        assert!(Authority::impossible().is_impossible());
    }

    #[test]
    fn zero_threshold_is_invalid() {
        let mut auth = Authority::single_key(PublicKey([1u8; 33]));
        auth.weight_threshold = 0;
        assert!(!auth.is_valid());
    }
}
