use std::collections::{BTreeSet, HashSet};

use gamebank_protocol::authority::Authority;
use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::transaction::SignedTransaction;
use gamebank_protocol::types::{AccountName, PublicKey};

use super::Database;

/// The three key roles an operation can demand.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Owner,
    Active,
    Posting,
}

impl Database {
    /// Verify that the transaction's signatures satisfy every authority its
    /// operations require. Posting-authorized operations may not share a
    /// transaction with active/owner-authorized ones.
    pub(crate) fn verify_transaction_authority(
        &self,
        trx: &SignedTransaction,
    ) -> Result<(), ChainError> {
        let mut required_owner = BTreeSet::new();
        let mut required_active = BTreeSet::new();
        let mut required_posting = BTreeSet::new();
        let mut required_other: Vec<Authority> = Vec::new();

        for op in &trx.trx.operations {
            op.get_required_authorities(
                &mut required_owner,
                &mut required_active,
                &mut required_posting,
                &mut required_other,
            );
        }

        if !required_posting.is_empty() {
            ensure!(
                required_owner.is_empty() && required_active.is_empty() && required_other.is_empty(),
                ChainError::Authority,
                "posting-authorized operations cannot be mixed with active or owner operations"
            );
        }

        let chain_id = self.chain_id();
        let available: HashSet<PublicKey> = trx
            .signature_keys(&chain_id, |sig, digest| {
                gamebank_crypto::recover_public_key(sig, digest)
            })?
            .into_iter()
            .collect();

        for name in &required_posting {
            ensure!(
                self.satisfies_role(name, Role::Posting, &available, 0)?,
                ChainError::Authority,
                "missing posting authority for {name}"
            );
        }
        for name in &required_active {
            ensure!(
                self.satisfies_role(name, Role::Active, &available, 0)?,
                ChainError::Authority,
                "missing active authority for {name}"
            );
        }
        for name in &required_owner {
            ensure!(
                self.satisfies_role(name, Role::Owner, &available, 0)?,
                ChainError::Authority,
                "missing owner authority for {name}"
            );
        }
        for auth in &required_other {
            ensure!(
                self.satisfies_authority(auth, Role::Active, &available, 0)?,
                ChainError::Authority,
                "missing authority for operation"
            );
        }
        Ok(())
    }

    /// An account's role is satisfied by the role's own authority or any
    /// stronger one.
    fn satisfies_role(
        &self,
        name: &AccountName,
        role: Role,
        available: &HashSet<PublicKey>,
        depth: u32,
    ) -> Result<bool, ChainError> {
        let account = self.state.get_account(name)?;
        let ladder: &[&Authority] = match role {
            Role::Posting => &[&account.posting, &account.active, &account.owner],
            Role::Active => &[&account.active, &account.owner],
            Role::Owner => &[&account.owner],
        };
        for auth in ladder {
            if self.satisfies_authority(auth, role, available, depth)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Threshold-weight check with bounded recursion into account members.
    fn satisfies_authority(
        &self,
        auth: &Authority,
        role: Role,
        available: &HashSet<PublicKey>,
        depth: u32,
    ) -> Result<bool, ChainError> {
        let mut total: u64 = 0;
        for (key, weight) in &auth.key_auths {
            if available.contains(key) {
                total += *weight as u64;
                if total >= auth.weight_threshold as u64 {
                    return Ok(true);
                }
            }
        }
        if depth >= config::MAX_SIG_CHECK_DEPTH {
            return Ok(total >= auth.weight_threshold as u64);
        }
        for (member, weight) in &auth.account_auths {
            // a missing member account contributes nothing
            if self.state.accounts.find_by_key(member).is_none() {
                continue;
            }
            if self.satisfies_role(member, role, available, depth + 1)? {
                total += *weight as u64;
                if total >= auth.weight_threshold as u64 {
                    return Ok(true);
                }
            }
        }
        Ok(total >= auth.weight_threshold as u64)
    }
}
