//! gamebank-contract
//!
//! The boundary between the chain core and the embedded script interpreter.
//!
//! The interpreter itself is an external component; the chain only depends
//! on [`ScriptEngine`], and exposes chain state to scripts through the
//! narrow [`HostApi`] call table. Host calls are deterministic, bounded by a
//! [`StepBudget`], and route every write through the same undo session as
//! the operation that invoked the script, so a failing script rolls back
//! like any other evaluator failure.

use serde_json::Value;

use gamebank_protocol::asset::Asset;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::types::AccountName;

/// Execution allowance for one script invocation. The host force-stops a
/// script that runs dry; the failure surfaces as a contract error on the
/// enclosing operation.
#[derive(Debug, Clone)]
pub struct StepBudget {
    remaining: u64,
}

impl StepBudget {
    pub const DEFAULT_STEPS: u64 = 1_000_000;

    pub fn new(steps: u64) -> Self {
        StepBudget { remaining: steps }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn consume(&mut self, steps: u64) -> Result<(), ChainError> {
        if steps > self.remaining {
            self.remaining = 0;
            return Err(ChainError::Contract("step budget exhausted".into()));
        }
        self.remaining -= steps;
        Ok(())
    }
}

impl Default for StepBudget {
    fn default() -> Self {
        StepBudget::new(Self::DEFAULT_STEPS)
    }
}

/// A contract-log event recorded by a host call during execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractEvent {
    Transfer {
        from: AccountName,
        to: AccountName,
        amount: Asset,
    },
    Emit {
        key: String,
        data: Value,
    },
}

/// The host-call table exposed to scripts.
///
/// Implemented by the chain over its live state; every mutation participates
/// in the enclosing operation's undo session.
pub trait HostApi {
    // ── Chain introspection ──────────────────────────────────────────────────

    fn head_block_num(&self) -> u32;

    /// Iterated ripemd160 over `count` block digests spaced `interval`
    /// apart, stepping back from `block_num`. Argument bounds:
    /// `count ∈ [1,100]`, `block_num ≥ count`, `1 ≤ interval ≤ count`.
    fn get_block_hash(&mut self, block_num: u32, count: u32, interval: u32)
        -> Result<String, ChainError>;

    // ── Identity ─────────────────────────────────────────────────────────────

    fn contract_name(&self) -> &AccountName;
    fn caller(&self) -> &AccountName;
    fn creator(&self) -> &AccountName;

    // ── Per-user JSON state ──────────────────────────────────────────────────

    /// The contract's own state table (the contract name as user).
    fn get_data(&mut self) -> Result<Value, ChainError>;

    /// A named user's state table, loaded lazily; absent users yield an
    /// empty object.
    fn get_user_data(&mut self, user: &AccountName) -> Result<Value, ChainError>;

    /// Replace a user's state table. The entry is marked modified and is
    /// persisted only when the script returns successfully.
    fn set_user_data(&mut self, user: &AccountName, data: Value) -> Result<(), ChainError>;

    // ── Funds & events ───────────────────────────────────────────────────────

    /// Move liquid tokens. `from` must be either the caller (with the
    /// contract as recipient) or the contract itself.
    fn transfer(&mut self, from: &AccountName, to: &AccountName, amount: Asset)
        -> Result<(), ChainError>;

    /// Record a contract-log event under `key`.
    fn emit(&mut self, key: &str, data: Value) -> Result<(), ChainError>;
}

/// Parse a JSON string into a sandbox value, mirroring the script-side
/// `jsonstr_to_table` helper.
pub fn jsonstr_to_table(s: &str) -> Result<Value, ChainError> {
    serde_json::from_str(s).map_err(|e| ChainError::Contract(format!("bad JSON: {e}")))
}

/// The interpreter interface.
///
/// `deploy` runs a script's top level once at deployment; `call` invokes a
/// named method with JSON arguments. Implementations must be deterministic,
/// must not perform I/O, and must charge the budget as they execute.
pub trait ScriptEngine: Send + Sync {
    fn deploy(
        &self,
        code: &str,
        host: &mut dyn HostApi,
        budget: &mut StepBudget,
    ) -> Result<(), ChainError>;

    fn call(
        &self,
        code: &str,
        method: &str,
        args: &[Value],
        host: &mut dyn HostApi,
        budget: &mut StepBudget,
    ) -> Result<(), ChainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exhaustion_is_a_contract_error() {
        let mut budget = StepBudget::new(10);
        assert!(budget.consume(6).is_ok());
        assert!(budget.consume(4).is_ok());
        let err = budget.consume(1).unwrap_err();
        assert!(matches!(err, ChainError::Contract(_)));
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn json_helper_rejects_garbage() {
        assert!(jsonstr_to_table("{\"a\": 1}").is_ok());
        assert!(jsonstr_to_table("not json").is_err());
    }
}
