//! gamebank-chain
//!
//! The consensus state machine: state objects and tables, per-operation
//! evaluators, block and transaction application with fork switching,
//! the witness scheduler, the periodic economic tasks, and the contract
//! host surface.

pub mod database;
pub mod evaluator;
pub mod genesis;
pub mod host;
pub mod objects;
pub mod rewards;
pub mod state;

pub use database::{skip, Database};
pub use state::State;
