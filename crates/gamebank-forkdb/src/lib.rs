//! gamebank-forkdb
//!
//! The two halves of block storage:
//!
//! - [`BlockLog`] — the persistent half: an append-only file of serialized
//!   irreversible blocks, each followed by its own start offset, with a
//!   sidecar index addressed by block number.
//! - [`ForkTree`] — the volatile half: a DAG of reversible candidate blocks
//!   from which the canonical chain is the path to the highest-numbered item.

pub mod block_log;
pub mod fork_tree;

pub use block_log::BlockLog;
pub use fork_tree::ForkTree;
