//! gamebank-store
//!
//! The object-store abstraction underneath the chain state: typed tables
//! with a stable numeric primary id, a unique secondary key, an ordered scan
//! key, and nested undo sessions.
//!
//! Sessions follow the block lifecycle. `begin(revision)` opens a layer that
//! records the pre-image of every object on first touch; `undo` restores
//! those pre-images; `squash` folds the newest layer into its parent;
//! `commit(revision)` discards undo layers at or below a revision once the
//! corresponding blocks are irreversible. The owner (the chain state) opens
//! and closes sessions across every table in lockstep.

pub mod table;

pub use table::{Table, TableObject};
