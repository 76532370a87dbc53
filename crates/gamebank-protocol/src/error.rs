use thiserror::Error;

/// The closed error taxonomy of the chain core.
///
/// Evaluators and the controller return these; the innermost undo session is
/// discarded at the boundary that observes the error and the error is
/// re-raised to the caller. `Invariant` and unrecoverable `Storage` failures
/// are fatal to the writer thread.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A field is syntactically invalid or a static precondition failed.
    #[error("validation: {0}")]
    Validation(String),

    /// Required signatures are insufficient, duplicated, or irrelevant.
    #[error("authority: {0}")]
    Authority(String),

    /// The transaction's reference block does not match the chain.
    #[error("tapos: {0}")]
    Tapos(String),

    /// The transaction expiration is in the past or too far in the future.
    #[error("expiration: {0}")]
    Expiration(String),

    /// The transaction id was already seen inside the dedupe window.
    #[error("duplicate transaction: {0}")]
    Duplicate(String),

    /// An evaluator found the pre-state inconsistent with the operation.
    #[error("state precondition: {0}")]
    StatePrecondition(String),

    /// A pushed block has no known parent in the fork tree.
    #[error("unlinkable block: {0}")]
    UnlinkableBlock(String),

    /// A block failed a header/merkle check during fork handling.
    #[error("fork: {0}")]
    Fork(String),

    /// A cross-block invariant was violated. Fatal.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Block-log I/O or index mismatch.
    #[error("storage: {0}")]
    Storage(String),

    /// Byte-level encode/decode failure.
    #[error("serialization: {0}")]
    Serialization(String),

    /// The script sandbox reported a failure.
    #[error("contract: {0}")]
    Contract(String),
}

impl ChainError {
    /// True for conditions the node must halt on rather than continue past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChainError::Invariant(_))
    }
}
