//! Error taxonomy for the authorization core
//!
//! Every failure is a named, synchronous outcome. An operation that returns
//! an error has not changed any state.

use crate::crypto::AccountId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to generalized-account multisig operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    // Setup
    #[error("Too few signers: need at least 2, got {0}")]
    TooFewSigners(usize),
    #[error("Confirmations required must be at least 2, got {0}")]
    ThresholdTooLow(usize),
    #[error("Confirmations required ({required}) exceeds signer count ({signers})")]
    ThresholdExceedsSigners { required: usize, signers: usize },
    #[error("The account itself must not be one of its signers")]
    SelfSignerNotAllowed,
    #[error("Not a valid signer identity: {0}")]
    NotAValidSigner(AccountId),

    // Authorization
    #[error("Caller not authorized: {0}")]
    CallerNotAuthorized(AccountId),
    #[error("Not authorized")]
    NotAuthorized,
    #[error("Only the proposer may revoke the proposal")]
    CallerNotProposer,

    // State conflicts
    #[error("Existing proposal has not expired yet (expires at height {expires_at})")]
    ExistingProposalNotExpired { expires_at: u64 },
    #[error("Already confirmed by this signer")]
    AlreadyConfirmed,
    #[error("Already refused by this signer")]
    AlreadyRefused,
    #[error("Nothing to confirm")]
    NothingToConfirm,
    #[error("Fee protection is disabled")]
    FeeProtectionDisabled,
    #[error("Max fee may only be increased: current {current}, requested {requested}")]
    FeeCeilingDecreaseNotAllowed { current: u64, requested: u64 },
    #[error("Max gas price may only be increased: current {current}, requested {requested}")]
    GasCeilingDecreaseNotAllowed { current: u64, requested: u64 },

    // Temporal
    #[error("Proposal expired at height {expired_at}")]
    ProposalExpired { expired_at: u64 },
    #[error("Invalid TTL: expiration height {expires_at} is not above current height {height}")]
    InvalidTtl { expires_at: u64, height: u64 },

    // Gate
    #[error("No transaction proposed")]
    NoTxProposed,
    #[error("No consensus: {confirmations} of {required} confirmations")]
    NoConsensus { confirmations: usize, required: usize },
    #[error("Transaction hash does not match the proposed hash")]
    UnequalHashes,
    #[error("Fee {fee} exceeds ceiling {max_fee}")]
    FeeExceedsCeiling { fee: u64, max_fee: u64 },
    #[error("Gas price {gas_price} exceeds ceiling {max_gasprice}")]
    GasExceedsCeiling { gas_price: u64, max_gasprice: u64 },
    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },
}

/// Coarse grouping of [`MultisigError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Raised only when attaching; fatal to account creation
    Setup,
    Authorization,
    /// Recoverable by retrying against the correct state
    StateConflict,
    /// Recoverable by re-proposing
    Temporal,
    /// The transaction must not execute
    Gate,
}

impl MultisigError {
    pub fn category(&self) -> ErrorCategory {
        use MultisigError::*;
        match self {
            TooFewSigners(_)
            | ThresholdTooLow(_)
            | ThresholdExceedsSigners { .. }
            | SelfSignerNotAllowed
            | NotAValidSigner(_) => ErrorCategory::Setup,
            CallerNotAuthorized(_) | NotAuthorized | CallerNotProposer => {
                ErrorCategory::Authorization
            }
            ExistingProposalNotExpired { .. }
            | AlreadyConfirmed
            | AlreadyRefused
            | NothingToConfirm
            | FeeProtectionDisabled
            | FeeCeilingDecreaseNotAllowed { .. }
            | GasCeilingDecreaseNotAllowed { .. } => ErrorCategory::StateConflict,
            ProposalExpired { .. } | InvalidTtl { .. } => ErrorCategory::Temporal,
            NoTxProposed
            | NoConsensus { .. }
            | UnequalHashes
            | FeeExceedsCeiling { .. }
            | GasExceedsCeiling { .. }
            | InvalidNonce { .. } => ErrorCategory::Gate,
        }
    }
}
