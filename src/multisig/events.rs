//! Account events
//!
//! Every successful state change appends one or more events, stamped with
//! the block height at which it happened.

use crate::crypto::{AccountId, TxHash};
use crate::multisig::fee::FeeCeilings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum MultisigEvent {
    TxProposed {
        tx_hash: TxHash,
        proposer: AccountId,
        expires_at: u64,
    },
    TxConfirmed {
        tx_hash: TxHash,
        signer: AccountId,
    },
    TxRefused {
        tx_hash: TxHash,
        signer: AccountId,
    },
    TxConsensusReached {
        tx_hash: TxHash,
    },
    TxConsensusLost {
        tx_hash: TxHash,
    },
    TxRevoked {
        tx_hash: TxHash,
        proposer: AccountId,
    },
    /// Vetoes made quorum impossible and the slot was cleared
    ProposalInvalidated {
        tx_hash: TxHash,
    },
    TxAuthorized {
        tx_hash: TxHash,
        nonce: u64,
    },
    FeeProtectionUpdated {
        signer: AccountId,
        ceilings: FeeCeilings,
    },
    FeeProtectionDisabled {
        signer: AccountId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub height: u64,
    #[serde(flatten)]
    pub event: MultisigEvent,
}

impl EventRecord {
    pub fn new(height: u64, event: MultisigEvent) -> Self {
        Self { height, event }
    }
}
