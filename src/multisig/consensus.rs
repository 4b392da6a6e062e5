//! Quorum arithmetic over the proposal slot
//!
//! Pure functions of the registry, the slot and the current height. Nothing
//! here mutates state; expiry and consensus are recomputed on every read.

use crate::crypto::{AccountId, TxHash};
use crate::multisig::proposal::{Proposal, ProposalState};
use crate::multisig::registry::SignerRegistry;
use serde::{Deserialize, Serialize};

/// Evaluates consensus for one registry at one block height
#[derive(Debug, Clone, Copy)]
pub struct ConsensusEvaluator<'a> {
    registry: &'a SignerRegistry,
    height: u64,
}

impl<'a> ConsensusEvaluator<'a> {
    pub fn new(registry: &'a SignerRegistry, height: u64) -> Self {
        Self { registry, height }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// True iff the slot holds a proposal whose expiration height is reached
    pub fn is_expired(&self, state: &ProposalState) -> bool {
        state
            .current()
            .map_or(false, |p| p.is_expired_at(self.height))
    }

    /// True iff the slot holds a live proposal with enough confirmations
    pub fn has_consensus(&self, state: &ProposalState) -> bool {
        state
            .current()
            .map_or(false, |p| self.proposal_has_consensus(p))
    }

    pub fn proposal_has_consensus(&self, proposal: &Proposal) -> bool {
        !proposal.is_expired_at(self.height)
            && proposal.confirmations() >= self.registry.confirmations_required()
    }

    /// Signers who have not vetoed
    pub fn remaining_signers(&self, proposal: &Proposal) -> usize {
        self.registry
            .signer_count()
            .saturating_sub(proposal.refusals())
    }

    /// True once enough signers have refused that quorum can never be reached
    pub fn quorum_unreachable(&self, proposal: &Proposal) -> bool {
        self.remaining_signers(proposal) < self.registry.confirmations_required()
    }

    /// Read view of the slot
    pub fn info(&self, state: &ProposalState) -> ConsensusInfo {
        let confirmations_required = self.registry.confirmations_required();
        match state.current() {
            None => ConsensusInfo::empty(confirmations_required),
            Some(p) => ConsensusInfo {
                tx_hash: Some(p.tx_hash),
                confirmations_required,
                confirmed_by: p.confirmed_by.clone(),
                refused_by: p.refused_by.iter().cloned().collect(),
                has_consensus: self.proposal_has_consensus(p),
                expiration_height: p.expires_at,
                expired: p.is_expired_at(self.height),
                proposed_by: Some(p.proposed_by.clone()),
            },
        }
    }
}

/// Snapshot of the proposal slot as seen at a given height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusInfo {
    pub tx_hash: Option<TxHash>,
    pub confirmations_required: usize,
    pub confirmed_by: Vec<AccountId>,
    pub refused_by: Vec<AccountId>,
    pub has_consensus: bool,
    pub expiration_height: u64,
    pub expired: bool,
    pub proposed_by: Option<AccountId>,
}

impl ConsensusInfo {
    fn empty(confirmations_required: usize) -> Self {
        Self {
            tx_hash: None,
            confirmations_required,
            confirmed_by: Vec::new(),
            refused_by: Vec::new(),
            has_consensus: false,
            expiration_height: 0,
            expired: false,
            proposed_by: None,
        }
    }
}
