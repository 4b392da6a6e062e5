//! The pending-transaction slot
//!
//! At most one proposal exists at a time. A second `propose` while the first
//! is still live fails instead of queueing; expiry is evaluated lazily
//! against the height passed in by the caller.

use crate::crypto::{AccountId, Caller, TxHash};
use crate::multisig::consensus::ConsensusEvaluator;
use crate::multisig::error::MultisigError;
use crate::multisig::registry::SignerRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Proposal lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "height")]
pub enum Ttl {
    /// Blocks after the current height
    Relative(u64),
    /// Absolute expiration height
    Fixed(u64),
}

impl Ttl {
    /// Resolve to an absolute expiration height above `current_height`
    pub fn resolve(self, current_height: u64) -> Result<u64, MultisigError> {
        let expires_at = match self {
            Ttl::Relative(offset) => current_height.checked_add(offset).ok_or(
                MultisigError::InvalidTtl {
                    expires_at: u64::MAX,
                    height: current_height,
                },
            )?,
            Ttl::Fixed(height) => height,
        };

        if expires_at <= current_height {
            return Err(MultisigError::InvalidTtl {
                expires_at,
                height: current_height,
            });
        }
        Ok(expires_at)
    }
}

/// A transaction hash awaiting quorum
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ProposalSerde")]
pub struct Proposal {
    pub tx_hash: TxHash,
    pub proposed_by: AccountId,
    /// Most recent first; the proposer is the initial entry
    pub confirmed_by: Vec<AccountId>,
    pub refused_by: BTreeSet<AccountId>,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ProposalSerde {
    tx_hash: TxHash,
    proposed_by: AccountId,
    confirmed_by: Vec<AccountId>,
    refused_by: BTreeSet<AccountId>,
    expires_at: u64,
}

impl TryFrom<ProposalSerde> for Proposal {
    type Error = String;

    fn try_from(value: ProposalSerde) -> Result<Self, Self::Error> {
        let distinct: BTreeSet<&AccountId> = value.confirmed_by.iter().collect();
        if distinct.len() != value.confirmed_by.len() {
            return Err(format!(
                "proposal {} lists a confirmation twice",
                value.tx_hash.short()
            ));
        }
        let overlap = value
            .confirmed_by
            .iter()
            .find(|id| value.refused_by.contains(*id));
        if let Some(both) = overlap {
            return Err(format!(
                "proposal {}: {} both confirmed and refused",
                value.tx_hash.short(),
                both
            ));
        }
        if value.expires_at == 0 {
            return Err(format!(
                "proposal {} has no expiration height",
                value.tx_hash.short()
            ));
        }

        Ok(Self {
            tx_hash: value.tx_hash,
            proposed_by: value.proposed_by,
            confirmed_by: value.confirmed_by,
            refused_by: value.refused_by,
            expires_at: value.expires_at,
        })
    }
}

impl Proposal {
    fn new(tx_hash: TxHash, proposer: AccountId, expires_at: u64) -> Self {
        Self {
            tx_hash,
            confirmed_by: vec![proposer.clone()],
            proposed_by: proposer,
            refused_by: BTreeSet::new(),
            expires_at,
        }
    }

    pub fn is_expired_at(&self, height: u64) -> bool {
        height >= self.expires_at
    }

    pub fn confirmations(&self) -> usize {
        self.confirmed_by.len()
    }

    pub fn refusals(&self) -> usize {
        self.refused_by.len()
    }

    pub fn has_confirmed(&self, id: &AccountId) -> bool {
        self.confirmed_by.contains(id)
    }

    pub fn has_refused(&self, id: &AccountId) -> bool {
        self.refused_by.contains(id)
    }
}

/// What a successful refusal did to the slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefuseOutcome {
    /// Refusal recorded; quorum is still reachable
    Recorded,
    /// Quorum became unreachable and the slot was cleared
    Invalidated(Proposal),
}

/// Single optional proposal slot
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalState {
    slot: Option<Proposal>,
}

impl ProposalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Proposal> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Empty the slot, returning the previous occupant
    pub fn take(&mut self) -> Option<Proposal> {
        self.slot.take()
    }

    /// Open a new proposal, overwriting an expired one
    pub fn propose(
        &mut self,
        caller: &Caller,
        tx_hash: TxHash,
        ttl: Ttl,
        registry: &SignerRegistry,
        height: u64,
    ) -> Result<&Proposal, MultisigError> {
        if !registry.is_signer(caller.id()) {
            return Err(MultisigError::CallerNotAuthorized(caller.id().clone()));
        }
        if let Some(existing) = &self.slot {
            if !existing.is_expired_at(height) {
                return Err(MultisigError::ExistingProposalNotExpired {
                    expires_at: existing.expires_at,
                });
            }
        }
        let expires_at = ttl.resolve(height)?;

        let proposal = self
            .slot
            .insert(Proposal::new(tx_hash, caller.id().clone(), expires_at));
        Ok(&*proposal)
    }

    /// Add the caller's confirmation
    pub fn confirm(
        &mut self,
        caller: &Caller,
        tx_hash: &TxHash,
        registry: &SignerRegistry,
        height: u64,
    ) -> Result<&Proposal, MultisigError> {
        if self.slot.is_none() {
            return Err(MultisigError::NothingToConfirm);
        }
        let proposal = self.authorized_mut(caller, tx_hash, registry)?;
        if proposal.is_expired_at(height) {
            return Err(MultisigError::ProposalExpired {
                expired_at: proposal.expires_at,
            });
        }
        if proposal.has_confirmed(caller.id()) {
            return Err(MultisigError::AlreadyConfirmed);
        }

        proposal.refused_by.remove(caller.id());
        proposal.confirmed_by.insert(0, caller.id().clone());
        Ok(&*proposal)
    }

    /// Record the caller's veto, clearing the slot if quorum is now unreachable
    pub fn refuse(
        &mut self,
        caller: &Caller,
        tx_hash: &TxHash,
        registry: &SignerRegistry,
        height: u64,
    ) -> Result<RefuseOutcome, MultisigError> {
        let proposal = self.authorized_mut(caller, tx_hash, registry)?;
        if proposal.is_expired_at(height) {
            return Err(MultisigError::ProposalExpired {
                expired_at: proposal.expires_at,
            });
        }
        if proposal.has_refused(caller.id()) {
            return Err(MultisigError::AlreadyRefused);
        }

        proposal.confirmed_by.retain(|id| id != caller.id());
        proposal.refused_by.insert(caller.id().clone());

        let evaluator = ConsensusEvaluator::new(registry, height);
        if evaluator.quorum_unreachable(proposal) {
            return Ok(match self.slot.take() {
                Some(dead) => RefuseOutcome::Invalidated(dead),
                None => RefuseOutcome::Recorded,
            });
        }
        Ok(RefuseOutcome::Recorded)
    }

    /// Cancel the proposal; proposer only, expired or not
    pub fn revoke(
        &mut self,
        caller: &Caller,
        tx_hash: &TxHash,
        registry: &SignerRegistry,
    ) -> Result<Proposal, MultisigError> {
        let proposal = self.authorized_mut(caller, tx_hash, registry)?;
        if &proposal.proposed_by != caller.id() {
            return Err(MultisigError::CallerNotProposer);
        }
        self.slot.take().ok_or(MultisigError::NotAuthorized)
    }

    // Non-signers, an empty slot and a mismatched hash all look the same
    // from the outside.
    fn authorized_mut(
        &mut self,
        caller: &Caller,
        tx_hash: &TxHash,
        registry: &SignerRegistry,
    ) -> Result<&mut Proposal, MultisigError> {
        if !registry.is_signer(caller.id()) {
            return Err(MultisigError::NotAuthorized);
        }
        match self.slot.as_mut() {
            Some(proposal) if &proposal.tx_hash == tx_hash => Ok(proposal),
            _ => Err(MultisigError::NotAuthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    struct Fixture {
        registry: SignerRegistry,
        s1: Caller,
        s2: Caller,
        s3: Caller,
    }

    fn fixture() -> Fixture {
        let ids: Vec<AccountId> = (0..3).map(|_| KeyPair::generate().address()).collect();
        let account = KeyPair::generate().address();
        let registry = SignerRegistry::new(ids.clone(), 2, &account).unwrap();
        Fixture {
            registry,
            s1: Caller::verified(ids[0].clone()),
            s2: Caller::verified(ids[1].clone()),
            s3: Caller::verified(ids[2].clone()),
        }
    }

    fn hash(tag: &str) -> TxHash {
        TxHash::digest(tag.as_bytes())
    }

    #[test]
    fn test_ttl_resolution() {
        assert_eq!(Ttl::Relative(10).resolve(5), Ok(15));
        assert_eq!(Ttl::Fixed(20).resolve(5), Ok(20));
        assert_eq!(
            Ttl::Fixed(5).resolve(5),
            Err(MultisigError::InvalidTtl {
                expires_at: 5,
                height: 5
            })
        );
        assert!(Ttl::Relative(0).resolve(5).is_err());
        assert!(Ttl::Relative(u64::MAX).resolve(1).is_err());
    }

    #[test]
    fn test_propose_initializes_slot() {
        let f = fixture();
        let mut state = ProposalState::new();

        let proposal = state
            .propose(&f.s1, hash("a"), Ttl::Relative(10), &f.registry, 0)
            .unwrap();
        assert_eq!(proposal.proposed_by, *f.s1.id());
        assert_eq!(proposal.confirmed_by, vec![f.s1.id().clone()]);
        assert!(proposal.refused_by.is_empty());
        assert_eq!(proposal.expires_at, 10);
    }

    #[test]
    fn test_propose_requires_signer() {
        let f = fixture();
        let outsider = Caller::verified(KeyPair::generate().address());
        let mut state = ProposalState::new();

        let result = state.propose(&outsider, hash("a"), Ttl::Relative(10), &f.registry, 0);
        assert!(matches!(result, Err(MultisigError::CallerNotAuthorized(_))));
        assert!(state.is_empty());
    }

    #[test]
    fn test_single_slot() {
        let f = fixture();
        let mut state = ProposalState::new();
        state
            .propose(&f.s1, hash("a"), Ttl::Fixed(10), &f.registry, 0)
            .unwrap();

        let result = state.propose(&f.s2, hash("b"), Ttl::Fixed(20), &f.registry, 9);
        assert_eq!(
            result,
            Err(MultisigError::ExistingProposalNotExpired { expires_at: 10 })
        );

        // At the expiration height the slot may be reused
        let proposal = state
            .propose(&f.s2, hash("b"), Ttl::Fixed(20), &f.registry, 10)
            .unwrap();
        assert_eq!(proposal.tx_hash, hash("b"));
        assert_eq!(proposal.proposed_by, *f.s2.id());
    }

    #[test]
    fn test_confirm_ordering_and_duplicates() {
        let f = fixture();
        let mut state = ProposalState::new();
        state
            .propose(&f.s1, hash("a"), Ttl::Relative(10), &f.registry, 0)
            .unwrap();

        let proposal = state.confirm(&f.s2, &hash("a"), &f.registry, 1).unwrap();
        assert_eq!(
            proposal.confirmed_by,
            vec![f.s2.id().clone(), f.s1.id().clone()]
        );

        assert_eq!(
            state.confirm(&f.s2, &hash("a"), &f.registry, 1),
            Err(MultisigError::AlreadyConfirmed)
        );
        assert_eq!(
            state.confirm(&f.s1, &hash("a"), &f.registry, 1),
            Err(MultisigError::AlreadyConfirmed)
        );
    }

    #[test]
    fn test_confirm_errors() {
        let f = fixture();
        let mut state = ProposalState::new();
        assert_eq!(
            state.confirm(&f.s1, &hash("a"), &f.registry, 0),
            Err(MultisigError::NothingToConfirm)
        );

        state
            .propose(&f.s1, hash("a"), Ttl::Fixed(5), &f.registry, 0)
            .unwrap();

        // Wrong hash looks exactly like an unauthorized caller
        assert_eq!(
            state.confirm(&f.s2, &hash("b"), &f.registry, 1),
            Err(MultisigError::NotAuthorized)
        );
        let outsider = Caller::verified(KeyPair::generate().address());
        assert_eq!(
            state.confirm(&outsider, &hash("a"), &f.registry, 1),
            Err(MultisigError::NotAuthorized)
        );

        assert_eq!(
            state.confirm(&f.s2, &hash("a"), &f.registry, 5),
            Err(MultisigError::ProposalExpired { expired_at: 5 })
        );
    }

    #[test]
    fn test_confirm_and_refuse_stay_disjoint() {
        let f = fixture();
        let mut state = ProposalState::new();
        state
            .propose(&f.s1, hash("a"), Ttl::Relative(10), &f.registry, 0)
            .unwrap();

        state.confirm(&f.s2, &hash("a"), &f.registry, 1).unwrap();
        assert_eq!(
            state.refuse(&f.s2, &hash("a"), &f.registry, 1),
            Ok(RefuseOutcome::Recorded)
        );
        let proposal = state.current().unwrap();
        assert!(!proposal.has_confirmed(f.s2.id()));
        assert!(proposal.has_refused(f.s2.id()));

        state.confirm(&f.s2, &hash("a"), &f.registry, 2).unwrap();
        let proposal = state.current().unwrap();
        assert!(proposal.has_confirmed(f.s2.id()));
        assert!(!proposal.has_refused(f.s2.id()));
        assert_eq!(proposal.confirmed_by[0], *f.s2.id());
    }

    #[test]
    fn test_refuse_errors() {
        let f = fixture();
        let mut state = ProposalState::new();
        assert_eq!(
            state.refuse(&f.s1, &hash("a"), &f.registry, 0),
            Err(MultisigError::NotAuthorized)
        );

        state
            .propose(&f.s1, hash("a"), Ttl::Fixed(5), &f.registry, 0)
            .unwrap();
        assert_eq!(
            state.refuse(&f.s2, &hash("b"), &f.registry, 1),
            Err(MultisigError::NotAuthorized)
        );
        assert_eq!(
            state.refuse(&f.s2, &hash("a"), &f.registry, 6),
            Err(MultisigError::ProposalExpired { expired_at: 5 })
        );

        let outsider = Caller::verified(KeyPair::generate().address());
        assert_eq!(
            state.refuse(&outsider, &hash("a"), &f.registry, 1),
            Err(MultisigError::NotAuthorized)
        );

        state.refuse(&f.s2, &hash("a"), &f.registry, 1).unwrap();
        assert_eq!(
            state.refuse(&f.s2, &hash("a"), &f.registry, 1),
            Err(MultisigError::AlreadyRefused)
        );
    }

    #[test]
    fn test_veto_invalidates_slot() {
        let f = fixture();
        let mut state = ProposalState::new();
        state
            .propose(&f.s1, hash("a"), Ttl::Relative(10), &f.registry, 0)
            .unwrap();
        state.confirm(&f.s2, &hash("a"), &f.registry, 1).unwrap();

        // remaining = 3 - 1 = 2, still reachable
        assert_eq!(
            state.refuse(&f.s2, &hash("a"), &f.registry, 1),
            Ok(RefuseOutcome::Recorded)
        );
        // remaining = 3 - 2 = 1 < 2
        let outcome = state.refuse(&f.s3, &hash("a"), &f.registry, 1).unwrap();
        match outcome {
            RefuseOutcome::Invalidated(dead) => {
                assert_eq!(dead.tx_hash, hash("a"));
                assert_eq!(dead.refusals(), 2);
            }
            other => panic!("expected invalidation, got {:?}", other),
        }
        assert!(state.is_empty());
    }

    #[test]
    fn test_proposer_can_veto_own_proposal() {
        let f = fixture();
        let mut state = ProposalState::new();
        state
            .propose(&f.s1, hash("a"), Ttl::Relative(10), &f.registry, 0)
            .unwrap();
        state.refuse(&f.s1, &hash("a"), &f.registry, 1).unwrap();

        let proposal = state.current().unwrap();
        assert!(proposal.confirmed_by.is_empty());
        assert_eq!(proposal.proposed_by, *f.s1.id());
    }

    #[test]
    fn test_revoke() {
        let f = fixture();
        let mut state = ProposalState::new();
        state
            .propose(&f.s1, hash("a"), Ttl::Fixed(5), &f.registry, 0)
            .unwrap();

        assert_eq!(
            state.revoke(&f.s2, &hash("a"), &f.registry),
            Err(MultisigError::CallerNotProposer)
        );
        assert_eq!(
            state.revoke(&f.s1, &hash("b"), &f.registry),
            Err(MultisigError::NotAuthorized)
        );
        let outsider = Caller::verified(KeyPair::generate().address());
        assert_eq!(
            state.revoke(&outsider, &hash("a"), &f.registry),
            Err(MultisigError::NotAuthorized)
        );
        assert_eq!(state.current().map(|p| p.tx_hash), Some(hash("a")));

        // Expiry does not block revoke
        let revoked = state.revoke(&f.s1, &hash("a"), &f.registry).unwrap();
        assert_eq!(revoked.tx_hash, hash("a"));
        assert!(state.is_empty());

        assert_eq!(
            state.revoke(&f.s1, &hash("a"), &f.registry),
            Err(MultisigError::NotAuthorized)
        );
    }

    #[test]
    fn test_deserialize_checks_proposal_shape() {
        let f = fixture();
        let mut state = ProposalState::new();
        state
            .propose(&f.s1, hash("a"), Ttl::Relative(10), &f.registry, 0)
            .unwrap();
        state.refuse(&f.s2, &hash("a"), &f.registry, 1).unwrap();

        let value = serde_json::to_value(&state).unwrap();
        let restored: ProposalState = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(restored, state);

        let mut overlap = value.clone();
        overlap["slot"]["confirmed_by"] = serde_json::json!([f.s1.id(), f.s2.id()]);
        assert!(serde_json::from_value::<ProposalState>(overlap).is_err());

        let mut doubled = value.clone();
        doubled["slot"]["confirmed_by"] = serde_json::json!([f.s1.id(), f.s1.id()]);
        assert!(serde_json::from_value::<ProposalState>(doubled).is_err());

        let mut no_expiry = value;
        no_expiry["slot"]["expires_at"] = serde_json::json!(0);
        assert!(serde_json::from_value::<ProposalState>(no_expiry).is_err());
    }
}
