//! Authorization gate
//!
//! The entry point the account runtime calls once per outgoing transaction.
//! All checks run before anything is written, so a rejected attempt leaves
//! the slot and the nonce exactly as they were.

use crate::crypto::{AccountId, TxHash};
use crate::multisig::consensus::ConsensusEvaluator;
use crate::multisig::error::MultisigError;
use crate::multisig::fee::FeeProtectionPolicy;
use crate::multisig::proposal::ProposalState;
use crate::multisig::registry::SignerRegistry;
use serde::{Deserialize, Serialize};

/// One authorization attempt as presented by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Hash of the transaction about to execute
    pub tx_hash: TxHash,
    pub fee: u64,
    pub gas_price: u64,
    /// Must equal the gate's current nonce
    pub nonce: u64,
}

/// Receipt for a successful authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub tx_hash: TxHash,
    /// Nonce consumed by this authorization
    pub nonce: u64,
    pub proposed_by: AccountId,
    pub confirmed_by: Vec<AccountId>,
    pub height: u64,
}

/// Owner of the replay nonce
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGate {
    nonce: u64,
}

impl AuthorizationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Run every gate check without changing state
    pub fn check(
        &self,
        request: &AuthRequest,
        proposals: &ProposalState,
        registry: &SignerRegistry,
        fees: &FeeProtectionPolicy,
        height: u64,
    ) -> Result<(), MultisigError> {
        let proposal = proposals.current().ok_or(MultisigError::NoTxProposed)?;
        let evaluator = ConsensusEvaluator::new(registry, height);

        if proposal.is_expired_at(height) {
            return Err(MultisigError::ProposalExpired {
                expired_at: proposal.expires_at,
            });
        }
        if !evaluator.proposal_has_consensus(proposal) {
            return Err(MultisigError::NoConsensus {
                confirmations: proposal.confirmations(),
                required: registry.confirmations_required(),
            });
        }
        if request.tx_hash != proposal.tx_hash {
            return Err(MultisigError::UnequalHashes);
        }
        fees.check(request.fee, request.gas_price)?;
        if request.nonce != self.nonce {
            return Err(MultisigError::InvalidNonce {
                expected: self.nonce,
                got: request.nonce,
            });
        }
        Ok(())
    }

    /// Check, then consume the proposal and advance the nonce
    pub fn authorize(
        &mut self,
        request: &AuthRequest,
        proposals: &mut ProposalState,
        registry: &SignerRegistry,
        fees: &FeeProtectionPolicy,
        height: u64,
    ) -> Result<Authorization, MultisigError> {
        self.check(request, proposals, registry, fees, height)?;
        let proposal = proposals.take().ok_or(MultisigError::NoTxProposed)?;

        let nonce = self.nonce;
        self.nonce += 1;

        Ok(Authorization {
            tx_hash: proposal.tx_hash,
            nonce,
            proposed_by: proposal.proposed_by,
            confirmed_by: proposal.confirmed_by,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Caller, KeyPair};
    use crate::multisig::fee::FeeCeilings;
    use crate::multisig::proposal::Ttl;

    struct Fixture {
        registry: SignerRegistry,
        callers: Vec<Caller>,
        proposals: ProposalState,
        fees: FeeProtectionPolicy,
        gate: AuthorizationGate,
        hash: TxHash,
    }

    fn fixture() -> Fixture {
        let ids: Vec<AccountId> = (0..3).map(|_| KeyPair::generate().address()).collect();
        let account = KeyPair::generate().address();
        Fixture {
            registry: SignerRegistry::new(ids.clone(), 2, &account).unwrap(),
            callers: ids.into_iter().map(Caller::verified).collect(),
            proposals: ProposalState::new(),
            fees: FeeProtectionPolicy::enabled(FeeCeilings {
                max_fee: 1_000,
                max_gasprice: 10,
            }),
            gate: AuthorizationGate::new(),
            hash: TxHash::digest(b"spend"),
        }
    }

    fn with_consensus(f: &mut Fixture) {
        f.proposals
            .propose(&f.callers[0], f.hash, Ttl::Fixed(10), &f.registry, 0)
            .unwrap();
        f.proposals
            .confirm(&f.callers[1], &f.hash, &f.registry, 0)
            .unwrap();
    }

    fn request(f: &Fixture) -> AuthRequest {
        AuthRequest {
            tx_hash: f.hash,
            fee: 500,
            gas_price: 5,
            nonce: f.gate.nonce(),
        }
    }

    fn attempt(
        f: &mut Fixture,
        req: AuthRequest,
        height: u64,
    ) -> Result<Authorization, MultisigError> {
        f.gate
            .authorize(&req, &mut f.proposals, &f.registry, &f.fees, height)
    }

    #[test]
    fn test_authorize_success() {
        let mut f = fixture();
        with_consensus(&mut f);
        let req = request(&f);

        let auth = attempt(&mut f, req, 1).unwrap();
        assert_eq!(auth.tx_hash, f.hash);
        assert_eq!(auth.nonce, 0);
        assert_eq!(auth.confirmed_by.len(), 2);
        assert_eq!(f.gate.nonce(), 1);
        assert!(f.proposals.is_empty());

        // Replaying the same request finds nothing to authorize
        assert_eq!(attempt(&mut f, req, 1), Err(MultisigError::NoTxProposed));
        assert_eq!(f.gate.nonce(), 1);
    }

    #[test]
    fn test_no_proposal() {
        let mut f = fixture();
        let req = request(&f);
        assert_eq!(attempt(&mut f, req, 1), Err(MultisigError::NoTxProposed));
    }

    #[test]
    fn test_expired_before_consensus_check() {
        let mut f = fixture();
        f.proposals
            .propose(&f.callers[0], f.hash, Ttl::Fixed(10), &f.registry, 0)
            .unwrap();
        let req = request(&f);

        assert_eq!(
            attempt(&mut f, req, 10),
            Err(MultisigError::ProposalExpired { expired_at: 10 })
        );
        assert_eq!(
            attempt(&mut f, req, 9),
            Err(MultisigError::NoConsensus {
                confirmations: 1,
                required: 2
            })
        );
        assert!(!f.proposals.is_empty());
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let mut f = fixture();
        with_consensus(&mut f);
        let before = f.proposals.clone();

        let mut req = request(&f);
        req.tx_hash = TxHash::digest(b"other");
        assert_eq!(attempt(&mut f, req, 1), Err(MultisigError::UnequalHashes));

        let mut req = request(&f);
        req.fee = 1_001;
        assert!(matches!(
            attempt(&mut f, req, 1),
            Err(MultisigError::FeeExceedsCeiling { .. })
        ));

        let mut req = request(&f);
        req.gas_price = 11;
        assert!(matches!(
            attempt(&mut f, req, 1),
            Err(MultisigError::GasExceedsCeiling { .. })
        ));

        let mut req = request(&f);
        req.nonce = 7;
        assert_eq!(
            attempt(&mut f, req, 1),
            Err(MultisigError::InvalidNonce {
                expected: 0,
                got: 7
            })
        );

        assert_eq!(f.proposals, before);
        assert_eq!(f.gate.nonce(), 0);
    }

    #[test]
    fn test_hash_checked_before_fees() {
        let mut f = fixture();
        with_consensus(&mut f);

        let mut req = request(&f);
        req.tx_hash = TxHash::digest(b"other");
        req.fee = u64::MAX;
        req.nonce = 99;
        assert_eq!(attempt(&mut f, req, 1), Err(MultisigError::UnequalHashes));
    }
}
