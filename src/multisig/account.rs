//! Generalized account
//!
//! The authorization logic attached to one account: signer registry, fee
//! protection, the proposal slot and the gate, plus an event log. Every
//! mutating method validates completely before it writes, so on error the
//! account is unchanged.

use crate::crypto::{AccountId, Caller, TxHash};
use crate::multisig::consensus::{ConsensusEvaluator, ConsensusInfo};
use crate::multisig::error::MultisigError;
use crate::multisig::events::{EventRecord, MultisigEvent};
use crate::multisig::fee::{FeeCeilings, FeeProtectionPolicy};
use crate::multisig::gate::{AuthRequest, Authorization, AuthorizationGate};
use crate::multisig::proposal::{ProposalState, RefuseOutcome, Ttl};
use crate::multisig::registry::SignerRegistry;
use crate::runtime::ChainContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the attached authorization logic
pub const VERSION: &str = "2.0.0";

/// A multi-signature generalized account
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "GeneralizedAccountSerde")]
pub struct GeneralizedAccount {
    id: AccountId,
    registry: SignerRegistry,
    fee_protection: FeeProtectionPolicy,
    proposals: ProposalState,
    gate: AuthorizationGate,
    events: Vec<EventRecord>,
    attached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeneralizedAccountSerde {
    id: AccountId,
    registry: SignerRegistry,
    fee_protection: FeeProtectionPolicy,
    proposals: ProposalState,
    gate: AuthorizationGate,
    events: Vec<EventRecord>,
    attached_at: DateTime<Utc>,
}

// Checks that span the registry and the slot; each part validates itself.
impl TryFrom<GeneralizedAccountSerde> for GeneralizedAccount {
    type Error = String;

    fn try_from(value: GeneralizedAccountSerde) -> Result<Self, Self::Error> {
        if value.registry.is_signer(&value.id) {
            return Err(format!(
                "account {}: {}",
                value.id,
                MultisigError::SelfSignerNotAllowed
            ));
        }
        if let Some(p) = value.proposals.current() {
            let participants = std::iter::once(&p.proposed_by)
                .chain(&p.confirmed_by)
                .chain(&p.refused_by);
            for id in participants {
                if !value.registry.is_signer(id) {
                    return Err(format!(
                        "account {}: proposal {} names non-signer {}",
                        value.id,
                        p.tx_hash.short(),
                        id
                    ));
                }
            }
        }

        Ok(Self {
            id: value.id,
            registry: value.registry,
            fee_protection: value.fee_protection,
            proposals: value.proposals,
            gate: value.gate,
            events: value.events,
            attached_at: value.attached_at,
        })
    }
}

impl GeneralizedAccount {
    /// Attach M-of-N authorization to `id`
    ///
    /// # Errors
    /// Any setup error from [`SignerRegistry::new`].
    pub fn attach(
        id: AccountId,
        signers: Vec<AccountId>,
        confirmations_required: usize,
        ceilings: FeeCeilings,
    ) -> Result<Self, MultisigError> {
        let registry = SignerRegistry::new(signers, confirmations_required, &id)?;

        log::info!("Attached {} multisig to account {}", registry.description(), id);

        Ok(Self {
            id,
            registry,
            fee_protection: FeeProtectionPolicy::enabled(ceilings),
            proposals: ProposalState::new(),
            gate: AuthorizationGate::new(),
            events: Vec::new(),
            attached_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn registry(&self) -> &SignerRegistry {
        &self.registry
    }

    pub fn signers(&self) -> Vec<AccountId> {
        self.registry.signers().iter().cloned().collect()
    }

    pub fn nonce(&self) -> u64 {
        self.gate.nonce()
    }

    pub fn fee_protection(&self) -> Option<FeeCeilings> {
        self.fee_protection.ceilings()
    }

    pub fn is_fee_protection_enabled(&self) -> bool {
        self.fee_protection.is_enabled()
    }

    pub fn version(&self) -> &'static str {
        VERSION
    }

    pub fn attached_at(&self) -> DateTime<Utc> {
        self.attached_at
    }

    pub fn consensus_info(&self, chain: &impl ChainContext) -> ConsensusInfo {
        self.evaluator(chain).info(&self.proposals)
    }

    pub fn has_consensus(&self, chain: &impl ChainContext) -> bool {
        self.evaluator(chain).has_consensus(&self.proposals)
    }

    pub fn is_expired(&self, chain: &impl ChainContext) -> bool {
        self.evaluator(chain).is_expired(&self.proposals)
    }

    /// Propose `tx_hash`; returns the resolved expiration height
    pub fn propose(
        &mut self,
        caller: &Caller,
        tx_hash: TxHash,
        ttl: Ttl,
        chain: &impl ChainContext,
    ) -> Result<u64, MultisigError> {
        let height = chain.current_height();
        let proposal = self
            .proposals
            .propose(caller, tx_hash, ttl, &self.registry, height)?;
        let expires_at = proposal.expires_at;

        log::info!(
            "Proposal {} by {} (expires at height {})",
            tx_hash.short(),
            caller.id(),
            expires_at
        );
        self.emit(
            height,
            MultisigEvent::TxProposed {
                tx_hash,
                proposer: caller.id().clone(),
                expires_at,
            },
        );
        Ok(expires_at)
    }

    pub fn confirm(
        &mut self,
        caller: &Caller,
        tx_hash: &TxHash,
        chain: &impl ChainContext,
    ) -> Result<(), MultisigError> {
        let height = chain.current_height();
        let had_consensus = self.has_consensus(chain);
        let confirmations = self
            .proposals
            .confirm(caller, tx_hash, &self.registry, height)?
            .confirmations();

        log::info!(
            "Proposal {} confirmed by {} ({}/{})",
            tx_hash.short(),
            caller.id(),
            confirmations,
            self.registry.confirmations_required()
        );
        self.emit(
            height,
            MultisigEvent::TxConfirmed {
                tx_hash: *tx_hash,
                signer: caller.id().clone(),
            },
        );
        if !had_consensus && self.has_consensus(chain) {
            log::info!("Consensus reached for {}", tx_hash.short());
            self.emit(height, MultisigEvent::TxConsensusReached { tx_hash: *tx_hash });
        }
        Ok(())
    }

    /// Veto the proposal; returns true if the veto cleared the slot
    pub fn refuse(
        &mut self,
        caller: &Caller,
        tx_hash: &TxHash,
        chain: &impl ChainContext,
    ) -> Result<bool, MultisigError> {
        let height = chain.current_height();
        let had_consensus = self.has_consensus(chain);
        let outcome = self
            .proposals
            .refuse(caller, tx_hash, &self.registry, height)?;

        log::info!("Proposal {} refused by {}", tx_hash.short(), caller.id());
        self.emit(
            height,
            MultisigEvent::TxRefused {
                tx_hash: *tx_hash,
                signer: caller.id().clone(),
            },
        );
        if had_consensus && !self.has_consensus(chain) {
            self.emit(height, MultisigEvent::TxConsensusLost { tx_hash: *tx_hash });
        }

        match outcome {
            RefuseOutcome::Recorded => Ok(false),
            RefuseOutcome::Invalidated(dead) => {
                log::info!(
                    "Proposal {} invalidated: {} refusals leave quorum of {} unreachable",
                    tx_hash.short(),
                    dead.refusals(),
                    self.registry.confirmations_required()
                );
                self.emit(height, MultisigEvent::ProposalInvalidated { tx_hash: *tx_hash });
                Ok(true)
            }
        }
    }

    pub fn revoke(
        &mut self,
        caller: &Caller,
        tx_hash: &TxHash,
        chain: &impl ChainContext,
    ) -> Result<(), MultisigError> {
        let revoked = self.proposals.revoke(caller, tx_hash, &self.registry)?;

        log::info!("Proposal {} revoked by {}", tx_hash.short(), caller.id());
        self.emit(
            chain.current_height(),
            MultisigEvent::TxRevoked {
                tx_hash: revoked.tx_hash,
                proposer: revoked.proposed_by,
            },
        );
        Ok(())
    }

    pub fn update_fee_protection(
        &mut self,
        caller: &Caller,
        ceilings: FeeCeilings,
        chain: &impl ChainContext,
    ) -> Result<(), MultisigError> {
        self.fee_protection.update(ceilings, caller, &self.registry)?;

        log::info!(
            "Fee protection raised by {}: max_fee={}, max_gasprice={}",
            caller.id(),
            ceilings.max_fee,
            ceilings.max_gasprice
        );
        self.emit(
            chain.current_height(),
            MultisigEvent::FeeProtectionUpdated {
                signer: caller.id().clone(),
                ceilings,
            },
        );
        Ok(())
    }

    pub fn disable_fee_protection(
        &mut self,
        caller: &Caller,
        chain: &impl ChainContext,
    ) -> Result<(), MultisigError> {
        self.fee_protection.disable(caller, &self.registry)?;

        log::info!("Fee protection disabled by {}", caller.id());
        self.emit(
            chain.current_height(),
            MultisigEvent::FeeProtectionDisabled {
                signer: caller.id().clone(),
            },
        );
        Ok(())
    }

    /// The runtime's per-transaction authorization entry point
    pub fn authorize(
        &mut self,
        request: &AuthRequest,
        chain: &impl ChainContext,
    ) -> Result<Authorization, MultisigError> {
        let height = chain.current_height();
        let result = self.gate.authorize(
            request,
            &mut self.proposals,
            &self.registry,
            &self.fee_protection,
            height,
        );

        match result {
            Ok(auth) => {
                log::info!(
                    "Authorized {} for account {} with nonce {}",
                    auth.tx_hash.short(),
                    self.id,
                    auth.nonce
                );
                self.emit(
                    height,
                    MultisigEvent::TxAuthorized {
                        tx_hash: auth.tx_hash,
                        nonce: auth.nonce,
                    },
                );
                Ok(auth)
            }
            Err(e) => {
                log::warn!(
                    "Rejected authorization of {} for account {}: {}",
                    request.tx_hash.short(),
                    self.id,
                    e
                );
                Err(e)
            }
        }
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    fn evaluator(&self, chain: &impl ChainContext) -> ConsensusEvaluator<'_> {
        ConsensusEvaluator::new(&self.registry, chain.current_height())
    }

    fn emit(&mut self, height: u64, event: MultisigEvent) {
        self.events.push(EventRecord::new(height, event));
    }
}
