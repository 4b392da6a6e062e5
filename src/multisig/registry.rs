//! Signer registry
//!
//! The set of co-signers and the quorum threshold. Fixed when the account is
//! attached; there is no add/remove-signer operation.

use crate::crypto::AccountId;
use crate::multisig::error::MultisigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Minimum number of distinct signers
pub const MIN_SIGNERS: usize = 2;

/// Minimum confirmation threshold
pub const MIN_CONFIRMATIONS: usize = 2;

/// Immutable M-of-N signer set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "SignerRegistrySerde")]
pub struct SignerRegistry {
    /// Authorized co-signers (N)
    signers: BTreeSet<AccountId>,
    /// Confirmations needed for consensus (M)
    confirmations_required: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct SignerRegistrySerde {
    signers: Vec<AccountId>,
    confirmations_required: usize,
}

// Stored registries go through the same checks as freshly attached ones,
// except the self-signer rule, which needs the owning account.
impl TryFrom<SignerRegistrySerde> for SignerRegistry {
    type Error = MultisigError;

    fn try_from(value: SignerRegistrySerde) -> Result<Self, Self::Error> {
        Self::validated(
            value.signers.into_iter().collect(),
            value.confirmations_required,
            None,
        )
    }
}

impl SignerRegistry {
    /// Build the registry for `account`
    ///
    /// Duplicate identities are collapsed before counting.
    ///
    /// # Errors
    /// `TooFewSigners`, `ThresholdTooLow`, `ThresholdExceedsSigners`,
    /// `SelfSignerNotAllowed` or `NotAValidSigner`, checked in that order.
    pub fn new(
        signers: Vec<AccountId>,
        confirmations_required: usize,
        account: &AccountId,
    ) -> Result<Self, MultisigError> {
        Self::validated(
            signers.into_iter().collect(),
            confirmations_required,
            Some(account),
        )
    }

    fn validated(
        signers: BTreeSet<AccountId>,
        confirmations_required: usize,
        account: Option<&AccountId>,
    ) -> Result<Self, MultisigError> {
        if signers.len() < MIN_SIGNERS {
            return Err(MultisigError::TooFewSigners(signers.len()));
        }
        if confirmations_required < MIN_CONFIRMATIONS {
            return Err(MultisigError::ThresholdTooLow(confirmations_required));
        }
        if confirmations_required > signers.len() {
            return Err(MultisigError::ThresholdExceedsSigners {
                required: confirmations_required,
                signers: signers.len(),
            });
        }
        if account.map_or(false, |a| signers.contains(a)) {
            return Err(MultisigError::SelfSignerNotAllowed);
        }
        if let Some(bad) = signers.iter().find(|s| !s.is_well_formed()) {
            return Err(MultisigError::NotAValidSigner(bad.clone()));
        }

        Ok(Self {
            signers,
            confirmations_required,
        })
    }

    pub fn is_signer(&self, id: &AccountId) -> bool {
        self.signers.contains(id)
    }

    pub fn signers(&self) -> &BTreeSet<AccountId> {
        &self.signers
    }

    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    pub fn confirmations_required(&self) -> usize {
        self.confirmations_required
    }

    /// Description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.confirmations_required, self.signers.len())
    }
}
