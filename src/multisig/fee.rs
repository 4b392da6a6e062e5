//! Fee protection
//!
//! Optional ceilings on the fee and gas price the account will authorize.
//! While enabled the ceilings can only be raised; once disabled the policy
//! stays disabled for the lifetime of the attachment.

use crate::crypto::Caller;
use crate::multisig::error::MultisigError;
use crate::multisig::registry::SignerRegistry;
use serde::{Deserialize, Serialize};

/// Default maximum fee per authorized transaction
pub const DEFAULT_MAX_FEE: u64 = 2_000_000_000_000_000;

/// Default maximum gas price per authorized transaction
pub const DEFAULT_MAX_GASPRICE: u64 = 10_000_000_000;

/// Fee and gas price ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCeilings {
    pub max_fee: u64,
    pub max_gasprice: u64,
}

impl Default for FeeCeilings {
    fn default() -> Self {
        Self {
            max_fee: DEFAULT_MAX_FEE,
            max_gasprice: DEFAULT_MAX_GASPRICE,
        }
    }
}

/// Ceilings are present only while protection is enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeProtectionPolicy {
    ceilings: Option<FeeCeilings>,
}

impl FeeProtectionPolicy {
    /// Enabled policy with the given initial ceilings
    pub fn enabled(ceilings: FeeCeilings) -> Self {
        Self {
            ceilings: Some(ceilings),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ceilings.is_some()
    }

    pub fn ceilings(&self) -> Option<FeeCeilings> {
        self.ceilings
    }

    /// Raise both ceilings
    pub fn update(
        &mut self,
        new: FeeCeilings,
        caller: &Caller,
        registry: &SignerRegistry,
    ) -> Result<(), MultisigError> {
        if !registry.is_signer(caller.id()) {
            return Err(MultisigError::CallerNotAuthorized(caller.id().clone()));
        }
        let current = self.ceilings.ok_or(MultisigError::FeeProtectionDisabled)?;

        if new.max_fee < current.max_fee {
            return Err(MultisigError::FeeCeilingDecreaseNotAllowed {
                current: current.max_fee,
                requested: new.max_fee,
            });
        }
        if new.max_gasprice < current.max_gasprice {
            return Err(MultisigError::GasCeilingDecreaseNotAllowed {
                current: current.max_gasprice,
                requested: new.max_gasprice,
            });
        }

        self.ceilings = Some(new);
        Ok(())
    }

    /// Switch protection off for good
    pub fn disable(
        &mut self,
        caller: &Caller,
        registry: &SignerRegistry,
    ) -> Result<(), MultisigError> {
        if !registry.is_signer(caller.id()) {
            return Err(MultisigError::CallerNotAuthorized(caller.id().clone()));
        }
        if self.ceilings.take().is_none() {
            return Err(MultisigError::FeeProtectionDisabled);
        }
        Ok(())
    }

    /// Gate check; always passes while disabled
    pub fn check(&self, fee: u64, gas_price: u64) -> Result<(), MultisigError> {
        let Some(ceilings) = self.ceilings else {
            return Ok(());
        };
        if fee > ceilings.max_fee {
            return Err(MultisigError::FeeExceedsCeiling {
                fee,
                max_fee: ceilings.max_fee,
            });
        }
        if gas_price > ceilings.max_gasprice {
            return Err(MultisigError::GasExceedsCeiling {
                gas_price,
                max_gasprice: ceilings.max_gasprice,
            });
        }
        Ok(())
    }
}

impl Default for FeeProtectionPolicy {
    fn default() -> Self {
        Self::enabled(FeeCeilings::default())
    }
}
