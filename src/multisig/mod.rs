//! Multi-signature authorization for generalized accounts
//!
//! An M-of-N group of co-signers must agree on a transaction hash before
//! the account runtime is allowed to execute it.
//!
//! # Example
//!
//! ```ignore
//! use ga_multisig::multisig::{AuthRequest, FeeCeilings, GeneralizedAccount, Ttl};
//!
//! // Attach 2-of-3 authorization
//! let mut account = GeneralizedAccount::attach(ga_id, signers, 2, FeeCeilings::default())?;
//!
//! // One signer proposes, another confirms
//! account.propose(&alice, tx_hash, Ttl::Relative(20), &chain)?;
//! account.confirm(&bob, &tx_hash, &chain)?;
//!
//! // The runtime consults the gate right before executing the transaction
//! let auth = account.authorize(&AuthRequest { tx_hash, fee, gas_price, nonce: 0 }, &chain)?;
//! ```

pub mod account;
pub mod consensus;
pub mod error;
pub mod events;
pub mod fee;
pub mod gate;
pub mod proposal;
pub mod registry;

pub use account::{GeneralizedAccount, VERSION};
pub use consensus::{ConsensusEvaluator, ConsensusInfo};
pub use error::{ErrorCategory, MultisigError};
pub use events::{EventRecord, MultisigEvent};
pub use fee::{FeeCeilings, FeeProtectionPolicy, DEFAULT_MAX_FEE, DEFAULT_MAX_GASPRICE};
pub use gate::{AuthRequest, Authorization, AuthorizationGate};
pub use proposal::{Proposal, ProposalState, RefuseOutcome, Ttl};
pub use registry::SignerRegistry;
