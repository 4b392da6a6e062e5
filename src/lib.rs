//! ga-multisig: M-of-N multi-signature authorization for generalized accounts
//!
//! This crate provides:
//! - A signer registry with threshold validation
//! - A single pending-proposal slot with lazy expiry and veto invalidation
//! - Consensus evaluation against the current block height
//! - An authorization gate with fee ceilings and a replay nonce
//! - An in-memory host ledger, JSON persistence and a CLI
//!
//! # Example
//!
//! ```rust
//! use ga_multisig::crypto::{Caller, KeyPair};
//! use ga_multisig::multisig::{FeeCeilings, Ttl};
//! use ga_multisig::runtime::{Ledger, SpendTx};
//!
//! let ga = KeyPair::generate().address();
//! let alice = KeyPair::generate().address();
//! let bob = KeyPair::generate().address();
//! let carol = KeyPair::generate().address();
//!
//! let mut ledger = Ledger::new();
//! ledger.credit(&ga, 10_000).unwrap();
//! ledger
//!     .attach_generalized_account(
//!         ga.clone(),
//!         vec![alice.clone(), bob.clone(), carol.clone()],
//!         2,
//!         FeeCeilings::default(),
//!     )
//!     .unwrap();
//!
//! // Alice proposes, Bob confirms
//! let tx = SpendTx::new(ga.clone(), carol.clone(), 500, 10, 1);
//! let hash = tx.hash();
//! let (a, b) = (Caller::verified(alice), Caller::verified(bob));
//! ledger
//!     .with_account(&ga, |acc, chain| acc.propose(&a, hash, Ttl::Relative(10), chain))
//!     .unwrap();
//! ledger
//!     .with_account(&ga, |acc, chain| acc.confirm(&b, &hash, chain))
//!     .unwrap();
//!
//! // The gate authorizes exactly once
//! let receipt = ledger.submit(&tx, 0).unwrap();
//! assert_eq!(receipt.nonce, 0);
//! assert_eq!(ledger.balance(&carol), 500);
//! assert!(ledger.submit(&tx, 1).is_err());
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod multisig;
pub mod runtime;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use crypto::{AccountId, Caller, KeyPair, TxHash};
pub use multisig::{
    AuthRequest, FeeCeilings, GeneralizedAccount, MultisigError, SignerRegistry, Ttl,
};
pub use runtime::{BlockHeight, ChainContext, Ledger, SpendTx};
pub use storage::{Storage, StorageConfig};
