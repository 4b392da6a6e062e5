//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing and the transaction hash type
//! - Account identities and the verified-caller capability
//! - ECDSA key management and signature checks (secp256k1)

pub mod hash;
pub mod identity;
pub mod keys;

pub use hash::{double_sha256, sha256, HashError, TxHash};
pub use identity::{AccountId, Caller};
pub use keys::{
    authenticate, public_key_from_hex, public_key_to_address, sign_message, verify_signature,
    KeyError, KeyPair,
};
