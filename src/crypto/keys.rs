//! ECDSA key management and caller authentication
//!
//! Co-signers are plain secp256k1 accounts. Their address is
//! `Base58Check(0x00 || RIPEMD160(SHA256(pubkey)))`, and an operation is
//! attributed to them only after their signature over the operation hash
//! verifies.

use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::hash::sha256;
use super::identity::{AccountId, Caller, ADDRESS_VERSION};

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Signature verification failed")]
    VerificationFailed,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A co-signer key pair
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Compressed public key, hex encoded
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// The account address owned by this key
    pub fn address(&self) -> AccountId {
        public_key_to_address(&self.public_key)
    }

    /// Sign a message hash with the private key
    pub fn sign(&self, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.secret_key, message_hash)
    }
}

/// Derive the account address for a public key
pub fn public_key_to_address(public_key: &PublicKey) -> AccountId {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(&public_key.serialize()));
    let ripemd_hash = ripemd.finalize();

    let mut address_bytes = vec![ADDRESS_VERSION];
    address_bytes.extend_from_slice(&ripemd_hash);

    let checksum = Sha256::digest(Sha256::digest(&address_bytes));
    address_bytes.extend_from_slice(&checksum[..4]);

    AccountId::new(bs58::encode(address_bytes).into_string())
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

// Messages that are not already 32 bytes are hashed first.
fn message_digest(message_hash: &[u8]) -> Result<Message, KeyError> {
    let hash = if message_hash.len() == 32 {
        message_hash.to_vec()
    } else {
        sha256(message_hash)
    };
    Ok(Message::from_digest_slice(&hash)?)
}

/// Sign a message hash with a secret key (compact encoding)
pub fn sign_message(secret_key: &SecretKey, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = message_digest(message_hash)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    message_hash: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let message = message_digest(message_hash)?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature)
        .map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}

/// Authenticate the signer of `message_hash` and hand back a [`Caller`]
///
/// The returned identity is the address derived from `public_key_hex`.
pub fn authenticate(
    public_key_hex: &str,
    message_hash: &[u8],
    signature: &[u8],
) -> Result<Caller, KeyError> {
    let public_key = public_key_from_hex(public_key_hex)?;
    if !verify_signature(&public_key, message_hash, signature)? {
        return Err(KeyError::VerificationFailed);
    }
    Ok(Caller::verified(public_key_to_address(&public_key)))
}
