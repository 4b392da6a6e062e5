//! Account identities and the verified-caller capability

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Address version byte for plain (key-owned) accounts
pub const ADDRESS_VERSION: u8 = 0x00;

/// Length of a decoded address: version + RIPEMD160 digest + checksum
const ADDRESS_BYTES: usize = 1 + 20 + 4;

/// A Base58Check account address
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check Base58Check structure, version byte and checksum
    pub fn is_well_formed(&self) -> bool {
        let bytes = match bs58::decode(&self.0).into_vec() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        if bytes.len() != ADDRESS_BYTES || bytes[0] != ADDRESS_VERSION {
            return false;
        }

        let (payload, checksum) = bytes.split_at(ADDRESS_BYTES - 4);
        let digest = Sha256::digest(Sha256::digest(payload));
        &digest[..4] == checksum
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An identity the host runtime has already authenticated
///
/// Every state-changing multisig operation takes a `Caller` rather than a
/// bare [`AccountId`]. Obtain one from [`crate::crypto::authenticate`] or,
/// when the host verified the caller upstream, from [`Caller::verified`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(AccountId);

impl Caller {
    pub fn verified(id: AccountId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> &AccountId {
        &self.0
    }
}
