//! Spend transactions issued by a generalized account

use crate::crypto::{AccountId, TxHash};
use serde::{Deserialize, Serialize};

/// Domain tag prefixed to every hashed spend
const SPEND_TAG: &[u8] = b"ga-spend-v1";

/// A transfer out of a generalized account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendTx {
    pub sender: AccountId,
    pub recipient: AccountId,
    pub amount: u64,
    pub fee: u64,
    pub gas_price: u64,
    #[serde(default)]
    pub payload: String,
}

impl SpendTx {
    pub fn new(
        sender: AccountId,
        recipient: AccountId,
        amount: u64,
        fee: u64,
        gas_price: u64,
    ) -> Self {
        Self {
            sender,
            recipient,
            amount,
            fee,
            gas_price,
            payload: String::new(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Total debited from the sender
    pub fn total_cost(&self) -> Option<u64> {
        self.amount.checked_add(self.fee)
    }

    /// Canonical hash: double SHA-256 over length-prefixed fields
    pub fn hash(&self) -> TxHash {
        let mut data = Vec::with_capacity(128);
        data.extend_from_slice(SPEND_TAG);
        push_bytes(&mut data, self.sender.as_str().as_bytes());
        push_bytes(&mut data, self.recipient.as_str().as_bytes());
        data.extend_from_slice(&self.amount.to_le_bytes());
        data.extend_from_slice(&self.fee.to_le_bytes());
        data.extend_from_slice(&self.gas_price.to_le_bytes());
        push_bytes(&mut data, self.payload.as_bytes());
        TxHash::digest(&data)
    }
}

fn push_bytes(data: &mut Vec<u8>, bytes: &[u8]) {
    data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SpendTx {
        SpendTx::new(AccountId::from("ga"), AccountId::from("bob"), 50, 10, 1)
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sample().hash(), sample().hash());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = sample().hash();

        let mut tx = sample();
        tx.amount = 51;
        assert_ne!(tx.hash(), base);

        let mut tx = sample();
        tx.fee = 11;
        assert_ne!(tx.hash(), base);

        let mut tx = sample();
        tx.gas_price = 2;
        assert_ne!(tx.hash(), base);

        assert_ne!(sample().with_payload("memo").hash(), base);
    }

    #[test]
    fn test_length_prefix_prevents_field_shifting() {
        let a = SpendTx::new(AccountId::from("ab"), AccountId::from("c"), 1, 1, 1);
        let b = SpendTx::new(AccountId::from("a"), AccountId::from("bc"), 1, 1, 1);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_total_cost() {
        assert_eq!(sample().total_cost(), Some(60));
        let mut tx = sample();
        tx.amount = u64::MAX;
        assert_eq!(tx.total_cost(), None);
    }
}
