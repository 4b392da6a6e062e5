//! In-memory host ledger
//!
//! Stands in for the account runtime: it tracks balances and block height,
//! attaches generalized accounts and, for every outgoing spend, consults the
//! account's authorization gate before moving any funds.

use crate::crypto::{AccountId, TxHash};
use crate::multisig::{
    AuthRequest, Authorization, FeeCeilings, GeneralizedAccount, MultisigError,
};
use crate::runtime::chain::{BlockHeight, ChainContext};
use crate::runtime::transaction::SpendTx;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Ledger-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account {0} is already a generalized account")]
    AlreadyGeneralized(AccountId),
    #[error("Account {0} is not a generalized account")]
    NotGeneralized(AccountId),
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Balance overflow for {0}")]
    BalanceOverflow(AccountId),
    #[error("Multisig error: {0}")]
    Multisig(#[from] MultisigError),
}

/// Record of an executed spend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub sender: AccountId,
    pub recipient: AccountId,
    pub amount: u64,
    pub fee: u64,
    pub nonce: u64,
    pub height: u64,
}

/// Balances, height and attached accounts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    height: u64,
    balances: BTreeMap<AccountId, u64>,
    accounts: BTreeMap<AccountId, GeneralizedAccount>,
    #[serde(default)]
    receipts: Vec<TxReceipt>,
}

impl ChainContext for Ledger {
    fn current_height(&self) -> u64 {
        self.height
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Mine `blocks` empty blocks
    pub fn advance_height(&mut self, blocks: u64) -> u64 {
        self.height = self.height.saturating_add(blocks);
        self.height
    }

    pub fn balance(&self, id: &AccountId) -> u64 {
        self.balances.get(id).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, id: &AccountId, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let balance = self
            .balance(id)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(id.clone()))?;
        self.balances.insert(id.clone(), balance);
        Ok(balance)
    }

    /// Convert `id` into a generalized account
    pub fn attach_generalized_account(
        &mut self,
        id: AccountId,
        signers: Vec<AccountId>,
        confirmations_required: usize,
        ceilings: FeeCeilings,
    ) -> Result<&GeneralizedAccount, LedgerError> {
        if self.accounts.contains_key(&id) {
            return Err(LedgerError::AlreadyGeneralized(id));
        }
        let account =
            GeneralizedAccount::attach(id.clone(), signers, confirmations_required, ceilings)?;
        Ok(self.accounts.entry(id).or_insert(account))
    }

    pub fn is_generalized(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    pub fn account(&self, id: &AccountId) -> Option<&GeneralizedAccount> {
        self.accounts.get(id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &GeneralizedAccount> {
        self.accounts.values()
    }

    pub fn receipts(&self) -> &[TxReceipt] {
        &self.receipts
    }

    /// Run a multisig operation against `id` at the current height
    pub fn with_account<T>(
        &mut self,
        id: &AccountId,
        op: impl FnOnce(&mut GeneralizedAccount, &BlockHeight) -> Result<T, MultisigError>,
    ) -> Result<T, LedgerError> {
        let chain = BlockHeight(self.height);
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotGeneralized(id.clone()))?;
        Ok(op(account, &chain)?)
    }

    /// Authorize and execute a spend from a generalized account
    ///
    /// Funds and the recipient's headroom are checked before the gate is
    /// consulted, so a spend that could not be applied never consumes the
    /// proposal or the nonce.
    pub fn submit(&mut self, tx: &SpendTx, nonce: u64) -> Result<TxReceipt, LedgerError> {
        if tx.amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let have = self.balance(&tx.sender);
        let need = tx.total_cost().ok_or(LedgerError::InsufficientBalance {
            have,
            need: u64::MAX,
        })?;
        if have < need {
            return Err(LedgerError::InsufficientBalance { have, need });
        }
        let sender_after = have - need;
        let recipient_before = if tx.recipient == tx.sender {
            sender_after
        } else {
            self.balance(&tx.recipient)
        };
        let recipient_after = recipient_before
            .checked_add(tx.amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(tx.recipient.clone()))?;

        let request = AuthRequest {
            tx_hash: tx.hash(),
            fee: tx.fee,
            gas_price: tx.gas_price,
            nonce,
        };
        let auth: Authorization = self.with_account(&tx.sender, |account, chain| {
            account.authorize(&request, chain)
        })?;

        self.balances.insert(tx.sender.clone(), sender_after);
        self.balances.insert(tx.recipient.clone(), recipient_after);

        let receipt = TxReceipt {
            tx_hash: auth.tx_hash,
            sender: tx.sender.clone(),
            recipient: tx.recipient.clone(),
            amount: tx.amount,
            fee: tx.fee,
            nonce: auth.nonce,
            height: self.height,
        };
        log::info!(
            "Executed spend {}: {} -> {} ({} coins, fee {})",
            receipt.tx_hash.short(),
            receipt.sender,
            receipt.recipient,
            receipt.amount,
            receipt.fee
        );
        self.receipts.push(receipt.clone());
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Caller, KeyPair};
    use crate::multisig::Ttl;

    struct World {
        ledger: Ledger,
        ga: AccountId,
        s1: Caller,
        s2: Caller,
        s3: Caller,
        bob: AccountId,
    }

    fn world() -> World {
        let ga = KeyPair::generate().address();
        let signers: Vec<AccountId> = (0..3).map(|_| KeyPair::generate().address()).collect();
        let bob = KeyPair::generate().address();

        let mut ledger = Ledger::new();
        ledger.credit(&ga, 1_000_000).unwrap();
        ledger
            .attach_generalized_account(ga.clone(), signers.clone(), 2, FeeCeilings::default())
            .unwrap();

        World {
            ledger,
            ga,
            s1: Caller::verified(signers[0].clone()),
            s2: Caller::verified(signers[1].clone()),
            s3: Caller::verified(signers[2].clone()),
            bob,
        }
    }

    fn spend(w: &World, amount: u64) -> SpendTx {
        SpendTx::new(w.ga.clone(), w.bob.clone(), amount, 1_000, 1_000_000_000)
    }

    fn propose_and_confirm(w: &mut World, tx: &SpendTx) {
        let hash = tx.hash();
        let (s1, s2) = (w.s1.clone(), w.s2.clone());
        w.ledger
            .with_account(&w.ga, |a, c| a.propose(&s1, hash, Ttl::Relative(10), c))
            .unwrap();
        w.ledger
            .with_account(&w.ga, |a, c| a.confirm(&s2, &hash, c))
            .unwrap();
    }

    #[test]
    fn test_attach_twice_fails() {
        let mut w = world();
        let signers: Vec<AccountId> = (0..3).map(|_| KeyPair::generate().address()).collect();
        let result = w.ledger.attach_generalized_account(
            w.ga.clone(),
            signers,
            2,
            FeeCeilings::default(),
        );
        assert_eq!(
            result.err(),
            Some(LedgerError::AlreadyGeneralized(w.ga.clone()))
        );
    }

    #[test]
    fn test_attach_setup_errors_propagate() {
        let mut ledger = Ledger::new();
        let ga = KeyPair::generate().address();
        let result = ledger.attach_generalized_account(
            ga.clone(),
            vec![KeyPair::generate().address()],
            2,
            FeeCeilings::default(),
        );
        assert_eq!(
            result.err(),
            Some(LedgerError::Multisig(MultisigError::TooFewSigners(1)))
        );
        assert!(!ledger.is_generalized(&ga));
    }

    #[test]
    fn test_round_trip_spend() {
        let mut w = world();
        let tx = spend(&w, 50_000);
        propose_and_confirm(&mut w, &tx);

        let receipt = w.ledger.submit(&tx, 0).unwrap();
        assert_eq!(receipt.nonce, 0);
        assert_eq!(w.ledger.balance(&w.bob), 50_000);
        assert_eq!(w.ledger.balance(&w.ga), 1_000_000 - 50_000 - 1_000);

        let account = w.ledger.account(&w.ga).unwrap();
        assert_eq!(account.nonce(), 1);
        assert_eq!(account.consensus_info(&w.ledger).tx_hash, None);
        assert_eq!(w.ledger.receipts().len(), 1);
    }

    #[test]
    fn test_replay_is_rejected() {
        let mut w = world();
        let tx = spend(&w, 10_000);
        propose_and_confirm(&mut w, &tx);
        w.ledger.submit(&tx, 0).unwrap();

        // Same transaction again, with a fresh quorum but the stale nonce
        propose_and_confirm(&mut w, &tx);
        assert_eq!(
            w.ledger.submit(&tx, 0),
            Err(LedgerError::Multisig(MultisigError::InvalidNonce {
                expected: 1,
                got: 0
            }))
        );
        assert_eq!(w.ledger.balance(&w.bob), 10_000);

        w.ledger.submit(&tx, 1).unwrap();
        assert_eq!(w.ledger.balance(&w.bob), 20_000);
    }

    #[test]
    fn test_gate_rejection_moves_no_funds() {
        let mut w = world();
        let tx = spend(&w, 10_000);
        let hash = tx.hash();
        let s1 = w.s1.clone();
        w.ledger
            .with_account(&w.ga, |a, c| a.propose(&s1, hash, Ttl::Relative(10), c))
            .unwrap();

        assert!(matches!(
            w.ledger.submit(&tx, 0),
            Err(LedgerError::Multisig(MultisigError::NoConsensus { .. }))
        ));
        assert_eq!(w.ledger.balance(&w.bob), 0);
        assert_eq!(w.ledger.balance(&w.ga), 1_000_000);

        // A different transaction than the one agreed on
        let s2 = w.s2.clone();
        w.ledger
            .with_account(&w.ga, |a, c| a.confirm(&s2, &hash, c))
            .unwrap();
        let other = spend(&w, 20_000);
        assert_eq!(
            w.ledger.submit(&other, 0),
            Err(LedgerError::Multisig(MultisigError::UnequalHashes))
        );
        assert_eq!(w.ledger.balance(&w.bob), 0);
    }

    #[test]
    fn test_insufficient_balance_keeps_proposal() {
        let mut w = world();
        let tx = spend(&w, 5_000_000);
        propose_and_confirm(&mut w, &tx);

        assert!(matches!(
            w.ledger.submit(&tx, 0),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        let account = w.ledger.account(&w.ga).unwrap();
        assert!(account.has_consensus(&w.ledger));
        assert_eq!(account.nonce(), 0);
    }

    #[test]
    fn test_expiry_follows_ledger_height() {
        let mut w = world();
        let tx = spend(&w, 10_000);
        propose_and_confirm(&mut w, &tx);

        w.ledger.advance_height(10);
        assert!(matches!(
            w.ledger.submit(&tx, 0),
            Err(LedgerError::Multisig(MultisigError::ProposalExpired { .. }))
        ));

        // A fresh proposal may now overwrite the expired one
        let s3 = w.s3.clone();
        let hash = tx.hash();
        w.ledger
            .with_account(&w.ga, |a, c| a.propose(&s3, hash, Ttl::Relative(5), c))
            .unwrap();
    }

    #[test]
    fn test_fee_ceiling_blocks_spend() {
        let mut w = world();
        let mut tx = spend(&w, 10_000);
        tx.gas_price = FeeCeilings::default().max_gasprice + 1;
        propose_and_confirm(&mut w, &tx);

        assert!(matches!(
            w.ledger.submit(&tx, 0),
            Err(LedgerError::Multisig(MultisigError::GasExceedsCeiling { .. }))
        ));

        let s1 = w.s1.clone();
        w.ledger
            .with_account(&w.ga, |a, c| a.disable_fee_protection(&s1, c))
            .unwrap();
        w.ledger.submit(&tx, 0).unwrap();
        assert_eq!(w.ledger.balance(&w.bob), 10_000);
    }

    #[test]
    fn test_operations_on_plain_account() {
        let mut w = world();
        let bob = w.bob.clone();
        let result = w.ledger.with_account(&bob, |a, _| Ok(a.nonce()));
        assert_eq!(result, Err(LedgerError::NotGeneralized(bob)));
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let mut w = world();
        w.ledger.credit(&w.bob, u64::MAX).unwrap();
        assert_eq!(
            w.ledger.credit(&w.bob, 1),
            Err(LedgerError::BalanceOverflow(w.bob.clone()))
        );
        assert_eq!(w.ledger.balance(&w.bob), u64::MAX);
    }

    #[test]
    fn test_recipient_overflow_moves_no_funds() {
        let mut w = world();
        w.ledger.credit(&w.bob, u64::MAX - 5).unwrap();
        let tx = spend(&w, 10);
        propose_and_confirm(&mut w, &tx);

        assert_eq!(
            w.ledger.submit(&tx, 0),
            Err(LedgerError::BalanceOverflow(w.bob.clone()))
        );
        assert_eq!(w.ledger.balance(&w.ga), 1_000_000);
        assert_eq!(w.ledger.balance(&w.bob), u64::MAX - 5);

        let account = w.ledger.account(&w.ga).unwrap();
        assert!(account.has_consensus(&w.ledger));
        assert_eq!(account.nonce(), 0);
    }
}
