//! Host runtime around generalized accounts
//!
//! - `chain` - block height source consumed by the multisig core
//! - `transaction` - spend transactions and their canonical hash
//! - `ledger` - balances plus the authorize-then-execute flow

pub mod chain;
pub mod ledger;
pub mod transaction;

pub use chain::{BlockHeight, ChainContext};
pub use ledger::{Ledger, LedgerError, TxReceipt};
pub use transaction::SpendTx;
