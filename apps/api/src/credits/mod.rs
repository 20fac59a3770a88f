//! Credit Ledger: per-user, per-kind consumable balances gating job admission.
//!
//! Pro accounts are unlimited and never mutated. Everyone else spends exactly
//! one credit per admitted job; a zero balance refuses admission. Consumed
//! credits are not refunded when a job later fails.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::credit::{CreditAccount, CreditBalance};
use crate::models::job::JobKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Unlimited,
    Consumed { remaining: i32 },
}

impl ConsumeOutcome {
    /// Balance left after consumption; `None` for unlimited accounts.
    pub fn remaining(&self) -> Option<i32> {
        match self {
            ConsumeOutcome::Unlimited => None,
            ConsumeOutcome::Consumed { remaining } => Some(*remaining),
        }
    }
}

#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Returns the user's ledger row, creating it with default balances on first access.
    async fn account(&self, user_id: &str) -> Result<CreditAccount, AppError>;

    async fn balance(&self, user_id: &str, kind: JobKind) -> Result<CreditBalance, AppError> {
        let account = self.account(user_id).await?;
        Ok(CreditBalance {
            remaining: account.remaining(kind),
            unlimited: account.is_pro,
        })
    }

    /// Spends one credit of `kind`, or fails with `InsufficientCredit`.
    async fn try_consume(&self, user_id: &str, kind: JobKind) -> Result<ConsumeOutcome, AppError>;
}

/// Applies one consumption to a loaded account.
pub fn consume(account: &mut CreditAccount, kind: JobKind) -> Result<ConsumeOutcome, AppError> {
    if account.is_pro {
        return Ok(ConsumeOutcome::Unlimited);
    }
    let counter = account.counter_mut(kind);
    if *counter <= 0 {
        return Err(AppError::InsufficientCredit(kind));
    }
    *counter -= 1;
    let remaining = *counter;
    account.updated_at = chrono::Utc::now();
    Ok(ConsumeOutcome::Consumed { remaining })
}
