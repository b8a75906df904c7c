use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cases::models::{AccountId, CaseRef, CustomerId};
use crate::error::{AppError, AppResult};

/// Unpaid remainder per charge category, as reported by the outstanding source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeOutstanding {
    pub residence: Decimal,
    pub fine: Decimal,
    pub cancellation: Decimal,
    pub custom_charges: Decimal,
}

/// Snapshot of what a case still owes. Rebuilt on every settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutstandingBreakdown {
    residence: Decimal,
    fine: Decimal,
    cancellation: Decimal,
    custom_charges: Decimal,
    total: Decimal,
}

impl OutstandingBreakdown {
    /// Negative categories are floored at zero so `total` always equals the
    /// sum of the categories and is never negative.
    pub fn new(residence: Decimal, fine: Decimal, cancellation: Decimal, custom_charges: Decimal) -> Self {
        let residence = residence.max(Decimal::ZERO);
        let fine = fine.max(Decimal::ZERO);
        let cancellation = cancellation.max(Decimal::ZERO);
        let custom_charges = custom_charges.max(Decimal::ZERO);
        Self {
            residence,
            fine,
            cancellation,
            custom_charges,
            total: residence + fine + cancellation + custom_charges,
        }
    }

    pub fn single_category(residence: Decimal) -> Self {
        Self::new(residence, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    pub fn residence(&self) -> Decimal {
        self.residence
    }

    pub fn fine(&self) -> Decimal {
        self.fine
    }

    pub fn cancellation(&self) -> Decimal {
        self.cancellation
    }

    pub fn custom_charges(&self) -> Decimal {
        self.custom_charges
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn can_settle(&self) -> bool {
        self.total > Decimal::ZERO
    }

    /// Full-payment amount to pre-fill in the settlement form
    pub fn suggested_amount(&self) -> Option<Decimal> {
        self.can_settle().then_some(self.total)
    }
}

/// Where the settlement money comes from. Identifiers may be absent on an
/// incoming request; validation rejects that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FundingSource {
    Ledger { account_id: Option<AccountId> },
    Wallet { customer_id: Option<CustomerId> },
}

impl FundingSource {
    pub fn label(&self) -> &'static str {
        match self {
            FundingSource::Ledger { .. } => "ledger",
            FundingSource::Wallet { .. } => "wallet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequest {
    pub case: CaseRef,
    pub amount: Decimal,
    pub funding: FundingSource,
    pub remarks: String,
}

/// Funding source after validation: the identifier is known to be present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Funding {
    Ledger { account_id: AccountId },
    Wallet { customer_id: CustomerId },
}

/// Durable result of a committed settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub case: CaseRef,
    pub amount_paid: Decimal,
    pub account_id: AccountId,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
}

/// Payment row to be written by the case payment store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub case: CaseRef,
    pub amount: Decimal,
    pub account_id: AccountId,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletDebitRequest {
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub reference_type: &'static str,
    pub reference_id: i64,
    pub remarks: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletDebit {
    pub transaction_id: i64,
}

/// The wallet was debited but no case payment exists for it. Needs a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationNotice {
    pub case: CaseRef,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub wallet_transaction_id: i64,
    pub reason: String,
    pub flagged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Committed(PaymentRecord),
    PendingReconciliation(ReconciliationNotice),
}

/// Reserved account identifiers that tag a payment rather than name a real
/// ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelAccounts {
    wallet: AccountId,
    no_notify: Option<AccountId>,
}

impl SentinelAccounts {
    pub fn new(wallet: AccountId, no_notify: Option<AccountId>) -> AppResult<Self> {
        if no_notify == Some(wallet) {
            return Err(AppError::Config(format!(
                "wallet sentinel account {} collides with the no-notify account",
                wallet
            )));
        }
        Ok(Self { wallet, no_notify })
    }

    pub fn wallet(&self) -> AccountId {
        self.wallet
    }

    pub fn no_notify(&self) -> Option<AccountId> {
        self.no_notify
    }

    pub fn is_wallet(&self, account_id: AccountId) -> bool {
        account_id == self.wallet
    }

    pub fn suppresses_customer(&self, account_id: AccountId) -> bool {
        self.no_notify == Some(account_id)
    }
}

/// Lifecycle of one settlement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    Idle,
    BreakdownLoaded,
    Validating,
    Rejected,
    Executing,
    Committed,
    Dispatching,
    Failed,
    PendingReconciliation,
}

impl SettlementState {
    pub fn can_transition_to(&self, next: SettlementState) -> bool {
        use SettlementState::*;
        matches!(
            (self, next),
            (Idle, BreakdownLoaded)
                | (BreakdownLoaded, Validating)
                | (Validating, Rejected)
                | (Validating, Executing)
                | (Executing, Committed)
                | (Executing, Failed)
                | (Executing, PendingReconciliation)
                | (Committed, Dispatching)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettlementState::Rejected
                | SettlementState::Failed
                | SettlementState::PendingReconciliation
                | SettlementState::Committed
                | SettlementState::Dispatching
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_is_sum_of_categories() {
        let b = OutstandingBreakdown::new(dec!(500), dec!(100), dec!(0), dec!(25.50));
        assert_eq!(b.total(), b.residence() + b.fine() + b.cancellation() + b.custom_charges());
        assert_eq!(b.total(), dec!(625.50));
    }

    #[test]
    fn test_negative_categories_floor_at_zero() {
        let b = OutstandingBreakdown::new(dec!(-50), dec!(30), dec!(0), dec!(0));
        assert_eq!(b.residence(), Decimal::ZERO);
        assert_eq!(b.total(), dec!(30));
    }

    #[test]
    fn test_suggested_amount_only_when_owing() {
        assert_eq!(OutstandingBreakdown::single_category(dec!(0)).suggested_amount(), None);
        assert_eq!(
            OutstandingBreakdown::single_category(dec!(12.5)).suggested_amount(),
            Some(dec!(12.5))
        );
    }

    #[test]
    fn test_sentinels_must_not_collide() {
        assert!(SentinelAccounts::new(0, Some(0)).is_err());
        let s = SentinelAccounts::new(0, Some(31)).unwrap();
        assert!(s.is_wallet(0));
        assert!(s.suppresses_customer(31));
        assert!(!s.suppresses_customer(0));
    }

    #[test]
    fn test_no_suppression_without_configured_account() {
        let s = SentinelAccounts::new(0, None).unwrap();
        assert!(!s.suppresses_customer(31));
    }

    #[test]
    fn test_state_transitions() {
        use SettlementState::*;
        assert!(Idle.can_transition_to(BreakdownLoaded));
        assert!(Validating.can_transition_to(Rejected));
        assert!(Executing.can_transition_to(PendingReconciliation));
        assert!(Committed.can_transition_to(Dispatching));
        assert!(!Rejected.can_transition_to(Executing));
        assert!(!Idle.can_transition_to(Executing));
        assert!(!Failed.can_transition_to(Committed));
        assert!(Rejected.is_terminal());
        assert!(!Validating.is_terminal());
    }

    #[test]
    fn test_funding_source_json_shape() {
        let src: FundingSource =
            serde_json::from_str(r#"{"type":"ledger","account_id":7}"#).unwrap();
        assert_eq!(src, FundingSource::Ledger { account_id: Some(7) });
        assert_eq!(src.label(), "ledger");
    }
}
