use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::cases::models::{AccountId, CaseId, CaseKind, CaseRef, CustomerId};
use crate::settlement::models::{
    FundingSource, PaymentRecord, ReconciliationNotice, SettlementRequest,
};
use crate::settlement::service::SettlementQuote;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FundingChoice {
    Ledger,
    Wallet,
}

/// POST /cases/:kind/:case_id/settlements
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SettleCaseRequest {
    pub amount: Decimal,
    pub funding_source: FundingChoice,
    pub account_id: Option<AccountId>,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

impl SettleCaseRequest {
    /// The wallet customer is filled in from the case when the settlement runs
    pub fn into_request(self, case: CaseRef) -> SettlementRequest {
        let funding = match self.funding_source {
            FundingChoice::Ledger => FundingSource::Ledger {
                account_id: self.account_id,
            },
            FundingChoice::Wallet => FundingSource::Wallet { customer_id: None },
        };
        SettlementRequest {
            case,
            amount: self.amount,
            funding,
            remarks: self.remarks.unwrap_or_default().trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BreakdownResponse {
    pub residence: String,
    pub fine: String,
    pub cancellation: String,
    pub custom_charges: String,
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct OutstandingResponse {
    pub case_id: CaseId,
    pub case_kind: CaseKind,
    pub reference: String,
    pub passenger_name: String,
    pub outstanding: BreakdownResponse,
    pub suggested_amount: Option<String>,
    pub can_settle: bool,
    pub customer_id: Option<CustomerId>,
    pub wallet_balance: String,
}

impl From<SettlementQuote> for OutstandingResponse {
    fn from(quote: SettlementQuote) -> Self {
        let b = quote.breakdown;
        Self {
            case_id: quote.case.case.id,
            case_kind: quote.case.case.kind,
            reference: quote.case.reference,
            passenger_name: quote.case.passenger_name,
            outstanding: BreakdownResponse {
                residence: b.residence().to_string(),
                fine: b.fine().to_string(),
                cancellation: b.cancellation().to_string(),
                custom_charges: b.custom_charges().to_string(),
                total: b.total().to_string(),
            },
            suggested_amount: b.suggested_amount().map(|a| a.to_string()),
            can_settle: b.can_settle(),
            customer_id: quote.case.customer_id,
            wallet_balance: quote.wallet_balance.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletBalanceResponse {
    pub customer_id: CustomerId,
    pub balance: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentRecordResponse {
    pub id: i64,
    pub case_id: CaseId,
    pub case_kind: CaseKind,
    pub amount_paid: String,
    pub account_id: AccountId,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentRecordResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            id: record.id,
            case_id: record.case.id,
            case_kind: record.case.kind,
            amount_paid: record.amount_paid.to_string(),
            account_id: record.account_id,
            remarks: record.remarks,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettlementResponse {
    Committed { payment: PaymentRecordResponse },
    PendingReconciliation { notice: ReconciliationResponse, message: String },
}

#[derive(Debug, Serialize)]
pub struct ReconciliationResponse {
    pub case_id: CaseId,
    pub case_kind: CaseKind,
    pub customer_id: CustomerId,
    pub amount: String,
    pub wallet_transaction_id: i64,
    pub reason: String,
    pub flagged_at: DateTime<Utc>,
}

impl From<ReconciliationNotice> for ReconciliationResponse {
    fn from(notice: ReconciliationNotice) -> Self {
        Self {
            case_id: notice.case.id,
            case_kind: notice.case.kind,
            customer_id: notice.customer_id,
            amount: notice.amount.to_string(),
            wallet_transaction_id: notice.wallet_transaction_id,
            reason: notice.reason,
            flagged_at: notice.flagged_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}
