use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::cases::models::{AccountId, CaseId, CaseRef, CustomerId, SettlementCase};
use crate::error::AppResult;
use crate::settlement::models::{
    ChargeOutstanding, NewPayment, PaymentRecord, ReconciliationNotice, WalletDebit,
    WalletDebitRequest,
};

#[async_trait]
pub trait CaseDirectory: Send + Sync {
    async fn find_case(&self, case: CaseRef) -> AppResult<Option<SettlementCase>>;
}

/// Per-category outstanding for standard cases, already net of prior payments
#[async_trait]
pub trait OutstandingSource: Send + Sync {
    async fn charge_outstanding(&self, case_id: CaseId) -> AppResult<ChargeOutstanding>;
}

#[async_trait]
pub trait WalletService: Send + Sync {
    /// `None` when the customer has no wallet
    async fn balance(&self, customer_id: CustomerId) -> AppResult<Option<Decimal>>;

    async fn debit(&self, request: WalletDebitRequest) -> AppResult<WalletDebit>;
}

#[async_trait]
pub trait CasePaymentStore: Send + Sync {
    async fn record_payment(&self, payment: NewPayment) -> AppResult<PaymentRecord>;

    async fn record_family_payment(&self, payment: NewPayment) -> AppResult<PaymentRecord>;
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn account_name(&self, account_id: AccountId) -> AppResult<Option<String>>;
}

#[async_trait]
pub trait ReconciliationLog: Send + Sync {
    async fn flag(&self, notice: &ReconciliationNotice) -> AppResult<()>;
}
