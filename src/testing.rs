// In-memory collaborators for unit tests

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::cases::models::{AccountId, CaseId, CaseRef, CustomerId, SettlementCase};
use crate::error::{AppError, AppResult};
use crate::notifications::transports::{EmailTransport, MessageTemplate, MessageTransport};
use crate::settlement::models::{
    ChargeOutstanding, NewPayment, PaymentRecord, ReconciliationNotice, WalletDebit,
    WalletDebitRequest,
};
use crate::settlement::traits::{
    AccountDirectory, CaseDirectory, CasePaymentStore, OutstandingSource, ReconciliationLog,
    WalletService,
};

pub fn sample_case(case: CaseRef) -> SettlementCase {
    SettlementCase {
        case,
        reference: format!("RES-{}", case.id),
        passenger_name: "Amina Yusuf".to_string(),
        customer_id: Some(5),
        customer_email: Some("amina@example.com".to_string()),
        customer_phone: Some("+971501234567".to_string()),
        total_price: dec!(1000),
        amount_paid: Decimal::ZERO,
    }
}

pub fn sample_record(case: CaseRef, amount: Decimal, account_id: AccountId) -> PaymentRecord {
    PaymentRecord {
        id: 1,
        case,
        amount_paid: amount,
        account_id,
        remarks: String::new(),
        created_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct InMemoryCases {
    cases: RwLock<HashMap<CaseRef, SettlementCase>>,
}

impl InMemoryCases {
    pub async fn insert(&self, case: SettlementCase) {
        self.cases.write().await.insert(case.case, case);
    }
}

#[async_trait]
impl CaseDirectory for InMemoryCases {
    async fn find_case(&self, case: CaseRef) -> AppResult<Option<SettlementCase>> {
        Ok(self.cases.read().await.get(&case).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryOutstanding {
    charges: RwLock<HashMap<CaseId, ChargeOutstanding>>,
}

impl InMemoryOutstanding {
    pub async fn set(&self, case_id: CaseId, charges: ChargeOutstanding) {
        self.charges.write().await.insert(case_id, charges);
    }
}

#[async_trait]
impl OutstandingSource for InMemoryOutstanding {
    async fn charge_outstanding(&self, case_id: CaseId) -> AppResult<ChargeOutstanding> {
        Ok(self
            .charges
            .read()
            .await
            .get(&case_id)
            .copied()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryWallet {
    balances: RwLock<HashMap<CustomerId, Decimal>>,
    debits: RwLock<Vec<WalletDebitRequest>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryWallet {
    pub async fn set_balance(&self, customer_id: CustomerId, balance: Decimal) {
        self.balances.write().await.insert(customer_id, balance);
    }

    pub async fn balance_of(&self, customer_id: CustomerId) -> Option<Decimal> {
        self.balances.read().await.get(&customer_id).copied()
    }

    pub async fn fail_debits(&self, message: &str) {
        *self.failure.write().await = Some(message.to_string());
    }

    pub async fn debits(&self) -> Vec<WalletDebitRequest> {
        self.debits.read().await.clone()
    }
}

#[async_trait]
impl WalletService for InMemoryWallet {
    async fn balance(&self, customer_id: CustomerId) -> AppResult<Option<Decimal>> {
        Ok(self.balance_of(customer_id).await)
    }

    async fn debit(&self, request: WalletDebitRequest) -> AppResult<WalletDebit> {
        if let Some(message) = self.failure.read().await.clone() {
            return Err(AppError::ExternalError(message));
        }
        let mut balances = self.balances.write().await;
        let balance = balances
            .get_mut(&request.customer_id)
            .ok_or_else(|| AppError::NotFound(format!("wallet for customer {}", request.customer_id)))?;
        if *balance < request.amount {
            return Err(AppError::InvalidInput("insufficient wallet balance".into()));
        }
        *balance -= request.amount;

        let mut debits = self.debits.write().await;
        debits.push(request);
        Ok(WalletDebit {
            transaction_id: debits.len() as i64,
        })
    }
}

#[derive(Default)]
pub struct InMemoryPayments {
    standard: RwLock<Vec<PaymentRecord>>,
    family: RwLock<Vec<PaymentRecord>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryPayments {
    pub async fn fail_writes(&self, message: &str) {
        *self.failure.write().await = Some(message.to_string());
    }

    pub async fn standard_records(&self) -> Vec<PaymentRecord> {
        self.standard.read().await.clone()
    }

    pub async fn family_records(&self) -> Vec<PaymentRecord> {
        self.family.read().await.clone()
    }

    async fn write(&self, table: &RwLock<Vec<PaymentRecord>>, payment: NewPayment) -> AppResult<PaymentRecord> {
        if let Some(message) = self.failure.read().await.clone() {
            return Err(AppError::ExternalError(message));
        }
        let mut rows = table.write().await;
        let record = PaymentRecord {
            id: rows.len() as i64 + 1,
            case: payment.case,
            amount_paid: payment.amount,
            account_id: payment.account_id,
            remarks: payment.remarks,
            created_at: Utc::now(),
        };
        rows.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl CasePaymentStore for InMemoryPayments {
    async fn record_payment(&self, payment: NewPayment) -> AppResult<PaymentRecord> {
        self.write(&self.standard, payment).await
    }

    async fn record_family_payment(&self, payment: NewPayment) -> AppResult<PaymentRecord> {
        self.write(&self.family, payment).await
    }
}

#[derive(Default)]
pub struct InMemoryReconciliation {
    flags: RwLock<Vec<ReconciliationNotice>>,
}

impl InMemoryReconciliation {
    pub async fn flags(&self) -> Vec<ReconciliationNotice> {
        self.flags.read().await.clone()
    }
}

#[async_trait]
impl ReconciliationLog for InMemoryReconciliation {
    async fn flag(&self, notice: &ReconciliationNotice) -> AppResult<()> {
        self.flags.write().await.push(notice.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAccounts {
    names: RwLock<HashMap<AccountId, String>>,
}

impl InMemoryAccounts {
    pub async fn insert(&self, account_id: AccountId, name: &str) {
        self.names.write().await.insert(account_id, name.to_string());
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccounts {
    async fn account_name(&self, account_id: AccountId) -> AppResult<Option<String>> {
        Ok(self.names.read().await.get(&account_id).cloned())
    }
}

/// Account directory whose every lookup errors
pub struct UnreachableAccounts;

#[async_trait]
impl AccountDirectory for UnreachableAccounts {
    async fn account_name(&self, _account_id: AccountId) -> AppResult<Option<String>> {
        Err(AppError::Internal("accounts table unavailable".into()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behaviour {
    #[default]
    Succeed,
    Fail,
    Hang,
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingEmail {
    behaviour: Behaviour,
    failure: String,
    sent: RwLock<Vec<SentEmail>>,
}

impl RecordingEmail {
    pub fn failing(message: &str) -> Self {
        Self {
            behaviour: Behaviour::Fail,
            failure: message.to_string(),
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            behaviour: Behaviour::Hang,
            ..Default::default()
        }
    }

    pub async fn recipients(&self) -> Vec<String> {
        self.sent.read().await.iter().map(|e| e.to.clone()).collect()
    }

    pub async fn sent_to(&self, to: &str) -> Option<SentEmail> {
        self.sent.read().await.iter().find(|e| e.to == to).cloned()
    }
}

#[async_trait]
impl EmailTransport for RecordingEmail {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> AppResult<String> {
        match self.behaviour {
            Behaviour::Succeed => {
                let mut sent = self.sent.write().await;
                sent.push(SentEmail {
                    to: to.to_string(),
                    subject: subject.to_string(),
                    html: html_body.to_string(),
                });
                Ok(format!("email-{}", sent.len()))
            }
            Behaviour::Fail => Err(AppError::ExternalError(self.failure.clone())),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::Panic => panic!("email transport exploded"),
        }
    }
}

#[derive(Default)]
pub struct RecordingMessages {
    behaviour: Behaviour,
    sent: RwLock<Vec<(String, MessageTemplate)>>,
}

impl RecordingMessages {
    pub fn failing() -> Self {
        Self {
            behaviour: Behaviour::Fail,
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            behaviour: Behaviour::Hang,
            ..Default::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            behaviour: Behaviour::Panic,
            ..Default::default()
        }
    }

    pub async fn recipients(&self) -> Vec<String> {
        self.sent.read().await.iter().map(|(to, _)| to.clone()).collect()
    }
}

#[async_trait]
impl MessageTransport for RecordingMessages {
    async fn send_message(&self, to: &str, template: &MessageTemplate) -> AppResult<String> {
        match self.behaviour {
            Behaviour::Succeed => {
                let mut sent = self.sent.write().await;
                sent.push((to.to_string(), template.clone()));
                Ok(format!("msg-{}", sent.len()))
            }
            Behaviour::Fail => Err(AppError::ExternalError("messaging provider rejected".into())),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::Panic => panic!("message transport exploded"),
        }
    }
}
