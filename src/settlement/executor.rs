use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use crate::cases::models::{CaseKind, CustomerId};
use crate::error::{AppError, AppResult, ExecutionError};
use crate::settlement::models::{
    ExecutionOutcome, Funding, NewPayment, PaymentRecord, ReconciliationNotice, SentinelAccounts,
    WalletDebitRequest,
};
use crate::settlement::traits::{CasePaymentStore, ReconciliationLog, WalletService};
use crate::settlement::validator::ValidatedSettlement;

const WALLET_REMARKS_PREFIX: &str = "[Wallet]";
const GENERIC_DEBIT_FAILURE: &str = "wallet debit was not accepted";
const GENERIC_WRITE_FAILURE: &str = "payment store rejected the write";

/// Commits validated settlements against a case
pub struct PaymentExecutor {
    wallet: Arc<dyn WalletService>,
    payments: Arc<dyn CasePaymentStore>,
    reconciliation: Arc<dyn ReconciliationLog>,
    sentinels: SentinelAccounts,
}

impl PaymentExecutor {
    pub fn new(
        wallet: Arc<dyn WalletService>,
        payments: Arc<dyn CasePaymentStore>,
        reconciliation: Arc<dyn ReconciliationLog>,
        sentinels: SentinelAccounts,
    ) -> Self {
        Self {
            wallet,
            payments,
            reconciliation,
            sentinels,
        }
    }

    pub async fn execute(&self, settlement: &ValidatedSettlement) -> AppResult<ExecutionOutcome> {
        match settlement.funding() {
            Funding::Ledger { account_id } => {
                let request = settlement.request();
                let payment = NewPayment {
                    case: request.case,
                    amount: request.amount,
                    account_id,
                    remarks: request.remarks.clone(),
                };
                let record = self
                    .write_payment(payment)
                    .await
                    .map_err(|e| ExecutionError::PaymentWriteFailed(collaborator_message(e, GENERIC_WRITE_FAILURE)))?;

                info!(
                    case = %record.case,
                    amount = %record.amount_paid,
                    account_id,
                    "💳 Ledger payment recorded"
                );
                Ok(ExecutionOutcome::Committed(record))
            }
            Funding::Wallet { customer_id } => self.execute_wallet(settlement, customer_id).await,
        }
    }

    /// Debit first, then record. The two writes are not atomic: a record
    /// failure after a debit becomes a reconciliation notice.
    async fn execute_wallet(
        &self,
        settlement: &ValidatedSettlement,
        customer_id: CustomerId,
    ) -> AppResult<ExecutionOutcome> {
        let request = settlement.request();
        let remarks = wallet_remarks(&request.remarks);

        let debit = self
            .wallet
            .debit(WalletDebitRequest {
                customer_id,
                amount: request.amount,
                reference_type: request.case.kind.wallet_reference_type(),
                reference_id: request.case.id,
                remarks: remarks.clone(),
            })
            .await
            .map_err(|e| ExecutionError::WalletDebitFailed(collaborator_message(e, GENERIC_DEBIT_FAILURE)))?;

        info!(
            case = %request.case,
            customer_id,
            amount = %request.amount,
            wallet_transaction_id = debit.transaction_id,
            "👛 Wallet debited"
        );

        let payment = NewPayment {
            case: request.case,
            amount: request.amount,
            account_id: self.sentinels.wallet(),
            remarks,
        };

        match self.write_payment(payment).await {
            Ok(record) => {
                info!(case = %record.case, amount = %record.amount_paid, "💳 Wallet payment recorded");
                Ok(ExecutionOutcome::Committed(record))
            }
            Err(e) => {
                let notice = ReconciliationNotice {
                    case: request.case,
                    customer_id,
                    amount: request.amount,
                    wallet_transaction_id: debit.transaction_id,
                    reason: collaborator_message(e, GENERIC_WRITE_FAILURE),
                    flagged_at: Utc::now(),
                };
                error!(
                    case = %notice.case,
                    customer_id,
                    amount = %notice.amount,
                    wallet_transaction_id = notice.wallet_transaction_id,
                    reason = %notice.reason,
                    "🚨 Wallet debited but payment record failed; reconciliation required"
                );
                if let Err(flag_err) = self.reconciliation.flag(&notice).await {
                    error!(case = %notice.case, "Failed to persist reconciliation flag: {}", flag_err);
                }
                Ok(ExecutionOutcome::PendingReconciliation(notice))
            }
        }
    }

    async fn write_payment(&self, payment: NewPayment) -> AppResult<PaymentRecord> {
        match payment.case.kind {
            CaseKind::Standard => self.payments.record_payment(payment).await,
            CaseKind::Family => self.payments.record_family_payment(payment).await,
        }
    }
}

fn wallet_remarks(remarks: &str) -> String {
    let remarks = remarks.trim();
    if remarks.is_empty() {
        format!("{} Paid from customer wallet", WALLET_REMARKS_PREFIX)
    } else {
        format!("{} {}", WALLET_REMARKS_PREFIX, remarks)
    }
}

/// The collaborator's own message when it has one, otherwise `fallback`
fn collaborator_message(error: AppError, fallback: &str) -> String {
    let message = match error {
        AppError::ExternalError(msg)
        | AppError::Internal(msg)
        | AppError::InvalidInput(msg)
        | AppError::NotFound(msg) => msg,
        AppError::Database(e) => e.to_string(),
        other => other.to_string(),
    };
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
