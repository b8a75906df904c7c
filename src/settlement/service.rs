use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cases::models::{CaseRef, CustomerId, SettlementCase};
use crate::error::{AppError, AppResult};
use crate::notifications::dispatcher::{DispatchReport, NotificationDispatcher, NotificationPolicy};
use crate::notifications::templates::FundingDescription;
use crate::settlement::executor::PaymentExecutor;
use crate::settlement::models::{
    ExecutionOutcome, Funding, FundingSource, OutstandingBreakdown, PaymentRecord, ReconciliationNotice,
    SettlementRequest, SettlementState,
};
use crate::settlement::outstanding::OutstandingAggregator;
use crate::settlement::traits::{AccountDirectory, CaseDirectory, WalletService};
use crate::settlement::validator::SettlementValidator;

/// What the caller sees once the attempt is over. Notification outcomes are
/// never part of this.
#[derive(Debug)]
pub enum SettlementOutcome {
    Committed {
        record: PaymentRecord,
        /// Detached dispatch task; dropping it does not cancel delivery
        notifications: JoinHandle<DispatchReport>,
    },
    PendingReconciliation(ReconciliationNotice),
}

/// Outstanding snapshot plus the wallet balance available to the case's customer
#[derive(Debug, Clone)]
pub struct SettlementQuote {
    pub case: SettlementCase,
    pub breakdown: OutstandingBreakdown,
    pub wallet_balance: Decimal,
}

/// Tracks one attempt through its lifecycle
#[derive(Debug)]
struct Attempt {
    case: CaseRef,
    state: SettlementState,
}

impl Attempt {
    fn new(case: CaseRef) -> Self {
        Self {
            case,
            state: SettlementState::Idle,
        }
    }

    fn advance(&mut self, next: SettlementState) -> AppResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "illegal settlement transition {:?} -> {:?} for {}",
                self.state, next, self.case
            )));
        }
        debug!(
            case = %self.case,
            from = ?self.state,
            to = ?next,
            terminal = next.is_terminal(),
            "Settlement state change"
        );
        self.state = next;
        Ok(())
    }
}

pub struct SettlementService {
    cases: Arc<dyn CaseDirectory>,
    wallet: Arc<dyn WalletService>,
    accounts: Arc<dyn AccountDirectory>,
    aggregator: OutstandingAggregator,
    validator: SettlementValidator,
    executor: PaymentExecutor,
    policy: NotificationPolicy,
    dispatcher: NotificationDispatcher,
}

impl SettlementService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cases: Arc<dyn CaseDirectory>,
        wallet: Arc<dyn WalletService>,
        accounts: Arc<dyn AccountDirectory>,
        aggregator: OutstandingAggregator,
        validator: SettlementValidator,
        executor: PaymentExecutor,
        policy: NotificationPolicy,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            cases,
            wallet,
            accounts,
            aggregator,
            validator,
            executor,
            policy,
            dispatcher,
        }
    }

    async fn load_case(&self, case: CaseRef) -> AppResult<SettlementCase> {
        self.cases
            .find_case(case)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("case {}", case)))
    }

    /// Wallet balance, zero when the customer has no wallet
    pub async fn wallet_balance(&self, customer_id: CustomerId) -> AppResult<Decimal> {
        Ok(self.wallet.balance(customer_id).await?.unwrap_or(Decimal::ZERO))
    }

    pub async fn quote(&self, case: CaseRef) -> AppResult<SettlementQuote> {
        let case = self.load_case(case).await?;
        let breakdown = self.aggregator.breakdown(&case).await?;
        let wallet_balance = match case.customer_id {
            Some(customer_id) => self.wallet_balance(customer_id).await?,
            None => Decimal::ZERO,
        };
        Ok(SettlementQuote {
            case,
            breakdown,
            wallet_balance,
        })
    }

    /// Wallet funding always draws on the case's own customer, whatever
    /// customer the request carries.
    pub async fn settle(&self, mut request: SettlementRequest) -> AppResult<SettlementOutcome> {
        let mut attempt = Attempt::new(request.case);

        let case = self.load_case(request.case).await?;
        if let FundingSource::Wallet { customer_id } = &mut request.funding {
            *customer_id = case.customer_id;
        }
        let breakdown = self.aggregator.breakdown(&case).await?;
        attempt.advance(SettlementState::BreakdownLoaded)?;

        attempt.advance(SettlementState::Validating)?;
        let wallet_balance = match request.funding {
            FundingSource::Wallet {
                customer_id: Some(customer_id),
            } => self.wallet.balance(customer_id).await?,
            _ => None,
        };

        let settlement = match self.validator.validate(request, &breakdown, wallet_balance) {
            Ok(settlement) => settlement,
            Err(rejection) => {
                attempt.advance(SettlementState::Rejected)?;
                info!(case = %case.case, reason = %rejection, "Settlement rejected");
                return Err(rejection.into());
            }
        };

        attempt.advance(SettlementState::Executing)?;
        let outcome = match self.executor.execute(&settlement).await {
            Ok(outcome) => outcome,
            Err(e) => {
                attempt.advance(SettlementState::Failed)?;
                warn!(case = %case.case, "Settlement failed: {}", e);
                return Err(e);
            }
        };

        match outcome {
            ExecutionOutcome::Committed(record) => {
                attempt.advance(SettlementState::Committed)?;
                info!(
                    case = %case.case,
                    payment_id = record.id,
                    amount = %record.amount_paid,
                    funding = settlement.request().funding.label(),
                    "✅ Settlement committed"
                );

                let description = self.describe_funding(settlement.funding()).await;
                let job = self
                    .policy
                    .build_job(&case, &record, settlement.funding(), &description);
                let notifications = self.dispatcher.dispatch(job);
                attempt.advance(SettlementState::Dispatching)?;

                Ok(SettlementOutcome::Committed {
                    record,
                    notifications,
                })
            }
            ExecutionOutcome::PendingReconciliation(notice) => {
                attempt.advance(SettlementState::PendingReconciliation)?;
                Ok(SettlementOutcome::PendingReconciliation(notice))
            }
        }
    }

    /// Account lookups only decorate notifications; a failure here is logged
    /// and the name left out.
    async fn describe_funding(&self, funding: Funding) -> FundingDescription {
        match funding {
            Funding::Wallet { .. } => FundingDescription::wallet(),
            Funding::Ledger { account_id } => {
                let name = match self.accounts.account_name(account_id).await {
                    Ok(name) => name,
                    Err(e) => {
                        warn!(account_id, "Could not resolve account name: {}", e);
                        None
                    }
                };
                FundingDescription::ledger(account_id, name)
            }
        }
    }
}
