// Post-settlement notification fan-out
//
// Runs after the payment is committed and the caller already has its answer.
// Each channel is its own task with its own timeout; nothing here can fail
// the settlement.

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cases::models::{CaseRef, SettlementCase};
use crate::error::{AppResult, NotificationError};
use crate::notifications::templates::{self, FundingDescription, RenderedEmail};
use crate::notifications::transports::{EmailTransport, MessageTemplate, MessageTransport};
use crate::settlement::models::{Funding, PaymentRecord, SentinelAccounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Admin,
    CustomerEmail,
    CustomerMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Suppressed,
    NoRecipient,
    TransportNotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Sent { message_id: String },
    Skipped(SkipReason),
    Failed(NotificationError),
}

impl ChannelOutcome {
    pub fn was_attempted(&self) -> bool {
        !matches!(self, ChannelOutcome::Skipped(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub admin: ChannelOutcome,
    pub customer_email: ChannelOutcome,
    pub customer_message: ChannelOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDelivery {
    pub to: String,
    pub email: RenderedEmail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDelivery {
    pub to: String,
    pub template: MessageTemplate,
}

/// Rendered content for one committed payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub case: CaseRef,
    pub payment_id: i64,
    pub admin: Option<EmailDelivery>,
    pub customer_email: Option<EmailDelivery>,
    pub customer_message: Option<MessageDelivery>,
    pub suppress_customer_channels: bool,
}

/// Decides who hears about a payment
#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    sentinels: SentinelAccounts,
    admin_recipient: Option<String>,
}

impl NotificationPolicy {
    pub fn new(sentinels: SentinelAccounts, admin_recipient: Option<String>) -> Self {
        Self {
            sentinels,
            admin_recipient,
        }
    }

    /// Only ledger payments booked to the no-notify account are kept from the customer
    pub fn suppresses_customer(&self, funding: Funding) -> bool {
        match funding {
            Funding::Ledger { account_id } => self.sentinels.suppresses_customer(account_id),
            Funding::Wallet { .. } => false,
        }
    }

    pub fn build_job(
        &self,
        case: &SettlementCase,
        record: &PaymentRecord,
        funding: Funding,
        description: &FundingDescription,
    ) -> NotificationJob {
        NotificationJob {
            case: case.case,
            payment_id: record.id,
            admin: self.admin_recipient.as_ref().map(|to| EmailDelivery {
                to: to.clone(),
                email: templates::admin_email(case, record, description),
            }),
            customer_email: case.customer_email.as_ref().map(|to| EmailDelivery {
                to: to.clone(),
                email: templates::customer_email(case, record),
            }),
            customer_message: case.customer_phone.as_ref().map(|to| MessageDelivery {
                to: to.clone(),
                template: templates::customer_message(case, record),
            }),
            suppress_customer_channels: self.suppresses_customer(funding),
        }
    }
}

type ChannelPlan = Result<BoxFuture<'static, AppResult<String>>, SkipReason>;

pub struct NotificationDispatcher {
    email: Option<Arc<dyn EmailTransport>>,
    messages: Option<Arc<dyn MessageTransport>>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        email: Option<Arc<dyn EmailTransport>>,
        messages: Option<Arc<dyn MessageTransport>>,
        timeout: Duration,
    ) -> Self {
        Self {
            email,
            messages,
            timeout,
        }
    }

    /// Fire and forget. The handle only exists so tests can observe the report.
    pub fn dispatch(&self, job: NotificationJob) -> JoinHandle<DispatchReport> {
        let suppressed = job.suppress_customer_channels;
        let admin = self.plan_email(job.admin, false);
        let customer_email = self.plan_email(job.customer_email, suppressed);
        let customer_message = self.plan_message(job.customer_message, suppressed);
        let timeout = self.timeout;
        let case = job.case;
        let payment_id = job.payment_id;

        tokio::spawn(async move {
            let (admin, customer_email, customer_message) = tokio::join!(
                run_channel(case, Channel::Admin, admin, timeout),
                run_channel(case, Channel::CustomerEmail, customer_email, timeout),
                run_channel(case, Channel::CustomerMessage, customer_message, timeout),
            );

            info!(
                case = %case,
                payment_id,
                admin = ?admin,
                customer_email = ?customer_email,
                customer_message = ?customer_message,
                "📬 Notification dispatch finished"
            );

            DispatchReport {
                admin,
                customer_email,
                customer_message,
            }
        })
    }

    fn plan_email(&self, delivery: Option<EmailDelivery>, suppressed: bool) -> ChannelPlan {
        if suppressed {
            return Err(SkipReason::Suppressed);
        }
        let delivery = delivery.ok_or(SkipReason::NoRecipient)?;
        let transport = self
            .email
            .clone()
            .ok_or(SkipReason::TransportNotConfigured)?;

        Ok(async move {
            transport
                .send_email(&delivery.to, &delivery.email.subject, &delivery.email.html)
                .await
        }
        .boxed())
    }

    fn plan_message(&self, delivery: Option<MessageDelivery>, suppressed: bool) -> ChannelPlan {
        if suppressed {
            return Err(SkipReason::Suppressed);
        }
        let delivery = delivery.ok_or(SkipReason::NoRecipient)?;
        let transport = self
            .messages
            .clone()
            .ok_or(SkipReason::TransportNotConfigured)?;

        Ok(async move { transport.send_message(&delivery.to, &delivery.template).await }.boxed())
    }
}

async fn run_channel(
    case: CaseRef,
    channel: Channel,
    plan: ChannelPlan,
    timeout: Duration,
) -> ChannelOutcome {
    let send = match plan {
        Ok(send) => send,
        Err(reason) => {
            debug!(case = %case, ?channel, ?reason, "Notification channel skipped");
            return ChannelOutcome::Skipped(reason);
        }
    };

    // Own task so a panicking transport only takes down its own channel
    let outcome = match tokio::spawn(tokio::time::timeout(timeout, send)).await {
        Ok(Ok(Ok(message_id))) => ChannelOutcome::Sent { message_id },
        Ok(Ok(Err(e))) => ChannelOutcome::Failed(NotificationError::Transport(e.to_string())),
        Ok(Err(_)) => ChannelOutcome::Failed(NotificationError::TimedOut(timeout.as_millis())),
        Err(e) => ChannelOutcome::Failed(NotificationError::Aborted(e.to_string())),
    };

    match &outcome {
        ChannelOutcome::Failed(err) => {
            warn!(case = %case, ?channel, "❌ Notification failed: {}", err)
        }
        _ => debug!(case = %case, ?channel, "✓ Notification sent"),
    }
    outcome
}
