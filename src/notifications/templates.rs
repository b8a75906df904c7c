use rust_decimal::Decimal;
use serde::Serialize;

use crate::cases::models::{AccountId, SettlementCase};
use crate::notifications::transports::MessageTemplate;
use crate::settlement::models::PaymentRecord;

/// How a settlement was funded, as shown to staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingDescription {
    pub label: String,
    pub account_id: Option<AccountId>,
    pub account_name: Option<String>,
}

impl FundingDescription {
    pub fn wallet() -> Self {
        Self {
            label: "Customer Wallet".to_string(),
            account_id: None,
            account_name: None,
        }
    }

    pub fn ledger(account_id: AccountId, account_name: Option<String>) -> Self {
        Self {
            label: "Account".to_string(),
            account_id: Some(account_id),
            account_name,
        }
    }

    fn summary(&self) -> String {
        match (&self.account_id, &self.account_name) {
            (Some(id), Some(name)) => format!("{} #{} ({})", self.label, id, name),
            (Some(id), None) => format!("{} #{}", self.label, id),
            _ => self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

pub fn admin_email(
    case: &SettlementCase,
    record: &PaymentRecord,
    funding: &FundingDescription,
) -> RenderedEmail {
    let subject = format!(
        "Payment received: {} ({})",
        case.reference,
        format_amount(record.amount_paid)
    );
    let html = format!(
        "<h2>Case payment recorded</h2>\
         <table>\
         <tr><td>Case</td><td>{reference}</td></tr>\
         <tr><td>Passenger</td><td>{passenger}</td></tr>\
         <tr><td>Amount</td><td>{amount}</td></tr>\
         <tr><td>Paid via</td><td>{funding}</td></tr>\
         <tr><td>Remarks</td><td>{remarks}</td></tr>\
         <tr><td>Time</td><td>{time}</td></tr>\
         </table>",
        reference = escape_html(&case.reference),
        passenger = escape_html(&case.passenger_name),
        amount = format_amount(record.amount_paid),
        funding = escape_html(&funding.summary()),
        remarks = escape_html(&record.remarks),
        time = record.created_at.format("%Y-%m-%d %H:%M UTC"),
    );
    RenderedEmail { subject, html }
}

pub fn customer_email(case: &SettlementCase, record: &PaymentRecord) -> RenderedEmail {
    let subject = format!("We received your payment for {}", case.reference);
    let html = format!(
        "<p>Dear {passenger},</p>\
         <p>We have received your payment of <strong>{amount}</strong> \
         for application <strong>{reference}</strong> on {date}.</p>\
         <p>Thank you.</p>",
        passenger = escape_html(&case.passenger_name),
        amount = format_amount(record.amount_paid),
        reference = escape_html(&case.reference),
        date = record.created_at.format("%Y-%m-%d"),
    );
    RenderedEmail { subject, html }
}

/// Template variables in order: passenger, amount, reference, date
pub fn customer_message(case: &SettlementCase, record: &PaymentRecord) -> MessageTemplate {
    MessageTemplate {
        fields: vec![
            case.passenger_name.clone(),
            format_amount(record.amount_paid),
            case.reference.clone(),
            record.created_at.format("%Y-%m-%d").to_string(),
        ],
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
