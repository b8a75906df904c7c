use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use super::models::*;
use crate::error::{AppError, AppResult};
use crate::settlement::models::{
    ChargeOutstanding, NewPayment, PaymentRecord, ReconciliationNotice,
};
use crate::settlement::traits::{
    AccountDirectory, CaseDirectory, CasePaymentStore, OutstandingSource, ReconciliationLog,
};

/// Case, payment and account storage
pub struct CaseRepository {
    pub pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ChargeTotalsRow {
    residence: Decimal,
    fine: Decimal,
    cancellation: Decimal,
    custom_charges: Decimal,
    paid: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    case_id: CaseId,
    amount: Decimal,
    account_id: AccountId,
    remarks: String,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_record(self, kind: CaseKind) -> PaymentRecord {
        PaymentRecord {
            id: self.id,
            case: CaseRef { kind, id: self.case_id },
            amount_paid: self.amount,
            account_id: self.account_id,
            remarks: self.remarks,
            created_at: self.created_at,
        }
    }
}

fn tables(kind: CaseKind) -> (&'static str, &'static str) {
    match kind {
        CaseKind::Standard => ("residence_cases", "case_payments"),
        CaseKind::Family => ("family_residence_cases", "family_case_payments"),
    }
}

/// Spread the unified payments already received over the gross charges in
/// the order residence, fine, cancellation, custom charges. Anything paid
/// beyond the gross total is left as a negative residence amount.
pub fn apply_payments(gross: ChargeOutstanding, paid: Decimal) -> ChargeOutstanding {
    let mut remaining = paid.max(Decimal::ZERO);
    let mut settle = |owed: Decimal| {
        let applied = owed.max(Decimal::ZERO).min(remaining);
        remaining -= applied;
        owed - applied
    };

    let residence = settle(gross.residence);
    let fine = settle(gross.fine);
    let cancellation = settle(gross.cancellation);
    let custom_charges = settle(gross.custom_charges);

    ChargeOutstanding {
        residence: residence - remaining,
        fine,
        cancellation,
        custom_charges,
    }
}

impl CaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_payment(&self, payment: NewPayment) -> AppResult<PaymentRecord> {
        let (_, payments) = tables(payment.case.kind);
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            INSERT INTO {payments} (case_id, amount, account_id, remarks)
            VALUES ($1, $2, $3, $4)
            RETURNING id, case_id, amount, account_id, remarks, created_at
            "#
        ))
        .bind(payment.case.id)
        .bind(payment.amount)
        .bind(payment.account_id)
        .bind(&payment.remarks)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_record(payment.case.kind))
    }
}

#[async_trait]
impl CaseDirectory for CaseRepository {
    async fn find_case(&self, case: CaseRef) -> AppResult<Option<SettlementCase>> {
        let (cases, payments) = tables(case.kind);
        let row = sqlx::query_as::<_, CaseRow>(&format!(
            r#"
            SELECT c.id, c.reference, c.passenger_name, c.customer_id, c.cust_id,
                   c.customer_email, c.phone, c.mobile, c.contact_number, c.whatsapp_number,
                   c.total_price,
                   COALESCE((SELECT SUM(p.amount) FROM {payments} p WHERE p.case_id = c.id), 0) AS amount_paid
            FROM {cases} c
            WHERE c.id = $1
            "#
        ))
        .bind(case.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.normalize(case.kind)))
    }
}

#[async_trait]
impl OutstandingSource for CaseRepository {
    async fn charge_outstanding(&self, case_id: CaseId) -> AppResult<ChargeOutstanding> {
        let totals = sqlx::query_as::<_, ChargeTotalsRow>(
            r#"
            SELECT c.total_price AS residence,
                   COALESCE((SELECT SUM(f.amount) FROM case_fines f WHERE f.case_id = c.id), 0) AS fine,
                   COALESCE((SELECT SUM(x.charge) FROM case_cancellations x WHERE x.case_id = c.id), 0) AS cancellation,
                   COALESCE((SELECT SUM(cc.amount) FROM case_custom_charges cc WHERE cc.case_id = c.id), 0) AS custom_charges,
                   COALESCE((SELECT SUM(p.amount) FROM case_payments p WHERE p.case_id = c.id), 0) AS paid
            FROM residence_cases c
            WHERE c.id = $1
            "#,
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("case {}", CaseRef::standard(case_id))))?;

        let gross = ChargeOutstanding {
            residence: totals.residence,
            fine: totals.fine,
            cancellation: totals.cancellation,
            custom_charges: totals.custom_charges,
        };
        Ok(apply_payments(gross, totals.paid))
    }
}

#[async_trait]
impl CasePaymentStore for CaseRepository {
    async fn record_payment(&self, payment: NewPayment) -> AppResult<PaymentRecord> {
        debug_assert_eq!(payment.case.kind, CaseKind::Standard);
        self.insert_payment(payment).await
    }

    async fn record_family_payment(&self, payment: NewPayment) -> AppResult<PaymentRecord> {
        debug_assert_eq!(payment.case.kind, CaseKind::Family);
        self.insert_payment(payment).await
    }
}

#[async_trait]
impl AccountDirectory for CaseRepository {
    async fn account_name(&self, account_id: AccountId) -> AppResult<Option<String>> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }
}

#[async_trait]
impl ReconciliationLog for CaseRepository {
    async fn flag(&self, notice: &ReconciliationNotice) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reconciliation_flags (
                case_kind, case_id, customer_id, amount, wallet_transaction_id, reason, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notice.case.kind.to_string())
        .bind(notice.case.id)
        .bind(notice.customer_id)
        .bind(notice.amount)
        .bind(notice.wallet_transaction_id)
        .bind(&notice.reason)
        .bind(notice.flagged_at)
        .execute(&self.pool)
        .await?;

        info!("🚩 Reconciliation flag stored for {}", notice.case);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gross(residence: Decimal, fine: Decimal, cancellation: Decimal, custom: Decimal) -> ChargeOutstanding {
        ChargeOutstanding {
            residence,
            fine,
            cancellation,
            custom_charges: custom,
        }
    }

    #[test]
    fn test_no_payments_leaves_gross_untouched() {
        let g = gross(dec!(500), dec!(100), dec!(0), dec!(20));
        assert_eq!(apply_payments(g, Decimal::ZERO), g);
    }

    #[test]
    fn test_payments_fill_residence_first() {
        let left = apply_payments(gross(dec!(500), dec!(100), dec!(50), dec!(20)), dec!(550));
        assert_eq!(left, gross(dec!(0), dec!(50), dec!(50), dec!(20)));
    }

    #[test]
    fn test_exact_payment_clears_everything() {
        let left = apply_payments(gross(dec!(500), dec!(100), dec!(50), dec!(20)), dec!(670));
        assert_eq!(left, ChargeOutstanding::default());
    }

    #[test]
    fn test_overpayment_shows_as_negative_residence() {
        let left = apply_payments(gross(dec!(100), dec!(0), dec!(0), dec!(0)), dec!(130));
        assert_eq!(left.residence, dec!(-30));
        assert_eq!(left.fine, Decimal::ZERO);
    }

    #[test]
    fn test_payment_tables_per_kind() {
        assert_eq!(tables(CaseKind::Standard).1, "case_payments");
        assert_eq!(tables(CaseKind::Family).1, "family_case_payments");
    }
}
