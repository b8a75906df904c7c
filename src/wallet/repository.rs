use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use crate::cases::models::CustomerId;
use crate::error::{AppError, AppResult};
use crate::settlement::models::{WalletDebit, WalletDebitRequest};
use crate::settlement::traits::WalletService;

/// Customer wallet balances and their debit trail
pub struct WalletRepository {
    pool: PgPool,
}

impl WalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletService for WalletRepository {
    async fn balance(&self, customer_id: CustomerId) -> AppResult<Option<Decimal>> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT balance FROM customer_wallets WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn debit(&self, request: WalletDebitRequest) -> AppResult<WalletDebit> {
        let mut tx = self.pool.begin().await?;

        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT balance FROM customer_wallets WHERE customer_id = $1 FOR UPDATE",
        )
        .bind(request.customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No wallet for customer {}", request.customer_id))
        })?;

        if balance < request.amount {
            return Err(AppError::InvalidInput(format!(
                "Wallet balance {} is below debit amount {}",
                balance, request.amount
            )));
        }

        sqlx::query(
            "UPDATE customer_wallets SET balance = balance - $2, updated_at = NOW() WHERE customer_id = $1",
        )
        .bind(request.customer_id)
        .bind(request.amount)
        .execute(&mut *tx)
        .await?;

        let transaction_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO wallet_transactions (
                customer_id, amount, direction, reference_type, reference_id, remarks
            ) VALUES ($1, $2, 'debit', $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(request.customer_id)
        .bind(request.amount)
        .bind(request.reference_type)
        .bind(request.reference_id)
        .bind(&request.remarks)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            customer_id = request.customer_id,
            amount = %request.amount,
            transaction_id,
            "👛 Wallet debit committed"
        );
        Ok(WalletDebit { transaction_id })
    }
}
