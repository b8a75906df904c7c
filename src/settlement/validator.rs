use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::settlement::models::{
    Funding, FundingSource, OutstandingBreakdown, SentinelAccounts, SettlementRequest,
};

/// Money columns are NUMERIC(14, 2); anything finer would be rounded on write
pub const MONEY_SCALE: u32 = 2;

/// A request that passed every settlement rule. Only [`SettlementValidator`]
/// can produce one, so the executor cannot be handed an unchecked request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSettlement {
    request: SettlementRequest,
    funding: Funding,
}

impl ValidatedSettlement {
    pub fn request(&self) -> &SettlementRequest {
        &self.request
    }

    pub fn funding(&self) -> Funding {
        self.funding
    }

    pub fn amount(&self) -> Decimal {
        self.request.amount
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SettlementValidator {
    sentinels: SentinelAccounts,
}

impl SettlementValidator {
    pub fn new(sentinels: SentinelAccounts) -> Self {
        Self { sentinels }
    }

    /// Rules run in a fixed order and the first failure wins.
    /// `wallet_balance` is only consulted for wallet funding; `None` means no wallet.
    pub fn validate(
        &self,
        request: SettlementRequest,
        breakdown: &OutstandingBreakdown,
        wallet_balance: Option<Decimal>,
    ) -> Result<ValidatedSettlement, ValidationError> {
        if request.amount <= Decimal::ZERO || request.amount.normalize().scale() > MONEY_SCALE {
            return Err(ValidationError::InvalidAmount);
        }

        let funding = match request.funding {
            FundingSource::Ledger { account_id } => match account_id {
                // The wallet sentinel is not a real account
                Some(id) if !self.sentinels.is_wallet(id) => Funding::Ledger { account_id: id },
                _ => return Err(ValidationError::MissingAccount),
            },
            FundingSource::Wallet { customer_id } => {
                let available = wallet_balance.unwrap_or(Decimal::ZERO);
                let customer_id = match customer_id {
                    Some(id) if request.amount <= available => id,
                    _ => {
                        return Err(ValidationError::InsufficientWalletBalance {
                            requested: request.amount,
                            available: if customer_id.is_some() { available } else { Decimal::ZERO },
                        })
                    }
                };
                Funding::Wallet { customer_id }
            }
        };

        if request.amount > breakdown.total() {
            return Err(ValidationError::AmountExceedsOutstanding {
                requested: request.amount,
                outstanding: breakdown.total(),
            });
        }

        Ok(ValidatedSettlement { request, funding })
    }
}
