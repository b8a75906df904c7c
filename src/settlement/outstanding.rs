use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cases::models::{CaseKind, SettlementCase};
use crate::error::AppResult;
use crate::settlement::models::{ChargeOutstanding, OutstandingBreakdown};
use crate::settlement::traits::OutstandingSource;

/// Computes the unified outstanding balance for a case
pub struct OutstandingAggregator {
    source: Arc<dyn OutstandingSource>,
}

impl OutstandingAggregator {
    pub fn new(source: Arc<dyn OutstandingSource>) -> Self {
        Self { source }
    }

    pub async fn breakdown(&self, case: &SettlementCase) -> AppResult<OutstandingBreakdown> {
        let breakdown = match case.case.kind {
            CaseKind::Standard => {
                let charges = self.source.charge_outstanding(case.case.id).await?;
                Self::from_charges(case, charges)
            }
            CaseKind::Family => Self::single_category(case),
        };

        debug!(
            case = %case.case,
            total = %breakdown.total(),
            "Outstanding breakdown loaded"
        );
        Ok(breakdown)
    }

    fn from_charges(case: &SettlementCase, charges: ChargeOutstanding) -> OutstandingBreakdown {
        let categories = [
            ("residence", charges.residence),
            ("fine", charges.fine),
            ("cancellation", charges.cancellation),
            ("custom_charges", charges.custom_charges),
        ];
        for (category, amount) in categories {
            if amount < Decimal::ZERO {
                warn!(
                    case = %case.case,
                    category,
                    amount = %amount,
                    "⚠️ Negative outstanding clamped to zero"
                );
            }
        }

        OutstandingBreakdown::new(
            charges.residence,
            charges.fine,
            charges.cancellation,
            charges.custom_charges,
        )
    }

    fn single_category(case: &SettlementCase) -> OutstandingBreakdown {
        let remaining = case.total_price - case.amount_paid;
        if remaining < Decimal::ZERO {
            warn!(
                case = %case.case,
                total_price = %case.total_price,
                amount_paid = %case.amount_paid,
                "⚠️ Case is overpaid, outstanding clamped to zero"
            );
        }
        OutstandingBreakdown::single_category(remaining)
    }
}
