use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CaseId = i64;
pub type CustomerId = i64;
pub type AccountId = i64;

/// Shortest phone number (in digits) we are willing to message
pub const MIN_PHONE_DIGITS: usize = 8;

/// Standard cases owe across four charge categories; family cases carry a
/// single price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
    Standard,
    Family,
}

impl CaseKind {
    /// Reference type written on wallet transactions for this kind of case
    pub fn wallet_reference_type(&self) -> &'static str {
        match self {
            CaseKind::Standard => "residence",
            CaseKind::Family => "family_residence",
        }
    }
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseKind::Standard => write!(f, "standard"),
            CaseKind::Family => write!(f, "family"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CaseRef {
    pub kind: CaseKind,
    pub id: CaseId,
}

impl CaseRef {
    pub fn standard(id: CaseId) -> Self {
        Self { kind: CaseKind::Standard, id }
    }

    pub fn family(id: CaseId) -> Self {
        Self { kind: CaseKind::Family, id }
    }
}

impl fmt::Display for CaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Raw case row as stored, legacy synonym columns included
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CaseRow {
    pub id: CaseId,
    pub reference: String,
    pub passenger_name: String,
    pub customer_id: Option<CustomerId>,
    pub cust_id: Option<CustomerId>,
    pub customer_email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub contact_number: Option<String>,
    pub whatsapp_number: Option<String>,
    pub total_price: Decimal,
    pub amount_paid: Decimal,
}

/// A case after legacy fields have been resolved into canonical ones.
/// Everything downstream of the repositories works with this shape only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementCase {
    pub case: CaseRef,
    pub reference: String,
    pub passenger_name: String,
    pub customer_id: Option<CustomerId>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub total_price: Decimal,
    pub amount_paid: Decimal,
}

impl CaseRow {
    pub fn normalize(self, kind: CaseKind) -> SettlementCase {
        let customer_phone = [
            self.phone.as_deref(),
            self.mobile.as_deref(),
            self.contact_number.as_deref(),
            self.whatsapp_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find_map(normalize_phone);

        let customer_email = self
            .customer_email
            .map(|e| e.trim().to_string())
            .filter(|e| e.contains('@'));

        SettlementCase {
            case: CaseRef { kind, id: self.id },
            reference: self.reference,
            passenger_name: self.passenger_name,
            customer_id: self.customer_id.or(self.cust_id),
            customer_email,
            customer_phone,
            total_price: self.total_price,
            amount_paid: self.amount_paid,
        }
    }
}

/// Strip formatting from a phone field, keeping a leading '+'. Returns `None`
/// when fewer than [`MIN_PHONE_DIGITS`] digits remain.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row() -> CaseRow {
        CaseRow {
            id: 42,
            reference: "RES-42".into(),
            passenger_name: "Amina Yusuf".into(),
            customer_id: None,
            cust_id: None,
            customer_email: None,
            phone: None,
            mobile: None,
            contact_number: None,
            whatsapp_number: None,
            total_price: dec!(1000),
            amount_paid: dec!(0),
        }
    }

    #[test]
    fn test_phone_fallback_order_skips_short_values() {
        let mut r = row();
        r.phone = Some("  ".into());
        r.mobile = Some("123".into());
        r.contact_number = Some("+971 50 123 4567".into());
        r.whatsapp_number = Some("0509999999".into());

        let case = r.normalize(CaseKind::Standard);
        assert_eq!(case.customer_phone.as_deref(), Some("+971501234567"));
    }

    #[test]
    fn test_phone_missing_everywhere() {
        let case = row().normalize(CaseKind::Family);
        assert_eq!(case.customer_phone, None);
        assert_eq!(case.case, CaseRef::family(42));
    }

    #[test]
    fn test_customer_id_falls_back_to_legacy_column() {
        let mut r = row();
        r.cust_id = Some(9);
        assert_eq!(r.clone().normalize(CaseKind::Standard).customer_id, Some(9));

        r.customer_id = Some(3);
        assert_eq!(r.normalize(CaseKind::Standard).customer_id, Some(3));
    }

    #[test]
    fn test_blank_email_is_dropped() {
        let mut r = row();
        r.customer_email = Some("   ".into());
        assert_eq!(r.normalize(CaseKind::Standard).customer_email, None);
    }

    #[test]
    fn test_case_ref_display() {
        assert_eq!(CaseRef::standard(7).to_string(), "standard#7");
    }
}
