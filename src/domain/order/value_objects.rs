use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Order Value Objects
// ============================================================================

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(PaymentMethod::Cash),
            "CARD" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

/// Where the order sits in the payment lifecycle.
///
/// `Pending -> Paid` is the only transition; `Paid` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// Catalog view of a product, as far as the ledger cares: a display name
/// and the current unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub name: String,
    pub unit_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_round_trip() {
        assert_eq!(PaymentMethod::parse("CASH"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse("CARD"), Some(PaymentMethod::Card));
        assert_eq!(PaymentMethod::Card.as_str(), "CARD");
        assert_eq!(PaymentMethod::parse("WIRE"), None);
    }

    #[test]
    fn test_payment_status_round_trip() {
        assert_eq!(PaymentStatus::parse("PENDING"), Some(PaymentStatus::Pending));
        assert_eq!(PaymentStatus::parse("PAID"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::parse("REFUNDED"), None);
    }
}
