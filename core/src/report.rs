//! Inbound report types and their decoding.
//!
//! Each report names the correlation key differently on the wire:
//! `order_id` for payments, `reference_id` for fraud checks and `order`
//! for vendor confirmations. Unknown fields are ignored.

use crate::order::{Dimension, OrderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status value that marks a payment or vendor report as successful.
pub const CONFIRMED: &str = "confirmed";

/// Highest risk score a fraud check may carry and still pass.
pub const RISK_THRESHOLD: i64 = 60;

/// Payment confirmation from the payment provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Correlation key
    pub order_id: OrderId,
    /// Charged amount
    pub amount: i64,
    /// `"confirmed"` on success, anything else is a failure
    pub payment_status: String,
}

impl PaymentConfirmation {
    /// Creates a payment report.
    #[must_use]
    pub fn new(order_id: OrderId, amount: i64, payment_status: impl Into<String>) -> Self {
        Self {
            order_id,
            amount,
            payment_status: payment_status.into(),
        }
    }
}

/// Fraud check result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudCheck {
    /// Correlation key, same key space as `order_id`
    pub reference_id: OrderId,
    /// Risk score; above [`RISK_THRESHOLD`] fails
    pub risk_points: i64,
}

impl FraudCheck {
    /// Creates a fraud report.
    #[must_use]
    pub const fn new(reference_id: OrderId, risk_points: i64) -> Self {
        Self {
            reference_id,
            risk_points,
        }
    }
}

/// Vendor confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorConfirmation {
    /// Correlation key
    pub order: OrderId,
    /// `"confirmed"` on success, anything else is a failure
    pub status: String,
}

impl VendorConfirmation {
    /// Creates a vendor report.
    #[must_use]
    pub fn new(order: OrderId, status: impl Into<String>) -> Self {
        Self {
            order,
            status: status.into(),
        }
    }
}

/// A decoded inbound report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Report {
    /// Payment confirmation
    Payment(PaymentConfirmation),
    /// Fraud check
    Fraud(FraudCheck),
    /// Vendor confirmation
    Vendor(VendorConfirmation),
}

/// Errors from decoding an inbound body.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Body is not valid JSON for the report, or a required field is missing
    #[error("malformed {dimension} report: {source}")]
    Malformed {
        /// Report kind being decoded
        dimension: Dimension,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Correlation key is empty
    #[error("{dimension} report has an empty correlation key")]
    EmptyKey {
        /// Report kind being decoded
        dimension: Dimension,
    },
}

impl Report {
    /// Decodes a JSON body as the report for `dimension`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] if the body does not match the
    /// report's field contract and [`DecodeError::EmptyKey`] if the
    /// correlation key is blank.
    pub fn decode(dimension: Dimension, body: &[u8]) -> Result<Self, DecodeError> {
        let malformed = |source| DecodeError::Malformed { dimension, source };

        let report = match dimension {
            Dimension::Payment => Self::Payment(serde_json::from_slice(body).map_err(malformed)?),
            Dimension::Fraud => Self::Fraud(serde_json::from_slice(body).map_err(malformed)?),
            Dimension::Vendor => Self::Vendor(serde_json::from_slice(body).map_err(malformed)?),
        };

        if report.order_id().as_str().trim().is_empty() {
            return Err(DecodeError::EmptyKey { dimension });
        }
        Ok(report)
    }

    /// Correlation key, whatever the wire field was called.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::Payment(payment) => &payment.order_id,
            Self::Fraud(fraud) => &fraud.reference_id,
            Self::Vendor(vendor) => &vendor.order,
        }
    }

    /// Dimension this report fills in.
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        match self {
            Self::Payment(_) => Dimension::Payment,
            Self::Fraud(_) => Dimension::Fraud,
            Self::Vendor(_) => Dimension::Vendor,
        }
    }

    /// Whether the report records a business failure for its dimension.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        match self {
            Self::Payment(payment) => payment.payment_status != CONFIRMED,
            Self::Fraud(fraud) => fraud.risk_points > RISK_THRESHOLD,
            Self::Vendor(vendor) => vendor.status != CONFIRMED,
        }
    }
}

impl From<PaymentConfirmation> for Report {
    fn from(report: PaymentConfirmation) -> Self {
        Self::Payment(report)
    }
}

impl From<FraudCheck> for Report {
    fn from(report: FraudCheck) -> Self {
        Self::Fraud(report)
    }
}

impl From<VendorConfirmation> for Report {
    fn from(report: VendorConfirmation) -> Self {
        Self::Vendor(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_payment_and_ignores_unknown_fields() {
        let body = br#"{"order_id":"de-ber-76898","payment_reference":"ref-1","amount":2000,"payment_status":"confirmed"}"#;
        let report = Report::decode(Dimension::Payment, body).unwrap();

        assert_eq!(report.order_id().as_str(), "de-ber-76898");
        assert_eq!(report.dimension(), Dimension::Payment);
        assert!(!report.is_failure());
        assert!(matches!(report, Report::Payment(ref p) if p.amount == 2000));
    }

    #[test]
    fn decodes_fraud_with_reference_id_key() {
        let body = br#"{"reference_id":"de-ber-76898","risk_points":10}"#;
        let report = Report::decode(Dimension::Fraud, body).unwrap();

        assert_eq!(report.order_id().as_str(), "de-ber-76898");
        assert_eq!(report.dimension(), Dimension::Fraud);
    }

    #[test]
    fn decodes_vendor_with_order_key() {
        let body = br#"{"order":"de-ber-76898","status":"rejected"}"#;
        let report = Report::decode(Dimension::Vendor, body).unwrap();

        assert_eq!(report.order_id().as_str(), "de-ber-76898");
        assert!(report.is_failure());
    }

    #[test]
    fn rejects_body_that_is_not_json() {
        let err = Report::decode(Dimension::Payment, b"not json").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Malformed {
                dimension: Dimension::Payment,
                ..
            }
        ));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = Report::decode(Dimension::Fraud, br#"{"reference_id":"x"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn rejects_wrong_field_type() {
        let body = br#"{"order_id":"x","amount":"2000","payment_status":"confirmed"}"#;
        assert!(Report::decode(Dimension::Payment, body).is_err());
    }

    #[test]
    fn rejects_key_from_another_report_kind() {
        // A payment body posted to the vendor route has no `order` field
        let body = br#"{"order_id":"x","amount":1,"payment_status":"confirmed"}"#;
        assert!(Report::decode(Dimension::Vendor, body).is_err());
    }

    #[test]
    fn rejects_empty_correlation_key() {
        let err = Report::decode(Dimension::Vendor, br#"{"order":"  ","status":"confirmed"}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::EmptyKey {
                dimension: Dimension::Vendor
            }
        ));
    }

    #[test]
    fn status_match_is_case_sensitive() {
        let report: Report = VendorConfirmation::new(OrderId::new("x"), "CONFIRMED").into();
        assert!(report.is_failure());
    }

    proptest! {
        #[test]
        fn fraud_fails_only_above_threshold(risk_points in -1_000i64..1_000) {
            let report: Report = FraudCheck::new(OrderId::new("x"), risk_points).into();
            prop_assert_eq!(report.is_failure(), risk_points > RISK_THRESHOLD);
        }

        #[test]
        fn payment_fails_unless_exactly_confirmed(status in "[a-zA-Z]{0,12}") {
            let report: Report = PaymentConfirmation::new(OrderId::new("x"), 1, status.clone()).into();
            prop_assert_eq!(report.is_failure(), status != CONFIRMED);
        }
    }
}
