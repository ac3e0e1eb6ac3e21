use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::ids::{PackageId, ParticipantId, TransactionId};

/// A purchasable coaching package.
///
/// `validity_months` is immutable after creation; price, facilities and the
/// active flag are staff-mutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    /// Price in minor currency units (no fractions, no partial payments).
    pub price: i64,
    pub validity_months: u32,
    pub facilities: Vec<Facility>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Enumerated facility keywords a package can include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facility {
    GroupClass,
    PrivateCoaching,
    MockTest,
    StudyMaterials,
    ProgressReport,
    Consultation,
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facility::GroupClass => write!(f, "group_class"),
            Facility::PrivateCoaching => write!(f, "private_coaching"),
            Facility::MockTest => write!(f, "mock_test"),
            Facility::StudyMaterials => write!(f, "study_materials"),
            Facility::ProgressReport => write!(f, "progress_report"),
            Facility::Consultation => write!(f, "consultation"),
        }
    }
}

impl FromStr for Facility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "group_class" => Ok(Facility::GroupClass),
            "private_coaching" => Ok(Facility::PrivateCoaching),
            "mock_test" => Ok(Facility::MockTest),
            "study_materials" => Ok(Facility::StudyMaterials),
            "progress_report" => Ok(Facility::ProgressReport),
            "consultation" => Ok(Facility::Consultation),
            other => Err(format!("invalid facility: '{other}'")),
        }
    }
}

/// Request to create a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackageRequest {
    pub name: String,
    pub price: i64,
    pub validity_months: u32,
    pub facilities: Vec<Facility>,
}

/// Staff-mutable package fields. `validity_months` is deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePackageRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub facilities: Option<Vec<Facility>>,
    pub active: Option<bool>,
}

/// A package-purchase transaction.
///
/// Created `Pending` when a participant submits proof of payment;
/// transitioned exactly once to `Approved` or `Rejected` by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Unique human-referenceable code, generated at creation.
    pub code: String,
    pub participant_id: ParticipantId,
    pub package_id: PackageId,
    pub amount: i64,
    pub status: TransactionStatus,
    /// Opaque reference to the payment proof in file storage.
    pub proof_ref: String,
    pub decision_remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Transaction lifecycle states. Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Approved => write!(f, "approved"),
            TransactionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "approved" => Ok(TransactionStatus::Approved),
            "rejected" => Ok(TransactionStatus::Rejected),
            other => Err(format!("invalid transaction status: '{other}'")),
        }
    }
}

/// The staff decision on a pending transaction. Rejection requires a
/// remark; approval's remark is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum TransactionDecision {
    Approve { remark: Option<String> },
    Reject { remark: String },
}

/// Request to purchase a package with proof of payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub participant_id: ParticipantId,
    pub package_id: PackageId,
    pub proof_ref: String,
    pub amount: i64,
}

/// The derived active-package period created when a transaction is
/// approved. Extension of an open window starts at the prior window's end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionWindow {
    pub participant_id: ParticipantId,
    pub package_id: PackageId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Generate a fresh unique transaction code, e.g. `TRX-0192F3A7...`.
pub fn generate_transaction_code() -> String {
    format!("TRX-{}", Uuid::now_v7().simple().to_string().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_status_roundtrip() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Approved,
            TransactionStatus::Rejected,
        ] {
            let parsed: TransactionStatus = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_facility_roundtrip() {
        for facility in [
            Facility::GroupClass,
            Facility::PrivateCoaching,
            Facility::MockTest,
            Facility::StudyMaterials,
            Facility::ProgressReport,
            Facility::Consultation,
        ] {
            let parsed: Facility = facility.to_string().parse().unwrap();
            assert_eq!(facility, parsed);
        }
    }

    #[test]
    fn test_transaction_codes_unique() {
        let a = generate_transaction_code();
        let b = generate_transaction_code();
        assert!(a.starts_with("TRX-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_update_request_cannot_touch_validity() {
        // Compile-time guarantee expressed as a shape check: the update
        // request deserializes with validity_months silently ignored.
        let req: UpdatePackageRequest =
            serde_json::from_str(r#"{"price": 150000}"#).unwrap();
        assert_eq!(req.price, Some(150000));
        assert!(req.name.is_none());
    }
}
