//! Package subscription and transaction ledger.
//!
//! Stage four of the workflow: participants whose plan has received
//! feedback may purchase a package by submitting proof of payment; staff
//! verify the transaction, and approval extends or creates the
//! participant's subscription window.

use chrono::{DateTime, Utc};

use prepflow_types::billing::{
    generate_transaction_code, CreatePackageRequest, Package, PurchaseRequest, Transaction,
    TransactionDecision, TransactionStatus, UpdatePackageRequest,
};
use prepflow_types::error::WorkflowError;
use prepflow_types::event::WorkflowEvent;
use prepflow_types::ids::{PackageId, ParticipantId, StaffId, TransactionId};

use crate::eligibility::{self, Eligibility};
use crate::event::EventBus;
use crate::repository::package::PackageRepository;
use crate::repository::plan::PlanRepository;
use crate::repository::score::ScoreRepository;
use crate::repository::transaction::TransactionRepository;
use crate::subscription::SubscriptionWindows;

/// Default remark recorded on approval when staff leave it blank.
const APPROVAL_ACK: &str = "Payment verified";

/// Service owning package catalog entries, purchase transactions, and
/// their verification transitions.
pub struct BillingService<T, P, Pl, S, W>
where
    T: TransactionRepository,
    P: PackageRepository,
    Pl: PlanRepository,
    S: ScoreRepository,
    W: SubscriptionWindows,
{
    transactions: T,
    packages: P,
    plans: Pl,
    scores: S,
    windows: W,
    events: EventBus,
}

impl<T, P, Pl, S, W> BillingService<T, P, Pl, S, W>
where
    T: TransactionRepository,
    P: PackageRepository,
    Pl: PlanRepository,
    S: ScoreRepository,
    W: SubscriptionWindows,
{
    pub fn new(transactions: T, packages: P, plans: Pl, scores: S, windows: W, events: EventBus) -> Self {
        Self {
            transactions,
            packages,
            plans,
            scores,
            windows,
            events,
        }
    }

    /// Packages with `active = true`.
    pub async fn list_active_packages(&self) -> Result<Vec<Package>, WorkflowError> {
        Ok(self.packages.list(true).await?)
    }

    /// All packages, including inactive ones (staff view).
    pub async fn list_all_packages(&self) -> Result<Vec<Package>, WorkflowError> {
        Ok(self.packages.list(false).await?)
    }

    pub async fn get_package(&self, id: &PackageId) -> Result<Package, WorkflowError> {
        self.packages
            .get(id)
            .await?
            .ok_or(WorkflowError::NotFound("package"))
    }

    /// Create a package (staff).
    pub async fn create_package(
        &self,
        request: CreatePackageRequest,
        now: DateTime<Utc>,
    ) -> Result<Package, WorkflowError> {
        if request.name.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "package name cannot be empty".to_string(),
            ));
        }
        if request.price <= 0 {
            return Err(WorkflowError::Validation(
                "package price must be positive".to_string(),
            ));
        }
        if request.validity_months == 0 {
            return Err(WorkflowError::Validation(
                "validity must be at least one month".to_string(),
            ));
        }

        let package = Package {
            id: PackageId::new(),
            name: request.name.trim().to_string(),
            price: request.price,
            validity_months: request.validity_months,
            facilities: request.facilities,
            active: true,
            created_at: now,
            updated_at: now,
        };

        Ok(self.packages.create(&package).await?)
    }

    /// Update a package's mutable fields (staff). `validity_months` is
    /// immutable after creation and not part of the request shape.
    pub async fn update_package(
        &self,
        id: &PackageId,
        request: UpdatePackageRequest,
        now: DateTime<Utc>,
    ) -> Result<Package, WorkflowError> {
        let mut package = self.get_package(id).await?;

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(WorkflowError::Validation(
                    "package name cannot be empty".to_string(),
                ));
            }
            package.name = name.trim().to_string();
        }
        if let Some(price) = request.price {
            if price <= 0 {
                return Err(WorkflowError::Validation(
                    "package price must be positive".to_string(),
                ));
            }
            package.price = price;
        }
        if let Some(facilities) = request.facilities {
            package.facilities = facilities;
        }
        if let Some(active) = request.active {
            package.active = active;
        }
        package.updated_at = now;

        Ok(self.packages.update(&package).await?)
    }

    /// The purchase eligibility gate: true iff the participant has at
    /// least one plan with status FeedbackGiven or Completed. Recomputed on
    /// demand, never cached.
    pub async fn check_eligibility(
        &self,
        participant_id: &ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<Eligibility, WorkflowError> {
        let plans = self.plans.list_for_participant(participant_id).await?;
        let current_score = self.scores.latest_valid_approved(participant_id, now).await?;
        Ok(eligibility::may_purchase_package(
            current_score.as_ref(),
            &plans,
            now,
        ))
    }

    /// Purchase a package by submitting proof of payment.
    ///
    /// Preconditions: the purchase gate holds, the package is active, and
    /// the amount equals the package price exactly (no partial payments).
    pub async fn purchase(
        &self,
        request: PurchaseRequest,
        now: DateTime<Utc>,
    ) -> Result<Transaction, WorkflowError> {
        self.check_eligibility(&request.participant_id, now)
            .await?
            .check()?;

        let package = self.get_package(&request.package_id).await?;
        if !package.active {
            return Err(WorkflowError::Validation(
                "package is not active".to_string(),
            ));
        }
        if request.amount != package.price {
            return Err(WorkflowError::Validation(format!(
                "amount {} does not match package price {}",
                request.amount, package.price
            )));
        }
        if request.proof_ref.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "payment proof reference cannot be empty".to_string(),
            ));
        }

        let transaction = Transaction {
            id: TransactionId::new(),
            code: generate_transaction_code(),
            participant_id: request.participant_id,
            package_id: request.package_id,
            amount: request.amount,
            status: TransactionStatus::Pending,
            proof_ref: request.proof_ref,
            decision_remark: None,
            created_at: now,
            decided_at: None,
        };

        let transaction = self.transactions.create(&transaction).await?;

        tracing::info!(
            transaction_id = %transaction.id,
            code = %transaction.code,
            participant_id = %transaction.participant_id,
            "purchase transaction created"
        );

        self.events.publish(WorkflowEvent::TransactionCreated {
            transaction_id: transaction.id,
            participant_id: transaction.participant_id,
            package_id: transaction.package_id,
        });

        Ok(transaction)
    }

    /// Verify a pending transaction, permanently.
    ///
    /// Rejection requires a non-empty remark; approval's remark defaults
    /// to a standard acknowledgement. On approval the participant's
    /// subscription window is extended or created by the package's
    /// validity, after the decision commits. A decided transaction cannot
    /// be re-decided in either direction.
    pub async fn verify(
        &self,
        transaction_id: &TransactionId,
        staff_id: &StaffId,
        decision: TransactionDecision,
        now: DateTime<Utc>,
    ) -> Result<Transaction, WorkflowError> {
        let mut transaction = self
            .transactions
            .get(transaction_id)
            .await?
            .ok_or(WorkflowError::NotFound("transaction"))?;

        if transaction.status != TransactionStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "transaction is {}, only pending transactions can be verified",
                transaction.status
            )));
        }

        let approved = match decision {
            TransactionDecision::Approve { remark } => {
                transaction.status = TransactionStatus::Approved;
                transaction.decision_remark =
                    Some(remark.unwrap_or_else(|| APPROVAL_ACK.to_string()));
                true
            }
            TransactionDecision::Reject { remark } => {
                if remark.trim().is_empty() {
                    return Err(WorkflowError::Validation(
                        "rejection remark cannot be empty".to_string(),
                    ));
                }
                transaction.status = TransactionStatus::Rejected;
                transaction.decision_remark = Some(remark);
                false
            }
        };
        transaction.decided_at = Some(now);

        let transaction = self
            .transactions
            .decide(&transaction)
            .await
            .map_err(|e| match e {
                prepflow_types::error::RepositoryError::Conflict(_) => {
                    WorkflowError::InvalidState(
                        "transaction was decided concurrently".to_string(),
                    )
                }
                other => other.into(),
            })?;

        tracing::info!(
            transaction_id = %transaction.id,
            staff_id = %staff_id,
            approved,
            "transaction verified"
        );

        if approved {
            let package = self.get_package(&transaction.package_id).await?;
            self.windows
                .extend_or_create(
                    &transaction.participant_id,
                    &transaction.package_id,
                    package.validity_months,
                    now,
                )
                .await?;
        }

        self.events.publish(WorkflowEvent::TransactionDecided {
            transaction_id: transaction.id,
            participant_id: transaction.participant_id,
            staff_id: *staff_id,
            approved,
        });

        Ok(transaction)
    }

    /// Transaction history for a participant, newest first.
    pub async fn list_transactions_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<Transaction>, WorkflowError> {
        Ok(self.transactions.list_for_participant(participant_id).await?)
    }

    /// Fetch a transaction by id.
    pub async fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Transaction, WorkflowError> {
        self.transactions
            .get(transaction_id)
            .await?
            .ok_or(WorkflowError::NotFound("transaction"))
    }
}
