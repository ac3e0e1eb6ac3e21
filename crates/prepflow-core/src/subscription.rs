//! Subscription window effect trait.
//!
//! Invoked only from a successful transaction approval. The window is a
//! downstream effect of verification, not a guard input, so it is never
//! consulted by the eligibility evaluator.

use chrono::{DateTime, Utc};

use prepflow_types::billing::SubscriptionWindow;
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::{PackageId, ParticipantId};

/// Trait for the subscription-period effect of an approved transaction.
pub trait SubscriptionWindows: Send + Sync {
    /// Create or extend the participant's active window by `months`.
    ///
    /// When the participant's latest window still covers `at`, the new
    /// window starts at that window's end; otherwise it starts at `at`.
    fn extend_or_create(
        &self,
        participant_id: &ParticipantId,
        package_id: &PackageId,
        months: u32,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<SubscriptionWindow, RepositoryError>> + Send;

    /// The participant's most recent window, if any.
    fn latest_for(
        &self,
        participant_id: &ParticipantId,
    ) -> impl std::future::Future<Output = Result<Option<SubscriptionWindow>, RepositoryError>> + Send;
}
