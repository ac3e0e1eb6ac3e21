//! Purchase transaction repository trait definition.

use prepflow_types::billing::Transaction;
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::{ParticipantId, TransactionId};

/// Repository trait for purchase transaction persistence.
pub trait TransactionRepository: Send + Sync {
    /// Insert a new Pending transaction. The generated code is unique
    /// (enforced by a UNIQUE column).
    fn create(
        &self,
        transaction: &Transaction,
    ) -> impl std::future::Future<Output = Result<Transaction, RepositoryError>> + Send;

    fn get(
        &self,
        id: &TransactionId,
    ) -> impl std::future::Future<Output = Result<Option<Transaction>, RepositoryError>> + Send;

    /// All transactions for a participant, newest first.
    fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> impl std::future::Future<Output = Result<Vec<Transaction>, RepositoryError>> + Send;

    /// Persist a verification decision, guarded on the stored status still
    /// being Pending inside a single transaction. A decided transaction
    /// cannot be re-decided in either direction; losing the race yields
    /// `Conflict`.
    fn decide(
        &self,
        transaction: &Transaction,
    ) -> impl std::future::Future<Output = Result<Transaction, RepositoryError>> + Send;
}
