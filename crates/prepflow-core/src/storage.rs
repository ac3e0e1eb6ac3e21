//! File store trait.
//!
//! Uploaded score documents and payment proofs are stored through this
//! interface. The workflow core only ever stores and passes along the
//! returned opaque `ref`; it never inspects file contents.

use prepflow_types::error::RepositoryError;

/// Trait for opaque-reference file storage.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in prepflow-infra.
pub trait FileStore: Send + Sync {
    /// Store bytes, returning an opaque reference for later retrieval.
    fn store(
        &self,
        filename: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String, RepositoryError>> + Send;

    /// Retrieve the bytes behind a reference.
    fn retrieve(
        &self,
        file_ref: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, RepositoryError>> + Send;
}
