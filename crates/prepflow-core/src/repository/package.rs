//! Package catalog repository trait definition.

use prepflow_types::billing::Package;
use prepflow_types::error::RepositoryError;
use prepflow_types::ids::PackageId;

/// Repository trait for package persistence.
pub trait PackageRepository: Send + Sync {
    fn create(
        &self,
        package: &Package,
    ) -> impl std::future::Future<Output = Result<Package, RepositoryError>> + Send;

    fn get(
        &self,
        id: &PackageId,
    ) -> impl std::future::Future<Output = Result<Option<Package>, RepositoryError>> + Send;

    /// List packages; when `active_only`, only those with `active = true`.
    fn list(
        &self,
        active_only: bool,
    ) -> impl std::future::Future<Output = Result<Vec<Package>, RepositoryError>> + Send;

    /// Update mutable fields. `validity_months` is never written after
    /// creation.
    fn update(
        &self,
        package: &Package,
    ) -> impl std::future::Future<Output = Result<Package, RepositoryError>> + Send;
}
