//! Local filesystem file store implementation.
//!
//! Implements the `FileStore` trait from `prepflow-core`. Uploaded documents
//! (score reports, payment proofs) are written under `{base_dir}/files/` and
//! addressed by an opaque reference. The reference embeds a fresh UUID so
//! uploads never collide; the original filename is kept as a suffix for
//! operator legibility only.

use std::path::PathBuf;

use prepflow_core::storage::FileStore;
use prepflow_types::error::RepositoryError;
use uuid::Uuid;

/// Maximum accepted upload size (10 MB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Local filesystem-backed file store.
///
/// Layout:
/// ```text
/// {base_dir}/files/
///   0192f3a7....-score-report.pdf
///   0192f3b1....-payment-proof.jpg
/// ```
pub struct LocalFileStore {
    base_dir: PathBuf,
}

impl LocalFileStore {
    /// Create a new file store rooted at `base_dir`.
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn files_dir(&self) -> PathBuf {
        self.base_dir.join("files")
    }

    /// Sanitize a filename down to a safe suffix. The result must pass
    /// `validate_ref`, so `..` sequences are collapsed, not just path
    /// separators.
    fn sanitize(filename: &str) -> String {
        let mut cleaned: String = filename
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        while cleaned.contains("..") {
            cleaned = cleaned.replace("..", "_");
        }
        let trimmed = cleaned.trim_matches('.').to_string();
        if trimmed.is_empty() {
            "upload".to_string()
        } else {
            trimmed
        }
    }

    fn validate_ref(file_ref: &str) -> Result<(), RepositoryError> {
        if file_ref.is_empty()
            || file_ref.contains("..")
            || file_ref.contains('/')
            || file_ref.contains('\\')
        {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl FileStore for LocalFileStore {
    async fn store(&self, filename: &str, data: &[u8]) -> Result<String, RepositoryError> {
        if data.len() as u64 > MAX_FILE_SIZE_BYTES {
            return Err(RepositoryError::Conflict(format!(
                "file exceeds maximum size of {} bytes (got {} bytes)",
                MAX_FILE_SIZE_BYTES,
                data.len()
            )));
        }

        let file_ref = format!(
            "{}-{}",
            Uuid::now_v7().simple(),
            Self::sanitize(filename)
        );

        let dir = self.files_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| RepositoryError::Query(format!("failed to create files dir: {e}")))?;

        tokio::fs::write(dir.join(&file_ref), data)
            .await
            .map_err(|e| RepositoryError::Query(format!("failed to write file: {e}")))?;

        Ok(file_ref)
    }

    async fn retrieve(&self, file_ref: &str) -> Result<Vec<u8>, RepositoryError> {
        Self::validate_ref(file_ref)?;

        let path = self.files_dir().join(file_ref);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RepositoryError::NotFound)
            }
            Err(err) => Err(RepositoryError::Query(format!("failed to read file: {err}"))),
        }
    }
}
