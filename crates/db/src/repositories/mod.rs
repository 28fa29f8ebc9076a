use async_trait::async_trait;
use thiserror::Error;

use resolute_core::domain::precedent::PrecedentCase;

pub mod precedent;

pub use precedent::SqlPrecedentIndex;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Write side of the case graph. Only the seeding process uses it; callers
/// must keep it from running while the index is serving queries.
#[async_trait]
pub trait PrecedentRepository: Send + Sync {
    async fn list_cases(&self) -> Result<Vec<PrecedentCase>, RepositoryError>;

    /// Atomically swaps the whole graph for `cases`. Returns the number of tag links written.
    async fn replace_all(&self, cases: &[PrecedentCase]) -> Result<usize, RepositoryError>;
}
