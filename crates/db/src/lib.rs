//! SQLite persistence for the precedent case graph.

pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_settings, DbPool};
pub use fixtures::{CaseSeedInfo, PrecedentSeed, SeedResult, VerificationResult};
pub use repositories::{PrecedentRepository, RepositoryError, SqlPrecedentIndex};
