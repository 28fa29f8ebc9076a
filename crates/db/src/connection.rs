use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Opens a pool with foreign keys enforced so deleting a case drops its tag links.
///
/// In-memory URLs give every connection its own database, so they are pinned
/// to a single connection. For file URLs the parent directory is created first.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let max_connections = if is_in_memory(database_url) { 1 } else { max_connections.max(1) };
    if let Some(parent) = database_parent_dir(database_url) {
        tokio::fs::create_dir_all(parent).await.map_err(sqlx::Error::Io)?;
    }

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:")
}

fn database_parent_dir(database_url: &str) -> Option<&Path> {
    if is_in_memory(database_url) {
        return None;
    }
    let without_scheme = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let file_path = without_scheme.split('?').next().unwrap_or(without_scheme);
    Path::new(file_path).parent().filter(|parent| !parent.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{connect_with_settings, database_parent_dir, is_in_memory};

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory(":memory:"));
        assert!(!is_in_memory("sqlite://data/precedents.db?mode=rwc"));
    }

    #[test]
    fn parent_dir_is_taken_from_file_urls_only() {
        assert_eq!(
            database_parent_dir("sqlite://data/precedents.db?mode=rwc"),
            Some(Path::new("data"))
        );
        assert_eq!(
            database_parent_dir("sqlite:///var/lib/resolute/cases.db"),
            Some(Path::new("/var/lib/resolute"))
        );
        assert_eq!(database_parent_dir("sqlite://precedents.db"), None);
        assert_eq!(database_parent_dir("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn nested_database_directories_are_created() {
        let root = tempfile::tempdir().expect("tempdir");
        let db_path = root.path().join("data").join("nested").join("precedents.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());

        let pool = connect_with_settings(&url, 2, 5).await.expect("connect creates parents");
        sqlx::query("SELECT 1").execute(&pool).await.expect("query");
        pool.close().await;

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn in_memory_pool_enables_foreign_keys() {
        let pool = connect_with_settings("sqlite::memory:", 8, 5).await.expect("connect");
        let (enabled,): (i64,) =
            sqlx::query_as("PRAGMA foreign_keys").fetch_one(&pool).await.expect("pragma");
        assert_eq!(enabled, 1);
        pool.close().await;
    }
}
