//! Database module for SQLite persistence.
//!
//! SQLite is the scheme record store and the source of truth; the search
//! index is rebuilt from it at startup.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Longest pause between two connection attempts.
const MAX_CONNECT_BACKOFF: Duration = Duration::from_secs(60);

/// Startup connection schedule: `attempts` tries, the pause doubling from
/// `initial_backoff` up to one minute.
#[derive(Debug, Clone, Copy)]
pub struct ConnectRetry {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl ConnectRetry {
    /// Pause before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(MAX_CONNECT_BACKOFF)
    }
}

/// Open the pool, retrying with backoff, and run migrations.
pub async fn init_database(db_path: &Path, retry: ConnectRetry) -> Result<SqlitePool, sqlx::Error> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;

    loop {
        match connect(db_path).await {
            Ok(pool) => {
                tracing::info!(path = %db_path.display(), "Database connected");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                let delay = retry.backoff(attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, attempts, "Database connection failed, giving up");
                return Err(e);
            }
        }
    }
}

async fn connect(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schemes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            age_min INTEGER NOT NULL DEFAULT 0,
            age_max INTEGER NOT NULL DEFAULT 120,
            income_min INTEGER NOT NULL DEFAULT 0,
            income_max INTEGER NOT NULL DEFAULT 999999999,
            education TEXT NOT NULL DEFAULT 'Any',
            gender TEXT NOT NULL DEFAULT 'Any',
            location TEXT NOT NULL DEFAULT 'Both',
            occupation TEXT NOT NULL DEFAULT 'Any',
            other_requirements TEXT NOT NULL DEFAULT '[]',
            district TEXT NOT NULL DEFAULT 'All Districts',
            benefits TEXT NOT NULL,
            documents TEXT NOT NULL,
            application_process TEXT NOT NULL,
            deadline TEXT,
            status TEXT NOT NULL DEFAULT 'Active',
            government_body TEXT NOT NULL,
            contact_phone TEXT,
            contact_email TEXT,
            contact_website TEXT,
            contact_address TEXT,
            budget_amount INTEGER NOT NULL DEFAULT 0,
            budget_currency TEXT NOT NULL DEFAULT 'INR',
            tags TEXT NOT NULL DEFAULT '[]',
            image TEXT,
            featured INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            applications INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for the listing and filter paths
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_schemes_status_created ON schemes(status, created_at);
        CREATE INDEX IF NOT EXISTS idx_schemes_category ON schemes(category);
        CREATE INDEX IF NOT EXISTS idx_schemes_district ON schemes(district);
        CREATE INDEX IF NOT EXISTS idx_schemes_featured ON schemes(featured);
        CREATE INDEX IF NOT EXISTS idx_schemes_age ON schemes(age_min, age_max);
        CREATE INDEX IF NOT EXISTS idx_schemes_income ON schemes(income_min, income_max);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = ConnectRetry {
            attempts: 5,
            initial_backoff: Duration::from_secs(5),
        };
        assert_eq!(retry.backoff(1), Duration::from_secs(5));
        assert_eq!(retry.backoff(2), Duration::from_secs(10));
        assert_eq!(retry.backoff(4), Duration::from_secs(40));
        assert_eq!(retry.backoff(5), Duration::from_secs(60));
        assert_eq!(retry.backoff(40), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_init_creates_schema() {
        let dir = tempfile::TempDir::new().unwrap();
        let retry = ConnectRetry {
            attempts: 1,
            initial_backoff: Duration::from_millis(1),
        };
        let pool = init_database(&dir.path().join("nested/schemes.sqlite"), retry)
            .await
            .unwrap();

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schemes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }
}
