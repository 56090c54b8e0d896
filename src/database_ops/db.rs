use std::future::Future;

use anyhow::{Context, Result};
use sqlx::AnyConnection;
use sqlx::Connection;
use tracing::{info, instrument, warn};

use crate::config::{DbSettings, RetryPolicy};
use crate::database_ops::schema::{Dialect, TableSchema};

/// One database session, shared by every statement of a seeding run.
///
/// Dropping a `Db` releases the session; `close` does so gracefully.
pub struct Db {
    conn: AnyConnection,
    dialect: Dialect,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let dialect = Dialect::from_url(database_url)?;
        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(database_url).await?;
        Ok(Self { conn, dialect })
    }

    /// Open a session, retrying on failure while the database comes up.
    pub async fn connect_with_retry(settings: &DbSettings, policy: RetryPolicy) -> Result<Self> {
        let url = settings.database_url()?;
        // Bad schemes can't fix themselves; don't spend the retry budget on them.
        let dialect = Dialect::from_url(&url)?;
        let db = retry_with_policy(policy, "database connect", |_| Self::connect(&url))
            .await
            .context("Failed to connect to database")?;
        info!(?dialect, "connected to db");
        Ok(db)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn conn(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }

    /// Create the table if absent. Never alters an existing table.
    pub async fn ensure_table(&mut self, schema: &TableSchema) -> Result<()> {
        let ddl = schema.create_table_sql(self.dialect);
        sqlx::raw_sql(&ddl)
            .execute(&mut self.conn)
            .await
            .with_context(|| format!("failed to ensure table `{}`", schema.name))?;
        info!(table = schema.name, "table ensured");
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is spent, sleeping
/// `policy.delay` between failures. The closure receives the 1-based attempt.
pub async fn retry_with_policy<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(err) if attempt < max => {
                warn!(what, attempt, max, error = %err, "attempt failed; retrying");
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(err) => {
                return Err(err.context(format!("{what} failed after {max} attempts")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::time::Duration;

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = Cell::new(0u32);
        let out = retry_with_policy(RetryPolicy::immediate(5), "op", |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(anyhow!("not yet"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let calls = Cell::new(0u32);
        let err = retry_with_policy::<(), _, _>(RetryPolicy::immediate(4), "connect", |_| {
            calls.set(calls.get() + 1);
            async { Err(anyhow!("refused")) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 4);
        let msg = format!("{err:#}");
        assert!(msg.contains("connect failed after 4 attempts"));
        assert!(msg.contains("refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_sleeps_between_attempts_only() {
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let _ = retry_with_policy::<(), _, _>(policy, "op", |_| async { Err(anyhow!("down")) }).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_secs(6), "waited {elapsed:?}");
    }

    #[tokio::test]
    async fn unsupported_scheme_fails_without_retrying() {
        let settings = DbSettings {
            url_override: Some("postgres://db/food_pantry".to_string()),
            ..DbSettings::default()
        };
        let err = Db::connect_with_retry(&settings, RetryPolicy::immediate(3))
            .await
            .err()
            .expect("should fail");
        assert!(format!("{err:#}").contains("unsupported database URL scheme"));
    }

    #[tokio::test]
    async fn unreachable_sqlite_file_exhausts_retries() {
        let settings = DbSettings {
            url_override: Some("sqlite:///nonexistent-dir/pantry.db".to_string()),
            ..DbSettings::default()
        };
        let err = Db::connect_with_retry(&settings, RetryPolicy::immediate(2))
            .await
            .err()
            .expect("should fail");
        let msg = format!("{err:#}");
        assert!(msg.contains("Failed to connect to database"));
        assert!(msg.contains("after 2 attempts"));
    }

    #[tokio::test]
    async fn ensure_table_is_idempotent() {
        let mut db = Db::connect("sqlite::memory:").await.unwrap();
        db.ensure_table(&crate::database_ops::schema::CATEGORIES).await.unwrap();
        db.ensure_table(&crate::database_ops::schema::CATEGORIES).await.unwrap();
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(db.conn())
            .await
            .unwrap();
        assert_eq!(n, 0);
        db.close().await.unwrap();
    }
}
