use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rand::Rng;
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel,
    SqlErr, TransactionTrait,
};
use tracing::debug;

use crate::config::DatabaseConfig;

/// Attempts made by [`serializable`] before a conflict is surfaced.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 8;

/// Future returned by a unit of work borrowing its transaction.
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, DbErr>> + Send + 'c>>;

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(60))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("common::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Errors that disappear when the whole transaction is re-run.
///
/// Covers Postgres serialization failures and deadlocks, plus unique
/// violations from two transactions inserting the same asset name.
pub fn is_retryable_conflict(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    let message = err.to_string();
    message.contains("could not serialize access")
        || message.contains("deadlock detected")
        || message.contains("40001")
        || message.contains("40P01")
}

/// Run `work` in a SERIALIZABLE transaction, re-running it from scratch on
/// serialization conflicts.
///
/// `work` may be invoked several times and must not have side effects outside
/// the transaction. Callers clone what they need into the returned future:
///
/// ```ignore
/// let name = name.to_owned();
/// serializable(&db, DEFAULT_CONFLICT_RETRIES, |txn| {
///     let name = name.clone();
///     Box::pin(async move { asset::Entity::find().filter(asset::Column::Name.eq(name)).one(txn).await })
/// })
/// .await?;
/// ```
pub async fn serializable<T, F>(
    db: &DatabaseConnection,
    max_attempts: u32,
    mut work: F,
) -> Result<T, DbErr>
where
    T: Send,
    F: for<'c> FnMut(&'c DatabaseTransaction) -> TxFuture<'c, T>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        let result = match db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
        {
            Ok(txn) => match work(&txn).await {
                Ok(value) => txn.commit().await.map(|_| value),
                Err(e) => {
                    if let Err(rollback) = txn.rollback().await {
                        debug!(error = %rollback, "Rollback after failed unit of work failed");
                    }
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && is_retryable_conflict(&e) => {
                debug!(attempt, error = %e, "Serialization conflict, re-running transaction");
                tokio::time::sleep(conflict_backoff(attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn conflict_backoff(attempt: u32) -> Duration {
    let ceiling = 10u64.saturating_mul(attempt as u64).min(200);
    Duration::from_millis(rand::rng().random_range(1..=ceiling))
}
