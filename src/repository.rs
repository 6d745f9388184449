//! Generic statement-execution helpers shared by entity storage types.
//!
//! The entity layer supplies SQL text, bound parameters, and a row-mapping
//! function; these helpers own the acquisition discipline: every
//! checked-out connection goes back to the pool on every exit path, and a
//! transaction is always committed or rolled back, never abandoned.

use futures::future::BoxFuture;
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Row, Transaction};

use crate::db::ConnectionManager;
use crate::errors::DbError;

/// Runs a query and maps every returned row.
pub async fn fetch_mapped<R, F>(
    db: &ConnectionManager,
    query: Query<'_, Postgres, PgArguments>,
    map_row: F,
) -> Result<Vec<R>, DbError>
where
    F: Fn(&PgRow) -> Result<R, DbError>,
{
    let mut conn = db.acquire().await?;
    let rows = query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DbError::query("failed to execute query", e))?;

    rows.iter().map(&map_row).collect()
}

/// Runs an INSERT/UPDATE/DELETE and returns the affected-row count.
pub async fn execute_update(
    db: &ConnectionManager,
    query: Query<'_, Postgres, PgArguments>,
) -> Result<u64, DbError> {
    let mut conn = db.acquire().await?;
    let result = query
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::query("failed to execute update", e))?;

    Ok(result.rows_affected())
}

/// Runs an INSERT carrying a `RETURNING` clause and maps the generated key.
pub async fn execute_insert_returning<R, F>(
    db: &ConnectionManager,
    query: Query<'_, Postgres, PgArguments>,
    map_key: F,
) -> Result<R, DbError>
where
    F: FnOnce(&PgRow) -> Result<R, DbError>,
{
    let mut conn = db.acquire().await?;
    let row = query
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DbError::query("failed to execute insert", e))?
        .ok_or_else(|| DbError::query_msg("no generated key returned from insert"))?;

    map_key(&row)
}

/// Runs a batch of statements on one checked-out connection, returning
/// the per-statement affected-row counts.
pub async fn execute_batch(
    db: &ConnectionManager,
    queries: Vec<Query<'_, Postgres, PgArguments>>,
) -> Result<Vec<u64>, DbError> {
    let mut conn = db.acquire().await?;
    let mut counts = Vec::with_capacity(queries.len());

    for query in queries {
        let result = query
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::query("failed to execute batch update", e))?;
        counts.push(result.rows_affected());
    }

    Ok(counts)
}

/// Runs `op` inside a single transaction: commit on success, explicit
/// rollback on any failure.
///
/// A rollback failure is logged but never masks the original error, and
/// an already-categorized [`DbError`] from `op` passes through unchanged.
pub async fn execute_in_transaction<R, F>(db: &ConnectionManager, op: F) -> Result<R, DbError>
where
    F: for<'t> FnOnce(
        &'t mut Transaction<'static, Postgres>,
    ) -> BoxFuture<'t, Result<R, DbError>>,
{
    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| DbError::transaction("failed to begin transaction", e))?;

    match op(&mut tx).await {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DbError::transaction("failed to commit transaction", e))?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!("Transaction rolled back due to error: {}", err);
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Failed to rollback transaction: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// Reads a single `i64` column from a row, for key and count mappers.
pub fn read_i64(row: &PgRow, column: &str) -> Result<i64, DbError> {
    row.try_get(column)
        .map_err(|e| DbError::data_access(format!("failed to read column {}: {}", column, e)))
}
