use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{OrderId, StatusHistoryEntry, TrackingStatus};

pub async fn append_status(
    order_id: &OrderId,
    status: TrackingStatus,
    conn: &mut SqliteConnection,
) -> Result<StatusHistoryEntry, sqlx::Error> {
    let entry: StatusHistoryEntry =
        sqlx::query_as("INSERT INTO order_status_history (order_id, status) VALUES ($1, $2) RETURNING *")
            .bind(order_id.to_string())
            .bind(status)
            .fetch_one(conn)
            .await?;
    trace!("📝️ Status history entry #{} recorded: [{order_id}] is now {status}", entry.id);
    Ok(entry)
}

pub async fn fetch_history_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.to_string())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn delete_history_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM order_status_history WHERE order_id = $1").bind(order_id.to_string()).execute(conn).await?;
    Ok(result.rows_affected())
}
