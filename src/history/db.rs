/**
 * Database Operations for the History Log
 *
 * Row-level operations against the two history tables: `history_data`
 * (immutable full-data snapshots) and `history` (the append-only entry
 * sequence, each row referencing one snapshot 1:1).
 */

use crate::element::{Element, FullData};
use crate::error::PlenumError;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

/// One materialized history entry, joined with its snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub element_id: String,
    pub timestamp: DateTime<Utc>,
    pub information: Vec<String>,
    pub restricted: bool,
    pub user_id: Option<i64>,
    /// Full snapshot at that time; `None` for a deletion.
    pub full_data: Option<FullData>,
}

/// Insert an immutable snapshot row, returning its id.
pub async fn insert_snapshot(
    conn: &mut SqliteConnection,
    full_data: &Option<FullData>,
) -> Result<i64, PlenumError> {
    let json = serde_json::to_string(full_data)?;
    let result = sqlx::query("INSERT INTO history_data (full_data) VALUES (?)")
        .bind(json)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Insert one history entry referencing an existing snapshot row.
pub async fn insert_entry(
    conn: &mut SqliteConnection,
    element: &Element,
    timestamp: DateTime<Utc>,
    full_data_id: i64,
) -> Result<HistoryEntry, PlenumError> {
    let information_json = serde_json::to_string(&element.information)?;
    let result = sqlx::query(
        r#"
        INSERT INTO history (element_id, now, information, restricted, user_id, full_data_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(element.element_id())
    .bind(timestamp)
    .bind(&information_json)
    .bind(element.restricted)
    .bind(element.user_id)
    .bind(full_data_id)
    .execute(&mut *conn)
    .await?;

    Ok(HistoryEntry {
        id: result.last_insert_rowid(),
        element_id: element.element_id(),
        timestamp,
        information: element.information.clone(),
        restricted: element.restricted,
        user_id: element.user_id,
        full_data: element.full_data.clone(),
    })
}

/// Number of history entries.
pub async fn count_entries(pool: &SqlitePool) -> Result<i64, PlenumError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Load history entries joined with their snapshots, oldest first.
///
/// With `element_id` set, only that element's sequence is returned.
pub async fn load_entries(
    pool: &SqlitePool,
    element_id: Option<&str>,
) -> Result<Vec<HistoryEntry>, PlenumError> {
    #[derive(sqlx::FromRow)]
    struct HistoryRow {
        id: i64,
        element_id: String,
        now: DateTime<Utc>,
        information: String,
        restricted: bool,
        user_id: Option<i64>,
        full_data: String,
    }

    let base = r#"
        SELECT h.id, h.element_id, h.now, h.information, h.restricted, h.user_id, d.full_data
        FROM history h
        JOIN history_data d ON d.id = h.full_data_id
        "#;

    let rows: Vec<HistoryRow> = match element_id {
        Some(element_id) => {
            let query = format!("{base} WHERE h.element_id = ? ORDER BY h.now ASC, h.id ASC");
            sqlx::query_as(&query).bind(element_id).fetch_all(pool).await?
        }
        None => {
            let query = format!("{base} ORDER BY h.now ASC, h.id ASC");
            sqlx::query_as(&query).fetch_all(pool).await?
        }
    };

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        entries.push(HistoryEntry {
            id: row.id,
            element_id: row.element_id,
            timestamp: row.now,
            information: serde_json::from_str(&row.information)?,
            restricted: row.restricted,
            user_id: row.user_id,
            full_data: serde_json::from_str(&row.full_data)?,
        });
    }
    Ok(entries)
}

/// Delete the entire history (the only deletion path).
pub async fn clear(pool: &SqlitePool) -> Result<u64, PlenumError> {
    let mut tx = pool.begin().await?;
    let deleted = sqlx::query("DELETE FROM history")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM history_data")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(deleted)
}
