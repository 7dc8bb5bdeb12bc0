use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde_json::{Map, Value};
use tokio_rusqlite::Connection;

use crate::defaults::default_new_tips;
use crate::error::{AppError, Result};
use crate::models::{
    Interaction, InteractionType, LikeOutcome, NewTip, Tip, TipFilter, TipKey, TipRow, TipUpdate,
};

use super::schema::{migrate, SCHEMA};
use super::TipSource;

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        let added = conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(migrate(conn)?)
            })
            .await?;

        if !added.is_empty() {
            tracing::info!("Added columns to tips: {}", added.join(", "));
        }

        Ok(Self { conn })
    }

    // Administrative tip operations

    pub async fn insert_tip(&self, tip: NewTip) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tips (id, situation, language, content) VALUES (?1, ?2, ?3, ?4)",
                    params![tip.id, tip.situation.as_str(), tip.language.as_str(), tip.content],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn count_tips(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM tips", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    /// Inserts the built-in tips into an empty table. Returns how many were inserted.
    pub async fn seed_defaults(&self) -> Result<usize> {
        if self.count_tips().await? > 0 {
            return Ok(0);
        }

        let tips = default_new_tips();
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for tip in &tips {
                    tx.execute(
                        "INSERT OR IGNORE INTO tips (id, situation, language, content) VALUES (?1, ?2, ?3, ?4)",
                        params![tip.id, tip.situation.as_str(), tip.language.as_str(), tip.content],
                    )?;
                }
                tx.commit()?;
                Ok(tips.len())
            })
            .await?;
        Ok(inserted)
    }

    pub async fn get_tip_details(&self, id: &str) -> Result<Tip> {
        let lookup = id.to_string();
        let tip = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, situation, language, content, likes, display_count,
                              created_at, updated_at, is_active
                       FROM tips WHERE id = ?1"#,
                )?;
                let tip = stmt.query_row(params![lookup], tip_from_row).optional()?;
                Ok(tip)
            })
            .await?;

        tip.ok_or_else(|| AppError::NotFound(format!("tip '{id}'")))
    }

    /// Applies the allowed fields from `fields`. Rejects the request before
    /// touching the database when no allowed field is present.
    pub async fn update_tip(&self, id: &str, fields: &Map<String, Value>) -> Result<Tip> {
        let update = TipUpdate::from_fields(fields)?;

        let mut assignments = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();
        if let Some(content) = update.content {
            assignments.push("content = ?");
            values.push(SqlValue::Text(content));
        }
        if let Some(active) = update.is_active {
            assignments.push("is_active = ?");
            values.push(SqlValue::Integer(active as i64));
        }
        if let Some(situation) = update.situation {
            assignments.push("situation = ?");
            values.push(SqlValue::Text(situation.as_str().to_string()));
        }
        if let Some(language) = update.language {
            assignments.push("language = ?");
            values.push(SqlValue::Text(language.as_str().to_string()));
        }
        values.push(SqlValue::Text(id.to_string()));

        let sql = format!(
            "UPDATE tips SET {}, updated_at = datetime('now') WHERE id = ?",
            assignments.join(", ")
        );

        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, params_from_iter(values))?))
            .await?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("tip '{id}'")));
        }

        self.get_tip_details(id).await
    }

    pub async fn soft_delete_tip(&self, id: &str) -> Result<()> {
        let target = id.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "UPDATE tips SET is_active = 0, updated_at = datetime('now') WHERE id = ?1",
                    params![target],
                )?)
            })
            .await?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("tip '{id}'")));
        }
        Ok(())
    }

    /// Removes the tip and its interaction history.
    pub async fn hard_delete_tip(&self, id: &str) -> Result<()> {
        let target = id.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM interactions WHERE tip_id = ?1", params![target])?;
                let changed = tx.execute("DELETE FROM tips WHERE id = ?1", params![target])?;
                tx.commit()?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("tip '{id}'")));
        }
        Ok(())
    }

    pub async fn get_interactions(&self, tip_id: &str) -> Result<Vec<Interaction>> {
        let target = tip_id.to_string();
        let interactions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, tip_id, interaction_type, created_at FROM interactions WHERE tip_id = ?1 ORDER BY id",
                )?;
                let interactions = stmt
                    .query_map(params![target], interaction_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(interactions)
            })
            .await?;
        Ok(interactions)
    }
}

#[async_trait]
impl TipSource for Repository {
    async fn fetch_all(&self, filter: &TipFilter) -> Result<Vec<TipRow>> {
        let mut sql = String::from(
            "SELECT id, situation, language, content, likes, display_count, is_active FROM tips WHERE is_active = 1",
        );
        let mut args: Vec<String> = Vec::new();
        if let Some(situation) = filter.situation {
            sql.push_str(" AND situation = ?");
            args.push(situation.as_str().to_string());
        }
        if let Some(language) = filter.language {
            sql.push_str(" AND language = ?");
            args.push(language.as_str().to_string());
        }
        sql.push_str(" ORDER BY situation, language, created_at, id");

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(args.iter()), tip_row_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    async fn increment_like(&self, key: &TipKey) -> Result<LikeOutcome> {
        let id = key.id.clone();
        let changed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE tips SET likes = COALESCE(likes, 0) + 1, updated_at = datetime('now') WHERE id = ?1",
                    params![id],
                )?;
                if changed > 0 {
                    tx.execute(
                        "INSERT INTO interactions (tip_id, interaction_type) VALUES (?1, ?2)",
                        params![id, InteractionType::Like.as_str()],
                    )?;
                }
                tx.commit()?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("tip '{}'", key.id)));
        }
        Ok(LikeOutcome::Recorded)
    }

    async fn get_like_count(&self, key: &TipKey) -> Result<i64> {
        let id = key.id.clone();
        let likes = self
            .conn
            .call(move |conn| {
                let likes: Option<Option<i64>> = conn
                    .query_row("SELECT likes FROM tips WHERE id = ?1", params![id], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(likes.flatten().unwrap_or(0))
            })
            .await?;
        Ok(likes)
    }

    async fn increment_display_count(&self, key: &TipKey) -> Result<()> {
        let id = key.id.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE tips SET display_count = COALESCE(display_count, 0) + 1 WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn timestamp_column(row: &Row, idx: usize) -> DateTime<Utc> {
    row.get::<_, String>(idx)
        .ok()
        .and_then(|s| parse_datetime(&s))
        .unwrap_or_else(Utc::now)
}

fn tip_row_from_row(row: &Row) -> rusqlite::Result<TipRow> {
    Ok(TipRow {
        id: row.get(0)?,
        situation: row.get(1)?,
        language: row.get(2)?,
        content: row.get(3)?,
        likes: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        display_count: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        is_active: row.get::<_, Option<bool>>(6)?.unwrap_or(true),
    })
}

fn tip_from_row(row: &Row) -> rusqlite::Result<Tip> {
    let situation: String = row.get(1)?;
    let language: String = row.get(2)?;
    Ok(Tip {
        id: row.get(0)?,
        situation: situation.parse().map_err(|e: AppError| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        language: language.parse().map_err(|e: AppError| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        content: row.get(3)?,
        likes: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        display_count: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        created_at: timestamp_column(row, 6),
        updated_at: timestamp_column(row, 7),
        is_active: row.get::<_, Option<bool>>(8)?.unwrap_or(true),
    })
}

fn interaction_from_row(row: &Row) -> rusqlite::Result<Interaction> {
    let kind: String = row.get(2)?;
    let interaction_type = match kind.as_str() {
        "like" => InteractionType::Like,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown interaction type '{other}'").into(),
            ))
        }
    };
    Ok(Interaction {
        id: row.get(0)?,
        tip_id: row.get(1)?,
        interaction_type,
        created_at: timestamp_column(row, 3),
    })
}
