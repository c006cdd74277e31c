use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{ScanId, ScanStatus},
    protocol::ScanPredictionUpdate,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredScan {
    pub scan_id: ScanId,
    pub user_id: Option<String>,
    pub image_url: String,
    pub status: ScanStatus,
    pub prediction_label: Option<String>,
    pub prediction_score: Option<f64>,
    pub prediction_json: Option<BTreeMap<String, f64>>,
    pub created_at: DateTime<Utc>,
}

const SCAN_COLUMNS: &str = "id, user_id, image_url, status, prediction_label, prediction_score, prediction_json, created_at";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Registers a freshly uploaded image. The returned id is what the upload
    /// widget hands back alongside the image URL.
    pub async fn create_scan(&self, user_id: Option<&str>, image_url: &str) -> Result<ScanId> {
        let scan_id = ScanId::generate();
        sqlx::query("INSERT INTO scans (id, user_id, image_url, status) VALUES (?, ?, ?, ?)")
            .bind(scan_id.as_str())
            .bind(user_id)
            .bind(image_url)
            .bind(ScanStatus::Uploaded.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to insert scan for image '{image_url}'"))?;
        Ok(scan_id)
    }

    /// Returns `false` when no scan matched `scan_id`.
    pub async fn update_scan_prediction(
        &self,
        scan_id: &ScanId,
        update: &ScanPredictionUpdate,
    ) -> Result<bool> {
        let prediction_json = update
            .prediction_json
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("failed to encode prediction probabilities")?;

        let rows = sqlx::query(
            "UPDATE scans
             SET prediction_label = ?, prediction_score = ?, prediction_json = ?, status = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(&update.prediction_label)
        .bind(update.prediction_score)
        .bind(prediction_json)
        .bind(update.status.as_str())
        .bind(scan_id.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update prediction for scan {scan_id}"))?
        .rows_affected();
        Ok(rows > 0)
    }

    pub async fn get_scan(&self, scan_id: &ScanId) -> Result<Option<StoredScan>> {
        let row = sqlx::query(&format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = ?"))
            .bind(scan_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| scan_from_row(&r)).transpose()
    }

    pub async fn list_scans(&self, user_id: Option<&str>, limit: u32) -> Result<Vec<StoredScan>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {SCAN_COLUMNS} FROM scans WHERE user_id = ?
                     ORDER BY created_at DESC, rowid DESC LIMIT ?"
                ))
                .bind(user_id)
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {SCAN_COLUMNS} FROM scans ORDER BY created_at DESC, rowid DESC LIMIT ?"
                ))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(scan_from_row).collect()
    }
}

fn scan_from_row(row: &SqliteRow) -> Result<StoredScan> {
    let prediction_json = row
        .try_get::<Option<String>, _>("prediction_json")?
        .map(|raw| serde_json::from_str::<BTreeMap<String, f64>>(&raw))
        .transpose()
        .context("stored prediction_json is not a probability map")?;
    let created_at: NaiveDateTime = row.try_get("created_at")?;

    Ok(StoredScan {
        scan_id: ScanId(row.try_get("id")?),
        user_id: row.try_get("user_id")?,
        image_url: row.try_get("image_url")?,
        status: ScanStatus::parse(&row.try_get::<String, _>("status")?),
        prediction_label: row.try_get("prediction_label")?,
        prediction_score: row.try_get("prediction_score")?,
        prediction_json,
        created_at: created_at.and_utc(),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
