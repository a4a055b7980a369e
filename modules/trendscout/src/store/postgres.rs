use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use trendscout_common::{CacheEntry, CacheKey, Country, HistoryRecord, TimeRange, TrendReport};

use super::TrendStore;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connecting to Postgres")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if missing. Safe to run on every start.
    pub async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("migration failed: {}", first_line(statement)))?;
        }
        info!("Trend store migrations applied");
        Ok(())
    }
}

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS trend_cache (
        topic       TEXT        NOT NULL,
        country     TEXT        NOT NULL,
        time_range  TEXT        NOT NULL,
        payload     JSONB       NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (topic, country, time_range)
    )",
    "CREATE TABLE IF NOT EXISTS trend_history (
        id          UUID        PRIMARY KEY,
        user_id     TEXT        NOT NULL,
        topic       TEXT        NOT NULL,
        country     TEXT        NOT NULL,
        time_range  TEXT        NOT NULL,
        report      JSONB       NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS trend_history_user_created
        ON trend_history (user_id, created_at DESC)",
];

fn first_line(sql: &str) -> &str {
    sql.lines().next().unwrap_or(sql).trim()
}

#[derive(sqlx::FromRow)]
struct CacheRow {
    topic: String,
    country: String,
    time_range: String,
    payload: Json<TrendReport>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    user_id: String,
    topic: String,
    country: String,
    time_range: String,
    report: Json<TrendReport>,
    created_at: DateTime<Utc>,
}

fn parse_params(country: &str, range: &str) -> Result<(Country, TimeRange)> {
    let country = Country::parse(country).ok_or_else(|| anyhow!("stored country {country:?} is not recognized"))?;
    let range = TimeRange::parse(range).ok_or_else(|| anyhow!("stored range {range:?} is not recognized"))?;
    Ok((country, range))
}

#[async_trait]
impl TrendStore for PostgresStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, CacheRow>(
            "SELECT topic, country, time_range, payload, updated_at
             FROM trend_cache
             WHERE topic = $1 AND country = $2 AND time_range = $3",
        )
        .bind(&key.topic)
        .bind(key.country.as_str())
        .bind(key.range.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("reading trend_cache")?;

        row.map(|row| {
            let (country, range) = parse_params(&row.country, &row.time_range)?;
            Ok(CacheEntry {
                key: CacheKey::new(row.topic, country, range),
                payload: row.payload.0,
                updated_at: row.updated_at,
            })
        })
        .transpose()
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO trend_cache (topic, country, time_range, payload, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (topic, country, time_range)
             DO UPDATE SET payload = EXCLUDED.payload,
                           updated_at = EXCLUDED.updated_at",
        )
        .bind(&entry.key.topic)
        .bind(entry.key.country.as_str())
        .bind(entry.key.range.as_str())
        .bind(Json(&entry.payload))
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .context("upserting trend_cache")?;
        Ok(())
    }

    async fn append(&self, record: HistoryRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO trend_history (id, user_id, topic, country, time_range, report, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_id)
        .bind(&record.topic)
        .bind(record.country.as_str())
        .bind(record.range.as_str())
        .bind(Json(&record.report))
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .context("appending trend_history")?;
        Ok(())
    }

    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT user_id, topic, country, time_range, report, created_at
             FROM trend_history
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("reading trend_history")?;

        rows.into_iter()
            .map(|row| {
                let (country, range) = parse_params(&row.country, &row.time_range)?;
                Ok(HistoryRecord {
                    user_id: row.user_id,
                    topic: row.topic,
                    country,
                    range,
                    report: row.report.0,
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
