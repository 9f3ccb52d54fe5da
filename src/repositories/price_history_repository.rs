use super::PriceHistoryStore;
use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{NewPriceRecord, PriceHistoryRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

/// Row shape of `price_history`; `explanation` is JSONB
#[derive(Debug, FromRow)]
struct PriceHistoryRow {
    id: Uuid,
    product_id: Uuid,
    price: i64,
    timestamp: DateTime<Utc>,
    demand_number: i64,
    supply_number: i64,
    momentum: i64,
    explanation: Json<Value>,
}

impl TryFrom<PriceHistoryRow> for PriceHistoryRecord {
    type Error = RepositoryError;

    fn try_from(row: PriceHistoryRow) -> Result<Self, Self::Error> {
        Ok(PriceHistoryRecord {
            explanation: explanation_lines(row.explanation.0, row.id)?,
            id: row.id,
            product_id: row.product_id,
            price: row.price,
            timestamp: row.timestamp,
            demand_number: row.demand_number,
            supply_number: row.supply_number,
            momentum: row.momentum,
        })
    }
}

/// Older rows hold a bare string instead of an array
fn explanation_lines(value: Value, id: Uuid) -> RepositoryResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Null => Ok(vec![]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(RepositoryError::Corrupt(format!(
                    "price_history {} explanation entry {}",
                    id, other
                ))),
            })
            .collect(),
        other => Err(RepositoryError::Corrupt(format!(
            "price_history {} explanation {}",
            id, other
        ))),
    }
}

/// Postgres-backed price history
pub struct PriceHistoryRepository {
    pool: PgPool,
}

impl PriceHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    record: NewPriceRecord,
    timestamp: DateTime<Utc>,
) -> RepositoryResult<PriceHistoryRecord> {
    let record = record.into_record(timestamp);

    let row = sqlx::query_as::<_, PriceHistoryRow>(
        r#"
        INSERT INTO price_history
            (id, product_id, price, "timestamp", demand_number, supply_number, momentum, explanation)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, product_id, price, "timestamp", demand_number, supply_number, momentum, explanation
        "#,
    )
    .bind(record.id)
    .bind(record.product_id)
    .bind(record.price)
    .bind(record.timestamp)
    .bind(record.demand_number)
    .bind(record.supply_number)
    .bind(record.momentum)
    .bind(Json(&record.explanation))
    .fetch_one(executor)
    .await?;

    row.try_into()
}

async fn select_sorted<'e>(
    executor: impl PgExecutor<'e>,
    product_id: Uuid,
) -> RepositoryResult<Vec<PriceHistoryRecord>> {
    let rows = sqlx::query_as::<_, PriceHistoryRow>(
        r#"
        SELECT id, product_id, price, "timestamp", demand_number, supply_number, momentum, explanation
        FROM price_history
        WHERE product_id = $1
        ORDER BY "timestamp" ASC, seq ASC
        "#,
    )
    .bind(product_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(PriceHistoryRecord::try_from).collect()
}

#[async_trait]
impl PriceHistoryStore for PriceHistoryRepository {
    async fn append(&self, record: NewPriceRecord) -> RepositoryResult<PriceHistoryRecord> {
        insert(&self.pool, record, Utc::now()).await
    }

    async fn append_next(
        &self,
        product_id: Uuid,
        next: &(dyn for<'a> Fn(&'a [PriceHistoryRecord]) -> NewPriceRecord + Send + Sync),
    ) -> RepositoryResult<Vec<PriceHistoryRecord>> {
        let mut tx = self.pool.begin().await?;

        // held until commit or rollback; shared by every instance on this database
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(product_id.to_string())
            .execute(&mut *tx)
            .await?;

        let mut series = select_sorted(&mut *tx, product_id).await?;
        let now = Utc::now();
        let timestamp = series.last().map_or(now, |last| last.timestamp.max(now));

        let record = insert(&mut *tx, next(&series[..]), timestamp).await?;
        tx.commit().await?;

        series.push(record);
        Ok(series)
    }

    async fn fetch_sorted(&self, product_id: Uuid) -> RepositoryResult<Vec<PriceHistoryRecord>> {
        select_sorted(&self.pool, product_id).await
    }

    async fn latest(&self, product_id: Uuid) -> RepositoryResult<Option<PriceHistoryRecord>> {
        let row = sqlx::query_as::<_, PriceHistoryRow>(
            r#"
            SELECT id, product_id, price, "timestamp", demand_number, supply_number, momentum, explanation
            FROM price_history
            WHERE product_id = $1
            ORDER BY "timestamp" DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PriceHistoryRecord::try_from).transpose()
    }
}
