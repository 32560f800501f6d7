use crate::domain::forecast::PredictionPoint;
use crate::domain::repositories::{
    MAX_PAGE_SIZE, NewPredictionRequest, PredictionRepository, RequestFilter, RequestSummary,
    StoredPrediction, StoredRequest, to_stored_decimal,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

const REQUEST_COLUMNS: &str = "r.request_id, r.species, r.province, r.city, r.date_from, \
     r.date_to, r.created_at, r.ip_address, r.user_agent";

pub struct SqlitePredictionRepository {
    pool: SqlitePool,
}

impl SqlitePredictionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Appends `AND ...` clauses for every set filter field. `point_dates`
/// applies the date bounds to `p.prediction_date` instead of the request.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RequestFilter, point_dates: bool) {
    if let Some(species) = &filter.species {
        qb.push(" AND r.species = ").push_bind(species.clone());
    }
    if let Some(province) = &filter.province {
        qb.push(" AND r.province = ").push_bind(province.clone());
    }
    if let Some(city) = &filter.city {
        qb.push(" AND r.city = ").push_bind(city.clone());
    }
    if let Some(from) = filter.date_from {
        let column = if point_dates { "p.prediction_date" } else { "r.date_from" };
        qb.push(format!(" AND {} >= ", column)).push_bind(from);
    }
    if let Some(to) = filter.date_to {
        let column = if point_dates { "p.prediction_date" } else { "r.date_to" };
        qb.push(format!(" AND {} <= ", column)).push_bind(to);
    }
}

/// SQLite binds are signed; offsets past `i64::MAX` saturate
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, skip: usize, limit: usize) {
    qb.push(" LIMIT ")
        .push_bind(sql_count(limit.min(MAX_PAGE_SIZE)))
        .push(" OFFSET ")
        .push_bind(sql_count(skip));
}

fn decimal_text(value: f64, what: &str) -> Result<String> {
    to_stored_decimal(value)
        .map(|d| d.to_string())
        .with_context(|| format!("Non-finite {} {}", what, value))
}

fn parse_decimal(text: Option<String>) -> Result<Option<Decimal>> {
    text.map(|t| Decimal::from_str(&t).with_context(|| format!("Invalid stored decimal '{}'", t)))
        .transpose()
}

impl SqlitePredictionRepository {
    fn map_request(row: &SqliteRow) -> Result<StoredRequest> {
        Ok(StoredRequest {
            request_id: row.try_get("request_id")?,
            species: row.try_get("species")?,
            province: row.try_get("province")?,
            city: row.try_get("city")?,
            date_from: row.try_get::<NaiveDate, _>("date_from")?,
            date_to: row.try_get::<NaiveDate, _>("date_to")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
        })
    }

    fn map_prediction(row: &SqliteRow) -> Result<StoredPrediction> {
        let value: String = row.try_get("predicted_value")?;
        Ok(StoredPrediction {
            id: row.try_get("id")?,
            request_id: row.try_get("request_id")?,
            prediction_date: row.try_get::<NaiveDate, _>("prediction_date")?,
            predicted_value: Decimal::from_str(&value)
                .with_context(|| format!("Invalid stored decimal '{}'", value))?,
            confidence_lower: parse_decimal(row.try_get("confidence_lower")?)?,
            confidence_upper: parse_decimal(row.try_get("confidence_upper")?)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

#[async_trait]
impl PredictionRepository for SqlitePredictionRepository {
    async fn create_request(&self, request: &NewPredictionRequest) -> Result<StoredRequest> {
        let stored = StoredRequest {
            request_id: Uuid::new_v4().to_string(),
            species: request.species.clone(),
            province: request.province.clone(),
            city: request.city.clone(),
            date_from: request.date_from,
            date_to: request.date_to,
            created_at: Utc::now(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO prediction_requests (
                request_id, species, province, city, date_from, date_to,
                created_at, ip_address, user_agent
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.request_id)
        .bind(&stored.species)
        .bind(&stored.province)
        .bind(&stored.city)
        .bind(stored.date_from)
        .bind(stored.date_to)
        .bind(stored.created_at)
        .bind(&stored.ip_address)
        .bind(&stored.user_agent)
        .execute(&self.pool)
        .await
        .context("Failed to save prediction request")?;

        info!("Persisted prediction request {}", stored.request_id);
        Ok(stored)
    }

    async fn save_predictions(&self, request_id: &str, points: &[PredictionPoint]) -> Result<()> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        for point in points {
            let lower = point
                .confidence_lower
                .map(|v| decimal_text(v, "confidence_lower"))
                .transpose()?;
            let upper = point
                .confidence_upper
                .map(|v| decimal_text(v, "confidence_upper"))
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO predictions (
                    request_id, prediction_date, predicted_value,
                    confidence_lower, confidence_upper, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(request_id)
            .bind(point.date)
            .bind(decimal_text(point.value, "predicted_value")?)
            .bind(lower)
            .bind(upper)
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .context("Failed to save prediction")?;
        }

        tx.commit().await.context("Failed to commit predictions")?;
        Ok(())
    }

    async fn find_request(&self, request_id: &str) -> Result<Option<StoredRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM prediction_requests r WHERE r.request_id = ?",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_request).transpose()
    }

    async fn find_requests(
        &self,
        filter: &RequestFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<RequestSummary>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, (SELECT COUNT(*) FROM predictions p WHERE p.request_id = r.request_id) \
             AS prediction_count FROM prediction_requests r WHERE 1 = 1",
            REQUEST_COLUMNS
        ));
        push_filters(&mut qb, filter, false);
        // Autoincrement id tracks insertion order exactly
        qb.push(" ORDER BY r.id DESC");
        push_page(&mut qb, skip, limit);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list prediction requests")?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let count: i64 = row.try_get("prediction_count")?;
            summaries.push(RequestSummary {
                request: Self::map_request(row)?,
                prediction_count: count as usize,
            });
        }
        Ok(summaries)
    }

    async fn count_requests(&self, filter: &RequestFilter) -> Result<usize> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS count FROM prediction_requests r WHERE 1 = 1",
        );
        push_filters(&mut qb, filter, false);

        let row = qb.build().fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as usize)
    }

    async fn predictions_for(&self, request_id: &str) -> Result<Vec<StoredPrediction>> {
        let rows = sqlx::query(
            "SELECT * FROM predictions WHERE request_id = ? ORDER BY prediction_date ASC, id ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_prediction).collect()
    }

    async fn find_predictions(
        &self,
        filter: &RequestFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<StoredPrediction>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT p.* FROM predictions p \
             JOIN prediction_requests r ON r.request_id = p.request_id WHERE 1 = 1",
        );
        push_filters(&mut qb, filter, true);
        qb.push(" ORDER BY p.prediction_date DESC, p.id DESC");
        push_page(&mut qb, skip, limit);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list predictions")?;

        rows.iter().map(Self::map_prediction).collect()
    }

    async fn delete_request(&self, request_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM predictions WHERE request_id = ?")
            .bind(request_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete predictions")?;
        let deleted = sqlx::query("DELETE FROM prediction_requests WHERE request_id = ?")
            .bind(request_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete prediction request")?;

        tx.commit().await?;

        if deleted.rows_affected() > 0 {
            info!("Deleted prediction request {}", request_id);
        }
        Ok(deleted.rows_affected() > 0)
    }
}
