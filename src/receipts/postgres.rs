use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::BigDecimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::pledges::postgres::{big_decimal_from, decimal_from, map_unique_violation};
use crate::receipts::models::{Receipt, ReceiptAllocation};
use crate::receipts::store::ReceiptStore;

/// Postgres-backed receipt store. Allocations live in a JSONB column; the
/// week and signature uniqueness lives in database constraints so two
/// concurrent settlement runs cannot both record the same week.
pub struct PgReceiptStore {
    pool: PgPool,
}

impl PgReceiptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> AppResult<Receipt> {
        let usd: BigDecimal = row.try_get("total_usd")?;
        let allocations: serde_json::Value = row.try_get("allocations")?;
        let allocations: Vec<ReceiptAllocation> = serde_json::from_value(allocations)
            .map_err(|e| AppError::Internal(format!("receipt allocations decode: {}", e)))?;
        Ok(Receipt {
            id: row.try_get("id")?,
            week_number: row.try_get("week_number")?,
            tx_signature: row.try_get("tx_signature")?,
            total_points: row.try_get("total_points")?,
            total_lamports_requested: row.try_get("total_lamports_requested")?,
            total_lamports_paid: row.try_get("total_lamports_paid")?,
            total_usd: decimal_from(&usd)?,
            pro_rata_applied: row.try_get("pro_rata_applied")?,
            cluster: row.try_get("cluster")?,
            allocations,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

#[async_trait]
impl ReceiptStore for PgReceiptStore {
    async fn create(&self, receipt: Receipt) -> AppResult<Receipt> {
        let allocations = serde_json::to_value(&receipt.allocations)
            .map_err(|e| AppError::Internal(format!("receipt allocations encode: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO receipts (id, week_number, tx_signature, total_points,
                                  total_lamports_requested, total_lamports_paid, total_usd,
                                  pro_rata_applied, cluster, allocations, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(receipt.id)
        .bind(receipt.week_number)
        .bind(&receipt.tx_signature)
        .bind(receipt.total_points)
        .bind(receipt.total_lamports_requested)
        .bind(receipt.total_lamports_paid)
        .bind(big_decimal_from(receipt.total_usd)?)
        .bind(receipt.pro_rata_applied)
        .bind(&receipt.cluster)
        .bind(allocations)
        .bind(receipt.processed_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation("receipt"))?;

        Ok(receipt)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Receipt>> {
        let row = sqlx::query("SELECT * FROM receipts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::from_row(&r)).transpose()
    }

    async fn find_by_week(&self, week_number: i64) -> AppResult<Option<Receipt>> {
        let row = sqlx::query("SELECT * FROM receipts WHERE week_number = $1")
            .bind(week_number)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::from_row(&r)).transpose()
    }

    async fn find_by_signature(&self, signature: &str) -> AppResult<Option<Receipt>> {
        let row = sqlx::query("SELECT * FROM receipts WHERE tx_signature = $1")
            .bind(signature)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::from_row(&r)).transpose()
    }

    async fn list(&self, limit: i64) -> AppResult<Vec<Receipt>> {
        let rows = sqlx::query("SELECT * FROM receipts ORDER BY processed_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::from_row).collect()
    }
}
