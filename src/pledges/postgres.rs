use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::types::BigDecimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::pledges::models::{Ngo, Pledge, PledgeStatus};
use crate::pledges::store::{NgoStore, PledgeStore};

/// Postgres-backed pledge store.
pub struct PgPledgeStore {
    pool: PgPool,
}

impl PgPledgeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> AppResult<Pledge> {
        let status_str: String = row.try_get("status")?;
        let status = PledgeStatus::from_str(&status_str)
            .ok_or_else(|| AppError::Internal(format!("invalid pledge status {}", status_str)))?;
        let usd: BigDecimal = row.try_get("usd_value")?;
        Ok(Pledge {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            ngo_id: row.try_get("ngo_id")?,
            points: row.try_get("points")?,
            week_number: row.try_get("week_number")?,
            status,
            receipt_id: row.try_get("receipt_id")?,
            usd_value: decimal_from(&usd)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl PledgeStore for PgPledgeStore {
    async fn create(&self, pledge: Pledge) -> AppResult<Pledge> {
        sqlx::query(
            r#"
            INSERT INTO pledges (id, user_id, ngo_id, points, week_number, status,
                                 receipt_id, usd_value, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(pledge.id)
        .bind(pledge.user_id)
        .bind(pledge.ngo_id)
        .bind(pledge.points)
        .bind(pledge.week_number)
        .bind(pledge.status.as_str())
        .bind(pledge.receipt_id)
        .bind(big_decimal_from(pledge.usd_value)?)
        .bind(pledge.created_at)
        .bind(pledge.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation("pledge"))?;

        Ok(pledge)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Pledge>> {
        let row = sqlx::query("SELECT * FROM pledges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::from_row(&r)).transpose()
    }

    async fn pending_for_week(&self, week_number: i64) -> AppResult<Vec<Pledge>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM pledges
            WHERE week_number = $1 AND status = 'pending'
            ORDER BY created_at
            "#,
        )
        .bind(week_number)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn mark_completed(&self, ids: &[Uuid], receipt_id: Uuid) -> AppResult<u64> {
        // The status predicate enforces the pending → completed transition;
        // terminal rows are left untouched.
        let result = sqlx::query(
            r#"
            UPDATE pledges
            SET status = 'completed', receipt_id = $2, updated_at = NOW()
            WHERE id = ANY($1) AND status = 'pending'
            "#,
        )
        .bind(ids)
        .bind(receipt_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_failed(&self, ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE pledges
            SET status = 'failed', updated_at = NOW()
            WHERE id = ANY($1) AND status = 'pending'
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Postgres-backed NGO store.
pub struct PgNgoStore {
    pool: PgPool,
}

impl PgNgoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> AppResult<Ngo> {
        let usd: BigDecimal = row.try_get("total_received_usd")?;
        Ok(Ngo {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            wallet_address: row.try_get("wallet_address")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            is_active: row.try_get("is_active")?,
            total_received_lamports: row.try_get("total_received_lamports")?,
            total_received_usd: decimal_from(&usd)?,
            donation_count: row.try_get("donation_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl NgoStore for PgNgoStore {
    async fn create(&self, ngo: Ngo) -> AppResult<Ngo> {
        sqlx::query(
            r#"
            INSERT INTO ngos (id, name, wallet_address, description, category, is_active,
                              total_received_lamports, total_received_usd, donation_count,
                              created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(ngo.id)
        .bind(&ngo.name)
        .bind(&ngo.wallet_address)
        .bind(&ngo.description)
        .bind(&ngo.category)
        .bind(ngo.is_active)
        .bind(ngo.total_received_lamports)
        .bind(big_decimal_from(ngo.total_received_usd)?)
        .bind(ngo.donation_count)
        .bind(ngo.created_at)
        .bind(ngo.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation("ngo"))?;

        Ok(ngo)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Ngo>> {
        let row = sqlx::query("SELECT * FROM ngos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::from_row(&r)).transpose()
    }

    async fn list(&self) -> AppResult<Vec<Ngo>> {
        let rows = sqlx::query("SELECT * FROM ngos ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn list_active(&self) -> AppResult<Vec<Ngo>> {
        let rows = sqlx::query("SELECT * FROM ngos WHERE is_active = TRUE ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn record_disbursement(&self, id: Uuid, lamports: i64, usd: Decimal) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE ngos
            SET total_received_lamports = total_received_lamports + $2,
                total_received_usd = total_received_usd + $3,
                donation_count = donation_count + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(lamports)
        .bind(big_decimal_from(usd)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("ngo {}", id)));
        }
        Ok(())
    }
}

pub(crate) fn decimal_from(value: &BigDecimal) -> AppResult<Decimal> {
    Decimal::from_str(&value.to_string())
        .map_err(|e| AppError::Internal(format!("decimal conversion: {}", e)))
}

pub(crate) fn big_decimal_from(value: Decimal) -> AppResult<BigDecimal> {
    BigDecimal::from_str(&value.to_string())
        .map_err(|e| AppError::Internal(format!("decimal conversion: {}", e)))
}

pub(crate) fn map_unique_violation(what: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::AlreadyExists(what.to_string())
        }
        _ => AppError::Database(e),
    }
}
