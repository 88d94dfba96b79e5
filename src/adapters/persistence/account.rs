use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::account::{Account, BillingFields},
    use_cases::account::AccountRepo,
};

fn row_to_account(row: sqlx::postgres::PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        plan_type: row.get("plan_type"),
        subscription_status: row.get("subscription_status"),
        stripe_customer_id: row.get("stripe_customer_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        deletion_scheduled_at: row.get("deletion_scheduled_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = "id, email, display_name, plan_type, subscription_status, \
     stripe_customer_id, stripe_subscription_id, current_period_start, current_period_end, \
     deletion_scheduled_at, created_at, updated_at";

#[async_trait]
impl AccountRepo for PostgresPersistence {
    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users_auth WHERE email = $1",
            SELECT_COLS
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_account))
    }

    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users_auth WHERE stripe_customer_id = $1 ORDER BY created_at LIMIT 1",
            SELECT_COLS
        ))
        .bind(customer_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_account))
    }

    async fn create_if_absent(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> AppResult<(Account, bool)> {
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO users_auth (email, display_name)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(email)
        .bind(display_name)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        if let Some(row) = inserted {
            return Ok((row_to_account(row), true));
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM users_auth WHERE email = $1",
            SELECT_COLS
        ))
        .bind(email)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok((row_to_account(row), false))
    }

    async fn update_billing_with(
        &self,
        account_id: Uuid,
        transition: &(dyn for<'b> Fn(&'b BillingFields) -> BillingFields + Send + Sync),
    ) -> AppResult<(Account, bool)> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        // Concurrent deliveries for one account apply one after another
        let row = sqlx::query(&format!(
            "SELECT {} FROM users_auth WHERE id = $1 FOR UPDATE",
            SELECT_COLS
        ))
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;

        let account = row_to_account(row);
        let current = account.billing();
        let next = transition(&current);

        if next == current {
            tx.commit().await.map_err(AppError::from)?;
            return Ok((account, false));
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE users_auth
            SET plan_type = $2,
                subscription_status = $3,
                stripe_customer_id = $4,
                stripe_subscription_id = $5,
                current_period_start = $6,
                current_period_end = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(account_id)
        .bind(next.plan_type)
        .bind(next.subscription_status)
        .bind(&next.stripe_customer_id)
        .bind(&next.stripe_subscription_id)
        .bind(next.current_period_start)
        .bind(next.current_period_end)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;

        Ok((row_to_account(row), true))
    }

    async fn set_deletion_schedule(
        &self,
        account_id: Uuid,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> AppResult<Account> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users_auth
            SET deletion_scheduled_at = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(account_id)
        .bind(scheduled_at)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        row.map(row_to_account).ok_or(AppError::NotFound)
    }

    async fn purge_scheduled(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM users_auth WHERE deletion_scheduled_at IS NOT NULL AND deletion_scheduled_at <= $1",
        )
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }
}
