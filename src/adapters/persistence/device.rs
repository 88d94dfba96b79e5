use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::device::{Device, DeviceAuthorization, NewDevice},
    use_cases::devices::DeviceRepo,
};

fn row_to_device(row: sqlx::postgres::PgRow) -> Device {
    Device {
        id: row.get("id"),
        user_id: row.get("user_id"),
        device_id: row.get("device_id"),
        device_fingerprint: row.get("device_fingerprint"),
        device_name: row.get("device_name"),
        metadata: row.get("metadata"),
        last_seen: row.get("last_seen"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str =
    "id, user_id, device_id, device_fingerprint, device_name, metadata, last_seen, created_at";

async fn count_devices<'e, E>(executor: E, account_id: Uuid) -> AppResult<i64>
where
    E: sqlx::PgExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_devices WHERE user_id = $1")
        .bind(account_id)
        .fetch_one(executor)
        .await
        .map_err(AppError::from)?;
    Ok(count)
}

#[async_trait]
impl DeviceRepo for PostgresPersistence {
    async fn authorize(
        &self,
        account_id: Uuid,
        max_devices: i64,
        device: &NewDevice,
    ) -> AppResult<DeviceAuthorization> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        // Serializes concurrent registrations for the same account
        let locked = sqlx::query("SELECT id FROM users_auth WHERE id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::from)?;
        if locked.is_none() {
            return Err(AppError::NotFound);
        }

        let refreshed = sqlx::query(
            r#"
            UPDATE user_devices
            SET last_seen = NOW(), metadata = COALESCE($3, metadata)
            WHERE user_id = $1 AND device_id = $2
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(&device.device_id)
        .bind(&device.metadata)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let device_count = count_devices(&mut *tx, account_id).await?;

        if refreshed.is_some() {
            tx.commit().await.map_err(AppError::from)?;
            return Ok(DeviceAuthorization::Existing { device_count });
        }

        if device_count >= max_devices {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(DeviceAuthorization::LimitReached { device_count });
        }

        let inserted: bool = sqlx::query(
            r#"
            INSERT INTO user_devices (user_id, device_id, device_fingerprint, device_name, metadata)
            VALUES ($1, $2, $3, $4, COALESCE($5, '{}'::jsonb))
            ON CONFLICT (user_id, device_id) DO UPDATE SET last_seen = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(account_id)
        .bind(&device.device_id)
        .bind(&device.device_fingerprint)
        .bind(&device.device_name)
        .bind(&device.metadata)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?
        .get("inserted");

        tx.commit().await.map_err(AppError::from)?;

        if inserted {
            Ok(DeviceAuthorization::Registered {
                device_count: device_count + 1,
            })
        } else {
            Ok(DeviceAuthorization::Existing { device_count })
        }
    }

    async fn remove(&self, account_id: Uuid, device_id: &str) -> AppResult<Option<i64>> {
        let deleted = sqlx::query("DELETE FROM user_devices WHERE user_id = $1 AND device_id = $2")
            .bind(account_id)
            .bind(device_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;

        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        count_devices(self.pool(), account_id).await.map(Some)
    }

    async fn list(&self, account_id: Uuid) -> AppResult<Vec<Device>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM user_devices WHERE user_id = $1 ORDER BY last_seen DESC",
            SELECT_COLS
        ))
        .bind(account_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_device).collect())
    }

    async fn count(&self, account_id: Uuid) -> AppResult<i64> {
        count_devices(self.pool(), account_id).await
    }
}
