use chrono::{DateTime, Utc};
use sqlx::{Executor, MySql, MySqlPool};
use tracing::{debug, warn};

use super::{Appended, AttendanceStore, IdentityStore};
use crate::error::AppError;
use crate::model::attendance::{AttendanceLog, AttendanceRow, LastEntry, NewAttendance};
use crate::model::store::Store;
use crate::model::store_user::StoreUser;

const LOG_SELECT: &str = r#"
    SELECT a.id, a.store_id, a.user_id, su.full_name, a.action, a.timestamp
    FROM attendance a
    LEFT JOIN store_users su ON su.id = a.user_id AND su.store_id = a.store_id
"#;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

async fn latest_in<'e, E>(
    executor: E,
    store_id: u64,
    user_id: u64,
) -> Result<Option<LastEntry>, AppError>
where
    E: Executor<'e, Database = MySql>,
{
    let row = sqlx::query_as::<_, (u64, String, DateTime<Utc>)>(
        r#"
        SELECT id, action, timestamp
        FROM attendance
        WHERE user_id = ?
        AND store_id = ?
        ORDER BY timestamp DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(store_id)
    .fetch_optional(executor)
    .await?;

    row.map(|(id, action, timestamp)| {
        let action = action.parse().map_err(|_| {
            AppError::Storage(format!("attendance row {id} has unknown action {action:?}"))
        })?;
        Ok(LastEntry {
            id,
            action,
            timestamp,
        })
    })
    .transpose()
}

fn into_log(row: AttendanceRow) -> Result<AttendanceLog, AppError> {
    let id = row.id;
    AttendanceLog::try_from(row)
        .map_err(|e| AppError::Storage(format!("attendance row {id}: {e}")))
}

impl AttendanceStore for MySqlStore {
    async fn latest_entry(
        &self,
        store_id: u64,
        user_id: u64,
    ) -> Result<Option<LastEntry>, AppError> {
        latest_in(&self.pool, store_id, user_id).await
    }

    async fn find_staff(&self, user_id: u64, store_id: u64) -> Result<Option<StoreUser>, AppError> {
        let staff = sqlx::query_as::<_, StoreUser>(
            r#"
            SELECT id, store_id, full_name, email_address, password_hash
            FROM store_users
            WHERE id = ?
            AND store_id = ?
            "#,
        )
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn append(
        &self,
        record: NewAttendance,
        after: Option<u64>,
    ) -> Result<Appended, AppError> {
        let mut tx = self.pool.begin().await?;

        // Appends for one store serialize on its row, across instances too.
        sqlx::query("SELECT id FROM stores WHERE id = ? FOR UPDATE")
            .bind(record.store_id)
            .fetch_optional(&mut *tx)
            .await?;

        let current = latest_in(&mut *tx, record.store_id, record.user_id)
            .await?
            .map(|entry| entry.id);
        if current != after {
            warn!(
                store_id = record.store_id,
                user_id = record.user_id,
                expected = ?after,
                found = ?current,
                "Attendance append lost a race"
            );
            tx.rollback().await?;
            return Ok(Appended::Stale);
        }

        let id = sqlx::query(
            r#"
            INSERT INTO attendance (store_id, user_id, action, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(record.store_id)
        .bind(record.user_id)
        .bind(record.action.as_ref())
        .bind(record.timestamp)
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        let row = sqlx::query_as::<_, AttendanceRow>(&format!("{LOG_SELECT} WHERE a.id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(id, "Attendance row inserted");

        into_log(row).map(Appended::Inserted)
    }

    async fn list_logs(&self, store_id: u64) -> Result<Vec<AttendanceLog>, AppError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "{LOG_SELECT} WHERE a.store_id = ? ORDER BY a.timestamp DESC, a.id DESC"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_log).collect()
    }

    async fn delete_log(&self, store_id: u64, id: u64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ? AND store_id = ?")
            .bind(id)
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_logs(&self, store_id: u64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM attendance WHERE store_id = ?")
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl IdentityStore for MySqlStore {
    async fn find_store_by_email(&self, email: &str) -> Result<Option<Store>, AppError> {
        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, name, email_address, password_hash
            FROM stores
            WHERE email_address = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(store)
    }

    async fn find_staff_by_email(
        &self,
        email: &str,
        store_id: Option<u64>,
    ) -> Result<Option<StoreUser>, AppError> {
        let staff = sqlx::query_as::<_, StoreUser>(
            r#"
            SELECT id, store_id, full_name, email_address, password_hash
            FROM store_users
            WHERE email_address = ?
            AND (? IS NULL OR store_id = ?)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(store_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn store_refresh_token(
        &self,
        email: &str,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (email_address, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(email)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ?
            AND revoked = FALSE
            AND expires_at > NOW()
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
