//! MySQL implementation of the TokenStore trait.
//!
//! Records live in `refresh_tokens`. Every refresh value ever stored is also
//! hashed into `refresh_value_registry`, which is never pruned, so a value
//! cannot be accepted twice even after its record is gone.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlConnection, MySqlPool, Row};
use uuid::Uuid;

use tw_core::domain::entities::{value_digest, PrincipalId, TokenRecord};
use tw_core::errors::DomainError;
use tw_core::repositories::TokenStore;

use super::map_sqlx_error;

const SELECT_COLUMNS: &str =
    "SELECT id, principal_id, refresh_value, access_value, issued_at, expires_at, revoked FROM refresh_tokens";

/// Byte-exact match on `refresh_value`; binds the value twice
///
/// The first comparison uses the unique index, the second rejects matches a
/// case-insensitive or PAD SPACE column collation would let through.
pub(crate) const MATCH_REFRESH_VALUE: &str =
    "refresh_value = ? AND CAST(refresh_value AS BINARY) = CAST(? AS BINARY)";

/// MySQL implementation of TokenStore
///
/// Multi-step operations run inside a transaction. Dropping an in-flight
/// call drops the transaction, which rolls it back.
pub struct MySqlTokenStore {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlTokenStore {
    /// Create a new MySQL token store
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert database row to TokenRecord entity
    fn row_to_record(row: &sqlx::mysql::MySqlRow) -> Result<TokenRecord, DomainError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| DomainError::Internal { message: format!("Failed to get id: {}", e) })?;
        let principal_id: String = row
            .try_get("principal_id")
            .map_err(|e| DomainError::Internal { message: format!("Failed to get principal_id: {}", e) })?;

        Ok(TokenRecord {
            id: Uuid::parse_str(&id)
                .map_err(|e| DomainError::Internal { message: format!("Invalid token UUID: {}", e) })?,
            principal_id: PrincipalId::new(principal_id),
            refresh_value: row
                .try_get("refresh_value")
                .map_err(|e| DomainError::Internal { message: format!("Failed to get refresh_value: {}", e) })?,
            access_value: row
                .try_get("access_value")
                .map_err(|e| DomainError::Internal { message: format!("Failed to get access_value: {}", e) })?,
            issued_at: row
                .try_get::<DateTime<Utc>, _>("issued_at")
                .map_err(|e| DomainError::Internal { message: format!("Failed to get issued_at: {}", e) })?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| DomainError::Internal { message: format!("Failed to get expires_at: {}", e) })?,
            revoked: row
                .try_get("revoked")
                .map_err(|e| DomainError::Internal { message: format!("Failed to get revoked: {}", e) })?,
        })
    }

    /// Claim the refresh value in the registry; conflicts if it was ever used
    async fn register_value(conn: &mut MySqlConnection, record: &TokenRecord) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO refresh_value_registry (value_hash, issued_at) VALUES (?, ?)")
            .bind(value_digest(&record.refresh_value))
            .bind(record.issued_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error(e, "refresh token value"))?;
        Ok(())
    }

    async fn insert_record(conn: &mut MySqlConnection, record: &TokenRecord) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO refresh_tokens (
                id, principal_id, refresh_value, access_value, issued_at, expires_at, revoked
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(record.id.to_string())
            .bind(record.principal_id.as_str())
            .bind(&record.refresh_value)
            .bind(&record.access_value)
            .bind(record.issued_at)
            .bind(record.expires_at)
            .bind(record.revoked)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error(e, "token record for principal"))?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MySqlTokenStore {
    async fn create(&self, record: TokenRecord) -> Result<TokenRecord, DomainError> {
        let mut tx = self.pool.begin().await.map_err(DomainError::storage)?;

        Self::register_value(&mut tx, &record).await?;
        Self::insert_record(&mut tx, &record).await?;

        tx.commit().await.map_err(DomainError::storage)?;
        Ok(record)
    }

    async fn find_by_refresh_value(&self, refresh_value: &str) -> Result<Option<TokenRecord>, DomainError> {
        let query = format!("{} WHERE {} LIMIT 1", SELECT_COLUMNS, MATCH_REFRESH_VALUE);

        let result = sqlx::query(&query)
            .bind(refresh_value)
            .bind(refresh_value)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::storage)?;

        result.as_ref().map(Self::row_to_record).transpose()
    }

    async fn find_by_principal(&self, principal_id: &PrincipalId) -> Result<Option<TokenRecord>, DomainError> {
        let query = format!("{} WHERE principal_id = ? LIMIT 2", SELECT_COLUMNS);

        let rows = sqlx::query(&query)
            .bind(principal_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::storage)?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(Some(Self::row_to_record(row)?)),
            _ => Err(DomainError::Internal {
                message: format!("more than one token record for principal {}", principal_id),
            }),
        }
    }

    async fn delete(&self, refresh_value: &str) -> Result<bool, DomainError> {
        let query = format!("DELETE FROM refresh_tokens WHERE {}", MATCH_REFRESH_VALUE);

        let result = sqlx::query(&query)
            .bind(refresh_value)
            .bind(refresh_value)
            .execute(&self.pool)
            .await
            .map_err(DomainError::storage)?;

        Ok(result.rows_affected() > 0)
    }

    /// MySQL reports changed rows, so re-writing identical values yields
    /// `Ok(false)` even though the record exists.
    async fn update(&self, record: TokenRecord) -> Result<bool, DomainError> {
        let query = format!(
            "UPDATE refresh_tokens SET access_value = ?, issued_at = ?, expires_at = ?, revoked = ? \
             WHERE {} AND principal_id = ?",
            MATCH_REFRESH_VALUE
        );

        let result = sqlx::query(&query)
            .bind(&record.access_value)
            .bind(record.issued_at)
            .bind(record.expires_at)
            .bind(record.revoked)
            .bind(&record.refresh_value)
            .bind(&record.refresh_value)
            .bind(record.principal_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(DomainError::storage)?;

        Ok(result.rows_affected() > 0)
    }

    async fn rotate(&self, consumed: &str, replacement: TokenRecord) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(DomainError::storage)?;

        // Row lock: a concurrent rotation of the same value waits here and
        // then finds the row gone.
        let lock_query = format!(
            "SELECT id, principal_id, revoked FROM refresh_tokens WHERE {} FOR UPDATE",
            MATCH_REFRESH_VALUE
        );
        let current = sqlx::query(&lock_query)
            .bind(consumed)
            .bind(consumed)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DomainError::storage)?;

        let Some(current) = current else {
            return Ok(false);
        };
        let id: String = current.try_get("id").map_err(DomainError::storage)?;
        let owner: String = current.try_get("principal_id").map_err(DomainError::storage)?;
        let revoked: bool = current.try_get("revoked").map_err(DomainError::storage)?;

        if revoked {
            return Ok(false);
        }
        if owner != replacement.principal_id.as_str() {
            return Err(DomainError::Internal {
                message: "rotation replacement belongs to a different principal".to_string(),
            });
        }

        sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DomainError::storage)?;
        Self::register_value(&mut tx, &replacement).await?;
        Self::insert_record(&mut tx, &replacement).await?;

        tx.commit().await.map_err(DomainError::storage)?;
        Ok(true)
    }

    async fn purge(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE revoked = TRUE OR expires_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(DomainError::storage)?;

        Ok(result.rows_affected() as usize)
    }
}
