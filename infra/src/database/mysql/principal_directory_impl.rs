//! MySQL-backed principal directory
//!
//! Existence checks read the principals table. Deletions are discovered by
//! polling the `principal_deletions` outbox, which whatever removes a
//! principal is expected to append to in the same transaction. A row is
//! deleted once it has been handed to at least one subscriber, so the outbox
//! only ever holds unpublished deletions and commit order does not matter.
//!
//! Notifications can still be lost after publishing (a lagging or restarted
//! listener), so token records whose principal no longer exists are also
//! swept periodically.

use async_trait::async_trait;
use sqlx::{MySqlPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use tw_core::domain::entities::PrincipalId;
use tw_core::errors::DomainError;
use tw_core::repositories::PrincipalRepository;

use crate::InfrastructureError;

/// Default principals table
const DEFAULT_PRINCIPALS_TABLE: &str = "principals";

/// Outbox rows fetched per poll
const POLL_BATCH_SIZE: i64 = 500;

/// Polls between orphan sweeps; the first tick always sweeps
const SWEEP_EVERY_POLLS: u64 = 60;

/// Principal directory reading MySQL
pub struct MySqlPrincipalDirectory {
    pool: MySqlPool,
    exists_query: String,
    sweep_query: String,
    deletions: broadcast::Sender<PrincipalId>,
    /// Serializes polls so a row is never published by two at once
    poll_lock: Mutex<()>,
}

impl MySqlPrincipalDirectory {
    /// Directory over the default `principals` table
    pub fn new(pool: MySqlPool, channel_capacity: usize) -> Self {
        Self::build(pool, DEFAULT_PRINCIPALS_TABLE, channel_capacity)
    }

    /// Directory over a custom table whose primary key column is `id`
    ///
    /// # Returns
    /// * `Err(InfrastructureError::Config)` - `table` is not a plain identifier
    pub fn with_table(pool: MySqlPool, table: &str, channel_capacity: usize) -> Result<Self, InfrastructureError> {
        if !is_identifier(table) {
            return Err(InfrastructureError::Config(format!(
                "Invalid principals table name: {}",
                table
            )));
        }
        Ok(Self::build(pool, table, channel_capacity))
    }

    fn build(pool: MySqlPool, table: &str, channel_capacity: usize) -> Self {
        let (deletions, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            pool,
            exists_query: format!("SELECT 1 FROM `{}` WHERE id = ? LIMIT 1", table),
            sweep_query: orphan_sweep_query(table),
            deletions,
            poll_lock: Mutex::new(()),
        }
    }

    /// Publish pending outbox rows and delete the ones that reached a subscriber
    ///
    /// Rows published while nobody is subscribed stay in the outbox and are
    /// published again by the next poll.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of deletions delivered and removed from the outbox
    /// * `Err(DomainError)` - The outbox could not be read or pruned
    pub async fn poll_deletions(&self) -> Result<usize, DomainError> {
        let _guard = self.poll_lock.lock().await;

        let rows = sqlx::query("SELECT id, principal_id FROM principal_deletions ORDER BY id LIMIT ?")
            .bind(POLL_BATCH_SIZE)
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::storage)?;

        let mut delivered = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: u64 = row.try_get("id").map_err(DomainError::storage)?;
            let principal_id: String = row.try_get("principal_id").map_err(DomainError::storage)?;

            match self.deletions.send(PrincipalId::new(principal_id)) {
                Ok(receivers) => {
                    debug!(outbox_id = id, receivers, "Published principal deletion");
                    delivered.push(id);
                }
                Err(_) => {
                    debug!(outbox_id = id, "No deletion subscribers, leaving outbox row");
                }
            }
        }

        if delivered.is_empty() {
            return Ok(0);
        }

        let delete = handled_rows_delete(delivered.len());
        let mut query = sqlx::query(&delete);
        for id in &delivered {
            query = query.bind(*id);
        }
        query.execute(&self.pool).await.map_err(DomainError::storage)?;

        Ok(delivered.len())
    }

    /// Delete token records whose principal is no longer in the principals table
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records removed
    pub async fn sweep_orphaned_tokens(&self) -> Result<usize, DomainError> {
        let result = sqlx::query(&self.sweep_query)
            .execute(&self.pool)
            .await
            .map_err(DomainError::storage)?;

        let removed = result.rows_affected() as usize;
        if removed > 0 {
            info!(removed, "Removed token records of missing principals");
        }
        Ok(removed)
    }

    /// Poll the outbox on a fixed interval until the task is aborted
    ///
    /// Orphaned records are swept on the first tick and then every
    /// `SWEEP_EVERY_POLLS` polls.
    pub fn start_polling(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "Principal deletion polling started");

            let mut timer = tokio::time::interval(interval);
            let mut polls: u64 = 0;
            loop {
                timer.tick().await;
                if let Err(e) = self.poll_deletions().await {
                    error!(error = %e, "Failed to poll principal deletions");
                }
                if polls % SWEEP_EVERY_POLLS == 0 {
                    if let Err(e) = self.sweep_orphaned_tokens().await {
                        error!(error = %e, "Failed to sweep orphaned token records");
                    }
                }
                polls = polls.wrapping_add(1);
            }
        })
    }
}

#[async_trait]
impl PrincipalRepository for MySqlPrincipalDirectory {
    async fn exists(&self, principal_id: &PrincipalId) -> Result<bool, DomainError> {
        let row = sqlx::query(&self.exists_query)
            .bind(principal_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::storage)?;
        Ok(row.is_some())
    }

    fn subscribe_deletions(&self) -> broadcast::Receiver<PrincipalId> {
        self.deletions.subscribe()
    }
}

/// ASCII letters, digits and underscores, not starting with a digit
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `DELETE ... WHERE id IN (?, ...)` with one placeholder per handled row
pub(crate) fn handled_rows_delete(count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    format!("DELETE FROM principal_deletions WHERE id IN ({})", placeholders)
}

/// Multi-table delete of records whose principal is missing from `table`
pub(crate) fn orphan_sweep_query(table: &str) -> String {
    format!(
        "DELETE rt FROM refresh_tokens rt LEFT JOIN `{}` p ON p.id = rt.principal_id WHERE p.id IS NULL",
        table
    )
}
