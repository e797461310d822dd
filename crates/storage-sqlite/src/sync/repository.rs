//! Per-tenant sync bookkeeping: watermark, in-progress flag, cleanup clock.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use tutorhub_core::errors::Result;
use tutorhub_core::sync::{now_millis, SyncFlag, SyncMetadataStore};

use super::model::SyncMetadataDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_metadata;

pub const LAST_SYNC_TIMESTAMP_KEY: &str = "last_sync_timestamp";
pub const SYNC_IN_PROGRESS_KEY: &str = "sync_in_progress";
pub const LAST_CLEANUP_TIMESTAMP_KEY: &str = "last_cleanup_timestamp";

pub struct SyncMetadataRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncMetadataRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn get(&self, tenant: &str, metadata_key: &str) -> Result<Option<SyncMetadataDB>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_metadata::table
            .find((tenant, metadata_key))
            .first::<SyncMetadataDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row)
    }

    async fn set(&self, tenant: &str, metadata_key: &str, metadata_value: String) -> Result<()> {
        let row = SyncMetadataDB {
            professor_id: tenant.to_string(),
            key: metadata_key.to_string(),
            value: metadata_value,
            updated_at: now_millis(),
        };
        self.writer
            .exec(move |conn| {
                diesel::insert_into(sync_metadata::table)
                    .values(&row)
                    .on_conflict((sync_metadata::professor_id, sync_metadata::key))
                    .do_update()
                    .set((
                        sync_metadata::value.eq(row.value.clone()),
                        sync_metadata::updated_at.eq(row.updated_at),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    fn get_millis(&self, tenant: &str, metadata_key: &str) -> Result<i64> {
        Ok(self
            .get(tenant, metadata_key)?
            .and_then(|row| row.value.parse::<i64>().ok())
            .unwrap_or(0))
    }
}

#[async_trait]
impl SyncMetadataStore for SyncMetadataRepository {
    fn last_sync_timestamp(&self, tenant: &str) -> Result<i64> {
        self.get_millis(tenant, LAST_SYNC_TIMESTAMP_KEY)
    }

    async fn set_last_sync_timestamp(&self, tenant: &str, timestamp: i64) -> Result<()> {
        self.set(tenant, LAST_SYNC_TIMESTAMP_KEY, timestamp.to_string())
            .await
    }

    fn sync_in_progress(&self, tenant: &str) -> Result<Option<SyncFlag>> {
        Ok(self.get(tenant, SYNC_IN_PROGRESS_KEY)?.map(|row| SyncFlag {
            in_progress: row.value == "true",
            updated_at: row.updated_at,
        }))
    }

    async fn set_sync_in_progress(&self, tenant: &str, in_progress: bool) -> Result<()> {
        self.set(tenant, SYNC_IN_PROGRESS_KEY, in_progress.to_string())
            .await
    }

    fn last_cleanup_timestamp(&self, tenant: &str) -> Result<i64> {
        self.get_millis(tenant, LAST_CLEANUP_TIMESTAMP_KEY)
    }

    async fn set_last_cleanup_timestamp(&self, tenant: &str, timestamp: i64) -> Result<()> {
        self.set(tenant, LAST_CLEANUP_TIMESTAMP_KEY, timestamp.to_string())
            .await
    }

    async fn clear_tenant(&self, tenant: &str) -> Result<()> {
        let tenant = tenant.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(
                    sync_metadata::table.filter(sync_metadata::professor_id.eq(tenant)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
