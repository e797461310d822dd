//! SQLite-backed resource and shared-resource stores.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use tutorhub_core::errors::Result;
use tutorhub_core::resources::{Resource, SharedResource};
use tutorhub_core::sync::{LocalRecordStore, SyncStatus};

use super::model::{NewResourceDB, NewSharedResourceDB, ResourceDB, SharedResourceDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{resources, shared_resources};

pub struct ResourceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ResourceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl LocalRecordStore<Resource> for ResourceRepository {
    fn find_by_status(&self, tenant: &str, status: SyncStatus) -> Result<Vec<Resource>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = resources::table
            .filter(resources::professor_id.eq(tenant))
            .filter(resources::sync_status.eq(status.discriminant()))
            .load::<ResourceDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(ResourceDB::into_domain).collect()
    }

    fn find_modified_since(&self, tenant: &str, since: i64) -> Result<Vec<Resource>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = resources::table
            .filter(resources::professor_id.eq(tenant))
            .filter(resources::last_modified_timestamp.gt(since))
            .load::<ResourceDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(ResourceDB::into_domain).collect()
    }

    fn find_by_cloud_id(&self, tenant: &str, cloud_id: &str) -> Result<Option<Resource>> {
        let mut conn = get_connection(&self.pool)?;
        let row = resources::table
            .filter(resources::professor_id.eq(tenant))
            .filter(resources::cloud_id.eq(cloud_id))
            .first::<ResourceDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(ResourceDB::into_domain).transpose()
    }

    fn find_by_local_id(&self, tenant: &str, local_id: i64) -> Result<Option<Resource>> {
        let mut conn = get_connection(&self.pool)?;
        let row = resources::table
            .filter(resources::professor_id.eq(tenant))
            .filter(resources::id.eq(local_id))
            .first::<ResourceDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(ResourceDB::into_domain).transpose()
    }

    fn list_all(&self, tenant: &str) -> Result<Vec<Resource>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = resources::table
            .filter(resources::professor_id.eq(tenant))
            .load::<ResourceDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(ResourceDB::into_domain).collect()
    }

    async fn upsert(&self, record: Resource) -> Result<Resource> {
        self.writer
            .exec(move |conn| {
                if record.id == 0 {
                    let row = NewResourceDB::from(&record);
                    let stored = diesel::insert_into(resources::table)
                        .values(&row)
                        .returning(ResourceDB::as_returning())
                        .get_result::<ResourceDB>(conn)
                        .map_err(StorageError::from)?;
                    stored.into_domain()
                } else {
                    let row = ResourceDB::from(&record);
                    diesel::update(resources::table.find(record.id))
                        .set(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    Ok(record)
                }
            })
            .await
    }

    async fn hard_delete(&self, local_id: i64) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::delete(resources::table.find(local_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

pub struct SharedResourceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SharedResourceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl LocalRecordStore<SharedResource> for SharedResourceRepository {
    fn find_by_status(&self, tenant: &str, status: SyncStatus) -> Result<Vec<SharedResource>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = shared_resources::table
            .filter(shared_resources::professor_id.eq(tenant))
            .filter(shared_resources::sync_status.eq(status.discriminant()))
            .load::<SharedResourceDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(SharedResourceDB::into_domain)
            .collect()
    }

    fn find_modified_since(&self, tenant: &str, since: i64) -> Result<Vec<SharedResource>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = shared_resources::table
            .filter(shared_resources::professor_id.eq(tenant))
            .filter(shared_resources::last_modified_timestamp.gt(since))
            .load::<SharedResourceDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(SharedResourceDB::into_domain)
            .collect()
    }

    fn find_by_cloud_id(&self, tenant: &str, cloud_id: &str) -> Result<Option<SharedResource>> {
        let mut conn = get_connection(&self.pool)?;
        let row = shared_resources::table
            .filter(shared_resources::professor_id.eq(tenant))
            .filter(shared_resources::cloud_id.eq(cloud_id))
            .first::<SharedResourceDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(SharedResourceDB::into_domain).transpose()
    }

    fn find_by_local_id(&self, tenant: &str, local_id: i64) -> Result<Option<SharedResource>> {
        let mut conn = get_connection(&self.pool)?;
        let row = shared_resources::table
            .filter(shared_resources::professor_id.eq(tenant))
            .filter(shared_resources::id.eq(local_id))
            .first::<SharedResourceDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(SharedResourceDB::into_domain).transpose()
    }

    fn list_all(&self, tenant: &str) -> Result<Vec<SharedResource>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = shared_resources::table
            .filter(shared_resources::professor_id.eq(tenant))
            .load::<SharedResourceDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(SharedResourceDB::into_domain)
            .collect()
    }

    async fn upsert(&self, record: SharedResource) -> Result<SharedResource> {
        self.writer
            .exec(move |conn| {
                if record.id == 0 {
                    let row = NewSharedResourceDB::from(&record);
                    let stored = diesel::insert_into(shared_resources::table)
                        .values(&row)
                        .returning(SharedResourceDB::as_returning())
                        .get_result::<SharedResourceDB>(conn)
                        .map_err(StorageError::from)?;
                    stored.into_domain()
                } else {
                    let row = SharedResourceDB::from(&record);
                    diesel::update(shared_resources::table.find(record.id))
                        .set(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    Ok(record)
                }
            })
            .await
    }

    async fn hard_delete(&self, local_id: i64) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::delete(shared_resources::table.find(local_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
