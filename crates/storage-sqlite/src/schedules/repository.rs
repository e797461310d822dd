//! SQLite-backed schedule and schedule-exception stores.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use tutorhub_core::errors::Result;
use tutorhub_core::schedules::{Schedule, ScheduleException};
use tutorhub_core::sync::{LocalRecordStore, SyncStatus};

use super::model::{
    NewScheduleDB, NewScheduleExceptionDB, ScheduleDB, ScheduleExceptionDB,
};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{schedule_exceptions, schedules};

pub struct ScheduleRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ScheduleRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Schedules of one student, soft-deleted rows excluded.
    pub fn list_for_student(&self, tenant: &str, student_id: i64) -> Result<Vec<Schedule>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = schedules::table
            .filter(schedules::professor_id.eq(tenant))
            .filter(schedules::student_id.eq(student_id))
            .filter(schedules::pending_delete.eq(false))
            .order((schedules::day_of_week.asc(), schedules::start_time.asc()))
            .load::<ScheduleDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(ScheduleDB::into_domain).collect()
    }
}

#[async_trait]
impl LocalRecordStore<Schedule> for ScheduleRepository {
    fn find_by_status(&self, tenant: &str, status: SyncStatus) -> Result<Vec<Schedule>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = schedules::table
            .filter(schedules::professor_id.eq(tenant))
            .filter(schedules::sync_status.eq(status.discriminant()))
            .load::<ScheduleDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(ScheduleDB::into_domain).collect()
    }

    fn find_modified_since(&self, tenant: &str, since: i64) -> Result<Vec<Schedule>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = schedules::table
            .filter(schedules::professor_id.eq(tenant))
            .filter(schedules::last_modified_timestamp.gt(since))
            .load::<ScheduleDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(ScheduleDB::into_domain).collect()
    }

    fn find_by_cloud_id(&self, tenant: &str, cloud_id: &str) -> Result<Option<Schedule>> {
        let mut conn = get_connection(&self.pool)?;
        let row = schedules::table
            .filter(schedules::professor_id.eq(tenant))
            .filter(schedules::cloud_id.eq(cloud_id))
            .first::<ScheduleDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(ScheduleDB::into_domain).transpose()
    }

    fn find_by_local_id(&self, tenant: &str, local_id: i64) -> Result<Option<Schedule>> {
        let mut conn = get_connection(&self.pool)?;
        let row = schedules::table
            .filter(schedules::professor_id.eq(tenant))
            .filter(schedules::id.eq(local_id))
            .first::<ScheduleDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(ScheduleDB::into_domain).transpose()
    }

    fn list_all(&self, tenant: &str) -> Result<Vec<Schedule>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = schedules::table
            .filter(schedules::professor_id.eq(tenant))
            .load::<ScheduleDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(ScheduleDB::into_domain).collect()
    }

    async fn upsert(&self, record: Schedule) -> Result<Schedule> {
        self.writer
            .exec(move |conn| {
                if record.id == 0 {
                    let row = NewScheduleDB::from(&record);
                    let stored = diesel::insert_into(schedules::table)
                        .values(&row)
                        .returning(ScheduleDB::as_returning())
                        .get_result::<ScheduleDB>(conn)
                        .map_err(StorageError::from)?;
                    stored.into_domain()
                } else {
                    let row = ScheduleDB::from(&record);
                    diesel::update(schedules::table.find(record.id))
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
                diesel::delete(schedules::table.find(local_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

pub struct ScheduleExceptionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ScheduleExceptionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl LocalRecordStore<ScheduleException> for ScheduleExceptionRepository {
    fn find_by_status(&self, tenant: &str, status: SyncStatus) -> Result<Vec<ScheduleException>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = schedule_exceptions::table
            .filter(schedule_exceptions::professor_id.eq(tenant))
            .filter(schedule_exceptions::sync_status.eq(status.discriminant()))
            .load::<ScheduleExceptionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(ScheduleExceptionDB::into_domain)
            .collect()
    }

    fn find_modified_since(&self, tenant: &str, since: i64) -> Result<Vec<ScheduleException>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = schedule_exceptions::table
            .filter(schedule_exceptions::professor_id.eq(tenant))
            .filter(schedule_exceptions::last_modified_timestamp.gt(since))
            .load::<ScheduleExceptionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(ScheduleExceptionDB::into_domain)
            .collect()
    }

    fn find_by_cloud_id(&self, tenant: &str, cloud_id: &str) -> Result<Option<ScheduleException>> {
        let mut conn = get_connection(&self.pool)?;
        let row = schedule_exceptions::table
            .filter(schedule_exceptions::professor_id.eq(tenant))
            .filter(schedule_exceptions::cloud_id.eq(cloud_id))
            .first::<ScheduleExceptionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(ScheduleExceptionDB::into_domain).transpose()
    }

    fn find_by_local_id(&self, tenant: &str, local_id: i64) -> Result<Option<ScheduleException>> {
        let mut conn = get_connection(&self.pool)?;
        let row = schedule_exceptions::table
            .filter(schedule_exceptions::professor_id.eq(tenant))
            .filter(schedule_exceptions::id.eq(local_id))
            .first::<ScheduleExceptionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(ScheduleExceptionDB::into_domain).transpose()
    }

    fn list_all(&self, tenant: &str) -> Result<Vec<ScheduleException>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = schedule_exceptions::table
            .filter(schedule_exceptions::professor_id.eq(tenant))
            .load::<ScheduleExceptionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(ScheduleExceptionDB::into_domain)
            .collect()
    }

    async fn upsert(&self, record: ScheduleException) -> Result<ScheduleException> {
        self.writer
            .exec(move |conn| {
                if record.id == 0 {
                    let row = NewScheduleExceptionDB::from_domain(&record)?;
                    let stored = diesel::insert_into(schedule_exceptions::table)
                        .values(&row)
                        .returning(ScheduleExceptionDB::as_returning())
                        .get_result::<ScheduleExceptionDB>(conn)
                        .map_err(StorageError::from)?;
                    stored.into_domain()
                } else {
                    let row = ScheduleExceptionDB::from_domain(&record)?;
                    diesel::update(schedule_exceptions::table.find(record.id))
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
                diesel::delete(schedule_exceptions::table.find(local_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
