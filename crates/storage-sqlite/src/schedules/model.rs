//! Database models for schedules and schedule exceptions.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use tutorhub_core::errors::Result;
use tutorhub_core::schedules::{ExceptionKind, Schedule, ScheduleException};
use tutorhub_core::sync::SyncStatus;

pub(crate) fn kind_to_db(kind: &ExceptionKind) -> Result<String> {
    Ok(serde_json::to_string(kind)?.trim_matches('"').to_string())
}

pub(crate) fn kind_from_db(raw: &str) -> Result<ExceptionKind> {
    Ok(serde_json::from_str(&format!("\"{raw}\""))?)
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::schedules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScheduleDB {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub student_id: i64,
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
    pub is_completed: bool,
    pub completed_date: Option<i64>,
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::schedules)]
pub struct NewScheduleDB {
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub student_id: i64,
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
    pub is_completed: bool,
    pub completed_date: Option<i64>,
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl ScheduleDB {
    pub fn into_domain(self) -> Result<Schedule> {
        Ok(Schedule {
            id: self.id,
            professor_id: self.professor_id,
            cloud_id: self.cloud_id,
            student_id: self.student_id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            is_completed: self.is_completed,
            completed_date: self.completed_date,
            sync_status: SyncStatus::from_discriminant(self.sync_status)?,
            last_modified_timestamp: self.last_modified_timestamp,
            pending_delete: self.pending_delete,
        })
    }
}

impl From<&Schedule> for ScheduleDB {
    fn from(schedule: &Schedule) -> Self {
        Self {
            id: schedule.id,
            professor_id: schedule.professor_id.clone(),
            cloud_id: schedule.cloud_id.clone(),
            student_id: schedule.student_id,
            day_of_week: schedule.day_of_week,
            start_time: schedule.start_time.clone(),
            end_time: schedule.end_time.clone(),
            is_completed: schedule.is_completed,
            completed_date: schedule.completed_date,
            sync_status: schedule.sync_status.discriminant(),
            last_modified_timestamp: schedule.last_modified_timestamp,
            pending_delete: schedule.pending_delete,
        }
    }
}

impl From<&Schedule> for NewScheduleDB {
    fn from(schedule: &Schedule) -> Self {
        Self {
            professor_id: schedule.professor_id.clone(),
            cloud_id: schedule.cloud_id.clone(),
            student_id: schedule.student_id,
            day_of_week: schedule.day_of_week,
            start_time: schedule.start_time.clone(),
            end_time: schedule.end_time.clone(),
            is_completed: schedule.is_completed,
            completed_date: schedule.completed_date,
            sync_status: schedule.sync_status.discriminant(),
            last_modified_timestamp: schedule.last_modified_timestamp,
            pending_delete: schedule.pending_delete,
        }
    }
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::schedule_exceptions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScheduleExceptionDB {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub student_id: i64,
    pub schedule_id: i64,
    pub exception_date: i64,
    pub kind: String,
    pub reason: String,
    pub new_start_time: Option<String>,
    pub new_end_time: Option<String>,
    pub new_day_of_week: Option<i32>,
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::schedule_exceptions)]
pub struct NewScheduleExceptionDB {
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub student_id: i64,
    pub schedule_id: i64,
    pub exception_date: i64,
    pub kind: String,
    pub reason: String,
    pub new_start_time: Option<String>,
    pub new_end_time: Option<String>,
    pub new_day_of_week: Option<i32>,
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl ScheduleExceptionDB {
    pub fn into_domain(self) -> Result<ScheduleException> {
        Ok(ScheduleException {
            id: self.id,
            professor_id: self.professor_id,
            cloud_id: self.cloud_id,
            student_id: self.student_id,
            schedule_id: self.schedule_id,
            exception_date: self.exception_date,
            kind: kind_from_db(&self.kind)?,
            reason: self.reason,
            new_start_time: self.new_start_time,
            new_end_time: self.new_end_time,
            new_day_of_week: self.new_day_of_week,
            sync_status: SyncStatus::from_discriminant(self.sync_status)?,
            last_modified_timestamp: self.last_modified_timestamp,
            pending_delete: self.pending_delete,
        })
    }

    pub fn from_domain(exception: &ScheduleException) -> Result<Self> {
        Ok(Self {
            id: exception.id,
            professor_id: exception.professor_id.clone(),
            cloud_id: exception.cloud_id.clone(),
            student_id: exception.student_id,
            schedule_id: exception.schedule_id,
            exception_date: exception.exception_date,
            kind: kind_to_db(&exception.kind)?,
            reason: exception.reason.clone(),
            new_start_time: exception.new_start_time.clone(),
            new_end_time: exception.new_end_time.clone(),
            new_day_of_week: exception.new_day_of_week,
            sync_status: exception.sync_status.discriminant(),
            last_modified_timestamp: exception.last_modified_timestamp,
            pending_delete: exception.pending_delete,
        })
    }
}

impl NewScheduleExceptionDB {
    pub fn from_domain(exception: &ScheduleException) -> Result<Self> {
        Ok(Self {
            professor_id: exception.professor_id.clone(),
            cloud_id: exception.cloud_id.clone(),
            student_id: exception.student_id,
            schedule_id: exception.schedule_id,
            exception_date: exception.exception_date,
            kind: kind_to_db(&exception.kind)?,
            reason: exception.reason.clone(),
            new_start_time: exception.new_start_time.clone(),
            new_end_time: exception.new_end_time.clone(),
            new_day_of_week: exception.new_day_of_week,
            sync_status: exception.sync_status.discriminant(),
            last_modified_timestamp: exception.last_modified_timestamp,
            pending_delete: exception.pending_delete,
        })
    }
}
