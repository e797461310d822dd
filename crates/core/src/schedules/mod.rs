//! Weekly schedules and one-off schedule exceptions.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::sync::model::{
    now_millis, IdempotencyProbe, RemoteDocument, SyncCollection, SyncRecord, SyncStatus,
};

/// A recurring weekly lesson slot for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    /// Local row id of the owning student.
    pub student_id: i64,
    /// ISO weekday, 1 = Monday … 7 = Sunday.
    pub day_of_week: i32,
    /// `HH:mm`.
    pub start_time: String,
    /// `HH:mm`.
    pub end_time: String,
    pub is_completed: bool,
    pub completed_date: Option<i64>,
    pub sync_status: SyncStatus,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl Schedule {
    pub fn new(professor_id: impl Into<String>, student_id: i64, day_of_week: i32) -> Self {
        Self {
            id: 0,
            professor_id: professor_id.into(),
            cloud_id: None,
            student_id,
            day_of_week,
            start_time: "16:00".to_string(),
            end_time: "17:00".to_string(),
            is_completed: false,
            completed_date: None,
            sync_status: SyncStatus::PendingUpload,
            last_modified_timestamp: now_millis(),
            pending_delete: false,
        }
    }

    pub fn from_document(doc: &RemoteDocument, tenant: &str, student_id: i64) -> Result<Self> {
        let body: ScheduleDocument = serde_json::from_value(doc.data.clone())?;
        Ok(Self {
            id: 0,
            professor_id: tenant.to_string(),
            cloud_id: Some(doc.id.clone()),
            student_id,
            day_of_week: body.day_of_week,
            start_time: body.start_time,
            end_time: body.end_time,
            is_completed: body.is_completed,
            completed_date: body.completed_date,
            sync_status: SyncStatus::Synced,
            last_modified_timestamp: body.last_modified,
            pending_delete: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDocument {
    /// Row id on the originating device; only used as the creation
    /// idempotency key, never as cross-device identity.
    pub local_id: i64,
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_date: Option<i64>,
    pub last_modified: i64,
}

impl From<&Schedule> for ScheduleDocument {
    fn from(schedule: &Schedule) -> Self {
        Self {
            local_id: schedule.id,
            day_of_week: schedule.day_of_week,
            start_time: schedule.start_time.clone(),
            end_time: schedule.end_time.clone(),
            is_completed: schedule.is_completed,
            completed_date: schedule.completed_date,
            last_modified: schedule.last_modified_timestamp,
        }
    }
}

impl SyncRecord for Schedule {
    fn collection(&self) -> SyncCollection {
        SyncCollection::Schedules
    }

    fn local_id(&self) -> i64 {
        self.id
    }

    fn set_local_id(&mut self, id: i64) {
        self.id = id;
    }

    fn tenant_id(&self) -> &str {
        &self.professor_id
    }

    fn cloud_id(&self) -> Option<&str> {
        self.cloud_id.as_deref()
    }

    fn set_cloud_id(&mut self, cloud_id: Option<String>) {
        self.cloud_id = cloud_id;
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    fn last_modified(&self) -> i64 {
        self.last_modified_timestamp
    }

    fn pending_delete(&self) -> bool {
        self.pending_delete
    }

    fn idempotency_probe(&self) -> IdempotencyProbe {
        IdempotencyProbe {
            field: "localId",
            key: self.id.to_string(),
        }
    }

    fn document_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(ScheduleDocument::from(self))?)
    }
}

/// Kind of deviation from the weekly pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionKind {
    Cancelled,
    Rescheduled,
    Extra,
}

/// A dated exception to one weekly schedule: a cancelled, moved, or extra
/// lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleException {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub student_id: i64,
    /// Local row id of the schedule the exception applies to.
    pub schedule_id: i64,
    /// Date of the affected occurrence, epoch millis at local midnight.
    pub exception_date: i64,
    pub kind: ExceptionKind,
    pub reason: String,
    pub new_start_time: Option<String>,
    pub new_end_time: Option<String>,
    pub new_day_of_week: Option<i32>,
    pub sync_status: SyncStatus,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl ScheduleException {
    pub fn new(
        professor_id: impl Into<String>,
        student_id: i64,
        schedule_id: i64,
        exception_date: i64,
        kind: ExceptionKind,
    ) -> Self {
        Self {
            id: 0,
            professor_id: professor_id.into(),
            cloud_id: None,
            student_id,
            schedule_id,
            exception_date,
            kind,
            reason: String::new(),
            new_start_time: None,
            new_end_time: None,
            new_day_of_week: None,
            sync_status: SyncStatus::PendingUpload,
            last_modified_timestamp: now_millis(),
            pending_delete: false,
        }
    }

    pub fn from_document(
        doc: &RemoteDocument,
        tenant: &str,
        student_id: i64,
        schedule_id: i64,
    ) -> Result<Self> {
        let body: ScheduleExceptionDocument = serde_json::from_value(doc.data.clone())?;
        Ok(Self {
            id: 0,
            professor_id: tenant.to_string(),
            cloud_id: Some(doc.id.clone()),
            student_id,
            schedule_id,
            exception_date: body.exception_date,
            kind: body.kind,
            reason: body.reason,
            new_start_time: body.new_start_time,
            new_end_time: body.new_end_time,
            new_day_of_week: body.new_day_of_week,
            sync_status: SyncStatus::Synced,
            last_modified_timestamp: body.last_modified,
            pending_delete: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleExceptionDocument {
    pub local_id: i64,
    pub exception_date: i64,
    pub kind: ExceptionKind,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub new_start_time: Option<String>,
    #[serde(default)]
    pub new_end_time: Option<String>,
    #[serde(default)]
    pub new_day_of_week: Option<i32>,
    pub last_modified: i64,
}

impl From<&ScheduleException> for ScheduleExceptionDocument {
    fn from(exception: &ScheduleException) -> Self {
        Self {
            local_id: exception.id,
            exception_date: exception.exception_date,
            kind: exception.kind,
            reason: exception.reason.clone(),
            new_start_time: exception.new_start_time.clone(),
            new_end_time: exception.new_end_time.clone(),
            new_day_of_week: exception.new_day_of_week,
            last_modified: exception.last_modified_timestamp,
        }
    }
}

impl SyncRecord for ScheduleException {
    fn collection(&self) -> SyncCollection {
        SyncCollection::ScheduleExceptions
    }

    fn local_id(&self) -> i64 {
        self.id
    }

    fn set_local_id(&mut self, id: i64) {
        self.id = id;
    }

    fn tenant_id(&self) -> &str {
        &self.professor_id
    }

    fn cloud_id(&self) -> Option<&str> {
        self.cloud_id.as_deref()
    }

    fn set_cloud_id(&mut self, cloud_id: Option<String>) {
        self.cloud_id = cloud_id;
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    fn last_modified(&self) -> i64 {
        self.last_modified_timestamp
    }

    fn pending_delete(&self) -> bool {
        self.pending_delete
    }

    fn idempotency_probe(&self) -> IdempotencyProbe {
        IdempotencyProbe {
            field: "localId",
            key: self.id.to_string(),
        }
    }

    fn document_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(ScheduleExceptionDocument::from(self))?)
    }
}
