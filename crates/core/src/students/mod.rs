//! Student domain model and its wire representation.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::sync::model::{
    now_millis, IdempotencyProbe, RemoteDocument, SyncCollection, SyncRecord, SyncStatus,
};

/// A tutored student. Root of the per-student remote subtree: schedules,
/// schedule exceptions and shared resources all nest under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub name: String,
    pub course: String,
    pub subjects: String,
    pub parent_phones: String,
    pub student_phone: String,
    pub student_email: Option<String>,
    pub price_per_hour: f64,
    pub pending_balance: f64,
    pub notes: String,
    pub is_active: bool,
    pub sync_status: SyncStatus,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl Student {
    /// New local-only student, queued for its first upload.
    pub fn new(professor_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            professor_id: professor_id.into(),
            cloud_id: None,
            name: name.into(),
            course: String::new(),
            subjects: String::new(),
            parent_phones: String::new(),
            student_phone: String::new(),
            student_email: None,
            price_per_hour: 0.0,
            pending_balance: 0.0,
            notes: String::new(),
            is_active: true,
            sync_status: SyncStatus::PendingUpload,
            last_modified_timestamp: now_millis(),
            pending_delete: false,
        }
    }

    /// Name key used for duplicate detection and adoption across devices.
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }

    /// Rebuild a student from a pulled remote document. The result carries no
    /// local row id yet and is marked `SYNCED`.
    pub fn from_document(doc: &RemoteDocument, tenant: &str) -> Result<Self> {
        let body: StudentDocument = serde_json::from_value(doc.data.clone())?;
        Ok(Self {
            id: 0,
            professor_id: tenant.to_string(),
            cloud_id: Some(doc.id.clone()),
            name: body.name,
            course: body.course,
            subjects: body.subjects,
            parent_phones: body.parent_phones,
            student_phone: body.student_phone,
            student_email: body.student_email,
            price_per_hour: body.price_per_hour,
            pending_balance: body.pending_balance,
            notes: body.notes,
            is_active: body.is_active,
            sync_status: SyncStatus::Synced,
            last_modified_timestamp: body.last_modified,
            pending_delete: false,
        })
    }
}

/// Wire layout of a student document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDocument {
    pub name: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub subjects: String,
    #[serde(default)]
    pub parent_phones: String,
    #[serde(default)]
    pub student_phone: String,
    #[serde(default)]
    pub student_email: Option<String>,
    #[serde(default)]
    pub price_per_hour: f64,
    #[serde(default)]
    pub pending_balance: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub last_modified: i64,
}

fn default_true() -> bool {
    true
}

impl From<&Student> for StudentDocument {
    fn from(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            course: student.course.clone(),
            subjects: student.subjects.clone(),
            parent_phones: student.parent_phones.clone(),
            student_phone: student.student_phone.clone(),
            student_email: student.student_email.clone(),
            price_per_hour: student.price_per_hour,
            pending_balance: student.pending_balance,
            notes: student.notes.clone(),
            is_active: student.is_active,
            last_modified: student.last_modified_timestamp,
        }
    }
}

impl SyncRecord for Student {
    fn collection(&self) -> SyncCollection {
        SyncCollection::Students
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
            field: "name",
            key: self.name.clone(),
        }
    }

    fn document_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(StudentDocument::from(self))?)
    }
}
