//! Teaching resources and the log of resources shared with students.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::sync::model::{
    now_millis, IdempotencyProbe, RemoteDocument, SyncCollection, SyncRecord, SyncStatus,
};

/// A teaching material tracked by the tutor (worksheet, exam, notes file).
/// Only the metadata syncs; file bytes live outside this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub name: String,
    /// MIME type.
    pub file_type: String,
    /// Path in the app's private storage on this device.
    pub local_file_path: String,
    /// Blob-store path once the file itself was uploaded.
    pub cloud_storage_path: Option<String>,
    pub upload_date: i64,
    pub sync_status: SyncStatus,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl Resource {
    pub fn new(professor_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: 0,
            professor_id: professor_id.into(),
            cloud_id: None,
            name: name.into(),
            file_type: "application/pdf".to_string(),
            local_file_path: String::new(),
            cloud_storage_path: None,
            upload_date: now,
            sync_status: SyncStatus::PendingUpload,
            last_modified_timestamp: now,
            pending_delete: false,
        }
    }

    pub fn from_document(doc: &RemoteDocument, tenant: &str) -> Result<Self> {
        let body: ResourceDocument = serde_json::from_value(doc.data.clone())?;
        Ok(Self {
            id: 0,
            professor_id: tenant.to_string(),
            cloud_id: Some(doc.id.clone()),
            name: body.name,
            file_type: body.file_type,
            // The file only exists on the device that created it until the
            // blob is fetched separately.
            local_file_path: String::new(),
            cloud_storage_path: body.cloud_storage_path,
            upload_date: body.upload_date,
            sync_status: SyncStatus::Synced,
            last_modified_timestamp: body.last_modified,
            pending_delete: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDocument {
    pub local_id: i64,
    pub name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub cloud_storage_path: Option<String>,
    #[serde(default)]
    pub upload_date: i64,
    pub last_modified: i64,
}

impl From<&Resource> for ResourceDocument {
    fn from(resource: &Resource) -> Self {
        Self {
            local_id: resource.id,
            name: resource.name.clone(),
            file_type: resource.file_type.clone(),
            cloud_storage_path: resource.cloud_storage_path.clone(),
            upload_date: resource.upload_date,
            last_modified: resource.last_modified_timestamp,
        }
    }
}

impl SyncRecord for Resource {
    fn collection(&self) -> SyncCollection {
        SyncCollection::Resources
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
        Ok(serde_json::to_value(ResourceDocument::from(self))?)
    }
}

/// One "file shared with a student" event, kept for the tutor's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedResource {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub student_id: i64,
    pub file_name: String,
    pub file_type: String,
    pub file_size_bytes: i64,
    /// Channel the file went out on, e.g. "EMAIL" or "WHATSAPP".
    pub shared_via: String,
    pub shared_at: i64,
    pub notes: String,
    pub sync_status: SyncStatus,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl SharedResource {
    pub fn new(
        professor_id: impl Into<String>,
        student_id: i64,
        file_name: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: 0,
            professor_id: professor_id.into(),
            cloud_id: None,
            student_id,
            file_name: file_name.into(),
            file_type: "application/pdf".to_string(),
            file_size_bytes: 0,
            shared_via: "EMAIL".to_string(),
            shared_at: now,
            notes: String::new(),
            sync_status: SyncStatus::PendingUpload,
            last_modified_timestamp: now,
            pending_delete: false,
        }
    }

    pub fn from_document(doc: &RemoteDocument, tenant: &str, student_id: i64) -> Result<Self> {
        let body: SharedResourceDocument = serde_json::from_value(doc.data.clone())?;
        Ok(Self {
            id: 0,
            professor_id: tenant.to_string(),
            cloud_id: Some(doc.id.clone()),
            student_id,
            file_name: body.file_name,
            file_type: body.file_type,
            file_size_bytes: body.file_size_bytes,
            shared_via: body.shared_via,
            shared_at: body.shared_at,
            notes: body.notes,
            sync_status: SyncStatus::Synced,
            last_modified_timestamp: body.last_modified,
            pending_delete: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedResourceDocument {
    pub local_id: i64,
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size_bytes: i64,
    #[serde(default)]
    pub shared_via: String,
    #[serde(default)]
    pub shared_at: i64,
    #[serde(default)]
    pub notes: String,
    pub last_modified: i64,
}

impl From<&SharedResource> for SharedResourceDocument {
    fn from(shared: &SharedResource) -> Self {
        Self {
            local_id: shared.id,
            file_name: shared.file_name.clone(),
            file_type: shared.file_type.clone(),
            file_size_bytes: shared.file_size_bytes,
            shared_via: shared.shared_via.clone(),
            shared_at: shared.shared_at,
            notes: shared.notes.clone(),
            last_modified: shared.last_modified_timestamp,
        }
    }
}

impl SyncRecord for SharedResource {
    fn collection(&self) -> SyncCollection {
        SyncCollection::SharedResources
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
        Ok(serde_json::to_value(SharedResourceDocument::from(self))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_document_round_trip() {
        let mut resource = Resource::new("p1", "Fractions worksheet");
        resource.id = 3;
        resource.cloud_storage_path = Some("files/p1/fractions.pdf".to_string());
        resource.last_modified_timestamp = 9_000;

        let doc = RemoteDocument {
            id: "r1".to_string(),
            last_modified: 9_000,
            data: resource.document_body().unwrap(),
        };
        let restored = Resource::from_document(&doc, "p1").unwrap();

        assert_eq!(restored.name, "Fractions worksheet");
        assert_eq!(
            restored.cloud_storage_path.as_deref(),
            Some("files/p1/fractions.pdf")
        );
        assert_eq!(restored.sync_status, SyncStatus::Synced);
        assert!(restored.local_file_path.is_empty());
    }
}
