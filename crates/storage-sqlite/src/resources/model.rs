//! Database models for resources and shared-resource log entries.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use tutorhub_core::errors::Result;
use tutorhub_core::resources::{Resource, SharedResource};
use tutorhub_core::sync::SyncStatus;

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
#[diesel(table_name = crate::schema::resources)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ResourceDB {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub name: String,
    pub file_type: String,
    pub local_file_path: String,
    pub cloud_storage_path: Option<String>,
    pub upload_date: i64,
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::resources)]
pub struct NewResourceDB {
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub name: String,
    pub file_type: String,
    pub local_file_path: String,
    pub cloud_storage_path: Option<String>,
    pub upload_date: i64,
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl ResourceDB {
    pub fn into_domain(self) -> Result<Resource> {
        Ok(Resource {
            id: self.id,
            professor_id: self.professor_id,
            cloud_id: self.cloud_id,
            name: self.name,
            file_type: self.file_type,
            local_file_path: self.local_file_path,
            cloud_storage_path: self.cloud_storage_path,
            upload_date: self.upload_date,
            sync_status: SyncStatus::from_discriminant(self.sync_status)?,
            last_modified_timestamp: self.last_modified_timestamp,
            pending_delete: self.pending_delete,
        })
    }
}

impl From<&Resource> for ResourceDB {
    fn from(resource: &Resource) -> Self {
        Self {
            id: resource.id,
            professor_id: resource.professor_id.clone(),
            cloud_id: resource.cloud_id.clone(),
            name: resource.name.clone(),
            file_type: resource.file_type.clone(),
            local_file_path: resource.local_file_path.clone(),
            cloud_storage_path: resource.cloud_storage_path.clone(),
            upload_date: resource.upload_date,
            sync_status: resource.sync_status.discriminant(),
            last_modified_timestamp: resource.last_modified_timestamp,
            pending_delete: resource.pending_delete,
        }
    }
}

impl From<&Resource> for NewResourceDB {
    fn from(resource: &Resource) -> Self {
        Self {
            professor_id: resource.professor_id.clone(),
            cloud_id: resource.cloud_id.clone(),
            name: resource.name.clone(),
            file_type: resource.file_type.clone(),
            local_file_path: resource.local_file_path.clone(),
            cloud_storage_path: resource.cloud_storage_path.clone(),
            upload_date: resource.upload_date,
            sync_status: resource.sync_status.discriminant(),
            last_modified_timestamp: resource.last_modified_timestamp,
            pending_delete: resource.pending_delete,
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
#[diesel(table_name = crate::schema::shared_resources)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SharedResourceDB {
    pub id: i64,
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub student_id: i64,
    pub file_name: String,
    pub file_type: String,
    pub file_size_bytes: i64,
    pub shared_via: String,
    pub shared_at: i64,
    pub notes: String,
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::shared_resources)]
pub struct NewSharedResourceDB {
    pub professor_id: String,
    pub cloud_id: Option<String>,
    pub student_id: i64,
    pub file_name: String,
    pub file_type: String,
    pub file_size_bytes: i64,
    pub shared_via: String,
    pub shared_at: i64,
    pub notes: String,
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl SharedResourceDB {
    pub fn into_domain(self) -> Result<SharedResource> {
        Ok(SharedResource {
            id: self.id,
            professor_id: self.professor_id,
            cloud_id: self.cloud_id,
            student_id: self.student_id,
            file_name: self.file_name,
            file_type: self.file_type,
            file_size_bytes: self.file_size_bytes,
            shared_via: self.shared_via,
            shared_at: self.shared_at,
            notes: self.notes,
            sync_status: SyncStatus::from_discriminant(self.sync_status)?,
            last_modified_timestamp: self.last_modified_timestamp,
            pending_delete: self.pending_delete,
        })
    }
}

impl From<&SharedResource> for SharedResourceDB {
    fn from(shared: &SharedResource) -> Self {
        Self {
            id: shared.id,
            professor_id: shared.professor_id.clone(),
            cloud_id: shared.cloud_id.clone(),
            student_id: shared.student_id,
            file_name: shared.file_name.clone(),
            file_type: shared.file_type.clone(),
            file_size_bytes: shared.file_size_bytes,
            shared_via: shared.shared_via.clone(),
            shared_at: shared.shared_at,
            notes: shared.notes.clone(),
            sync_status: shared.sync_status.discriminant(),
            last_modified_timestamp: shared.last_modified_timestamp,
            pending_delete: shared.pending_delete,
        }
    }
}

impl From<&SharedResource> for NewSharedResourceDB {
    fn from(shared: &SharedResource) -> Self {
        Self {
            professor_id: shared.professor_id.clone(),
            cloud_id: shared.cloud_id.clone(),
            student_id: shared.student_id,
            file_name: shared.file_name.clone(),
            file_type: shared.file_type.clone(),
            file_size_bytes: shared.file_size_bytes,
            shared_via: shared.shared_via.clone(),
            shared_at: shared.shared_at,
            notes: shared.notes.clone(),
            sync_status: shared.sync_status.discriminant(),
            last_modified_timestamp: shared.last_modified_timestamp,
            pending_delete: shared.pending_delete,
        }
    }
}
