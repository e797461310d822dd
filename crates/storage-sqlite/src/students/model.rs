//! Database model for the students table.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use tutorhub_core::errors::Result;
use tutorhub_core::students::Student;
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
#[diesel(table_name = crate::schema::students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StudentDB {
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
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::students)]
pub struct NewStudentDB {
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
    pub sync_status: i32,
    pub last_modified_timestamp: i64,
    pub pending_delete: bool,
}

impl StudentDB {
    pub fn into_domain(self) -> Result<Student> {
        Ok(Student {
            id: self.id,
            professor_id: self.professor_id,
            cloud_id: self.cloud_id,
            name: self.name,
            course: self.course,
            subjects: self.subjects,
            parent_phones: self.parent_phones,
            student_phone: self.student_phone,
            student_email: self.student_email,
            price_per_hour: self.price_per_hour,
            pending_balance: self.pending_balance,
            notes: self.notes,
            is_active: self.is_active,
            sync_status: SyncStatus::from_discriminant(self.sync_status)?,
            last_modified_timestamp: self.last_modified_timestamp,
            pending_delete: self.pending_delete,
        })
    }
}

impl From<&Student> for StudentDB {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            professor_id: student.professor_id.clone(),
            cloud_id: student.cloud_id.clone(),
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
            sync_status: student.sync_status.discriminant(),
            last_modified_timestamp: student.last_modified_timestamp,
            pending_delete: student.pending_delete,
        }
    }
}

impl From<&Student> for NewStudentDB {
    fn from(student: &Student) -> Self {
        Self {
            professor_id: student.professor_id.clone(),
            cloud_id: student.cloud_id.clone(),
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
            sync_status: student.sync_status.discriminant(),
            last_modified_timestamp: student.last_modified_timestamp,
            pending_delete: student.pending_delete,
        }
    }
}
