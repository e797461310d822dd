//! SQLite-backed student store.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use tutorhub_core::errors::Result;
use tutorhub_core::students::Student;
use tutorhub_core::sync::{LocalRecordStore, SyncStatus};

use super::model::{NewStudentDB, StudentDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::students;

pub struct StudentRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl StudentRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Students visible to the app: soft-deleted rows are excluded.
    pub fn list_active(&self, tenant: &str) -> Result<Vec<Student>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = students::table
            .filter(students::professor_id.eq(tenant))
            .filter(students::pending_delete.eq(false))
            .order(students::name.asc())
            .load::<StudentDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(StudentDB::into_domain).collect()
    }
}

#[async_trait]
impl LocalRecordStore<Student> for StudentRepository {
    fn find_by_status(&self, tenant: &str, status: SyncStatus) -> Result<Vec<Student>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = students::table
            .filter(students::professor_id.eq(tenant))
            .filter(students::sync_status.eq(status.discriminant()))
            .load::<StudentDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(StudentDB::into_domain).collect()
    }

    fn find_modified_since(&self, tenant: &str, since: i64) -> Result<Vec<Student>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = students::table
            .filter(students::professor_id.eq(tenant))
            .filter(students::last_modified_timestamp.gt(since))
            .load::<StudentDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(StudentDB::into_domain).collect()
    }

    fn find_by_cloud_id(&self, tenant: &str, cloud_id: &str) -> Result<Option<Student>> {
        let mut conn = get_connection(&self.pool)?;
        let row = students::table
            .filter(students::professor_id.eq(tenant))
            .filter(students::cloud_id.eq(cloud_id))
            .first::<StudentDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(StudentDB::into_domain).transpose()
    }

    fn find_by_local_id(&self, tenant: &str, local_id: i64) -> Result<Option<Student>> {
        let mut conn = get_connection(&self.pool)?;
        let row = students::table
            .filter(students::professor_id.eq(tenant))
            .filter(students::id.eq(local_id))
            .first::<StudentDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(StudentDB::into_domain).transpose()
    }

    fn list_all(&self, tenant: &str) -> Result<Vec<Student>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = students::table
            .filter(students::professor_id.eq(tenant))
            .load::<StudentDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(StudentDB::into_domain).collect()
    }

    async fn upsert(&self, record: Student) -> Result<Student> {
        self.writer
            .exec(move |conn| {
                if record.id == 0 {
                    let row = NewStudentDB::from(&record);
                    let stored = diesel::insert_into(students::table)
                        .values(&row)
                        .returning(StudentDB::as_returning())
                        .get_result::<StudentDB>(conn)
                        .map_err(StorageError::from)?;
                    stored.into_domain()
                } else {
                    let row = StudentDB::from(&record);
                    diesel::update(students::table.find(record.id))
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
                // Child rows cascade via foreign keys.
                diesel::delete(students::table.find(local_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, init, run_migrations, spawn_writer};
    use crate::schedules::ScheduleRepository;
    use tempfile::tempdir;
    use tutorhub_core::schedules::Schedule;

    fn setup_db() -> (Arc<DbPool>, WriteHandle) {
        let app_data = tempdir()
            .expect("tempdir")
            .keep()
            .to_string_lossy()
            .to_string();
        let db_path = init(&app_data).expect("init db");
        run_migrations(&db_path).expect("migrate db");
        let pool = create_pool(&db_path).expect("create pool");
        let writer = spawn_writer(pool.as_ref().clone());
        (pool, writer)
    }

    fn sample_student(name: &str, status: SyncStatus) -> Student {
        let mut student = Student::new("p1", name);
        student.sync_status = status;
        student.pending_delete = status == SyncStatus::PendingDelete;
        student
    }

    #[tokio::test]
    async fn round_trips_every_sync_status_discriminant() {
        let (pool, writer) = setup_db();
        let repo = StudentRepository::new(pool, writer);

        for (i, status) in [
            SyncStatus::Synced,
            SyncStatus::PendingUpload,
            SyncStatus::PendingDelete,
            SyncStatus::Conflict,
            SyncStatus::Error,
        ]
        .into_iter()
        .enumerate()
        {
            let stored = repo
                .upsert(sample_student(&format!("Student {i}"), status))
                .await
                .expect("insert");
            assert!(stored.id > 0);
            let reloaded = repo
                .find_by_local_id("p1", stored.id)
                .expect("query")
                .expect("present");
            assert_eq!(reloaded.sync_status, status);
        }
    }

    #[tokio::test]
    async fn status_queries_are_tenant_scoped() {
        let (pool, writer) = setup_db();
        let repo = StudentRepository::new(pool, writer);

        repo.upsert(sample_student("Ana", SyncStatus::PendingUpload))
            .await
            .expect("insert");
        let mut foreign = Student::new("p2", "Other tenant");
        foreign.sync_status = SyncStatus::PendingUpload;
        repo.upsert(foreign).await.expect("insert");

        let pending = repo
            .find_by_status("p1", SyncStatus::PendingUpload)
            .expect("query");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "Ana");
        assert!(repo
            .find_by_status("p1", SyncStatus::PendingDelete)
            .expect("query")
            .is_empty());

        let modified = repo.find_modified_since("p1", 0).expect("query");
        assert_eq!(modified.len(), 1);
        assert!(repo
            .find_modified_since("p1", modified[0].last_modified_timestamp)
            .expect("query")
            .is_empty());
    }

    #[tokio::test]
    async fn soft_deleted_rows_are_invisible_to_normal_reads() {
        let (pool, writer) = setup_db();
        let repo = StudentRepository::new(pool, writer);

        repo.upsert(sample_student("Visible", SyncStatus::Synced))
            .await
            .expect("insert");
        repo.upsert(sample_student("Hidden", SyncStatus::PendingDelete))
            .await
            .expect("insert");

        let active = repo.list_active("p1").expect("query");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Visible");

        // The engine still sees the soft-deleted row.
        assert_eq!(repo.list_all("p1").expect("query").len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_student_cascades_to_child_rows() {
        let (pool, writer) = setup_db();
        let students = StudentRepository::new(Arc::clone(&pool), writer.clone());
        let schedules = ScheduleRepository::new(Arc::clone(&pool), writer);

        let student = students
            .upsert(sample_student("Ana", SyncStatus::Synced))
            .await
            .expect("insert student");
        schedules
            .upsert(Schedule::new("p1", student.id, 2))
            .await
            .expect("insert schedule");

        students.hard_delete(student.id).await.expect("delete");

        assert!(students
            .find_by_local_id("p1", student.id)
            .expect("query")
            .is_none());
        assert!(schedules.list_all("p1").expect("query").is_empty());
    }
}
