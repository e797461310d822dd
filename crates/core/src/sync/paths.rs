//! Builders for the tenant-rooted remote path scheme.
//!
//! Every path is rooted at `tenants/{tenant}`; child collections nest under
//! the owning student so deleting the student subtree erases them all.

pub fn students_collection(tenant: &str) -> String {
    format!("tenants/{tenant}/students")
}

pub fn student_document(tenant: &str, student_cloud_id: &str) -> String {
    format!("tenants/{tenant}/students/{student_cloud_id}")
}

pub fn schedules_collection(tenant: &str, student_cloud_id: &str) -> String {
    format!("tenants/{tenant}/students/{student_cloud_id}/schedules")
}

pub fn schedule_document(tenant: &str, student_cloud_id: &str, schedule_cloud_id: &str) -> String {
    format!("tenants/{tenant}/students/{student_cloud_id}/schedules/{schedule_cloud_id}")
}

pub fn exceptions_collection(
    tenant: &str,
    student_cloud_id: &str,
    schedule_cloud_id: &str,
) -> String {
    format!("tenants/{tenant}/students/{student_cloud_id}/schedules/{schedule_cloud_id}/exceptions")
}

pub fn exception_document(
    tenant: &str,
    student_cloud_id: &str,
    schedule_cloud_id: &str,
    exception_cloud_id: &str,
) -> String {
    format!(
        "tenants/{tenant}/students/{student_cloud_id}/schedules/{schedule_cloud_id}/exceptions/{exception_cloud_id}"
    )
}

pub fn resources_collection(tenant: &str) -> String {
    format!("tenants/{tenant}/resources")
}

pub fn resource_document(tenant: &str, resource_cloud_id: &str) -> String {
    format!("tenants/{tenant}/resources/{resource_cloud_id}")
}

pub fn shared_resources_collection(tenant: &str, student_cloud_id: &str) -> String {
    format!("tenants/{tenant}/students/{student_cloud_id}/shared_resources")
}

pub fn shared_resource_document(
    tenant: &str,
    student_cloud_id: &str,
    shared_cloud_id: &str,
) -> String {
    format!("tenants/{tenant}/students/{student_cloud_id}/shared_resources/{shared_cloud_id}")
}
