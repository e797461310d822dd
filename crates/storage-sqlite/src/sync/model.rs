//! Database model for the per-tenant sync metadata table.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

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
#[diesel(primary_key(professor_id, key))]
#[diesel(table_name = crate::schema::sync_metadata)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncMetadataDB {
    pub professor_id: String,
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}
