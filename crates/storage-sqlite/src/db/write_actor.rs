//! Dedicated writer thread serializing all database mutations.
//!
//! SQLite allows one writer at a time; funnelling every mutation through a
//! single thread avoids lock contention and gives each job an implicit
//! transaction boundary.

use std::sync::mpsc;
use std::thread;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use tokio::sync::oneshot;

use tutorhub_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Async handle to the writer thread. Cheap to clone; every repository holds
/// one.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<WriteJob>,
}

impl WriteHandle {
    /// Run `job` on the writer thread inside an immediate transaction and
    /// await its result.
    pub async fn exec<R, F>(&self, job: F) -> Result<R>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let wrapped: WriteJob = Box::new(move |conn| {
            let result = conn
                .immediate_transaction(|tx| job(tx).map_err(StorageError::Domain))
                .map_err(Error::from);
            let _ = reply_tx.send(result);
        });

        self.tx.send(wrapped).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Database writer is gone".to_string(),
            ))
        })?;
        reply_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Database writer dropped the reply".to_string(),
            ))
        })?
    }
}

/// Spawn the writer thread against a pool-owned connection.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, rx) = mpsc::channel::<WriteJob>();
    thread::Builder::new()
        .name("db-writer".to_string())
        .spawn(move || {
            let mut conn = match pool.get() {
                Ok(conn) => conn,
                Err(err) => {
                    warn!("Database writer failed to acquire a connection: {err}");
                    return;
                }
            };
            debug!("Database writer started");
            while let Ok(job) = rx.recv() {
                job(&mut conn);
            }
            debug!("Database writer stopped");
        })
        .expect("Failed to spawn db-writer thread");
    WriteHandle { tx }
}
