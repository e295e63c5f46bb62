use super::DbPool;
use crate::errors::StorageError;
use craftflow_core::errors::{DatabaseError, Error, Result};
use diesel::SqliteConnection;
use log::{debug, error};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// A job runs against the writer's connection, inside an immediate transaction.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type ErasedReply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Pending jobs before `exec` callers start waiting for a slot.
const QUEUE_CAPACITY: usize = 1024;

/// Handle for sending jobs to the writer actor.
///
/// Every write in the process goes through one actor, so transactions never
/// interleave and SQLite never sees two concurrent writers.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, ErasedReply)>,
}

fn writer_stopped() -> Error {
    Error::Database(DatabaseError::Internal(
        "database writer is not running".to_string(),
    ))
}

impl WriteHandle {
    /// Run `job` on the writer's connection inside an immediate transaction.
    ///
    /// If the job returns an error the transaction is rolled back.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| writer_stopped())?;

        let boxed = ret_rx.await.map_err(|_| writer_stopped())??;
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::Unexpected("writer returned an unexpected type".to_string()))
    }
}

/// Spawn the single writer task. It owns one pooled connection for its
/// whole lifetime and stops once every [`WriteHandle`] is dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, ErasedReply)>(QUEUE_CAPACITY);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                // Dropping `rx` makes every pending and future `exec` fail.
                error!("Database writer could not get a connection: {}", e);
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(|e: StorageError| e.into());

            // The requester may have gone away (cancelled task); nothing to do.
            let _ = reply_tx.send(result);
        }

        debug!("Database writer stopped");
    });

    WriteHandle { tx }
}
