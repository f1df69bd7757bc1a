use super::DbPool;
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::error;
use std::any::Any;
use stockfolio_core::errors::{DatabaseError, Error, Result};
use tokio::sync::{mpsc, oneshot};

// A job receives the writer's connection and returns a core Result.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type Reply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(Job<Box<dyn Any + Send + 'static>>, Reply)>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// The job runs inside one immediate transaction: if it returns an error
    /// every write it made is rolled back.
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
            .map_err(|_| writer_gone("writer actor stopped"))?;

        let boxed = ret_rx
            .await
            .map_err(|_| writer_gone("writer actor dropped the reply"))??;

        boxed
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| writer_gone("unexpected result type from writer actor"))
    }
}

fn writer_gone(detail: &str) -> Error {
    Error::Database(DatabaseError::TransactionFailed(detail.to_string()))
}

/// Spawns a background Tokio task that acts as the single writer to the database.
///
/// The actor owns one pooled connection and processes jobs serially, so
/// per-account reconciliation never interleaves with another write.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(Job<Box<dyn Any + Send + 'static>>, Reply)>(1024);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Writer actor could not acquire a connection: {}", e);
                // Dropping the receiver fails every pending and future job.
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(|e: StorageError| e.into());

            // The caller may have gone away; nothing to do then.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}
