use tracing::{debug, error};

use crate::database::manager::DatabaseError;
use crate::database::store::Store;

/// One open transaction, finished exactly once through [`UnitOfWork::complete`].
///
/// If the owning future is dropped (client disconnect) or panics before
/// `complete` runs, the transaction is dropped with it and the store rolls it back.
pub struct UnitOfWork<'s, S: Store> {
    store: &'s S,
    tx: S::Tx,
}

impl<'s, S: Store> UnitOfWork<'s, S> {
    pub async fn begin(store: &'s S) -> Result<Self, DatabaseError> {
        let tx = store.begin().await?;
        Ok(Self { store, tx })
    }

    pub fn tx(&mut self) -> &mut S::Tx {
        &mut self.tx
    }

    /// Commit on `Ok`, roll back on `Err`.
    ///
    /// A failed commit replaces the success value with the commit error. A failed
    /// rollback is logged and the original error is returned unchanged.
    pub async fn complete<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        let Self { store, tx } = self;
        match outcome {
            Ok(value) => {
                store.commit(tx).await.map_err(E::from)?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = store.rollback(tx).await {
                    error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
