use std::sync::Arc;

use axum::http::Extensions;
use goodtables_core::session::{DatabaseSession, SessionFactory};
use migration::{Migrator, MigratorTrait};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

/// Handle on the application database.
#[derive(Clone)]
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    pub fn new(conn: DatabaseConnection) -> Self {
        Database { conn }
    }

    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let conn = sea_orm::Database::connect(url)
            .await
            .map_err(|err| anyhow::anyhow!("cannot connect to database: {err}"))?;
        Ok(Database::new(conn))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        Migrator::up(&self.conn, None).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    pub fn sessions(&self) -> Arc<dyn SessionFactory> {
        Arc::new(SeaSessionFactory {
            conn: self.conn.clone(),
        })
    }
}

/// Per-request session. The transaction is begun on first use, so requests
/// that never touch the database never open one.
pub struct SeaSession {
    conn: DatabaseConnection,
    txn: Mutex<Option<DatabaseTransaction>>,
}

impl SeaSession {
    fn new(conn: DatabaseConnection) -> Self {
        SeaSession {
            conn,
            txn: Mutex::new(None),
        }
    }

    pub async fn transaction(&self) -> Result<MappedMutexGuard<'_, DatabaseTransaction>, DbErr> {
        let mut guard = self.txn.lock().await;
        if guard.is_none() {
            *guard = Some(self.conn.begin().await?);
        }
        MutexGuard::try_map(guard, Option::as_mut)
            .map_err(|_| DbErr::Custom("session transaction vanished".into()))
    }
}

#[async_trait::async_trait]
impl DatabaseSession for SeaSession {
    async fn commit(&self) -> Result<(), DbErr> {
        let txn = self.txn.lock().await.take();
        match txn {
            Some(txn) => txn.commit().await,
            None => Ok(()),
        }
    }

    async fn rollback(&self) -> Result<(), DbErr> {
        let txn = self.txn.lock().await.take();
        match txn {
            Some(txn) => txn.rollback().await,
            None => Ok(()),
        }
    }
}

struct SeaSessionFactory {
    conn: DatabaseConnection,
}

impl SessionFactory for SeaSessionFactory {
    fn open(&self, extensions: &mut Extensions) -> Arc<dyn DatabaseSession> {
        let session = Arc::new(SeaSession::new(self.conn.clone()));
        extensions.insert(session.clone());
        session
    }
}
