//! Database primitives: the shared connection handle and the translation of
//! [`ScopeFilter`] descriptors into query predicates.
//!
//! The access engine stays storage-agnostic; this crate is the one place
//! that knows how a scope descriptor becomes SQL.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use thiserror::Error;
use tracing::info;

pub mod scope;

pub use scope::{ScopeColumns, scope_condition};

/// Shared connection handle alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL missing")]
    MissingUrl,
    #[error("database connection failed")]
    Connect(#[from] sea_orm::DbErr),
}

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self, DbError> {
        std::env::var("DATABASE_URL")
            .map(|url| Self { url })
            .map_err(|_| DbError::MissingUrl)
    }
}

pub async fn connect(settings: &DatabaseSettings) -> Result<DbPool, DbError> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options.sqlx_logging(false);
    let pool = Database::connect(options).await?;
    info!("database pool established");
    Ok(pool)
}
