//! Database connection handling
//!
//! This module turns connection parameters into a live PostgreSQL pool.

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::time::Duration;

use crate::error::{Error, Result, SchemaSide};
use crate::schema::types::DEFAULT_SCHEMA;

/// Drivers the tool knows how to talk to
pub const SUPPORTED_DRIVERS: &[&str] = &["postgres"];

/// Default port used when none is given
pub const DEFAULT_PORT: u16 = 5432;

/// Parameters needed to reach one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub user: String,
    pub password: Option<String>,
    pub schema: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            database: String::new(),
            user: String::new(),
            password: None,
            schema: None,
        }
    }
}

impl ConnectionParams {
    /// Host, database and user are mandatory; the password is not
    pub fn validate(&self, side: SchemaSide) -> Result<()> {
        let missing: Vec<&str> = [
            ("host", self.host.as_str()),
            ("database", self.database.as_str()),
            ("user", self.user.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigError(format!(
                "missing {} connection parameter(s): {}",
                side,
                missing.join(", ")
            )))
        }
    }

    /// Configured schema, or `public` when blank
    pub fn schema_name(&self) -> &str {
        match self.schema.as_deref().map(str::trim) {
            Some(schema) if !schema.is_empty() => schema,
            _ => DEFAULT_SCHEMA,
        }
    }

    /// `postgres://` URL with the password percent-escaped
    pub fn connection_url(&self) -> String {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user,
                urlencoding::encode(password),
                self.host,
                self.port,
                self.database
            ),
            None => format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
        }
    }

    /// Same as [`ConnectionParams::connection_url`] but safe to log
    pub fn redacted_url(&self) -> String {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(_) => format!(
                "postgres://{}:***@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
            None => self.connection_url(),
        }
    }
}

fn search_path_sql(schema: &str) -> String {
    format!("SET search_path TO \"{}\"", schema.replace('"', "\"\""))
}

/// A live connection to one side of the replication
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
    schema: String,
    side: SchemaSide,
}

impl DatabaseConnection {
    /// Connect, failing after `timeout` if the server does not answer
    pub async fn connect(params: &ConnectionParams, timeout: Duration, side: SchemaSide) -> Result<Self> {
        params.validate(side)?;

        tracing::debug!(%side, url = %params.redacted_url(), "Connecting");

        // Generated DDL uses bare table names, so they must resolve to this schema.
        let search_path = search_path_sql(params.schema_name());

        // One run uses each connection exclusively, so a single slot is enough.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&params.connection_url())
            .await
            .map_err(|source| Error::ConnectionError { side, source })?;

        Ok(Self {
            pool,
            schema: params.schema_name().to_string(),
            side,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Schema this connection reads and writes
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    pub fn side(&self) -> SchemaSide {
        self.side
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
