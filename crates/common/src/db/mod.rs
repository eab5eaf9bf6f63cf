//! Database layer for Acadex
//!
//! Provides:
//! - SeaORM entity models
//! - Connection pool management
//! - Idempotent schema bootstrap
//! - Repository pattern for data access

pub mod models;
mod repository;

pub use repository::{NewInstitute, Repository, StudentProfile, Upserted};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::*;
use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction,
    EntityTrait, Schema, TransactionTrait,
};
use std::time::Duration;
use tracing::info;

/// Name of the unique index backing attendance upserts
pub const ATTENDANCE_KEY_INDEX: &str = "uq_attendance_student_subject_date";

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(config.sql_logging);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e)
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Get the pooled connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Start a transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        self.conn.begin().await.map_err(Into::into)
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}

/// Create every table that does not exist yet, parents before children.
pub async fn init_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    let schema = Schema::new(conn.get_database_backend());

    create_table(conn, &schema, InstituteEntity).await?;
    create_table(conn, &schema, UserEntity).await?;
    create_table(conn, &schema, EmployeeEntity).await?;
    create_table(conn, &schema, StudentEntity).await?;
    create_table(conn, &schema, ClassEntity).await?;
    create_table(conn, &schema, RoomEntity).await?;
    create_table(conn, &schema, ExamBranchEntity).await?;
    create_table(conn, &schema, BlueprintUploadEntity).await?;
    create_table(conn, &schema, SubjectEntity).await?;
    create_table(conn, &schema, FacultySubjectEntity).await?;
    create_table(conn, &schema, AttendanceEntity).await?;

    let attendance_key = Index::create()
        .name(ATTENDANCE_KEY_INDEX)
        .table(AttendanceEntity)
        .col(AttendanceColumn::StudentId)
        .col(AttendanceColumn::SubjectId)
        .col(AttendanceColumn::Date)
        .unique()
        .if_not_exists()
        .to_owned();
    conn.execute(conn.get_database_backend().build(&attendance_key))
        .await?;

    info!("Database tables ready");
    Ok(())
}

async fn create_table<C, E>(conn: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    conn.execute(conn.get_database_backend().build(&stmt)).await?;
    Ok(())
}

/// Single-connection in-memory SQLite pool with the schema created
#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let mut config = DatabaseConfig::with_url("sqlite::memory:");
    config.max_connections = 1;
    config.min_connections = 1;

    let pool = DbPool::new(&config).await.expect("connect sqlite");
    init_schema(pool.conn()).await.expect("init schema");
    pool
}
