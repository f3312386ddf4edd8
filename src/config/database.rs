//! Database configuration module for the CFP gateway.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the database schema always matches the Rust struct definitions.

use crate::entities::{CfpInfo, Part, PartsStructure, RequestStatus, Trade, cfp_info};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema, sea_query::Index};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/cfp_gateway.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all gateway tables from the entity definitions, skipping tables that already exist.
///
/// A trace holds at most one CFP row per type, enforced by a unique index on
/// `(trace_id, cfp_type)`.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(Part),
        schema.create_table_from_entity(PartsStructure),
        schema.create_table_from_entity(CfpInfo),
        schema.create_table_from_entity(Trade),
        schema.create_table_from_entity(RequestStatus),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(&*statement)).await?;
    }

    let cfp_per_trace = Index::create()
        .name("idx_cfp_infos_trace_type")
        .table(CfpInfo)
        .col(cfp_info::Column::TraceId)
        .col(cfp_info::Column::CfpType)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&cfp_per_trace)).await?;

    info!("Database tables ensured ({} tables)", statements.len());
    Ok(())
}
