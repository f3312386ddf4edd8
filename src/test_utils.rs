//! Shared test utilities for the CFP gateway.
//!
//! This module provides common helper functions for setting up test databases
//! and creating parts, CFP sets and trades with sensible defaults. Fixtures go
//! through the core operations so they exercise the same rules as real writes.

use crate::{
    config::gateway::TradeConfig,
    core::{cfp, parts, trade},
    errors::Result,
    models::{
        AmountRequiredUnit, CfpModel, CfpType, DqrValue, GhgDeclaredUnit, PartsDraft, PartsModel,
        PartsStructureDraft, PartsStructureModel, StatusModel, TradeModel, TradeRequestInput,
    },
    repository::DatabaseRepository,
};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Wraps a fresh in-memory database in the repository the core runs against.
pub async fn setup_test_repo() -> Result<DatabaseRepository> {
    Ok(DatabaseRepository::new(setup_test_db().await?))
}

/// Routes `tracing` output to the test harness; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("cfp_gateway=debug"))
        .with_test_writer()
        .try_init();
}

/// The operator most tests act as.
pub const fn operator_a() -> Uuid {
    Uuid::from_u128(0xa)
}

/// A second operator, usually the supplier.
pub const fn operator_b() -> Uuid {
    Uuid::from_u128(0xb)
}

/// A third operator.
pub const fn operator_c() -> Uuid {
    Uuid::from_u128(0xc)
}

/// The plant every fixture part is produced at.
pub const fn test_plant() -> Uuid {
    Uuid::from_u128(0x100)
}

fn test_draft(operator_id: Uuid, name: String, terminated_flag: bool) -> PartsDraft {
    PartsDraft {
        trace_id: None,
        operator_id,
        plant_id: Some(test_plant()),
        parts_name: name,
        support_parts_name: None,
        terminated_flag,
        amount_required: Some(1.0),
        amount_required_unit: Some(AmountRequiredUnit::Kilogram),
    }
}

/// Creates a structure with a parent and one child per entry of `children`.
///
/// # Arguments
/// * `repo` - Repository to write to
/// * `operator_id` - Owner of every part
/// * `parent_terminal` - Terminal flag of the parent
/// * `children` - Terminal flag of each child, in structure order
///
/// # Defaults
/// * names: `"parent"`, `"child-0"`, `"child-1"`, ...
/// * `plant_id`: [`test_plant`]
/// * amount required: 1.0 kilogram (masked on the parent)
pub async fn create_test_structure(
    repo: &DatabaseRepository,
    operator_id: Uuid,
    parent_terminal: bool,
    children: &[bool],
) -> Result<PartsStructureModel> {
    let draft = PartsStructureDraft {
        parent: Some(test_draft(
            operator_id,
            "parent".to_string(),
            parent_terminal,
        )),
        children: children
            .iter()
            .enumerate()
            .map(|(index, terminal)| test_draft(operator_id, format!("child-{index}"), *terminal))
            .collect(),
    };
    parts::put_parts_structure(repo, operator_id, draft).await
}

/// Creates a single part that heads an empty structure.
pub async fn create_test_part(
    repo: &DatabaseRepository,
    operator_id: Uuid,
    terminated_flag: bool,
) -> Result<PartsModel> {
    Ok(create_test_structure(repo, operator_id, terminated_flag, &[])
        .await?
        .parent)
}

/// Four input rows for a trace, in canonical type order.
///
/// `emissions` are the preProduction, mainProduction, preComponent and mainComponent values.
/// Every row declares kgCO2e/kilogram and carries the DQR triple (2.1, 0.1, 0.1).
pub fn test_cfp_rows(trace_id: Uuid, emissions: [f64; 4]) -> Vec<CfpModel> {
    CfpType::INPUTS
        .iter()
        .zip(emissions)
        .map(|(cfp_type, ghg)| CfpModel {
            cfp_id: None,
            trace_id,
            ghg_emission: Some(ghg),
            ghg_declared_unit: Some(GhgDeclaredUnit::Kilogram),
            cfp_type: *cfp_type,
            dqr_type: cfp_type.dqr_type(),
            dqr_value: DqrValue {
                ter: Some(2.1),
                ger: Some(0.1),
                tir: Some(0.1),
            },
            cfp_certification_ids: Vec::new(),
        })
        .collect()
}

/// Registers a new CFP set built by [`test_cfp_rows`] and returns its cfp-id.
pub async fn put_test_cfp(
    repo: &DatabaseRepository,
    operator_id: Uuid,
    trace_id: Uuid,
    emissions: [f64; 4],
) -> Result<Uuid> {
    cfp::put_cfp(repo, operator_id, test_cfp_rows(trace_id, emissions)).await
}

/// Opens a trade asking `upstream_operator_id` for the CFP of `downstream_trace_id`.
///
/// # Defaults
/// * message: `"Test request"`
/// * due date: `"2026-12-31T00:00:00Z"`
pub async fn create_test_trade(
    repo: &DatabaseRepository,
    downstream_operator_id: Uuid,
    downstream_trace_id: Uuid,
    upstream_operator_id: Uuid,
) -> Result<TradeModel> {
    let input = TradeRequestInput {
        trade_id: None,
        downstream_operator_id,
        upstream_operator_id,
        downstream_trace_id,
        message: Some("Test request".to_string()),
        response_due_date: "2026-12-31T00:00:00Z".to_string(),
    };
    let (trade, _) =
        trade::put_trade_request(repo, &TradeConfig::default(), downstream_operator_id, input)
            .await?;
    Ok(trade)
}

/// Answers a trade as its supplier with `upstream_trace_id`.
pub async fn answer_test_trade(
    repo: &DatabaseRepository,
    trade: &TradeModel,
    upstream_trace_id: Uuid,
) -> Result<StatusModel> {
    trade::put_trade_response(
        repo,
        trade.upstream_operator_id,
        trade.trade_id,
        upstream_trace_id,
    )
    .await
}
