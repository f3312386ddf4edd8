//! Repository contract consumed by the core.
//!
//! Lookups return `Ok(None)` (or an empty list) for normal absence so the aggregator can
//! pattern-match on it; a lookup `Err` is a store failure and is surfaced unchanged. Multi-row
//! writes are atomic, and writes that lose a race report the domain error the caller would have
//! seen had it read afterwards. Either a local database or a remote traceability gateway can sit
//! behind this trait; the crate ships the database implementation.

/// `SeaORM`-backed implementation
pub mod database;

pub use database::DatabaseRepository;

use crate::errors::Result;
use crate::models::{
    CfpModel, CfpType, PartsModel, PartsStructureModel, StatusModel, StatusPage, StatusQuery,
    StatusTarget, StructureHeader, TradeModel,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage operations for parts, CFP rows, trades and request statuses.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Live part with the given trace owned by `operator_id`.
    async fn get_part_by_trace(&self, operator_id: Uuid, trace_id: Uuid)
    -> Result<Option<PartsModel>>;

    /// Structure row of a live part.
    async fn get_parts_structure_header_by_trace(
        &self,
        trace_id: Uuid,
    ) -> Result<Option<StructureHeader>>;

    /// Parent owned by `operator_id` with its live children in structure order.
    async fn get_parts_structure_by_root(
        &self,
        operator_id: Uuid,
        parent_trace_id: Uuid,
    ) -> Result<Option<PartsStructureModel>>;

    /// Upserts the parent and children, replaces the parent's child rows and removes the parts
    /// in `removed` together with their CFP rows.
    async fn put_parts_structure(
        &self,
        structure: &PartsStructureModel,
        removed: &[Uuid],
    ) -> Result<()>;

    /// Soft-deletes every part of the structure and deletes their structure and CFP rows.
    async fn delete_parts_structure(&self, structure: &PartsStructureModel) -> Result<()>;

    /// CFP rows of a trace, empty when none exist.
    async fn list_cfp_by_trace(&self, trace_id: Uuid) -> Result<Vec<CfpModel>>;

    /// One CFP row by set id and type.
    async fn get_cfp_by_id_and_type(
        &self,
        cfp_id: Uuid,
        cfp_type: CfpType,
    ) -> Result<Option<CfpModel>>;

    /// Inserts a fresh set and, in the same unit, writes the completed statuses of the trades it
    /// answers. Fails with [`Error::DuplicateCfp`](crate::errors::Error::DuplicateCfp) when the
    /// trace already has rows of the same type; statuses no longer pending are left alone.
    async fn batch_insert_cfp(
        &self,
        rows: &[CfpModel],
        completed_statuses: &[StatusModel],
    ) -> Result<()>;

    /// Overwrites existing rows in place.
    async fn update_cfp(&self, rows: &[CfpModel]) -> Result<()>;

    /// Replaces the certificate list on every CFP row of a trace.
    async fn put_cfp_certificates(&self, trace_id: Uuid, certification_ids: &[String])
    -> Result<()>;

    /// Live trade requesting CFP for a downstream part.
    async fn get_trade_by_downstream_trace(&self, trace_id: Uuid) -> Result<Option<TradeModel>>;

    /// Live trades answered with the given upstream part.
    async fn list_trades_by_upstream_trace(&self, trace_id: Uuid) -> Result<Vec<TradeModel>>;

    /// Live trade by id.
    async fn get_trade(&self, trade_id: Uuid) -> Result<Option<TradeModel>>;

    /// Inserts a trade and its status; `updated_by` is recorded on both.
    async fn create_trade_request(
        &self,
        trade: &TradeModel,
        status: &StatusModel,
        updated_by: Uuid,
    ) -> Result<()>;

    /// Updates the request fields of an existing trade and its still pending status.
    async fn update_trade_request(
        &self,
        trade: &TradeModel,
        status: &StatusModel,
        updated_by: Uuid,
    ) -> Result<()>;

    /// Records the supplier's answer on the trade and writes the resulting status. Fails with
    /// [`Error::InvalidTransition`](crate::errors::Error::InvalidTransition) when the status left
    /// `PENDING` since it was read.
    async fn put_trade_response(
        &self,
        trade_id: Uuid,
        upstream_trace_id: Uuid,
        status: &StatusModel,
        updated_by: Uuid,
    ) -> Result<()>;

    /// Soft-deletes a trade and its status.
    async fn delete_trade(&self, trade_id: Uuid, updated_by: Uuid) -> Result<()>;

    /// Live status bound to a trade.
    async fn get_status_by_trade(&self, trade_id: Uuid) -> Result<Option<StatusModel>>;

    /// One page of a single status stream, ordered by status id. The store fetches
    /// `limit + 1` rows and turns the surplus row's id into `next`.
    async fn list_statuses(&self, query: &StatusQuery) -> Result<StatusPage>;

    /// Number of live statuses on one side of the operator's trades.
    async fn count_statuses(&self, operator_id: Uuid, target: StatusTarget) -> Result<u64>;

    /// Moves a pending status to `CANCEL`.
    async fn cancel_status(
        &self,
        trade_id: Uuid,
        reply_message: Option<&str>,
        updated_by: Uuid,
    ) -> Result<()>;

    /// Moves a pending status to `REJECT`.
    async fn reject_status(
        &self,
        trade_id: Uuid,
        reply_message: Option<&str>,
        updated_by: Uuid,
    ) -> Result<()>;
}
