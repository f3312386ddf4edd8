//! `SeaORM` implementation of the repository contract.
//!
//! Enumerated columns are stored as their wire literals; a literal the domain does not know is
//! reported as [`Error::UnexpectedEnum`]. Parts, trades and statuses are soft-deleted through
//! `deleted_at`, CFP and structure rows are removed outright.
//!
//! Status writes only apply to a row that is still `PENDING`, so of two racing transitions out of
//! `PENDING` exactly one lands.

use super::Repository;
use crate::{
    entities::{
        CfpInfo, Part, PartsStructure, RequestStatus, Trade, cfp_info, part, parts_structure,
        request_status, trade,
    },
    errors::{Error, Result},
    models::{
        CfpModel, CfpResponseStatus, CfpType, DqrValue, PartsModel, PartsStructureModel,
        RequestStatus as Status, StatusModel, StatusPage, StatusQuery, StatusTarget,
        StructureHeader, TradeModel, parse_enum,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, PaginatorTrait, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, instrument};

/// Repository backed by a `SeaORM` database connection.
#[derive(Debug, Clone)]
pub struct DatabaseRepository {
    db: DatabaseConnection,
}

impl DatabaseRepository {
    /// Wraps an open connection whose tables already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn part_from_entity(model: part::Model) -> Result<PartsModel> {
    let amount_required_unit = model
        .amount_required_unit
        .as_deref()
        .map(|unit| parse_enum("amountRequiredUnit", unit))
        .transpose()?;

    Ok(PartsModel {
        trace_id: model.trace_id,
        operator_id: model.operator_id,
        plant_id: model.plant_id,
        parts_name: model.parts_name,
        support_parts_name: model.support_parts_name,
        terminated_flag: model.terminated_flag,
        amount_required: model.amount_required,
        amount_required_unit,
    })
}

fn cfp_from_entity(model: cfp_info::Model) -> Result<CfpModel> {
    let ghg_declared_unit = if model.ghg_declared_unit.is_empty() {
        None
    } else {
        Some(parse_enum("ghgDeclaredUnit", &model.ghg_declared_unit)?)
    };

    Ok(CfpModel {
        cfp_id: Some(model.cfp_id),
        trace_id: model.trace_id,
        ghg_emission: model.ghg_emission,
        ghg_declared_unit,
        cfp_type: parse_enum("cfpType", &model.cfp_type)?,
        dqr_type: parse_enum("dqrType", &model.dqr_type)?,
        dqr_value: DqrValue {
            ter: model.te_r,
            ger: model.ge_r,
            tir: model.ti_r,
        },
        cfp_certification_ids: serde_json::from_str(&model.cfp_certification_ids)?,
    })
}

const fn trade_from_entity(model: &trade::Model) -> TradeModel {
    TradeModel {
        trade_id: model.trade_id,
        downstream_operator_id: model.downstream_operator_id,
        upstream_operator_id: model.upstream_operator_id,
        downstream_trace_id: model.downstream_trace_id,
        upstream_trace_id: model.upstream_trace_id,
    }
}

fn status_from_entity(model: request_status::Model) -> Result<StatusModel> {
    Ok(StatusModel {
        status_id: model.status_id,
        trade_id: model.trade_id,
        request_status: Status {
            cfp_response_status: parse_enum("cfpResponseStatus", &model.cfp_response_status)?,
            trade_tree_status: parse_enum("tradeTreeStatus", &model.trade_tree_status)?,
        },
        message: model.message,
        reply_message: model.reply_message,
        request_type: parse_enum("requestType", &model.request_type)?,
        response_due_date: model.response_due_date,
        completed_count: model.completed_count,
        trades_count: model.trades_count,
        requested_at: model.requested_at,
    })
}

fn cfp_to_active(row: &CfpModel, cfp_id: Uuid) -> Result<cfp_info::ActiveModel> {
    let now = Utc::now();
    Ok(cfp_info::ActiveModel {
        cfp_id: Set(cfp_id),
        cfp_type: Set(row.cfp_type.as_str().to_string()),
        trace_id: Set(row.trace_id),
        ghg_emission: Set(row.ghg_emission),
        ghg_declared_unit: Set(row
            .ghg_declared_unit
            .map(|unit| unit.as_str().to_string())
            .unwrap_or_default()),
        dqr_type: Set(row.dqr_type.as_str().to_string()),
        te_r: Set(row.dqr_value.ter),
        ge_r: Set(row.dqr_value.ger),
        ti_r: Set(row.dqr_value.tir),
        cfp_certification_ids: Set(serde_json::to_string(&row.cfp_certification_ids)?),
        created_at: Set(now),
        updated_at: Set(now),
    })
}

/// Upserts one part, reviving it if it was soft-deleted.
async fn upsert_part<C: ConnectionTrait>(db: &C, parts: &PartsModel) -> Result<()> {
    let now = Utc::now();
    let model = part::ActiveModel {
        trace_id: Set(parts.trace_id),
        operator_id: Set(parts.operator_id),
        plant_id: Set(parts.plant_id),
        parts_name: Set(parts.parts_name.clone()),
        support_parts_name: Set(parts.support_parts_name.clone()),
        terminated_flag: Set(parts.terminated_flag),
        amount_required: Set(parts.amount_required),
        amount_required_unit: Set(parts
            .amount_required_unit
            .map(|unit| unit.as_str().to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        updated_by: Set(parts.operator_id),
    };

    Part::insert(model)
        .on_conflict(
            OnConflict::column(part::Column::TraceId)
                .update_columns([
                    part::Column::PlantId,
                    part::Column::PartsName,
                    part::Column::SupportPartsName,
                    part::Column::TerminatedFlag,
                    part::Column::AmountRequired,
                    part::Column::AmountRequiredUnit,
                    part::Column::UpdatedAt,
                    part::Column::DeletedAt,
                    part::Column::UpdatedBy,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(())
}

/// Soft-deletes parts and removes their structure and CFP rows.
async fn remove_parts<C: ConnectionTrait>(
    db: &C,
    trace_ids: &[Uuid],
    updated_by: Uuid,
) -> Result<()> {
    if trace_ids.is_empty() {
        return Ok(());
    }
    let now = Utc::now();

    Part::update_many()
        .col_expr(part::Column::DeletedAt, Expr::value(Some(now)))
        .col_expr(part::Column::UpdatedAt, Expr::value(now))
        .col_expr(part::Column::UpdatedBy, Expr::value(updated_by))
        .filter(part::Column::TraceId.is_in(trace_ids.iter().copied()))
        .exec(db)
        .await?;

    PartsStructure::delete_many()
        .filter(parts_structure::Column::TraceId.is_in(trace_ids.iter().copied()))
        .exec(db)
        .await?;

    CfpInfo::delete_many()
        .filter(cfp_info::Column::TraceId.is_in(trace_ids.iter().copied()))
        .exec(db)
        .await?;

    Ok(())
}

/// Error for a status write that found the request no longer pending.
async fn lost_transition<C: ConnectionTrait>(
    db: &C,
    trade_id: Uuid,
    event: &'static str,
) -> Result<Error> {
    let current = RequestStatus::find()
        .filter(request_status::Column::TradeId.eq(trade_id))
        .filter(request_status::Column::DeletedAt.is_null())
        .one(db)
        .await?;
    Ok(match current {
        Some(row) => Error::InvalidTransition {
            from: row.cfp_response_status,
            event,
        },
        None => Error::StatusNotFound { trade_id },
    })
}

/// Writes the mutable columns of a pending status row.
///
/// Returns `false` when the row has left `PENDING` since it was read.
async fn write_status<C: ConnectionTrait>(
    db: &C,
    status: &StatusModel,
    updated_by: Option<Uuid>,
) -> Result<bool> {
    let mut update = RequestStatus::update_many()
        .col_expr(
            request_status::Column::CfpResponseStatus,
            Expr::value(status.request_status.cfp_response_status.as_str()),
        )
        .col_expr(
            request_status::Column::TradeTreeStatus,
            Expr::value(status.request_status.trade_tree_status.as_str()),
        )
        .col_expr(
            request_status::Column::Message,
            Expr::value(status.message.clone()),
        )
        .col_expr(
            request_status::Column::ReplyMessage,
            Expr::value(status.reply_message.clone()),
        )
        .col_expr(
            request_status::Column::ResponseDueDate,
            Expr::value(status.response_due_date.clone()),
        )
        .col_expr(
            request_status::Column::CompletedCount,
            Expr::value(status.completed_count),
        )
        .col_expr(
            request_status::Column::TradesCount,
            Expr::value(status.trades_count),
        )
        .col_expr(request_status::Column::UpdatedAt, Expr::value(Utc::now()));

    if let Some(operator_id) = updated_by {
        update = update.col_expr(request_status::Column::UpdatedBy, Expr::value(operator_id));
    }

    let result = update
        .filter(request_status::Column::StatusId.eq(status.status_id))
        .filter(request_status::Column::CfpResponseStatus.eq(CfpResponseStatus::Pending.as_str()))
        .filter(request_status::Column::DeletedAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Moves the pending status of a trade to a terminal state with a reply.
async fn close_status<C: ConnectionTrait>(
    db: &C,
    trade_id: Uuid,
    to: CfpResponseStatus,
    event: &'static str,
    reply_message: Option<&str>,
    updated_by: Uuid,
) -> Result<()> {
    let result = RequestStatus::update_many()
        .col_expr(request_status::Column::CfpResponseStatus, Expr::value(to.as_str()))
        .col_expr(
            request_status::Column::ReplyMessage,
            Expr::value(reply_message.map(ToString::to_string)),
        )
        .col_expr(request_status::Column::UpdatedAt, Expr::value(Utc::now()))
        .col_expr(request_status::Column::UpdatedBy, Expr::value(updated_by))
        .filter(request_status::Column::TradeId.eq(trade_id))
        .filter(request_status::Column::CfpResponseStatus.eq(CfpResponseStatus::Pending.as_str()))
        .filter(request_status::Column::DeletedAt.is_null())
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(lost_transition(db, trade_id, event).await?);
    }
    Ok(())
}

#[async_trait]
impl Repository for DatabaseRepository {
    async fn get_part_by_trace(
        &self,
        operator_id: Uuid,
        trace_id: Uuid,
    ) -> Result<Option<PartsModel>> {
        Part::find_by_id(trace_id)
            .filter(part::Column::OperatorId.eq(operator_id))
            .filter(part::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .map(part_from_entity)
            .transpose()
    }

    async fn get_parts_structure_header_by_trace(
        &self,
        trace_id: Uuid,
    ) -> Result<Option<StructureHeader>> {
        let header = PartsStructure::find_by_id(trace_id)
            .one(&self.db)
            .await?
            .map(|row| StructureHeader {
                trace_id: row.trace_id,
                parent_trace_id: row.parent_trace_id,
            });
        Ok(header)
    }

    #[instrument(skip(self))]
    async fn get_parts_structure_by_root(
        &self,
        operator_id: Uuid,
        parent_trace_id: Uuid,
    ) -> Result<Option<PartsStructureModel>> {
        let Some(parent) = self.get_part_by_trace(operator_id, parent_trace_id).await? else {
            return Ok(None);
        };
        match self.get_parts_structure_header_by_trace(parent_trace_id).await? {
            Some(header) if header.is_parent() => {}
            _ => return Ok(None),
        }

        let rows = PartsStructure::find()
            .filter(parts_structure::Column::ParentTraceId.eq(parent_trace_id))
            .order_by_asc(parts_structure::Column::Position)
            .all(&self.db)
            .await?;
        let child_ids: Vec<Uuid> = rows.iter().map(|row| row.trace_id).collect();

        let mut live = Part::find()
            .filter(part::Column::TraceId.is_in(child_ids.iter().copied()))
            .filter(part::Column::DeletedAt.is_null())
            .all(&self.db)
            .await?;

        let mut children = Vec::with_capacity(child_ids.len());
        for trace_id in child_ids {
            if let Some(index) = live.iter().position(|model| model.trace_id == trace_id) {
                children.push(part_from_entity(live.swap_remove(index))?);
            }
        }
        debug!("Loaded structure with {} children", children.len());

        Ok(Some(PartsStructureModel { parent, children }))
    }

    #[instrument(skip(self, structure), fields(parent = %structure.parent.trace_id))]
    async fn put_parts_structure(
        &self,
        structure: &PartsStructureModel,
        removed: &[Uuid],
    ) -> Result<()> {
        let parent_trace_id = structure.parent.trace_id;
        let txn = self.db.begin().await?;

        remove_parts(&txn, removed, structure.parent.operator_id).await?;

        upsert_part(&txn, &structure.parent).await?;
        for child in &structure.children {
            upsert_part(&txn, child).await?;
        }

        PartsStructure::delete_many()
            .filter(
                parts_structure::Column::ParentTraceId
                    .eq(parent_trace_id)
                    .or(parts_structure::Column::TraceId.eq(parent_trace_id)),
            )
            .exec(&txn)
            .await?;

        let now = Utc::now();
        let parent_row = parts_structure::ActiveModel {
            trace_id: Set(parent_trace_id),
            parent_trace_id: Set(Uuid::nil()),
            position: Set(0),
            created_at: Set(now),
        };
        let child_rows = structure
            .children
            .iter()
            .zip(0..)
            .map(|(child, position)| parts_structure::ActiveModel {
                trace_id: Set(child.trace_id),
                parent_trace_id: Set(parent_trace_id),
                position: Set(position),
                created_at: Set(now),
            });
        PartsStructure::insert_many(std::iter::once(parent_row).chain(child_rows))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    async fn delete_parts_structure(&self, structure: &PartsStructureModel) -> Result<()> {
        let trace_ids: Vec<Uuid> = std::iter::once(&structure.parent)
            .chain(&structure.children)
            .map(|parts| parts.trace_id)
            .collect();

        let txn = self.db.begin().await?;
        remove_parts(&txn, &trace_ids, structure.parent.operator_id).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn list_cfp_by_trace(&self, trace_id: Uuid) -> Result<Vec<CfpModel>> {
        let mut rows = CfpInfo::find()
            .filter(cfp_info::Column::TraceId.eq(trace_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(cfp_from_entity)
            .collect::<Result<Vec<_>>>()?;
        rows.sort_by_key(|row| {
            CfpType::ALL
                .iter()
                .position(|cfp_type| *cfp_type == row.cfp_type)
        });
        Ok(rows)
    }

    async fn get_cfp_by_id_and_type(
        &self,
        cfp_id: Uuid,
        cfp_type: CfpType,
    ) -> Result<Option<CfpModel>> {
        CfpInfo::find_by_id((cfp_id, cfp_type.as_str().to_string()))
            .one(&self.db)
            .await?
            .map(cfp_from_entity)
            .transpose()
    }

    #[instrument(skip_all, fields(rows = rows.len(), statuses = completed_statuses.len()))]
    async fn batch_insert_cfp(
        &self,
        rows: &[CfpModel],
        completed_statuses: &[StatusModel],
    ) -> Result<()> {
        let models = rows
            .iter()
            .map(|row| {
                let cfp_id = row.cfp_id.ok_or_else(|| Error::Inconsistent {
                    field: "cfpId",
                    trace_id: row.trace_id,
                })?;
                cfp_to_active(row, cfp_id)
            })
            .collect::<Result<Vec<_>>>()?;
        let Some(trace_id) = rows.first().map(|row| row.trace_id) else {
            return Ok(());
        };

        let txn = self.db.begin().await?;
        CfpInfo::insert_many(models)
            .exec(&txn)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateCfp { trace_id },
                _ => err.into(),
            })?;
        for status in completed_statuses {
            if !write_status(&txn, status, None).await? {
                debug!("Status {} closed before completion", status.status_id);
            }
        }
        txn.commit().await?;
        Ok(())
    }

    async fn update_cfp(&self, rows: &[CfpModel]) -> Result<()> {
        let txn = self.db.begin().await?;
        for row in rows {
            let cfp_id = row.cfp_id.ok_or_else(|| Error::Inconsistent {
                field: "cfpId",
                trace_id: row.trace_id,
            })?;
            CfpInfo::update_many()
                .col_expr(cfp_info::Column::GhgEmission, Expr::value(row.ghg_emission))
                .col_expr(
                    cfp_info::Column::GhgDeclaredUnit,
                    Expr::value(
                        row.ghg_declared_unit
                            .map(|unit| unit.as_str().to_string())
                            .unwrap_or_default(),
                    ),
                )
                .col_expr(cfp_info::Column::DqrType, Expr::value(row.dqr_type.as_str()))
                .col_expr(cfp_info::Column::TeR, Expr::value(row.dqr_value.ter))
                .col_expr(cfp_info::Column::GeR, Expr::value(row.dqr_value.ger))
                .col_expr(cfp_info::Column::TiR, Expr::value(row.dqr_value.tir))
                .col_expr(cfp_info::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(cfp_info::Column::CfpId.eq(cfp_id))
                .filter(cfp_info::Column::CfpType.eq(row.cfp_type.as_str()))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn put_cfp_certificates(
        &self,
        trace_id: Uuid,
        certification_ids: &[String],
    ) -> Result<()> {
        CfpInfo::update_many()
            .col_expr(
                cfp_info::Column::CfpCertificationIds,
                Expr::value(serde_json::to_string(certification_ids)?),
            )
            .col_expr(cfp_info::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cfp_info::Column::TraceId.eq(trace_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn get_trade_by_downstream_trace(&self, trace_id: Uuid) -> Result<Option<TradeModel>> {
        let trade = Trade::find()
            .filter(trade::Column::DownstreamTraceId.eq(trace_id))
            .filter(trade::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(trade.as_ref().map(trade_from_entity))
    }

    async fn list_trades_by_upstream_trace(&self, trace_id: Uuid) -> Result<Vec<TradeModel>> {
        let trades = Trade::find()
            .filter(trade::Column::UpstreamTraceId.eq(trace_id))
            .filter(trade::Column::DeletedAt.is_null())
            .order_by_asc(trade::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(trades.iter().map(trade_from_entity).collect())
    }

    async fn get_trade(&self, trade_id: Uuid) -> Result<Option<TradeModel>> {
        let trade = Trade::find_by_id(trade_id)
            .filter(trade::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(trade.as_ref().map(trade_from_entity))
    }

    #[instrument(skip(self, trade, status), fields(trade_id = %trade.trade_id))]
    async fn create_trade_request(
        &self,
        trade: &TradeModel,
        status: &StatusModel,
        updated_by: Uuid,
    ) -> Result<()> {
        let now = Utc::now();
        let trade_model = trade::ActiveModel {
            trade_id: Set(trade.trade_id),
            downstream_operator_id: Set(trade.downstream_operator_id),
            upstream_operator_id: Set(trade.upstream_operator_id),
            downstream_trace_id: Set(trade.downstream_trace_id),
            upstream_trace_id: Set(trade.upstream_trace_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            updated_by: Set(updated_by),
        };
        let status_model = request_status::ActiveModel {
            status_id: Set(status.status_id),
            trade_id: Set(status.trade_id),
            downstream_operator_id: Set(trade.downstream_operator_id),
            upstream_operator_id: Set(trade.upstream_operator_id),
            cfp_response_status: Set(status
                .request_status
                .cfp_response_status
                .as_str()
                .to_string()),
            trade_tree_status: Set(status.request_status.trade_tree_status.as_str().to_string()),
            message: Set(status.message.clone()),
            reply_message: Set(status.reply_message.clone()),
            request_type: Set(status.request_type.as_str().to_string()),
            response_due_date: Set(status.response_due_date.clone()),
            completed_count: Set(status.completed_count),
            trades_count: Set(status.trades_count),
            requested_at: Set(status.requested_at),
            updated_at: Set(now),
            deleted_at: Set(None),
            updated_by: Set(updated_by),
        };

        let txn = self.db.begin().await?;
        Trade::insert(trade_model).exec(&txn).await?;
        RequestStatus::insert(status_model).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn update_trade_request(
        &self,
        trade: &TradeModel,
        status: &StatusModel,
        updated_by: Uuid,
    ) -> Result<()> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        Trade::update_many()
            .col_expr(
                trade::Column::UpstreamOperatorId,
                Expr::value(trade.upstream_operator_id),
            )
            .col_expr(trade::Column::UpdatedAt, Expr::value(now))
            .col_expr(trade::Column::UpdatedBy, Expr::value(updated_by))
            .filter(trade::Column::TradeId.eq(trade.trade_id))
            .filter(trade::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        RequestStatus::update_many()
            .col_expr(
                request_status::Column::UpstreamOperatorId,
                Expr::value(trade.upstream_operator_id),
            )
            .filter(request_status::Column::StatusId.eq(status.status_id))
            .exec(&txn)
            .await?;
        if !write_status(&txn, status, Some(updated_by)).await? {
            return Err(lost_transition(&txn, trade.trade_id, "update").await?);
        }

        txn.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, status))]
    async fn put_trade_response(
        &self,
        trade_id: Uuid,
        upstream_trace_id: Uuid,
        status: &StatusModel,
        updated_by: Uuid,
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        Trade::update_many()
            .col_expr(trade::Column::UpstreamTraceId, Expr::value(Some(upstream_trace_id)))
            .col_expr(trade::Column::UpdatedAt, Expr::value(Utc::now()))
            .col_expr(trade::Column::UpdatedBy, Expr::value(updated_by))
            .filter(trade::Column::TradeId.eq(trade_id))
            .filter(trade::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;
        if !write_status(&txn, status, Some(updated_by)).await? {
            return Err(lost_transition(&txn, trade_id, "answer").await?);
        }

        txn.commit().await?;
        Ok(())
    }

    async fn delete_trade(&self, trade_id: Uuid, updated_by: Uuid) -> Result<()> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        Trade::update_many()
            .col_expr(trade::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(trade::Column::UpdatedBy, Expr::value(updated_by))
            .filter(trade::Column::TradeId.eq(trade_id))
            .exec(&txn)
            .await?;
        RequestStatus::update_many()
            .col_expr(request_status::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(request_status::Column::UpdatedBy, Expr::value(updated_by))
            .filter(request_status::Column::TradeId.eq(trade_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    async fn get_status_by_trade(&self, trade_id: Uuid) -> Result<Option<StatusModel>> {
        RequestStatus::find()
            .filter(request_status::Column::TradeId.eq(trade_id))
            .filter(request_status::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .map(status_from_entity)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_statuses(&self, query: &StatusQuery) -> Result<StatusPage> {
        let operator_column = match query.target {
            StatusTarget::Request => request_status::Column::DownstreamOperatorId,
            StatusTarget::Response => request_status::Column::UpstreamOperatorId,
        };

        let mut select = RequestStatus::find()
            .filter(operator_column.eq(query.operator_id))
            .filter(request_status::Column::DeletedAt.is_null());
        if let Some(status_id) = query.status_id {
            select = select.filter(request_status::Column::StatusId.eq(status_id));
        }
        if let Some(after) = query.after {
            select = select.filter(request_status::Column::StatusId.gte(after));
        }

        let mut statuses = select
            .order_by_asc(request_status::Column::StatusId)
            .limit(query.limit.saturating_add(1))
            .all(&self.db)
            .await?
            .into_iter()
            .map(status_from_entity)
            .collect::<Result<Vec<_>>>()?;

        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let next = if statuses.len() > limit {
            statuses.pop().map(|surplus| surplus.status_id)
        } else {
            None
        };
        debug!("Listed {} statuses, next = {:?}", statuses.len(), next);

        Ok(StatusPage { statuses, next })
    }

    async fn count_statuses(&self, operator_id: Uuid, target: StatusTarget) -> Result<u64> {
        let operator_column = match target {
            StatusTarget::Request => request_status::Column::DownstreamOperatorId,
            StatusTarget::Response => request_status::Column::UpstreamOperatorId,
        };
        RequestStatus::find()
            .filter(operator_column.eq(operator_id))
            .filter(request_status::Column::DeletedAt.is_null())
            .count(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn cancel_status(
        &self,
        trade_id: Uuid,
        reply_message: Option<&str>,
        updated_by: Uuid,
    ) -> Result<()> {
        close_status(
            &self.db,
            trade_id,
            CfpResponseStatus::Cancel,
            "cancel",
            reply_message,
            updated_by,
        )
        .await
    }

    async fn reject_status(
        &self,
        trade_id: Uuid,
        reply_message: Option<&str>,
        updated_by: Uuid,
    ) -> Result<()> {
        close_status(
            &self.db,
            trade_id,
            CfpResponseStatus::Reject,
            "reject",
            reply_message,
            updated_by,
        )
        .await
    }
}
