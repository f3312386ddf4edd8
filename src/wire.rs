//! JSON shapes of the canonical objects exchanged with callers.
//!
//! Field names are camelCase and every enumerated field is its exact string literal. Decoding an
//! unknown literal fails with [`Error::UnexpectedEnum`] naming the field; encoding is infallible.
//!
//! [`Error::UnexpectedEnum`]: crate::errors::Error::UnexpectedEnum

use crate::{
    errors::Result,
    models::{
        self, AmountRequiredUnit, CfpModel, DqrValue, PartsDraft, PartsModel, PartsStructureDraft,
        PartsStructureModel, StatusModel, TradeModel, TradeRequestInput, parse_enum,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Data quality rating triple; component names keep their upstream capitalisation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DqrValueDto {
    /// Technological representativeness
    #[serde(rename = "TeR", default)]
    pub ter: Option<f64>,
    /// Geographical representativeness
    #[serde(rename = "GeR", default)]
    pub ger: Option<f64>,
    /// Temporal representativeness
    #[serde(rename = "TiR", default)]
    pub tir: Option<f64>,
}

impl From<DqrValue> for DqrValueDto {
    fn from(value: DqrValue) -> Self {
        Self {
            ter: value.ter,
            ger: value.ger,
            tir: value.tir,
        }
    }
}

impl From<DqrValueDto> for DqrValue {
    fn from(value: DqrValueDto) -> Self {
        Self {
            ter: value.ter,
            ger: value.ger,
            tir: value.tir,
        }
    }
}

/// One CFP row on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfpRow {
    /// Set identifier; null on fresh writes and response rows
    #[serde(default)]
    pub cfp_id: Option<Uuid>,
    /// Part the row belongs to
    pub trace_id: Uuid,
    /// Emission value
    pub ghg_emission: Option<f64>,
    /// Declared unit literal; null on empty response rows
    pub ghg_declared_unit: Option<String>,
    /// CFP type literal
    pub cfp_type: String,
    /// DQR type literal
    pub dqr_type: String,
    /// Rating triple
    pub dqr_value: DqrValueDto,
    /// Certificate references
    #[serde(default)]
    pub cfp_certification_ids: Vec<String>,
}

impl TryFrom<CfpRow> for CfpModel {
    type Error = crate::errors::Error;

    fn try_from(row: CfpRow) -> Result<Self> {
        Ok(Self {
            cfp_id: row.cfp_id,
            trace_id: row.trace_id,
            ghg_emission: row.ghg_emission,
            ghg_declared_unit: row
                .ghg_declared_unit
                .as_deref()
                .map(|unit| parse_enum("ghgDeclaredUnit", unit))
                .transpose()?,
            cfp_type: parse_enum("cfpType", &row.cfp_type)?,
            dqr_type: parse_enum("dqrType", &row.dqr_type)?,
            dqr_value: row.dqr_value.into(),
            cfp_certification_ids: row.cfp_certification_ids,
        })
    }
}

impl From<CfpModel> for CfpRow {
    fn from(model: CfpModel) -> Self {
        Self {
            cfp_id: model.cfp_id,
            trace_id: model.trace_id,
            ghg_emission: model.ghg_emission,
            ghg_declared_unit: model.ghg_declared_unit.map(|unit| unit.as_str().to_string()),
            cfp_type: model.cfp_type.as_str().to_string(),
            dqr_type: model.dqr_type.as_str().to_string(),
            dqr_value: model.dqr_value.into(),
            cfp_certification_ids: model.cfp_certification_ids,
        }
    }
}

/// Decodes a CFP write body.
pub fn decode_cfp_rows(rows: Vec<CfpRow>) -> Result<Vec<CfpModel>> {
    rows.into_iter().map(CfpModel::try_from).collect()
}

/// A part on the wire; `traceId` and `plantId` may be absent on writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Trace id, absent to create
    #[serde(default)]
    pub trace_id: Option<Uuid>,
    /// Owning operator
    pub operator_id: Uuid,
    /// Producing plant
    #[serde(default)]
    pub plant_id: Option<Uuid>,
    /// Part name
    pub parts_name: String,
    /// Supplementary name
    #[serde(default)]
    pub support_parts_name: Option<String>,
    /// Terminal flag
    pub terminated_flag: bool,
    /// Amount used by the parent
    #[serde(default)]
    pub amount_required: Option<f64>,
    /// Amount unit literal, `""` when not set
    #[serde(default)]
    pub amount_required_unit: Option<String>,
}

impl TryFrom<Part> for PartsDraft {
    type Error = crate::errors::Error;

    fn try_from(part: Part) -> Result<Self> {
        Ok(Self {
            trace_id: part.trace_id,
            operator_id: part.operator_id,
            plant_id: part.plant_id,
            parts_name: part.parts_name,
            support_parts_name: part.support_parts_name,
            terminated_flag: part.terminated_flag,
            amount_required: part.amount_required,
            amount_required_unit: part
                .amount_required_unit
                .as_deref()
                .map(|unit| parse_enum::<AmountRequiredUnit>("amountRequiredUnit", unit))
                .transpose()?,
        })
    }
}

impl From<PartsModel> for Part {
    fn from(model: PartsModel) -> Self {
        Self {
            trace_id: Some(model.trace_id),
            operator_id: model.operator_id,
            plant_id: Some(model.plant_id),
            parts_name: model.parts_name,
            support_parts_name: model.support_parts_name,
            terminated_flag: model.terminated_flag,
            amount_required: model.amount_required,
            amount_required_unit: model
                .amount_required_unit
                .map(|unit| unit.as_str().to_string()),
        }
    }
}

/// A parent with its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartsStructure {
    /// The parent, null only on malformed input
    pub parent_parts_model: Option<Part>,
    /// Children in structure order
    #[serde(default)]
    pub children_parts_model: Vec<Part>,
}

impl TryFrom<PartsStructure> for PartsStructureDraft {
    type Error = crate::errors::Error;

    fn try_from(structure: PartsStructure) -> Result<Self> {
        Ok(Self {
            parent: structure
                .parent_parts_model
                .map(PartsDraft::try_from)
                .transpose()?,
            children: structure
                .children_parts_model
                .into_iter()
                .map(PartsDraft::try_from)
                .collect::<Result<_>>()?,
        })
    }
}

impl From<PartsStructureModel> for PartsStructure {
    fn from(model: PartsStructureModel) -> Self {
        Self {
            parent_parts_model: Some(model.parent.into()),
            children_parts_model: model.children.into_iter().map(Part::from).collect(),
        }
    }
}

/// A trade on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Trade id, absent to create
    #[serde(default)]
    pub trade_id: Option<Uuid>,
    /// Requesting operator
    pub downstream_operator_id: Uuid,
    /// Answering operator
    pub upstream_operator_id: Uuid,
    /// Requester's part
    pub downstream_trace_id: Uuid,
    /// Supplier's part once answered
    #[serde(default)]
    pub upstream_trace_id: Option<Uuid>,
}

impl From<TradeModel> for Trade {
    fn from(model: TradeModel) -> Self {
        Self {
            trade_id: Some(model.trade_id),
            downstream_operator_id: model.downstream_operator_id,
            upstream_operator_id: model.upstream_operator_id,
            downstream_trace_id: model.downstream_trace_id,
            upstream_trace_id: model.upstream_trace_id,
        }
    }
}

/// Body of a trade request write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    /// The trade being requested or updated
    pub trade: Trade,
    /// Free text for the supplier
    #[serde(default)]
    pub message: Option<String>,
    /// ISO-8601 due date
    pub response_due_date: String,
}

impl From<TradeRequest> for TradeRequestInput {
    fn from(request: TradeRequest) -> Self {
        Self {
            trade_id: request.trade.trade_id,
            downstream_operator_id: request.trade.downstream_operator_id,
            upstream_operator_id: request.trade.upstream_operator_id,
            downstream_trace_id: request.trade.downstream_trace_id,
            message: request.message,
            response_due_date: request.response_due_date,
        }
    }
}

/// Pair of status literals reported as `requestStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatus {
    /// CFP answer progress literal
    pub cfp_response_status: String,
    /// Sub-tree terminality literal
    pub trade_tree_status: String,
}

impl From<models::RequestStatus> for RequestStatus {
    fn from(status: models::RequestStatus) -> Self {
        Self {
            cfp_response_status: status.cfp_response_status.as_str().to_string(),
            trade_tree_status: status.trade_tree_status.as_str().to_string(),
        }
    }
}

/// A request status on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Status id
    pub status_id: Uuid,
    /// Trade id
    pub trade_id: Uuid,
    /// Current state
    pub request_status: RequestStatus,
    /// Requester's message
    pub message: Option<String>,
    /// Reply on reject/cancel
    pub reply_message: Option<String>,
    /// Request type literal
    pub request_type: String,
    /// ISO-8601 due date
    pub response_due_date: String,
    /// Completed answers
    pub completed_count: i32,
    /// Trades the count refers to
    pub trades_count: i32,
    /// Creation time
    pub requested_at: DateTime<Utc>,
}

impl From<StatusModel> for Status {
    fn from(model: StatusModel) -> Self {
        Self {
            status_id: model.status_id,
            trade_id: model.trade_id,
            request_status: model.request_status.into(),
            message: model.message,
            reply_message: model.reply_message,
            request_type: model.request_type.as_str().to_string(),
            response_due_date: model.response_due_date,
            completed_count: model.completed_count,
            trades_count: model.trades_count,
            requested_at: model.requested_at,
        }
    }
}

/// One page of a status listing with its cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusList {
    /// Statuses of the page
    pub statuses: Vec<Status>,
    /// Cursor of the next page
    pub next: Option<Uuid>,
}

impl From<models::StatusPage> for StatusList {
    fn from(page: models::StatusPage) -> Self {
        Self {
            statuses: page.statuses.into_iter().map(Status::from).collect(),
            next: page.next,
        }
    }
}
