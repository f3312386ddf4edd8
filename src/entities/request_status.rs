//! Request status entity - Tracks the CFP answer progress of one trade.
//!
//! Both operator ids are copied from the trade so listings need no join.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Request status database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "request_statuses")]
pub struct Model {
    /// Status identity
    #[sea_orm(primary_key, auto_increment = false)]
    pub status_id: Uuid,
    /// Bound trade
    pub trade_id: Uuid,
    /// Requesting operator (copied from the trade)
    pub downstream_operator_id: Uuid,
    /// Answering operator (copied from the trade)
    pub upstream_operator_id: Uuid,
    /// `"PENDING"`, `"COMPLETED"`, `"REJECT"` or `"CANCEL"`
    pub cfp_response_status: String,
    /// `"UNTERMINATED"` or `"TERMINATED"`
    pub trade_tree_status: String,
    /// Requester's message
    pub message: Option<String>,
    /// Reply on reject/cancel
    pub reply_message: Option<String>,
    /// Always `"CFP"`
    pub request_type: String,
    /// ISO-8601 due date
    pub response_due_date: String,
    /// Completed answers
    pub completed_count: i32,
    /// Trades counted
    pub trades_count: i32,
    /// When the request was issued
    pub requested_at: DateTimeUtc,
    /// When the status was last modified
    pub updated_at: DateTimeUtc,
    /// Soft delete timestamp
    pub deleted_at: Option<DateTimeUtc>,
    /// Operator that last modified the row
    pub updated_by: Uuid,
}

/// Each status belongs to one trade
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The bound trade
    #[sea_orm(
        belongs_to = "super::trade::Entity",
        from = "Column::TradeId",
        to = "super::trade::Column::TradeId"
    )]
    Trade,
}

impl Related<super::trade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
