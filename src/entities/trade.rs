//! Trade entity - Links a downstream operator's part to an upstream operator's part.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trade database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trades")]
pub struct Model {
    /// Trade identity
    #[sea_orm(primary_key, auto_increment = false)]
    pub trade_id: Uuid,
    /// Requesting operator
    pub downstream_operator_id: Uuid,
    /// Answering operator
    pub upstream_operator_id: Uuid,
    /// Requester's part
    pub downstream_trace_id: Uuid,
    /// Supplier's part, set once answered
    pub upstream_trace_id: Option<Uuid>,
    /// When the trade was created
    pub created_at: DateTimeUtc,
    /// When the trade was last modified
    pub updated_at: DateTimeUtc,
    /// Soft delete timestamp
    pub deleted_at: Option<DateTimeUtc>,
    /// Operator that last modified the row
    pub updated_by: Uuid,
}

/// One trade has one request status
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The bound request status
    #[sea_orm(has_one = "super::request_status::Entity")]
    RequestStatus,
}

impl Related<super::request_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequestStatus.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
