//! Parts structure entity - One row per part placing it under its parent.
//!
//! A parent's own row carries the nil trace as `parent_trace_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Parts structure database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parts_structures")]
pub struct Model {
    /// Part the row describes
    #[sea_orm(primary_key, auto_increment = false)]
    pub trace_id: Uuid,
    /// Parent trace, nil for parents
    pub parent_trace_id: Uuid,
    /// Position among the parent's children
    pub position: i32,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Each structure row belongs to one part
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The described part
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::TraceId",
        to = "super::part::Column::TraceId"
    )]
    Part,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
