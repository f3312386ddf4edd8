//! Part entity - A manufactured or procured part identified by its trace id.
//!
//! Parts are soft-deleted: `deleted_at` hides the row while keeping it for audit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Part database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parts")]
pub struct Model {
    /// Trace id, unique across the data space
    #[sea_orm(primary_key, auto_increment = false)]
    pub trace_id: Uuid,
    /// Owning operator
    pub operator_id: Uuid,
    /// Producing plant
    pub plant_id: Uuid,
    /// Part name
    pub parts_name: String,
    /// Optional supplementary name
    pub support_parts_name: Option<String>,
    /// Whether the part is terminal
    pub terminated_flag: bool,
    /// Amount used by the parent (children only)
    pub amount_required: Option<f64>,
    /// Wire literal of the amount unit
    pub amount_required_unit: Option<String>,
    /// When the part was created
    pub created_at: DateTimeUtc,
    /// When the part was last modified
    pub updated_at: DateTimeUtc,
    /// Soft delete timestamp
    pub deleted_at: Option<DateTimeUtc>,
    /// Operator that last modified the row
    pub updated_by: Uuid,
}

/// Parts have no declared relations; structure rows reference them by trace id
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
