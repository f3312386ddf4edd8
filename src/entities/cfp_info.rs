//! CFP entity - One emission row of a part's CFP set.
//!
//! Rows are keyed by `(cfp_id, cfp_type)`; all rows of a set share the `cfp_id`. A trace holds at
//! most one row per type (unique index created alongside the table).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// CFP database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cfp_infos")]
pub struct Model {
    /// Set identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub cfp_id: Uuid,
    /// Wire literal of the row type
    #[sea_orm(primary_key, auto_increment = false)]
    pub cfp_type: String,
    /// Part the set belongs to
    pub trace_id: Uuid,
    /// Emission value
    pub ghg_emission: Option<f64>,
    /// Wire literal of the declared unit
    pub ghg_declared_unit: String,
    /// Wire literal of the rating type
    pub dqr_type: String,
    /// Technological representativeness
    pub te_r: Option<f64>,
    /// Geographical representativeness
    pub ge_r: Option<f64>,
    /// Temporal representativeness
    pub ti_r: Option<f64>,
    /// Certificate references as a JSON array
    pub cfp_certification_ids: String,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// CFP rows are looked up by trace id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
