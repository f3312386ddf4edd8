//! Parts and their parent/children structure.

use super::AmountRequiredUnit;
use uuid::Uuid;

/// A stored part.
#[derive(Debug, Clone, PartialEq)]
pub struct PartsModel {
    /// Identity of the part along the supply chain
    pub trace_id: Uuid,
    /// Operator owning the part
    pub operator_id: Uuid,
    /// Plant producing the part
    pub plant_id: Uuid,
    /// Part name
    pub parts_name: String,
    /// Optional supplementary name
    pub support_parts_name: Option<String>,
    /// Whether the part's CFP is supplied directly rather than inherited from upstream
    pub terminated_flag: bool,
    /// Amount of this part used by its parent; masked on parents
    pub amount_required: Option<f64>,
    /// Unit of `amount_required`
    pub amount_required_unit: Option<AmountRequiredUnit>,
}

/// Structure row of a part: which parent it hangs under.
///
/// A parent's own row points at the nil trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureHeader {
    /// Part the row describes
    pub trace_id: Uuid,
    /// Parent trace, nil for a parent
    pub parent_trace_id: Uuid,
}

impl StructureHeader {
    /// Whether the row describes a parent.
    #[must_use]
    pub fn is_parent(&self) -> bool {
        self.parent_trace_id.is_nil()
    }
}

/// A parent part together with its children in structure order.
#[derive(Debug, Clone, PartialEq)]
pub struct PartsStructureModel {
    /// The parent
    pub parent: PartsModel,
    /// Children in structure order
    pub children: Vec<PartsModel>,
}

/// A part as submitted in a structure write; a missing trace means "create".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartsDraft {
    /// Existing trace, or `None` to mint one
    pub trace_id: Option<Uuid>,
    /// Operator the caller claims to own the part
    pub operator_id: Uuid,
    /// Producing plant, required
    pub plant_id: Option<Uuid>,
    /// Part name
    pub parts_name: String,
    /// Optional supplementary name
    pub support_parts_name: Option<String>,
    /// Terminal flag
    pub terminated_flag: bool,
    /// Amount used by the parent
    pub amount_required: Option<f64>,
    /// Unit of `amount_required`
    pub amount_required_unit: Option<AmountRequiredUnit>,
}

/// A structure write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartsStructureDraft {
    /// The parent; required
    pub parent: Option<PartsDraft>,
    /// Children in structure order
    pub children: Vec<PartsDraft>,
}
