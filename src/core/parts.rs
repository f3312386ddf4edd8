//! Parts structure business logic - registering, reading and removing a parent part with its
//! children.
//!
//! A structure write mints trace ids for new parts, masks the parent's amount fields and replaces
//! the parent's child list. Children dropped from the list are removed together with their CFP,
//! unless a live trade still points at them.

use crate::{
    core::validate::validate_parts_structure,
    errors::{Error, Result},
    models::{PartsDraft, PartsModel, PartsStructureDraft, PartsStructureModel},
    repository::Repository,
};
use tracing::{info, instrument};
use uuid::Uuid;

/// Position a draft takes in the structure being written.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Parent,
    ChildOf(Uuid),
}

/// Turns a draft into a stored part, minting a trace id when the draft has none.
///
/// A draft that names a trace must refer to a live part of the caller that is either outside
/// any structure or already in the same position.
async fn resolve_draft<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    draft: PartsDraft,
    slot: Slot,
) -> Result<PartsModel> {
    let trace_id = match draft.trace_id {
        Some(trace_id) => {
            if repo.get_part_by_trace(operator_id, trace_id).await?.is_none() {
                return Err(Error::PartNotFound { trace_id });
            }
            if let Some(header) = repo.get_parts_structure_header_by_trace(trace_id).await? {
                let in_place = match slot {
                    Slot::Parent => header.is_parent(),
                    Slot::ChildOf(parent_trace_id) => header.parent_trace_id == parent_trace_id,
                };
                if !in_place {
                    return Err(Error::validation(format!(
                        "traceId {trace_id} already belongs to another parts structure"
                    )));
                }
            }
            trace_id
        }
        None => Uuid::new_v4(),
    };
    let plant_id = draft
        .plant_id
        .ok_or_else(|| Error::validation("plantId is required"))?;

    Ok(PartsModel {
        trace_id,
        operator_id,
        plant_id,
        parts_name: draft.parts_name,
        support_parts_name: draft.support_parts_name,
        terminated_flag: draft.terminated_flag,
        amount_required: draft.amount_required,
        amount_required_unit: draft.amount_required_unit,
    })
}

/// Fails with [`Error::PartInUse`] when a live trade references the part on either side.
async fn ensure_not_traded<R: Repository + ?Sized>(repo: &R, trace_id: Uuid) -> Result<()> {
    let requested = repo.get_trade_by_downstream_trace(trace_id).await?.is_some();
    let answered = !repo.list_trades_by_upstream_trace(trace_id).await?.is_empty();
    if requested || answered {
        return Err(Error::PartInUse { trace_id });
    }
    Ok(())
}

/// Registers or updates a parts structure owned by the caller.
///
/// Returns the stored structure with every trace id filled in.
///
/// # Errors
/// * [`Error::Validation`] when the draft breaks the parts rules or moves a part out of another
///   structure
/// * [`Error::PartNotFound`] when a draft names a trace the caller does not own
/// * [`Error::PartInUse`] when a child dropped from the list is still traded
#[instrument(skip(repo, draft))]
pub async fn put_parts_structure<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    draft: PartsStructureDraft,
) -> Result<PartsStructureModel> {
    validate_parts_structure(operator_id, &draft)?;
    let parent_draft = draft
        .parent
        .ok_or_else(|| Error::validation("parentPartsModel is required"))?;

    let mut parent = resolve_draft(repo, operator_id, parent_draft, Slot::Parent).await?;
    parent.amount_required = None;
    parent.amount_required_unit = None;

    let mut children = Vec::with_capacity(draft.children.len());
    for child in draft.children {
        let slot = Slot::ChildOf(parent.trace_id);
        children.push(resolve_draft(repo, operator_id, child, slot).await?);
    }

    let mut removed = Vec::new();
    if let Some(existing) = repo
        .get_parts_structure_by_root(operator_id, parent.trace_id)
        .await?
    {
        for old in existing.children {
            if children.iter().all(|child| child.trace_id != old.trace_id) {
                ensure_not_traded(repo, old.trace_id).await?;
                removed.push(old.trace_id);
            }
        }
    }

    let structure = PartsStructureModel { parent, children };
    repo.put_parts_structure(&structure, &removed).await?;
    info!(
        "Stored structure {} with {} children, {} removed",
        structure.parent.trace_id,
        structure.children.len(),
        removed.len()
    );
    Ok(structure)
}

/// A parent owned by the caller with its children, `None` when absent.
pub async fn get_parts_structure<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    parent_trace_id: Uuid,
) -> Result<Option<PartsStructureModel>> {
    repo.get_parts_structure_by_root(operator_id, parent_trace_id).await
}

/// A single part owned by the caller, `None` when absent.
pub async fn get_part<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    trace_id: Uuid,
) -> Result<Option<PartsModel>> {
    repo.get_part_by_trace(operator_id, trace_id).await
}

/// Removes a parent, its children and their CFP.
///
/// # Errors
/// Returns [`Error::PartNotFound`] when the caller owns no such parent and [`Error::PartInUse`]
/// when any part of the structure is still traded.
pub async fn delete_parts_structure<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    parent_trace_id: Uuid,
) -> Result<()> {
    let structure = repo
        .get_parts_structure_by_root(operator_id, parent_trace_id)
        .await?
        .ok_or(Error::PartNotFound {
            trace_id: parent_trace_id,
        })?;

    for part in std::iter::once(&structure.parent).chain(&structure.children) {
        ensure_not_traded(repo, part.trace_id).await?;
    }

    repo.delete_parts_structure(&structure).await?;
    info!("Deleted structure {}", parent_trace_id);
    Ok(())
}
