//! CFP aggregation.
//!
//! For every requested trace the aggregator classifies the part, gathers the CFP sets that
//! contribute to it and shapes the canonical result:
//!
//! | class | result |
//! |---|---|
//! | terminal, not a parent | the four stored rows |
//! | terminal parent | four stored rows + four totals (component totals 0) |
//! | parent with children | four stored rows + four totals summed over children |
//! | imported, no trade | two empty response rows |
//! | imported, answered | two response rows built from the upstream set |
//!
//! Normal absence (no part, no CFP, no upstream answer) skips the trace or the child. Rows of a
//! set that disagree on identity fields fail the whole trace with [`Error::Inconsistent`].

use crate::{
    errors::{Error, Result},
    models::{CfpModel, CfpSet, CfpType, DqrValue, PartsModel},
    repository::Repository,
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// How a part obtains its CFP.
#[derive(Debug, Clone, PartialEq)]
pub enum PartClass {
    /// CFP is supplied directly for the part.
    Terminal {
        /// Whether the part heads a structure and therefore gets totals
        is_parent: bool,
    },
    /// CFP comes from the upstream trade partner.
    Imported,
    /// CFP is the part's own set plus contributions of its children.
    Parent {
        /// Children in structure order
        children: Vec<PartsModel>,
    },
}

/// Reads the terminal flag and structure row of `part` to decide its class.
pub async fn classify<R: Repository + ?Sized>(repo: &R, part: &PartsModel) -> Result<PartClass> {
    let header = repo
        .get_parts_structure_header_by_trace(part.trace_id)
        .await?;
    let is_parent = header.is_some_and(|header| header.is_parent());

    if part.terminated_flag {
        return Ok(PartClass::Terminal { is_parent });
    }
    if !is_parent {
        return Ok(PartClass::Imported);
    }

    let children = repo
        .get_parts_structure_by_root(part.operator_id, part.trace_id)
        .await?
        .map(|structure| structure.children)
        .unwrap_or_default();

    if children.is_empty() {
        Ok(PartClass::Imported)
    } else {
        Ok(PartClass::Parent { children })
    }
}

fn check_identity<T: PartialEq>(
    rows: &[CfpModel],
    trace_id: Uuid,
    field: &'static str,
    key: impl Fn(&CfpModel) -> T,
) -> Result<()> {
    let first = key(&rows[0]);
    if rows.iter().all(|row| key(row) == first) {
        Ok(())
    } else {
        warn!("CFP rows of trace {} disagree on {}", trace_id, field);
        Err(Error::Inconsistent { field, trace_id })
    }
}

/// Wraps stored rows into a set after checking they agree on cfp-id, trace-id, declared unit and
/// certificate list. An empty input means the trace has no CFP.
pub fn guard_set(trace_id: Uuid, rows: Vec<CfpModel>) -> Result<Option<CfpSet>> {
    if rows.is_empty() {
        return Ok(None);
    }
    check_identity(&rows, trace_id, "cfpId", |row| row.cfp_id)?;
    check_identity(&rows, trace_id, "traceId", |row| row.trace_id)?;
    check_identity(&rows, trace_id, "ghgDeclaredUnit", |row| row.ghg_declared_unit)?;
    check_identity(&rows, trace_id, "cfpCertificationIds", |row| {
        row.cfp_certification_ids.clone()
    })?;
    Ok(Some(CfpSet::new(rows)))
}

async fn load_set<R: Repository + ?Sized>(repo: &R, trace_id: Uuid) -> Result<Option<CfpSet>> {
    let rows = repo.list_cfp_by_trace(trace_id).await?;
    guard_set(trace_id, rows)
}

/// Rounds to the five decimals CFP values are fixed to.
fn round_cfp(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// Component sums contributed by a parent's children.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct ComponentTotals {
    pre: f64,
    main: f64,
}

/// The stored rows of a parent followed by its four totals.
fn with_totals(set: CfpSet, components: ComponentTotals) -> Vec<CfpModel> {
    let driver = set.driver().clone();
    let totals = [
        (
            CfpType::PreProductionTotal,
            set.emission(CfpType::PreProduction),
        ),
        (
            CfpType::MainProductionTotal,
            set.emission(CfpType::MainProduction),
        ),
        (CfpType::PreComponentTotal, Some(round_cfp(components.pre))),
        (CfpType::MainComponentTotal, Some(round_cfp(components.main))),
    ];

    let mut rows = set.into_rows();
    rows.extend(
        totals
            .into_iter()
            .map(|(cfp_type, ghg)| CfpModel::derived(&driver, cfp_type, ghg)),
    );
    rows
}

/// Two-row answer propagated downstream from an upstream set.
fn response_vector(upstream: &CfpSet, downstream_trace_id: Uuid) -> Vec<CfpModel> {
    [CfpType::PreProduction, CfpType::MainProduction]
        .into_iter()
        .filter_map(|cfp_type| {
            let response_type = cfp_type.response_type()?;
            let mut row = CfpModel::derived(
                upstream.driver(),
                response_type,
                upstream.emission(cfp_type),
            );
            row.cfp_id = None;
            row.trace_id = downstream_trace_id;
            Some(row)
        })
        .collect()
}

/// Two-row placeholder for an imported part nobody has been asked about yet.
fn empty_response(trace_id: Uuid) -> Vec<CfpModel> {
    [
        CfpType::PreProductionResponse,
        CfpType::MainProductionResponse,
    ]
    .into_iter()
    .map(|cfp_type| CfpModel {
        cfp_id: None,
        trace_id,
        ghg_emission: None,
        ghg_declared_unit: None,
        cfp_type,
        dqr_type: cfp_type.dqr_type(),
        dqr_value: DqrValue::EMPTY,
        cfp_certification_ids: Vec::new(),
    })
    .collect()
}

/// CFP set of an upstream part answering the trade on `trace_id`, if it has been answered.
async fn upstream_set<R: Repository + ?Sized>(repo: &R, trace_id: Uuid) -> Result<Option<CfpSet>> {
    let Some(trade) = repo.get_trade_by_downstream_trace(trace_id).await? else {
        return Ok(None);
    };
    match trade.upstream_trace_id {
        Some(upstream_trace_id) => load_set(repo, upstream_trace_id).await,
        None => Ok(None),
    }
}

/// CFP set a child contributes: its own when terminal, otherwise its supplier's.
async fn child_set<R: Repository + ?Sized>(repo: &R, child: &PartsModel) -> Result<Option<CfpSet>> {
    if child.terminated_flag {
        load_set(repo, child.trace_id).await
    } else {
        upstream_set(repo, child.trace_id).await
    }
}

/// Canonical result rows for one part, or `None` when the trace is skipped.
async fn resolve_part<R: Repository + ?Sized>(
    repo: &R,
    part: &PartsModel,
) -> Result<Option<Vec<CfpModel>>> {
    let trace_id = part.trace_id;

    match classify(repo, part).await? {
        PartClass::Terminal { is_parent } => {
            let Some(set) = load_set(repo, trace_id).await? else {
                return Ok(None);
            };
            if is_parent {
                Ok(Some(with_totals(set, ComponentTotals::default())))
            } else {
                Ok(Some(set.into_rows()))
            }
        }
        PartClass::Imported => {
            let Some(trade) = repo.get_trade_by_downstream_trace(trace_id).await? else {
                return Ok(Some(empty_response(trace_id)));
            };
            let Some(upstream_trace_id) = trade.upstream_trace_id else {
                debug!("Trade {} not answered yet, skipping", trade.trade_id);
                return Ok(None);
            };
            Ok(load_set(repo, upstream_trace_id)
                .await?
                .map(|upstream| response_vector(&upstream, trace_id)))
        }
        PartClass::Parent { children } => {
            let Some(set) = load_set(repo, trace_id).await? else {
                return Ok(None);
            };

            let mut components = ComponentTotals::default();
            for child in &children {
                let Some(contribution) = child_set(repo, child).await? else {
                    debug!("Child {} has no CFP, skipping", child.trace_id);
                    continue;
                };
                if contribution.declared_unit() != set.declared_unit() {
                    warn!(
                        "Child {} declares a different unit than parent {}",
                        child.trace_id, trace_id
                    );
                    return Err(Error::Inconsistent {
                        field: "ghgDeclaredUnit",
                        trace_id,
                    });
                }
                components.pre += contribution.emission(CfpType::PreProduction).unwrap_or(0.0);
                components.main += contribution
                    .emission(CfpType::MainProduction)
                    .unwrap_or(0.0);
            }

            Ok(Some(with_totals(set, components)))
        }
    }
}

/// Canonical CFP rows for each requested trace, in the caller's order.
///
/// Traces that are unknown to `operator_id`, have no CFP, or whose supplier has not answered are
/// left out of the result.
#[instrument(skip(repo, trace_ids), fields(traces = trace_ids.len()))]
pub async fn get_cfp<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    trace_ids: &[Uuid],
) -> Result<Vec<CfpModel>> {
    let mut result = Vec::new();

    for &trace_id in trace_ids {
        let Some(part) = repo.get_part_by_trace(operator_id, trace_id).await? else {
            debug!("Part {} not found, skipping", trace_id);
            continue;
        };
        if let Some(rows) = resolve_part(repo, &part).await? {
            result.extend(rows);
        }
    }

    debug!("Aggregated {} CFP rows", result.len());
    Ok(result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::models::{DqrType, GhgDeclaredUnit};
    use crate::test_utils::{
        answer_test_trade, create_test_structure, create_test_trade, init_test_tracing, operator_a,
        operator_b, put_test_cfp, setup_test_repo, test_cfp_rows,
    };

    fn row_of(rows: &[CfpModel], cfp_type: CfpType) -> &CfpModel {
        rows.iter().find(|row| row.cfp_type == cfp_type).unwrap()
    }

    fn types(rows: &[CfpModel]) -> Vec<CfpType> {
        rows.iter().map(|row| row.cfp_type).collect()
    }

    fn assert_static_policy(rows: &[CfpModel]) {
        for row in rows
            .iter()
            .filter(|row| row.cfp_type.is_total() || row.cfp_type.is_response())
        {
            assert_eq!(row.dqr_value.ter, Some(2.1));
            assert_eq!(row.dqr_value.ger, Some(0.0));
            assert_eq!(row.dqr_value.tir, None);
        }
    }

    #[tokio::test]
    async fn test_empty_trace_list() -> Result<()> {
        let repo = setup_test_repo().await?;
        let rows = get_cfp(&repo, operator_a(), &[]).await?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_terminal_parent_gets_totals() -> Result<()> {
        init_test_tracing();
        let repo = setup_test_repo().await?;
        let parent = create_test_structure(&repo, operator_a(), true, &[]).await?;
        put_test_cfp(&repo, operator_a(), parent.parent.trace_id, [1.123_45; 4]).await?;

        let rows = get_cfp(&repo, operator_a(), &[parent.parent.trace_id]).await?;
        assert_eq!(rows.len(), 8);
        assert_eq!(&types(&rows)[4..], &[
            CfpType::PreProductionTotal,
            CfpType::MainProductionTotal,
            CfpType::PreComponentTotal,
            CfpType::MainComponentTotal,
        ]);
        for original in &rows[..4] {
            assert_eq!(original.ghg_emission, Some(1.123_45));
            assert_eq!(original.dqr_value.ger, Some(0.1));
        }
        assert_eq!(row_of(&rows, CfpType::PreProductionTotal).ghg_emission, Some(1.123_45));
        assert_eq!(row_of(&rows, CfpType::MainProductionTotal).ghg_emission, Some(1.123_45));
        assert_eq!(row_of(&rows, CfpType::PreComponentTotal).ghg_emission, Some(0.0));
        assert_eq!(row_of(&rows, CfpType::MainComponentTotal).ghg_emission, Some(0.0));
        assert_static_policy(&rows);

        let total = row_of(&rows, CfpType::PreComponentTotal);
        assert_eq!(total.dqr_type, DqrType::PreProcessingTotal);
        assert_eq!(total.ghg_declared_unit, Some(GhgDeclaredUnit::Kilogram));
        assert_eq!(total.trace_id, parent.parent.trace_id);
        Ok(())
    }

    #[tokio::test]
    async fn test_terminal_child_returns_stored_rows() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), false, &[true]).await?;
        let child = structure.children[0].trace_id;
        put_test_cfp(&repo, operator_a(), child, [0.3, 0.4, 0.0, 0.0]).await?;

        let rows = get_cfp(&repo, operator_a(), &[child]).await?;
        assert_eq!(types(&rows).len(), 4);
        assert!(rows.iter().all(|row| row.cfp_type.is_input()));
        Ok(())
    }

    #[tokio::test]
    async fn test_terminal_without_cfp_is_skipped() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), true, &[]).await?;

        let rows = get_cfp(&repo, operator_a(), &[structure.parent.trace_id]).await?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_imported_part_with_answer() -> Result<()> {
        let repo = setup_test_repo().await?;
        let downstream = create_test_structure(&repo, operator_a(), false, &[false]).await?;
        let imported = downstream.children[0].trace_id;
        let upstream = create_test_structure(&repo, operator_b(), true, &[]).await?;
        let upstream_trace = upstream.parent.trace_id;
        put_test_cfp(&repo, operator_b(), upstream_trace, [0.5, 0.6, 0.0, 0.0]).await?;
        let trade = create_test_trade(&repo, operator_a(), imported, operator_b()).await?;
        answer_test_trade(&repo, &trade, upstream_trace).await?;

        let rows = get_cfp(&repo, operator_a(), &[imported]).await?;
        assert_eq!(types(&rows), vec![
            CfpType::PreProductionResponse,
            CfpType::MainProductionResponse
        ]);
        assert_eq!(rows[0].ghg_emission, Some(0.5));
        assert_eq!(rows[1].ghg_emission, Some(0.6));
        assert_eq!(rows[1].dqr_type, DqrType::MainProcessingResponse);
        for row in &rows {
            assert_eq!(row.cfp_id, None);
            assert_eq!(row.trace_id, imported);
            assert_eq!(row.ghg_declared_unit, Some(GhgDeclaredUnit::Kilogram));
        }
        assert_static_policy(&rows);
        Ok(())
    }

    #[tokio::test]
    async fn test_imported_part_without_trade() -> Result<()> {
        let repo = setup_test_repo().await?;
        let downstream = create_test_structure(&repo, operator_a(), false, &[false]).await?;
        let imported = downstream.children[0].trace_id;

        let rows = get_cfp(&repo, operator_a(), &[imported]).await?;
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row.cfp_type.is_response());
            assert_eq!(row.ghg_emission, None);
            assert_eq!(row.dqr_value, DqrValue::EMPTY);
            assert_eq!(row.trace_id, imported);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_imported_part_not_answered_is_skipped() -> Result<()> {
        let repo = setup_test_repo().await?;
        let downstream = create_test_structure(&repo, operator_a(), false, &[false]).await?;
        let imported = downstream.children[0].trace_id;
        create_test_trade(&repo, operator_a(), imported, operator_b()).await?;

        let rows = get_cfp(&repo, operator_a(), &[imported]).await?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_sums_children() -> Result<()> {
        init_test_tracing();
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), false, &[true, false]).await?;
        let parent = structure.parent.trace_id;
        let terminal_child = structure.children[0].trace_id;
        let imported_child = structure.children[1].trace_id;

        put_test_cfp(&repo, operator_a(), parent, [1.0, 2.0, 0.0, 0.0]).await?;
        put_test_cfp(&repo, operator_a(), terminal_child, [0.3, 0.4, 0.0, 0.0]).await?;

        let upstream = create_test_structure(&repo, operator_b(), true, &[]).await?;
        let upstream_trace = upstream.parent.trace_id;
        put_test_cfp(&repo, operator_b(), upstream_trace, [0.2, 0.1, 0.0, 0.0]).await?;
        let trade = create_test_trade(&repo, operator_a(), imported_child, operator_b()).await?;
        answer_test_trade(&repo, &trade, upstream_trace).await?;

        let rows = get_cfp(&repo, operator_a(), &[parent]).await?;
        assert_eq!(rows.len(), 8);
        assert_eq!(row_of(&rows, CfpType::PreProductionTotal).ghg_emission, Some(1.0));
        assert_eq!(row_of(&rows, CfpType::MainProductionTotal).ghg_emission, Some(2.0));
        assert_eq!(row_of(&rows, CfpType::PreComponentTotal).ghg_emission, Some(0.5));
        assert_eq!(row_of(&rows, CfpType::MainComponentTotal).ghg_emission, Some(0.5));
        assert_static_policy(&rows);
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_skips_child_without_trade() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), false, &[false]).await?;
        let parent = structure.parent.trace_id;
        put_test_cfp(&repo, operator_a(), parent, [1.0, 2.0, 0.0, 0.0]).await?;

        let rows = get_cfp(&repo, operator_a(), &[parent]).await?;
        assert_eq!(rows.len(), 8);
        assert_eq!(row_of(&rows, CfpType::PreComponentTotal).ghg_emission, Some(0.0));
        assert_eq!(row_of(&rows, CfpType::MainComponentTotal).ghg_emission, Some(0.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_skips_child_with_unanswered_trade() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), false, &[false, true]).await?;
        let parent = structure.parent.trace_id;
        let imported_child = structure.children[0].trace_id;
        put_test_cfp(&repo, operator_a(), parent, [1.0, 2.0, 0.0, 0.0]).await?;
        put_test_cfp(&repo, operator_a(), structure.children[1].trace_id, [0.3, 0.4, 0.0, 0.0])
            .await?;
        create_test_trade(&repo, operator_a(), imported_child, operator_b()).await?;

        let rows = get_cfp(&repo, operator_a(), &[parent]).await?;
        assert_eq!(rows.len(), 8);
        assert_eq!(row_of(&rows, CfpType::PreComponentTotal).ghg_emission, Some(0.3));
        assert_eq!(row_of(&rows, CfpType::MainComponentTotal).ghg_emission, Some(0.4));
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_rejects_mismatched_child_unit() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), false, &[true]).await?;
        let parent = structure.parent.trace_id;
        let child = structure.children[0].trace_id;
        put_test_cfp(&repo, operator_a(), parent, [1.0, 2.0, 0.0, 0.0]).await?;

        let mut rows = test_cfp_rows(child, [0.3, 0.4, 0.0, 0.0]);
        for row in &mut rows {
            row.ghg_declared_unit = Some(GhgDeclaredUnit::Liter);
        }
        crate::core::cfp::put_cfp(&repo, operator_a(), rows).await?;

        let result = get_cfp(&repo, operator_a(), &[parent]).await;
        assert!(matches!(
            result,
            Err(Error::Inconsistent {
                field: "ghgDeclaredUnit",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_result_follows_caller_order() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), false, &[true, true]).await?;
        let first = structure.children[0].trace_id;
        let second = structure.children[1].trace_id;
        put_test_cfp(&repo, operator_a(), first, [0.1, 0.1, 0.0, 0.0]).await?;
        put_test_cfp(&repo, operator_a(), second, [0.2, 0.2, 0.0, 0.0]).await?;

        let rows = get_cfp(&repo, operator_a(), &[second, Uuid::new_v4(), first]).await?;
        assert_eq!(rows.len(), 8);
        assert!(rows[..4].iter().all(|row| row.trace_id == second));
        assert!(rows[4..].iter().all(|row| row.trace_id == first));
        Ok(())
    }

    #[tokio::test]
    async fn test_other_operators_parts_are_skipped() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_b(), true, &[]).await?;
        put_test_cfp(&repo, operator_b(), structure.parent.trace_id, [1.0; 4]).await?;

        let rows = get_cfp(&repo, operator_a(), &[structure.parent.trace_id]).await?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[test]
    fn test_guard_set_rejects_mixed_units() {
        let trace_id = Uuid::from_u128(1);
        let mut rows = test_cfp_rows(trace_id, [1.0; 4]);
        assert!(guard_set(trace_id, rows.clone()).unwrap().is_some());
        assert!(guard_set(trace_id, Vec::new()).unwrap().is_none());

        rows[3].ghg_declared_unit = Some(GhgDeclaredUnit::Unit);
        assert!(matches!(
            guard_set(trace_id, rows),
            Err(Error::Inconsistent {
                field: "ghgDeclaredUnit",
                ..
            })
        ));
    }

    #[test]
    fn test_guard_set_rejects_mixed_certificates() {
        let trace_id = Uuid::from_u128(1);
        let mut rows = test_cfp_rows(trace_id, [1.0; 4]);
        rows[0].cfp_certification_ids = vec!["cert-1".to_string()];
        assert!(matches!(
            guard_set(trace_id, rows),
            Err(Error::Inconsistent {
                field: "cfpCertificationIds",
                ..
            })
        ));
    }
}
