//! CFP writes - registering a new four-row set, updating an existing one, and attaching
//! certificates.
//!
//! Registering a fresh set for a part that answers trades is what completes those trades: every
//! pending request status pointing at the part moves to `COMPLETED` in the same store transaction
//! as the insert.

use crate::{
    core::validate::validate_cfp_set,
    errors::{Error, Result},
    models::{CfpModel, CfpResponseStatus, RequestStatus, StatusModel, TradeTreeStatus},
    repository::Repository,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Registers or updates a four-row CFP set for one of the caller's parts.
///
/// All rows carrying no cfp-id registers a new set: the trace must not have CFP yet, a fresh
/// cfp-id is shared by the four rows, and pending requests answered with this part are completed.
/// All rows carrying the same cfp-id updates the stored rows in place.
///
/// Returns the cfp-id of the stored set.
///
/// # Errors
/// * [`Error::Validation`] when the rows break the write rules
/// * [`Error::PartNotFound`] when the part does not belong to the caller
/// * [`Error::DuplicateCfp`] when a new set targets a trace that already has CFP
/// * [`Error::CfpNotFound`] when an update references a row that does not exist
#[instrument(skip(repo, rows))]
pub async fn put_cfp<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    mut rows: Vec<CfpModel>,
) -> Result<Uuid> {
    validate_cfp_set(&rows)?;
    let trace_id = rows[0].trace_id;

    let part = repo
        .get_part_by_trace(operator_id, trace_id)
        .await?
        .ok_or(Error::PartNotFound { trace_id })?;

    if let Some(cfp_id) = rows[0].cfp_id {
        update_set(repo, cfp_id, &rows).await?;
        return Ok(cfp_id);
    }

    if !repo.list_cfp_by_trace(trace_id).await?.is_empty() {
        return Err(Error::DuplicateCfp { trace_id });
    }

    let cfp_id = Uuid::new_v4();
    for row in &mut rows {
        row.cfp_id = Some(cfp_id);
    }

    let trade_tree_status = if part.terminated_flag {
        TradeTreeStatus::Terminated
    } else {
        TradeTreeStatus::Unterminated
    };
    let mut completed = Vec::new();
    for trade in repo.list_trades_by_upstream_trace(trace_id).await? {
        let Some(status) = repo.get_status_by_trade(trade.trade_id).await? else {
            continue;
        };
        if status.request_status.cfp_response_status != CfpResponseStatus::Pending {
            continue;
        }
        // Each trade is counted on its own even when the part answers several.
        completed.push(StatusModel {
            request_status: RequestStatus {
                cfp_response_status: CfpResponseStatus::Completed,
                trade_tree_status,
            },
            completed_count: 1,
            trades_count: 1,
            ..status
        });
    }

    repo.batch_insert_cfp(&rows, &completed).await?;
    info!(
        "Registered CFP {} for trace {}, completing {} requests",
        cfp_id,
        trace_id,
        completed.len()
    );
    Ok(cfp_id)
}

/// Overwrites the value fields of each stored row with the submitted ones.
async fn update_set<R: Repository + ?Sized>(
    repo: &R,
    cfp_id: Uuid,
    rows: &[CfpModel],
) -> Result<()> {
    let mut updated = Vec::with_capacity(rows.len());
    for row in rows {
        let stored = repo
            .get_cfp_by_id_and_type(cfp_id, row.cfp_type)
            .await?
            .ok_or_else(|| Error::CfpNotFound {
                cfp_id,
                cfp_type: row.cfp_type.to_string(),
            })?;
        if stored.trace_id != row.trace_id {
            return Err(Error::validation(format!(
                "cfpId {cfp_id} belongs to another traceId"
            )));
        }

        updated.push(CfpModel {
            ghg_emission: row.ghg_emission,
            ghg_declared_unit: row.ghg_declared_unit,
            dqr_type: row.dqr_type,
            dqr_value: row.dqr_value,
            ..stored
        });
    }

    repo.update_cfp(&updated).await?;
    debug!("Updated {} rows of CFP {}", updated.len(), cfp_id);
    Ok(())
}

/// Replaces the certificate list on every CFP row of one of the caller's parts.
///
/// # Errors
/// Returns [`Error::PartNotFound`] when the part does not belong to the caller, or a validation
/// error when the part has no CFP to attach certificates to.
pub async fn register_cfp_certificates<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    trace_id: Uuid,
    certification_ids: &[String],
) -> Result<()> {
    if repo.get_part_by_trace(operator_id, trace_id).await?.is_none() {
        return Err(Error::PartNotFound { trace_id });
    }
    if certification_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(Error::validation("cfpCertificationIds must not contain blank ids"));
    }
    if repo.list_cfp_by_trace(trace_id).await?.is_empty() {
        return Err(Error::validation(format!(
            "traceId {trace_id} has no CFP to certify"
        )));
    }

    repo.put_cfp_certificates(trace_id, certification_ids).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::gateway::TradeConfig;
    use crate::core::aggregate::get_cfp;
    use crate::core::trade::{cancel_trade_request, reject_trade_request};
    use crate::models::{CfpType, DqrValue, GhgDeclaredUnit};
    use crate::test_utils::{
        answer_test_trade, create_test_part, create_test_structure, create_test_trade,
        init_test_tracing, operator_a, operator_b, put_test_cfp, setup_test_repo, test_cfp_rows,
    };

    #[tokio::test]
    async fn test_new_set_gets_shared_id() -> Result<()> {
        let repo = setup_test_repo().await?;
        let trace_id = create_test_part(&repo, operator_a(), true).await?.trace_id;

        let cfp_id = put_cfp(&repo, operator_a(), test_cfp_rows(trace_id, [1.0; 4])).await?;

        let stored = repo.list_cfp_by_trace(trace_id).await?;
        assert_eq!(stored.len(), 4);
        assert!(stored.iter().all(|row| row.cfp_id == Some(cfp_id)));
        Ok(())
    }

    #[tokio::test]
    async fn test_second_new_set_is_duplicate() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), true, &[]).await?;
        let trace_id = structure.parent.trace_id;
        put_test_cfp(&repo, operator_a(), trace_id, [1.0; 4]).await?;

        let result = put_cfp(&repo, operator_a(), test_cfp_rows(trace_id, [2.0; 4])).await;
        assert!(matches!(result, Err(Error::DuplicateCfp { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_requires_own_part() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_b(), true, &[]).await?;

        let result = put_cfp(
            &repo,
            operator_a(),
            test_cfp_rows(structure.parent.trace_id, [1.0; 4]),
        )
        .await;
        assert!(matches!(result, Err(Error::PartNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_set_is_rejected_before_store() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), true, &[]).await?;
        let mut rows = test_cfp_rows(structure.parent.trace_id, [1.0; 4]);
        rows.pop();

        let result = put_cfp(&repo, operator_a(), rows).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(
            repo.list_cfp_by_trace(structure.parent.trace_id)
                .await?
                .is_empty()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_update_overwrites_values() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), true, &[]).await?;
        let trace_id = structure.parent.trace_id;
        let cfp_id = put_test_cfp(&repo, operator_a(), trace_id, [1.0; 4]).await?;

        let mut rows = test_cfp_rows(trace_id, [3.5, 4.5, 0.0, 0.0]);
        for row in &mut rows {
            row.cfp_id = Some(cfp_id);
            row.ghg_declared_unit = Some(GhgDeclaredUnit::Unit);
            row.dqr_value = DqrValue {
                ter: Some(1.0),
                ger: Some(1.0),
                tir: Some(1.0),
            };
        }
        assert_eq!(put_cfp(&repo, operator_a(), rows).await?, cfp_id);

        let stored = repo
            .get_cfp_by_id_and_type(cfp_id, CfpType::MainProduction)
            .await?
            .unwrap();
        assert_eq!(stored.ghg_emission, Some(4.5));
        assert_eq!(stored.ghg_declared_unit, Some(GhgDeclaredUnit::Unit));
        assert_eq!(stored.dqr_value.ter, Some(1.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_with_current_values_is_idempotent() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), true, &[]).await?;
        let trace_id = structure.parent.trace_id;
        put_test_cfp(&repo, operator_a(), trace_id, [1.0, 2.0, 0.5, 0.5]).await?;

        let before = repo.list_cfp_by_trace(trace_id).await?;
        put_cfp(&repo, operator_a(), before.clone()).await?;
        let after = repo.list_cfp_by_trace(trace_id).await?;
        assert_eq!(before, after);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_of_unknown_set() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), true, &[]).await?;
        let mut rows = test_cfp_rows(structure.parent.trace_id, [1.0; 4]);
        let unknown = Uuid::new_v4();
        for row in &mut rows {
            row.cfp_id = Some(unknown);
        }

        let result = put_cfp(&repo, operator_a(), rows).await;
        assert!(matches!(result, Err(Error::CfpNotFound { cfp_id, .. }) if cfp_id == unknown));
        Ok(())
    }

    #[tokio::test]
    async fn test_new_set_completes_pending_requests() -> Result<()> {
        init_test_tracing();
        let repo = setup_test_repo().await?;
        let downstream = create_test_structure(&repo, operator_a(), false, &[false, false]).await?;
        let upstream = create_test_structure(&repo, operator_b(), true, &[]).await?;
        let upstream_trace = upstream.parent.trace_id;

        let mut trades = Vec::new();
        for child in &downstream.children {
            let trade = create_test_trade(&repo, operator_a(), child.trace_id, operator_b()).await?;
            let status = answer_test_trade(&repo, &trade, upstream_trace).await?;
            assert_eq!(
                status.request_status.cfp_response_status,
                CfpResponseStatus::Pending
            );
            trades.push(trade);
        }

        put_test_cfp(&repo, operator_b(), upstream_trace, [0.5, 0.6, 0.0, 0.0]).await?;

        for trade in &trades {
            let status = repo.get_status_by_trade(trade.trade_id).await?.unwrap();
            assert_eq!(
                status.request_status,
                RequestStatus {
                    cfp_response_status: CfpResponseStatus::Completed,
                    trade_tree_status: TradeTreeStatus::Terminated,
                }
            );
            assert_eq!(status.completed_count, 1);
            assert_eq!(status.trades_count, 1);

            let rows = get_cfp(&repo, operator_a(), &[trade.downstream_trace_id]).await?;
            assert_eq!(rows[0].ghg_emission, Some(0.5));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_non_terminal_supplier_part_completes_unterminated() -> Result<()> {
        let repo = setup_test_repo().await?;
        let downstream = create_test_structure(&repo, operator_a(), false, &[false]).await?;
        let upstream = create_test_structure(&repo, operator_b(), false, &[true]).await?;
        let upstream_trace = upstream.parent.trace_id;
        let trade =
            create_test_trade(&repo, operator_a(), downstream.children[0].trace_id, operator_b())
                .await?;
        let answered = answer_test_trade(&repo, &trade, upstream_trace).await?;
        assert_eq!(
            answered.request_status,
            RequestStatus {
                cfp_response_status: CfpResponseStatus::Pending,
                trade_tree_status: TradeTreeStatus::Unterminated,
            }
        );

        put_test_cfp(&repo, operator_b(), upstream_trace, [1.0; 4]).await?;

        let status = repo.get_status_by_trade(trade.trade_id).await?.unwrap();
        assert_eq!(
            status.request_status,
            RequestStatus {
                cfp_response_status: CfpResponseStatus::Completed,
                trade_tree_status: TradeTreeStatus::Unterminated,
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_requests_stay_closed() -> Result<()> {
        let repo = setup_test_repo().await?;
        let config = TradeConfig::default();
        let downstream = create_test_structure(&repo, operator_a(), false, &[false, false]).await?;
        let upstream = create_test_structure(&repo, operator_b(), true, &[]).await?;
        let upstream_trace = upstream.parent.trace_id;

        let cancelled =
            create_test_trade(&repo, operator_a(), downstream.children[0].trace_id, operator_b())
                .await?;
        let rejected =
            create_test_trade(&repo, operator_a(), downstream.children[1].trace_id, operator_b())
                .await?;
        answer_test_trade(&repo, &cancelled, upstream_trace).await?;
        answer_test_trade(&repo, &rejected, upstream_trace).await?;
        cancel_trade_request(&repo, &config, operator_a(), cancelled.trade_id, None).await?;
        reject_trade_request(&repo, &config, operator_b(), rejected.trade_id, None).await?;

        put_test_cfp(&repo, operator_b(), upstream_trace, [1.0; 4]).await?;

        let status = repo.get_status_by_trade(cancelled.trade_id).await?.unwrap();
        assert_eq!(
            status.request_status.cfp_response_status,
            CfpResponseStatus::Cancel
        );
        assert_eq!(status.completed_count, 0);
        let status = repo.get_status_by_trade(rejected.trade_id).await?.unwrap();
        assert_eq!(
            status.request_status.cfp_response_status,
            CfpResponseStatus::Reject
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_new_sets_register_once() -> Result<()> {
        let repo = setup_test_repo().await?;
        let trace_id = create_test_part(&repo, operator_a(), true).await?.trace_id;

        let (first, second) = tokio::join!(
            put_cfp(&repo, operator_a(), test_cfp_rows(trace_id, [1.0; 4])),
            put_cfp(&repo, operator_a(), test_cfp_rows(trace_id, [2.0; 4])),
        );
        let duplicates = [&first, &second]
            .iter()
            .filter(|result| matches!(result, Err(Error::DuplicateCfp { .. })))
            .count();
        assert_eq!(duplicates, 1);
        assert!(first.is_ok() || second.is_ok());

        assert_eq!(repo.list_cfp_by_trace(trace_id).await?.len(), 4);
        assert_eq!(get_cfp(&repo, operator_a(), &[trace_id]).await?.len(), 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_registration_racing_cancel_lands_once() -> Result<()> {
        let repo = setup_test_repo().await?;
        let config = TradeConfig::default();
        let downstream = create_test_structure(&repo, operator_a(), false, &[false]).await?;
        let upstream = create_test_structure(&repo, operator_b(), true, &[]).await?;
        let upstream_trace = upstream.parent.trace_id;
        let trade =
            create_test_trade(&repo, operator_a(), downstream.children[0].trace_id, operator_b())
                .await?;
        answer_test_trade(&repo, &trade, upstream_trace).await?;

        let (registered, cancelled) = tokio::join!(
            put_test_cfp(&repo, operator_b(), upstream_trace, [1.0; 4]),
            cancel_trade_request(&repo, &config, operator_a(), trade.trade_id, None),
        );
        registered?;

        let status = repo.get_status_by_trade(trade.trade_id).await?.unwrap();
        match status.request_status.cfp_response_status {
            CfpResponseStatus::Completed => {
                assert!(matches!(cancelled, Err(Error::InvalidTransition { .. })));
            }
            CfpResponseStatus::Cancel => {
                assert!(cancelled.is_ok());
                assert_eq!(status.completed_count, 0);
            }
            other => panic!("unexpected status {other}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_certificates_replace_list() -> Result<()> {
        let repo = setup_test_repo().await?;
        let structure = create_test_structure(&repo, operator_a(), true, &[]).await?;
        let trace_id = structure.parent.trace_id;

        let first = ["c-1".to_string()];
        let result = register_cfp_certificates(&repo, operator_a(), trace_id, &first).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        put_test_cfp(&repo, operator_a(), trace_id, [1.0; 4]).await?;
        register_cfp_certificates(&repo, operator_a(), trace_id, &first).await?;
        let replaced = ["c-2".to_string(), "c-3".to_string()];
        register_cfp_certificates(&repo, operator_a(), trace_id, &replaced).await?;

        let rows = get_cfp(&repo, operator_a(), &[trace_id]).await?;
        assert_eq!(rows.len(), 8);
        for row in &rows {
            assert_eq!(row.cfp_certification_ids, vec!["c-2", "c-3"]);
        }
        Ok(())
    }
}
