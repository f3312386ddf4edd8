//! Trade lifecycle between a downstream requester and an upstream supplier.
//!
//! A request creates a trade and its `PENDING` status. From `PENDING` the requester may cancel,
//! the supplier may reject, or the supplier may answer with one of its parts; `COMPLETED`,
//! `REJECT` and `CANCEL` accept no further events.

use crate::{
    config::gateway::TradeConfig,
    core::validate::{Violations, validate_text},
    errors::{Error, Result},
    models::{
        CfpResponseStatus, RequestStatus, RequestType, StatusModel, TradeModel, TradeRequestInput,
        TradeTreeStatus,
    },
    repository::Repository,
};
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Live trade plus its status, failing when either half is missing.
async fn load_trade_with_status<R: Repository + ?Sized>(
    repo: &R,
    trade_id: Uuid,
) -> Result<(TradeModel, StatusModel)> {
    let trade = repo
        .get_trade(trade_id)
        .await?
        .ok_or(Error::TradeNotFound { trade_id })?;
    let status = repo
        .get_status_by_trade(trade_id)
        .await?
        .ok_or(Error::StatusNotFound { trade_id })?;
    Ok((trade, status))
}

fn ensure_pending(status: &StatusModel, event: &'static str) -> Result<()> {
    let current = status.request_status.cfp_response_status;
    if current.is_terminal() {
        warn!("Refusing to {} trade {} in status {}", event, status.trade_id, current);
        return Err(Error::InvalidTransition {
            from: current.to_string(),
            event,
        });
    }
    Ok(())
}

/// Creates or updates a CFP request on one of the caller's parts.
///
/// Without a trade id a new trade is opened together with a `PENDING`/`UNTERMINATED` status.
/// The downstream part must belong to the caller, must not be terminal and must not already be
/// traded. With a trade id the pending request's upstream operator, message and due date are
/// replaced.
///
/// # Errors
/// Returns a validation error for bad input, [`Error::PartNotFound`] for a part the caller does
/// not own, [`Error::TradeNotFound`]/[`Error::StatusNotFound`] when updating a missing trade, and
/// [`Error::InvalidTransition`] when the request is no longer pending.
#[instrument(skip(repo, config, input))]
pub async fn put_trade_request<R: Repository + ?Sized>(
    repo: &R,
    config: &TradeConfig,
    operator_id: Uuid,
    input: TradeRequestInput,
) -> Result<(TradeModel, StatusModel)> {
    let mut violations = Violations::new();
    violations.check(input.downstream_operator_id == operator_id, || {
        "downstreamOperatorId must be the caller's operatorId".to_string()
    });
    violations.check(input.upstream_operator_id != operator_id, || {
        "upstreamOperatorId must differ from downstreamOperatorId".to_string()
    });
    violations.check(!input.response_due_date.trim().is_empty(), || {
        "responseDueDate is required".to_string()
    });
    violations.into_result()?;
    validate_text("message", input.message.as_deref(), config.message_max_len)?;

    if let Some(trade_id) = input.trade_id {
        let (mut trade, mut status) = load_trade_with_status(repo, trade_id).await?;
        if trade.downstream_operator_id != operator_id
            || trade.downstream_trace_id != input.downstream_trace_id
        {
            return Err(Error::TradeNotFound { trade_id });
        }
        ensure_pending(&status, "update")?;

        trade.upstream_operator_id = input.upstream_operator_id;
        status.message = input.message;
        status.response_due_date = input.response_due_date;
        repo.update_trade_request(&trade, &status, operator_id).await?;
        info!("Updated trade request {}", trade_id);
        return Ok((trade, status));
    }

    let trace_id = input.downstream_trace_id;
    let part = repo
        .get_part_by_trace(operator_id, trace_id)
        .await?
        .ok_or(Error::PartNotFound { trace_id })?;
    if part.terminated_flag {
        return Err(Error::validation(format!(
            "downstreamTraceId {trace_id} is terminal and cannot request CFP"
        )));
    }
    if repo.get_trade_by_downstream_trace(trace_id).await?.is_some() {
        return Err(Error::validation(format!(
            "downstreamTraceId {trace_id} already has a trade"
        )));
    }

    let trade = TradeModel {
        trade_id: Uuid::new_v4(),
        downstream_operator_id: operator_id,
        upstream_operator_id: input.upstream_operator_id,
        downstream_trace_id: trace_id,
        upstream_trace_id: None,
    };
    let status = StatusModel {
        status_id: Uuid::new_v4(),
        trade_id: trade.trade_id,
        request_status: RequestStatus {
            cfp_response_status: CfpResponseStatus::Pending,
            trade_tree_status: TradeTreeStatus::Unterminated,
        },
        message: input.message,
        reply_message: None,
        request_type: RequestType::Cfp,
        response_due_date: input.response_due_date,
        completed_count: 0,
        trades_count: 0,
        requested_at: Utc::now(),
    };

    repo.create_trade_request(&trade, &status, operator_id).await?;
    info!(
        "Opened trade {} from {} to {}",
        trade.trade_id, trade.downstream_operator_id, trade.upstream_operator_id
    );
    Ok((trade, status))
}

/// Records the supplier's answer to a pending request.
///
/// The answered part must be a live part of the supplier. The request is `COMPLETED` when CFP
/// exists on the answered part or on the requester's part, otherwise it stays `PENDING` until CFP
/// for the answered part is registered. The tree status follows the answered part's terminal flag.
///
/// # Errors
/// Returns [`Error::TradeNotFound`] when the caller is not the trade's supplier,
/// [`Error::InvalidTransition`] when the request is no longer pending, and
/// [`Error::PartNotFound`] when the answered trace is not a part of the caller.
#[instrument(skip(repo))]
pub async fn put_trade_response<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    trade_id: Uuid,
    answered_trace_id: Uuid,
) -> Result<StatusModel> {
    let (trade, status) = load_trade_with_status(repo, trade_id).await?;
    if trade.upstream_operator_id != operator_id {
        return Err(Error::TradeNotFound { trade_id });
    }
    ensure_pending(&status, "answer")?;
    let answered = repo
        .get_part_by_trace(operator_id, answered_trace_id)
        .await?
        .ok_or(Error::PartNotFound {
            trace_id: answered_trace_id,
        })?;

    let mut cfp_response_status = CfpResponseStatus::Completed;
    if repo.list_cfp_by_trace(answered_trace_id).await?.is_empty()
        && repo
            .list_cfp_by_trace(trade.downstream_trace_id)
            .await?
            .is_empty()
    {
        cfp_response_status = CfpResponseStatus::Pending;
    }

    let trade_tree_status = if answered.terminated_flag {
        TradeTreeStatus::Terminated
    } else {
        TradeTreeStatus::Unterminated
    };

    let completed = i32::from(cfp_response_status == CfpResponseStatus::Completed);
    let status = StatusModel {
        request_status: RequestStatus {
            cfp_response_status,
            trade_tree_status,
        },
        completed_count: completed,
        trades_count: completed,
        ..status
    };

    repo.put_trade_response(trade_id, answered_trace_id, &status, operator_id).await?;
    info!(
        "Trade {} answered with {}: {}/{}",
        trade_id, answered_trace_id, cfp_response_status, trade_tree_status
    );
    Ok(status)
}

/// Withdraws a pending request; only the requester may cancel.
///
/// # Errors
/// Returns [`Error::TradeNotFound`] for trades the caller did not issue,
/// [`Error::InvalidTransition`] for requests that are no longer pending, and a validation error
/// when the reply is too long.
pub async fn cancel_trade_request<R: Repository + ?Sized>(
    repo: &R,
    config: &TradeConfig,
    operator_id: Uuid,
    trade_id: Uuid,
    reply_message: Option<&str>,
) -> Result<()> {
    validate_text("replyMessage", reply_message, config.reply_message_max_len)?;
    let (trade, status) = load_trade_with_status(repo, trade_id).await?;
    if trade.downstream_operator_id != operator_id {
        return Err(Error::TradeNotFound { trade_id });
    }
    ensure_pending(&status, "cancel")?;

    repo.cancel_status(trade_id, reply_message, operator_id).await?;
    info!("Trade {} cancelled", trade_id);
    Ok(())
}

/// Refuses a pending request; only the supplier may reject.
///
/// # Errors
/// Returns [`Error::TradeNotFound`] for trades addressed to another operator,
/// [`Error::InvalidTransition`] for requests that are no longer pending, and a validation error
/// when the reply is too long.
pub async fn reject_trade_request<R: Repository + ?Sized>(
    repo: &R,
    config: &TradeConfig,
    operator_id: Uuid,
    trade_id: Uuid,
    reply_message: Option<&str>,
) -> Result<()> {
    validate_text("replyMessage", reply_message, config.reply_message_max_len)?;
    let (trade, status) = load_trade_with_status(repo, trade_id).await?;
    if trade.upstream_operator_id != operator_id {
        return Err(Error::TradeNotFound { trade_id });
    }
    ensure_pending(&status, "reject")?;

    repo.reject_status(trade_id, reply_message, operator_id).await?;
    info!("Trade {} rejected", trade_id);
    Ok(())
}

/// Soft-deletes a trade and its status; only the requester may delete.
///
/// # Errors
/// Returns [`Error::TradeNotFound`] when the trade is missing or was issued by another operator.
pub async fn delete_trade<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    trade_id: Uuid,
) -> Result<()> {
    match repo.get_trade(trade_id).await? {
        Some(trade) if trade.downstream_operator_id == operator_id => {
            repo.delete_trade(trade_id, operator_id).await?;
            info!("Trade {} deleted", trade_id);
            Ok(())
        }
        _ => Err(Error::TradeNotFound { trade_id }),
    }
}

/// A live trade the caller takes part in, on either side.
pub async fn get_trade<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    trade_id: Uuid,
) -> Result<Option<TradeModel>> {
    let trade = repo.get_trade(trade_id).await?.filter(|trade| {
        trade.downstream_operator_id == operator_id || trade.upstream_operator_id == operator_id
    });
    Ok(trade)
}
