//! Request status listing and counting.
//!
//! A single target is paged straight from the store with its `limit + 1` cursor. Listing both
//! targets drains the two streams, orders the merged list newest first and cuts the window in
//! memory, so the cursor of a merged page is an id into that ordering.

use crate::{
    config::gateway::ListingConfig,
    errors::{Error, Result},
    models::{StatusModel, StatusPage, StatusQuery, StatusTarget},
    repository::Repository,
};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Parameters of one listing call, as received from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListStatusesParams {
    /// `None` lists both sides
    pub target: Option<StatusTarget>,
    /// Restrict to one status
    pub status_id: Option<Uuid>,
    /// First status id of the page, inclusive
    pub after: Option<Uuid>,
    /// Page size; `None` uses the configured default
    pub limit: Option<u64>,
}

fn effective_limit(config: &ListingConfig, limit: Option<u64>) -> Result<u64> {
    match limit {
        Some(0) => Err(Error::validation("limit must be at least 1")),
        Some(limit) => Ok(limit.min(config.max_limit)),
        None => Ok(config.default_limit),
    }
}

/// Reads every page of one stream.
async fn drain<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    target: StatusTarget,
    page_size: u64,
) -> Result<Vec<StatusModel>> {
    let mut statuses = Vec::new();
    let mut after = None;
    loop {
        let page = repo
            .list_statuses(&StatusQuery {
                operator_id,
                target,
                status_id: None,
                after,
                limit: page_size,
            })
            .await?;
        statuses.extend(page.statuses);
        match page.next {
            Some(next) => after = Some(next),
            None => return Ok(statuses),
        }
    }
}

/// Cuts `[after, after + limit)` out of an already ordered list.
fn window(statuses: Vec<StatusModel>, after: Option<Uuid>, limit: u64) -> StatusPage {
    let start = match after {
        Some(after) => statuses
            .iter()
            .position(|status| status.status_id == after)
            .unwrap_or(statuses.len()),
        None => 0,
    };
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);

    let mut rest = statuses.into_iter().skip(start);
    let page: Vec<StatusModel> = rest.by_ref().take(limit).collect();
    let next = rest.next().map(|status| status.status_id);
    StatusPage {
        statuses: page,
        next,
    }
}

/// Lists request statuses of an operator, one page at a time.
///
/// # Errors
/// Returns a validation error for a zero limit; store errors propagate unchanged.
#[instrument(skip(repo, config))]
pub async fn list_request_statuses<R: Repository + ?Sized>(
    repo: &R,
    config: &ListingConfig,
    operator_id: Uuid,
    params: ListStatusesParams,
) -> Result<StatusPage> {
    let limit = effective_limit(config, params.limit)?;

    if let Some(target) = params.target {
        return repo
            .list_statuses(&StatusQuery {
                operator_id,
                target,
                status_id: params.status_id,
                after: params.after,
                limit,
            })
            .await;
    }

    let mut merged = drain(repo, operator_id, StatusTarget::Request, config.max_limit).await?;
    merged.extend(drain(repo, operator_id, StatusTarget::Response, config.max_limit).await?);
    merged.sort_by(|a, b| {
        b.requested_at
            .cmp(&a.requested_at)
            .then_with(|| a.status_id.cmp(&b.status_id))
    });
    if let Some(status_id) = params.status_id {
        merged.retain(|status| status.status_id == status_id);
    }
    debug!("Merged {} statuses of both targets", merged.len());

    Ok(window(merged, params.after, limit))
}

/// Number of live statuses on one side of the operator's trades.
pub async fn count_request_statuses<R: Repository + ?Sized>(
    repo: &R,
    operator_id: Uuid,
    target: StatusTarget,
) -> Result<u64> {
    repo.count_statuses(operator_id, target).await
}
