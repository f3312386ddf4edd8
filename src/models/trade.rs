//! Trades between operators and the request statuses tracking their CFP answer.

use chrono::{DateTime, Utc};
use uuid::Uuid;

wire_enum! {
    /// Progress of the CFP answer to a trade request.
    pub enum CfpResponseStatus {
        /// Waiting for the supplier
        Pending => "PENDING",
        /// CFP is available downstream
        Completed => "COMPLETED",
        /// Supplier refused the request
        Reject => "REJECT",
        /// Requester withdrew the request
        Cancel => "CANCEL",
    }
}

wire_enum! {
    /// Whether the sub-tree below the supplier is closed.
    pub enum TradeTreeStatus {
        /// Supplier's part still depends on open upstream data
        Unterminated => "UNTERMINATED",
        /// Supplier's part is terminal
        Terminated => "TERMINATED",
    }
}

wire_enum! {
    /// Kind of data requested through a trade.
    pub enum RequestType {
        /// Carbon footprint
        Cfp => "CFP",
    }
}

wire_enum! {
    /// Which side of a trade a status listing looks at.
    pub enum StatusTarget {
        /// Requests the operator issued
        Request => "REQUEST",
        /// Requests the operator has to answer
        Response => "RESPONSE",
    }
}

impl CfpResponseStatus {
    /// Whether no further event is accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A stored trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeModel {
    /// Trade identity, shared with its request status
    pub trade_id: Uuid,
    /// Requesting operator
    pub downstream_operator_id: Uuid,
    /// Answering operator
    pub upstream_operator_id: Uuid,
    /// Requester's part
    pub downstream_trace_id: Uuid,
    /// Supplier's part, `None` until the supplier answers
    pub upstream_trace_id: Option<Uuid>,
}

/// A trade request as submitted by the downstream operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequestInput {
    /// `None` creates the trade, `Some` updates it
    pub trade_id: Option<Uuid>,
    /// Requesting operator, must be the caller
    pub downstream_operator_id: Uuid,
    /// Operator asked to answer
    pub upstream_operator_id: Uuid,
    /// Requester's part
    pub downstream_trace_id: Uuid,
    /// Free text for the supplier
    pub message: Option<String>,
    /// ISO-8601 due date, opaque to the core
    pub response_due_date: String,
}

/// Pair of status dimensions reported on the wire as `requestStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestStatus {
    /// CFP answer progress
    pub cfp_response_status: CfpResponseStatus,
    /// Sub-tree terminality
    pub trade_tree_status: TradeTreeStatus,
}

/// Request status bound 1:1 to a trade.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusModel {
    /// Status identity
    pub status_id: Uuid,
    /// Trade identity
    pub trade_id: Uuid,
    /// Current state
    pub request_status: RequestStatus,
    /// Requester's message
    pub message: Option<String>,
    /// Supplier's or requester's reply on reject/cancel
    pub reply_message: Option<String>,
    /// Always CFP
    pub request_type: RequestType,
    /// ISO-8601 due date, opaque to the core
    pub response_due_date: String,
    /// Number of completed answers
    pub completed_count: i32,
    /// Number of trades the count refers to
    pub trades_count: i32,
    /// Creation time, the listing sort key
    pub requested_at: DateTime<Utc>,
}

/// One store-level page of a single status stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    /// Operator whose statuses are listed
    pub operator_id: Uuid,
    /// Side of the trade
    pub target: StatusTarget,
    /// Restrict to one status
    pub status_id: Option<Uuid>,
    /// First status id of the page, inclusive
    pub after: Option<Uuid>,
    /// Page size
    pub limit: u64,
}

/// A page of statuses plus the cursor of the next page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusPage {
    /// Statuses of this page
    pub statuses: Vec<StatusModel>,
    /// Id to pass as `after` for the next page, present iff more remain
    pub next: Option<Uuid>,
}
