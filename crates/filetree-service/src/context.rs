//! Request context carrying the acting owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use filetree_core::types::id::OwnerId;

/// Context for the current request.
///
/// Authentication happens outside this crate; by the time a context exists
/// the owner id is trusted, and every lookup is scoped to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The user whose tree is being read or changed.
    pub owner_id: OwnerId,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            request_time: Utc::now(),
        }
    }
}
