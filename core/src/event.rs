//! Run-completion events: the one inbound fact this library consumes.
//!
//! RULE: callers emit a `RunEvent` when (and only when) a processing
//! session reaches terminal success. The session id doubles as the
//! idempotency key, so retried deliveries are harmless.

use crate::types::{CustomerId, SessionId};
use serde::{Deserialize, Serialize};

/// "Customer C's network completed a health-check run at date T."
///
/// `completed_on` stays a raw string until write time: parsing is the
/// reconciler's job, and an unparseable value must be rejected there,
/// never silently defaulted to today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub session_id: SessionId,
    pub customer_id: CustomerId,
    pub completed_on: String,
}

impl RunEvent {
    pub fn new(
        session_id: impl Into<SessionId>,
        customer_id: impl Into<CustomerId>,
        completed_on: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            customer_id: customer_id.into(),
            completed_on: completed_on.into(),
        }
    }
}
