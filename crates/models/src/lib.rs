//! Data contracts shared by the alert store, the notification renderer, and
//! the alert agent.
mod alerts;
mod batch;
mod id;

pub use alerts::{Alert, AlertPayload, HomeUserLink, NewAlert, PayloadError, SentStatus};
pub use batch::{BatchResult, ResolvedRecipient};
pub use id::AlertId;

/// Maximum number of alerts processed by a single batch invocation.
pub const BATCH_LIMIT: u32 = 10;
