//! Feedback Module - Analyst corrections and whitelist
//!
//! - `record`      - labels, scored logs, corrections, `LogStore` seam
//! - `whitelist`   - trusted source IPs
//! - `coordinator` - pending-correction buffer and batched retraining

pub mod coordinator;
pub mod record;
pub mod whitelist;


pub use coordinator::{CoordinatorConfig, FeedbackContext, FeedbackCoordinator, FeedbackStats};
pub use record::{Correction, FeedbackRecord, Label, LogStore, ScoredLog};
pub use whitelist::{Whitelist, WhitelistEntry};
