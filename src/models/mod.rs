pub mod analysis;
pub mod usage;
pub mod user;

pub use analysis::{AnalysisRecord, AnalysisResult, Language};
pub use usage::{Allowance, UsageRecord, UsageStatus};
pub use user::{SessionRecord, Tier, User, UserRecord};
