//! 封禁子系统
//!
//! - **policy**: 爽约 → 场次级/平台级封禁的升级策略
//! - **release_scheduler**: 每日删除过期 GLOBAL 封禁

pub mod policy;
pub mod release_scheduler;

// Re-exports
pub use policy::{BanEscalationService, EscalationOutcome};
pub use release_scheduler::BanReleaseScheduler;
