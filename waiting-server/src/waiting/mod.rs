//! 排队领域模块
//!
//! - **service**: 生命周期入口 (登记/入场/爽约/重排修复)
//! - **reorder**: 纯函数重排算法
//! - **statistics**: 平均耗时与预计等待推算
//! - **no_show_scheduler**: 爽约超时扫描
//! - **promotion_scheduler**: 可入场时间兜底扫描
//!
//! # 数据流
//!
//! ```text
//! join ──▶ Waiting(WAITING, max+1) ──▶ 确认通知 + 4 条待触发通知
//! enter ─▶ VISITED + 统计补全 ──▶ advance_after_entry ─▶ 批量落库
//! no-show ▶ NO_SHOW ──▶ renumber_after_no_show ─▶ 爽约通知 ─▶ 封禁升级
//! ```

pub mod error;
pub mod no_show_scheduler;
pub mod promotion_scheduler;
pub mod reorder;
pub mod service;
pub mod statistics;

// Re-exports
pub use error::WaitingError;
pub use no_show_scheduler::NoShowScheduler;
pub use promotion_scheduler::PromotionScheduler;
pub use reorder::{advance_after_entry, renumber_after_no_show, ReorderOutcome};
pub use service::{JoinRequest, VenueLocks, WaitingService};
pub use statistics::VenueWaitingStatistics;
