//! 通知子系统
//!
//! - **trigger**: 无状态触发条件求值器
//! - **service**: 内容生成与投递公共路径
//! - **sweep**: 待触发通知的周期扫描
//! - **channel**: 实时连接注册表 (窄接口 + TTL 驱逐)
//! - **email**: 异步邮件队列与 worker
//!
//! # 投递语义
//!
//! 待触发通知投递成功后立即删除 → at-most-once；
//! 投递本身失败时记录保留、下周期重试 → 失败前 at-least-once。

pub mod channel;
pub mod email;
pub mod service;
pub mod sweep;
pub mod trigger;

// Re-exports
pub use channel::RealtimeChannels;
pub use email::{EmailPayload, EmailService, EmailWorker};
pub use service::NotificationService;
pub use sweep::NotificationSweepScheduler;
pub use trigger::{should_fire, TriggerContext};
