//! Database Models
//!
//! SurrealDB 实体定义。排队/封禁/通知/统计由本服务创建，
//! 场次与会员由外部系统维护、这里只读。

pub mod ban;
pub mod member;
pub mod notification;
pub mod serde_helpers;
pub mod statistic;
pub mod venue;
pub mod waiting;

// Re-exports
pub use ban::{Ban, BanScope};
pub use member::Member;
pub use notification::{Notification, NotificationTrigger, ScheduledNotification, WaitingEventType};
pub use statistic::VisitStatistic;
pub use venue::Venue;
pub use waiting::{Waiting, WaitingStatus};
