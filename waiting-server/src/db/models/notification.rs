//! Notification Models
//!
//! - [`Notification`]: 已投递的通知，永久保留
//! - [`ScheduledNotification`]: 待触发的通知，投递成功后删除，
//!   删除即 at-most-once 投递保证；投递失败则保留待下个扫描周期重试

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use std::fmt;
use surrealdb::RecordId;

/// 通知事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitingEventType {
    /// 排队确认，登记后立即发送
    WaitingConfirmed,
    /// 轮到入场
    EnterNow,
    /// 前方剩 3 组
    Enter3TeamsBefore,
    /// 入场超时提醒
    EnterTimeOver,
    /// 离店后评价邀请
    ReviewRequest,
    /// 当日第一次爽约
    NoshowFirst,
    /// 当日第二次爽约 (触发场次封禁)
    NoshowSecond,
    /// 累计爽约触发平台封禁
    NoshowGlobalBan,
}

/// 已投递的通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub member_id: i64,
    pub event_type: WaitingEventType,
    pub content: String,
    /// 来源排队记录 ("waiting:xxx")，平台封禁通知无来源
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_id: Option<String>,
    pub created_at: i64,
}

impl Notification {
    pub fn new(
        member_id: i64,
        event_type: WaitingEventType,
        content: impl Into<String>,
        waiting_id: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            id: None,
            member_id,
            event_type,
            content: content.into(),
            waiting_id,
            created_at: now,
        }
    }
}

/// 触发条件类型
///
/// 每个扫描周期由求值器判断条件是否成立，成立则投递并删除。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationTrigger {
    /// 前方 WAITING 数为 0
    EnterNow,
    /// 入场通知发出 5 分钟后仍未入场
    EnterTimeOver,
    /// 前方 WAITING 数 ≤ 3
    ThreeTeamsBefore,
    /// 实际入场 2 小时后
    ReviewRequest,
}

impl fmt::Display for NotificationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationTrigger::EnterNow => write!(f, "ENTER_NOW"),
            NotificationTrigger::EnterTimeOver => write!(f, "ENTER_TIME_OVER"),
            NotificationTrigger::ThreeTeamsBefore => write!(f, "THREE_TEAMS_BEFORE"),
            NotificationTrigger::ReviewRequest => write!(f, "REVIEW_REQUEST"),
        }
    }
}

/// 待触发的通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledNotification {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub member_id: i64,
    /// 来源排队记录 ("waiting:xxx")
    pub waiting_id: String,
    pub venue_id: i64,
    pub trigger: NotificationTrigger,
    pub content: String,
    /// ENTER_NOW 投递时间，ENTER_TIME_OVER 的触发输入
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enter_notification_sent_at: Option<i64>,
    /// 实际入场时间，REVIEW_REQUEST 的触发输入
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_enter_time: Option<i64>,
    pub created_at: i64,
}

impl ScheduledNotification {
    pub fn new(
        member_id: i64,
        waiting_id: impl Into<String>,
        venue_id: i64,
        trigger: NotificationTrigger,
        content: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: None,
            member_id,
            waiting_id: waiting_id.into(),
            venue_id,
            trigger,
            content: content.into(),
            enter_notification_sent_at: None,
            actual_enter_time: None,
            created_at: now,
        }
    }

    /// 对应的投递事件类型
    pub fn event_type(&self) -> WaitingEventType {
        match self.trigger {
            NotificationTrigger::EnterNow => WaitingEventType::EnterNow,
            NotificationTrigger::EnterTimeOver => WaitingEventType::EnterTimeOver,
            NotificationTrigger::ThreeTeamsBefore => WaitingEventType::Enter3TeamsBefore,
            NotificationTrigger::ReviewRequest => WaitingEventType::ReviewRequest,
        }
    }
}
