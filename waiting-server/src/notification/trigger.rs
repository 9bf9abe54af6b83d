//! 通知触发条件求值器
//!
//! 无状态决策层：给定一条待触发通知和当前队列/到访状态快照，
//! 判断其条件此刻是否成立。每个扫描周期重新求值，条件不成立
//! 就留到下个周期；求值本身不产生副作用。

use crate::db::models::{NotificationTrigger, ScheduledNotification, Waiting, WaitingStatus};

/// 入场通知发出后允许的入场窗口 (分钟)
pub const ENTER_GRACE_MINUTES: i64 = 5;

/// 入场后到评价邀请的间隔 (分钟)
pub const REVIEW_DELAY_MINUTES: i64 = 2 * 60;

/// 触发 3 组前提醒的前方队伍数上限
pub const THREE_TEAMS_THRESHOLD: i64 = 3;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// 求值所需的当前状态快照，由扫描器逐条组装
#[derive(Debug)]
pub struct TriggerContext<'a> {
    /// 来源排队记录；查不到时为 None (条件视为不成立)
    pub waiting: Option<&'a Waiting>,
    /// 同场次排在该记录之前的 WAITING 数量
    pub ahead_count: i64,
    /// 当前时间 (Unix millis)
    pub now: i64,
}

/// 判断触发条件是否成立
pub fn should_fire(scheduled: &ScheduledNotification, ctx: &TriggerContext<'_>) -> bool {
    match scheduled.trigger {
        NotificationTrigger::EnterNow => check_enter_now(scheduled, ctx),
        NotificationTrigger::ThreeTeamsBefore => check_three_teams_before(scheduled, ctx),
        NotificationTrigger::EnterTimeOver => check_enter_time_over(scheduled, ctx),
        NotificationTrigger::ReviewRequest => check_review_request(scheduled, ctx),
    }
}

/// 入场触发：自己之前不再有 WAITING 记录
fn check_enter_now(scheduled: &ScheduledNotification, ctx: &TriggerContext<'_>) -> bool {
    if ctx.waiting.is_none() {
        return false;
    }
    let triggered = ctx.ahead_count == 0;
    if triggered {
        tracing::debug!(
            waiting_id = %scheduled.waiting_id,
            "ENTER_NOW trigger satisfied"
        );
    }
    triggered
}

/// 3 组前触发：前方 WAITING 数 ≤ 3
fn check_three_teams_before(scheduled: &ScheduledNotification, ctx: &TriggerContext<'_>) -> bool {
    if ctx.waiting.is_none() {
        return false;
    }
    let triggered = ctx.ahead_count <= THREE_TEAMS_THRESHOLD;
    if triggered {
        tracing::debug!(
            waiting_id = %scheduled.waiting_id,
            ahead = ctx.ahead_count,
            "THREE_TEAMS_BEFORE trigger satisfied"
        );
    }
    triggered
}

/// 入场超时触发：入场通知已发出 5 分钟、且仍未入场
fn check_enter_time_over(scheduled: &ScheduledNotification, ctx: &TriggerContext<'_>) -> bool {
    let Some(sent_at) = scheduled.enter_notification_sent_at else {
        return false; // 入场通知尚未发出
    };
    let Some(waiting) = ctx.waiting else {
        return false;
    };
    if waiting.status == WaitingStatus::Visited {
        return false; // 已入场
    }

    let threshold = sent_at + ENTER_GRACE_MINUTES * MILLIS_PER_MINUTE;
    let triggered = ctx.now > threshold;
    if triggered {
        tracing::debug!(
            waiting_id = %scheduled.waiting_id,
            "ENTER_TIME_OVER trigger satisfied"
        );
    }
    triggered
}

/// 评价邀请触发：实际入场 2 小时后
fn check_review_request(scheduled: &ScheduledNotification, ctx: &TriggerContext<'_>) -> bool {
    let Some(entered_at) = scheduled.actual_enter_time else {
        return false; // 尚未入场
    };
    let threshold = entered_at + REVIEW_DELAY_MINUTES * MILLIS_PER_MINUTE;
    let triggered = ctx.now > threshold;
    if triggered {
        tracing::debug!(
            waiting_id = %scheduled.waiting_id,
            "REVIEW_REQUEST trigger satisfied"
        );
    }
    triggered
}
