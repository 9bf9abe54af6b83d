//! 通知服务
//!
//! 通知内容的生成策略与投递公共路径：
//! 持久化 → 实时推送 (在线时) → 邮件 (仅入场通知)。
//!
//! 生命周期路径上的投递失败只记日志，绝不让排队事务回滚；
//! 扫描器路径上的失败向上返回，由扫描器保留待触发记录重试。

use crate::db::models::{
    Notification, NotificationTrigger, ScheduledNotification, Venue, Waiting, WaitingEventType,
};
use crate::db::repository::{
    NotificationRepository, RepoResult, ScheduledNotificationRepository, VenueRepository,
};
use crate::notification::{EmailPayload, EmailService, RealtimeChannels};
use crate::utils::time;
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::Arc;

/// 通知服务
#[derive(Clone)]
pub struct NotificationService {
    notifications: NotificationRepository,
    scheduled: ScheduledNotificationRepository,
    venues: VenueRepository,
    channels: Arc<RealtimeChannels>,
    email: EmailService,
    tz: Tz,
}

impl NotificationService {
    pub fn new(
        notifications: NotificationRepository,
        scheduled: ScheduledNotificationRepository,
        venues: VenueRepository,
        channels: Arc<RealtimeChannels>,
        email: EmailService,
        tz: Tz,
    ) -> Self {
        Self {
            notifications,
            scheduled,
            venues,
            channels,
            email,
            tz,
        }
    }

    /// 实时通道注册表 (连接管理与 TTL 驱逐入口)
    pub fn channels(&self) -> &Arc<RealtimeChannels> {
        &self.channels
    }

    // ========================================================================
    // Lifecycle notifications (immediate)
    // ========================================================================

    /// 排队确认通知，登记成功后立即发送
    pub async fn send_waiting_confirmed(&self, waiting: &Waiting) {
        let content = self.waiting_confirmed_content(waiting);
        let notification = Notification::new(
            waiting.member_id,
            WaitingEventType::WaitingConfirmed,
            content,
            Some(waiting.id_str()),
            time::now_millis(),
        );
        self.dispatch_logged(notification).await;
    }

    /// 爽约通知：当日第 1 次和第 2 次文案不同
    pub async fn process_no_show_notifications(&self, waiting: &Waiting, no_show_count: i64) {
        let (event_type, content) = match no_show_count {
            1 => (
                WaitingEventType::NoshowFirst,
                "You were marked as a no-show after the 10-minute entry window. \
                 You have one waiting chance left for this popup today.",
            ),
            2 => (
                WaitingEventType::NoshowSecond,
                "You have used all waiting chances for this popup today. \
                 Please come back tomorrow!",
            ),
            _ => return,
        };

        let notification = Notification::new(
            waiting.member_id,
            event_type,
            content,
            Some(waiting.id_str()),
            time::now_millis(),
        );
        self.dispatch_logged(notification).await;
    }

    /// 平台封禁通知：立即投递，不走待触发队列
    pub async fn send_global_ban_notification(&self, member_id: i64) {
        tracing::info!(member_id, "Sending platform ban notification");
        let notification = Notification::new(
            member_id,
            WaitingEventType::NoshowGlobalBan,
            "Due to repeated no-shows, reservations across all popups are suspended for 3 days.",
            None,
            time::now_millis(),
        );
        self.dispatch_logged(notification).await;
    }

    // ========================================================================
    // Scheduled notifications
    // ========================================================================

    /// 登记时创建全部四条待触发通知
    ///
    /// 条件由扫描器逐周期求值；这里只负责内容与归属。
    pub async fn schedule_waiting_notifications(
        &self,
        waiting: &Waiting,
        venue: &Venue,
    ) -> RepoResult<()> {
        let now = time::now_millis();
        let waiting_id = waiting.id_str();

        let entries = [
            (
                NotificationTrigger::EnterNow,
                "It's your turn! Please enter the store now. Enjoy your visit!".to_string(),
            ),
            (
                NotificationTrigger::ThreeTeamsBefore,
                "Only 3 teams ahead of you! Your turn is coming up, please wait near the store."
                    .to_string(),
            ),
            (
                NotificationTrigger::EnterTimeOver,
                "Your entry time has passed. Please enter as soon as possible; \
                 your waiting may be cancelled if entry is delayed."
                    .to_string(),
            ),
            (
                NotificationTrigger::ReviewRequest,
                format!("How was {}? Share a review of your visit!", venue.name),
            ),
        ];

        for (trigger, content) in entries {
            let scheduled = ScheduledNotification::new(
                waiting.member_id,
                waiting_id.clone(),
                waiting.venue_id,
                trigger,
                content,
                now,
            );
            self.scheduled.save(&scheduled).await?;
        }

        tracing::debug!(waiting_id = %waiting_id, "Scheduled lifecycle notifications created");
        Ok(())
    }

    /// 投递一条触发条件已成立的待触发通知
    ///
    /// 返回 Err 时记录保持待触发状态，由下个扫描周期重试。
    pub async fn dispatch_scheduled(
        &self,
        scheduled: &ScheduledNotification,
        waiting: Option<&Waiting>,
    ) -> RepoResult<Notification> {
        let now = time::now_millis();
        let notification = Notification::new(
            scheduled.member_id,
            scheduled.event_type(),
            scheduled.content.clone(),
            Some(scheduled.waiting_id.clone()),
            now,
        );

        // 1. 持久化投递结果
        let saved = self.notifications.save(&notification).await?;

        // 2. 入场通知：记录发送时间，超时触发器以此为基准
        if scheduled.trigger == NotificationTrigger::EnterNow {
            if let Some(id) = &scheduled.id
                && let Err(e) = self.scheduled.mark_enter_notification_sent(id, now).await
            {
                tracing::warn!(
                    scheduled_id = %id,
                    error = %e,
                    "Failed to record enter notification sent time"
                );
            }

            // 入场通知额外发邮件
            if let Some(waiting) = waiting {
                self.send_entry_email(waiting).await;
            }
        }

        // 3. 在线客户端实时推送
        self.push_if_connected(&saved);

        tracing::info!(
            member_id = scheduled.member_id,
            trigger = %scheduled.trigger,
            "Scheduled notification dispatched"
        );
        Ok(saved)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// 投递公共路径，失败只记日志 (生命周期路径用)
    async fn dispatch_logged(&self, notification: Notification) {
        let member_id = notification.member_id;
        match self.notifications.save(&notification).await {
            Ok(saved) => self.push_if_connected(&saved),
            Err(e) => {
                tracing::error!(member_id, error = %e, "Failed to persist notification");
            }
        }
    }

    fn push_if_connected(&self, notification: &Notification) {
        if self.channels.is_connected(notification.member_id) {
            if self.channels.push_realtime(notification.member_id, notification) {
                tracing::debug!(member_id = notification.member_id, "Realtime push delivered");
            }
        } else {
            tracing::debug!(
                member_id = notification.member_id,
                "No realtime connection, skipping push"
            );
        }
    }

    /// 入场邮件：场次名称 + 位置链接
    async fn send_entry_email(&self, waiting: &Waiting) {
        let venue = match self.venues.find_by_id(waiting.venue_id).await {
            Ok(Some(venue)) => venue,
            Ok(None) => {
                tracing::warn!(venue_id = waiting.venue_id, "Venue missing, skipping entry email");
                return;
            }
            Err(e) => {
                tracing::warn!(venue_id = waiting.venue_id, error = %e, "Venue lookup failed, skipping entry email");
                return;
            }
        };

        let location = venue
            .location_url
            .as_deref()
            .unwrap_or("(location unavailable)");
        self.email.send_async(EmailPayload {
            to: waiting.contact_email.clone(),
            subject: format!("[{}] It's your turn to enter", venue.name),
            body: format!(
                "{}, your party of {} can enter {} now.\nDirections: {}",
                waiting.contact_name, waiting.party_size, venue.name, location
            ),
        });
    }

    /// 确认文案: "MM.dd (Day) waiting for N confirmed..."
    fn waiting_confirmed_content(&self, waiting: &Waiting) -> String {
        let registered = DateTime::from_timestamp_millis(waiting.registered_at)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&self.tz);
        format!(
            "{} waiting for {} confirmed. Check your current queue number!",
            registered.format("%m.%d (%a)"),
            waiting.party_size
        )
    }
}
