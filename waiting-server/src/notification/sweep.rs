//! 通知扫描调度器
//!
//! 每 30 秒对全部待触发通知求值一次，条件成立即投递、
//! 投递成功即删除。单条失败隔离处理，不中断整批；
//! 失败的记录保持待触发状态，下个周期从最新状态重新求值。

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::db::models::ScheduledNotification;
use crate::db::repository::{RepoError, ScheduledNotificationRepository, WaitingRepository};
use crate::notification::trigger::{self, TriggerContext};
use crate::notification::NotificationService;
use crate::utils::time;

/// 通知扫描调度器
///
/// 注册为 `TaskKind::Periodic`，在 `start_background_tasks()` 中启动。
pub struct NotificationSweepScheduler {
    scheduled: ScheduledNotificationRepository,
    waiting: WaitingRepository,
    service: NotificationService,
    interval: Duration,
    shutdown: CancellationToken,
}

impl NotificationSweepScheduler {
    pub fn new(
        scheduled: ScheduledNotificationRepository,
        waiting: WaitingRepository,
        service: NotificationService,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            scheduled,
            waiting,
            service,
            interval,
            shutdown,
        }
    }

    /// 主循环
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Notification sweep started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Notification sweep received shutdown signal");
                    return;
                }
            }
            self.tick().await;
        }
    }

    /// 单次扫描，返回投递条数
    pub async fn tick(&self) -> usize {
        let now = time::now_millis();

        // 顺带驱逐超时的实时连接
        self.service.channels().evict_stale(now);

        let pending = match self.scheduled.find_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch pending notifications");
                return 0;
            }
        };
        if pending.is_empty() {
            return 0;
        }
        tracing::debug!(pending = pending.len(), "Evaluating scheduled notifications");

        let mut dispatched: Vec<ScheduledNotification> = Vec::new();
        for item in pending {
            if let Some(sent) = self.evaluate_and_dispatch(&item, now).await {
                dispatched.push(sent);
            }
        }

        if dispatched.is_empty() {
            return 0;
        }

        let count = dispatched.len();
        // 删除即 at-most-once：删除失败的条目下个周期会重投，
        // 属 at-least-once 退化，记错误日志跟进
        if let Err(e) = self.scheduled.delete(&dispatched).await {
            tracing::error!(error = %e, "Failed to delete dispatched notifications");
        }
        tracing::info!(dispatched = count, "Notification sweep completed");
        count
    }

    /// 单条求值 + 投递，失败隔离
    async fn evaluate_and_dispatch(
        &self,
        item: &ScheduledNotification,
        now: i64,
    ) -> Option<ScheduledNotification> {
        let waiting = match self.waiting.get(&item.waiting_id).await {
            Ok(waiting) => Some(waiting),
            Err(RepoError::NotFound(_)) => {
                // 排队记录从不删除，查不到说明数据被外部破坏，
                // 必须暴露而不是静默吞掉；条目保留以便修复后恢复
                tracing::error!(
                    waiting_id = %item.waiting_id,
                    trigger = %item.trigger,
                    "Source waiting record is gone, unrecoverable configuration error"
                );
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    waiting_id = %item.waiting_id,
                    error = %e,
                    "Waiting lookup failed, retrying next sweep"
                );
                return None;
            }
        };

        let ahead_count = match &waiting {
            Some(w) => match self
                .waiting
                .count_waiting_before(w.venue_id, w.waiting_number)
                .await
            {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(
                        waiting_id = %item.waiting_id,
                        error = %e,
                        "Ahead-count query failed, retrying next sweep"
                    );
                    return None;
                }
            },
            None => 0,
        };

        let ctx = TriggerContext {
            waiting: waiting.as_ref(),
            ahead_count,
            now,
        };
        if !trigger::should_fire(item, &ctx) {
            return None;
        }

        match self.service.dispatch_scheduled(item, waiting.as_ref()).await {
            Ok(_) => Some(item.clone()),
            Err(e) => {
                tracing::error!(
                    waiting_id = %item.waiting_id,
                    trigger = %item.trigger,
                    error = %e,
                    "Dispatch failed, notification stays pending"
                );
                None
            }
        }
    }
}
