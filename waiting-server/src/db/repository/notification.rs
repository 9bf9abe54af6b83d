//! Notification Repositories
//!
//! - [`NotificationRepository`]: 已投递通知，只增不删
//! - [`ScheduledNotificationRepository`]: 待触发通知，
//!   投递成功后删除，删除即 at-most-once 保证

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Notification, ScheduledNotification};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const NOTIFICATION_TABLE: &str = "notification";
const SCHEDULED_TABLE: &str = "scheduled_notification";

#[derive(Clone)]
pub struct NotificationRepository {
    base: BaseRepository,
}

impl NotificationRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 持久化一条已投递通知
    pub async fn save(&self, notification: &Notification) -> RepoResult<Notification> {
        let created: Option<Notification> = self
            .base
            .db()
            .create(NOTIFICATION_TABLE)
            .content(notification.clone())
            .await?;
        created.ok_or_else(|| RepoError::Database("Failed to create notification".to_string()))
    }

    /// 会员的通知列表 (最新在前)
    pub async fn find_by_member(&self, member_id: i64) -> RepoResult<Vec<Notification>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM notification WHERE member_id = $member_id \
                 ORDER BY created_at DESC",
            )
            .bind(("member_id", member_id))
            .await?;
        Ok(result.take(0)?)
    }
}

#[derive(Clone)]
pub struct ScheduledNotificationRepository {
    base: BaseRepository,
}

impl ScheduledNotificationRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 创建待触发通知
    pub async fn save(
        &self,
        scheduled: &ScheduledNotification,
    ) -> RepoResult<ScheduledNotification> {
        let created: Option<ScheduledNotification> = self
            .base
            .db()
            .create(SCHEDULED_TABLE)
            .content(scheduled.clone())
            .await?;
        created.ok_or_else(|| {
            RepoError::Database("Failed to create scheduled notification".to_string())
        })
    }

    /// 全部待触发通知 (扫描输入)
    pub async fn find_pending(&self) -> RepoResult<Vec<ScheduledNotification>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM scheduled_notification ORDER BY created_at")
            .await?;
        Ok(result.take(0)?)
    }

    /// 记录 ENTER_NOW 的投递时间 (ENTER_TIME_OVER 的触发输入)
    pub async fn mark_enter_notification_sent(
        &self,
        id: &RecordId,
        sent_at: i64,
    ) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $id SET enter_notification_sent_at = $sent_at")
            .bind(("id", id.clone()))
            .bind(("sent_at", sent_at))
            .await?;
        Ok(())
    }

    /// 记录实际入场时间；同一排队记录的所有待触发通知一起更新
    pub async fn mark_actual_enter_time(
        &self,
        waiting_id: &str,
        entered_at: i64,
    ) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE scheduled_notification SET actual_enter_time = $entered_at \
                 WHERE waiting_id = $waiting_id",
            )
            .bind(("entered_at", entered_at))
            .bind(("waiting_id", waiting_id.to_string()))
            .await?;
        Ok(())
    }

    /// 删除已投递的待触发通知
    pub async fn delete(&self, scheduled: &[ScheduledNotification]) -> RepoResult<usize> {
        let mut deleted = 0;
        for item in scheduled {
            let Some(id) = item.id.clone() else {
                continue;
            };
            let removed: Option<ScheduledNotification> = self.base.db().delete(id).await?;
            if removed.is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
