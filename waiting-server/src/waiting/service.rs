//! 排队服务
//!
//! 对外生命周期入口：登记 (join)、入场 (enter)、爽约 (no-show)、
//! 重排修复。每个场次的"取号 + 重排 + 批量落库"在场次级互斥锁
//! 内执行，并发入场观察不到非连续排号。
//!
//! 生命周期操作返回类型化错误；通知投递失败只记日志，
//! 不影响排队状态变更。

use std::sync::Arc;

use chrono_tz::Tz;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::ban::BanEscalationService;
use crate::db::models::{VisitStatistic, Waiting, WaitingStatus};
use crate::db::repository::{
    MemberRepository, ScheduledNotificationRepository, VenueRepository, VisitStatisticRepository,
    WaitingQuery, WaitingRepository,
};
use crate::notification::NotificationService;
use crate::utils::{time, AppError, AppResult};
use crate::waiting::reorder;

/// 场次级互斥锁表
///
/// 同一场次的重排串行执行，场次内最后提交生效；跨场次可并行。
#[derive(Default)]
pub struct VenueLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl VenueLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, venue_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(venue_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// 现场排队登记请求
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub venue_id: i64,
    pub member_id: i64,
    pub contact_name: String,
    pub contact_email: String,
    pub party_size: u32,
}

/// 排队服务
#[derive(Clone)]
pub struct WaitingService {
    waiting: WaitingRepository,
    statistics: VisitStatisticRepository,
    venues: VenueRepository,
    members: MemberRepository,
    scheduled: ScheduledNotificationRepository,
    notifications: NotificationService,
    bans: BanEscalationService,
    locks: Arc<VenueLocks>,
    tz: Tz,
}

impl WaitingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        waiting: WaitingRepository,
        statistics: VisitStatisticRepository,
        venues: VenueRepository,
        members: MemberRepository,
        scheduled: ScheduledNotificationRepository,
        notifications: NotificationService,
        bans: BanEscalationService,
        locks: Arc<VenueLocks>,
        tz: Tz,
    ) -> Self {
        Self {
            waiting,
            statistics,
            venues,
            members,
            scheduled,
            notifications,
            bans,
            locks,
            tz,
        }
    }

    // ========================================================================
    // Join
    // ========================================================================

    /// 现场排队登记
    ///
    /// 校验顺序：场次营业 → 封禁 → 当日重复 → 会员存在，
    /// 全部通过后在场次锁内取号、落库并创建通知。
    pub async fn join_queue(&self, request: JoinRequest) -> AppResult<Waiting> {
        let now = time::now_millis();

        // 1. 场次存在且营业中
        let venue = self
            .venues
            .find_by_id(request.venue_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Venue {} not found", request.venue_id)))?;
        if !venue.is_open_at(now, self.tz) {
            return Err(AppError::VenueClosed(format!(
                "venue {} is not operating now",
                request.venue_id
            )));
        }

        // 2. 封禁检查 (场次级 + 平台级)
        if self
            .bans
            .is_banned(request.member_id, request.venue_id, now)
            .await?
        {
            return Err(AppError::BannedMember(format!(
                "member {}",
                request.member_id
            )));
        }

        // 3. 当日重复检查：有效排队或爽约满 2 次都不可再排；
        //    当日仅 1 次爽约允许重新排队
        let (day_start, day_end) = time::day_bounds(now, self.tz);
        let today = self
            .waiting
            .find_by_query(WaitingQuery::ForMemberVenueOnDate {
                member_id: request.member_id,
                venue_id: request.venue_id,
                day_start,
                day_end,
            })
            .await?;
        let has_active = today.iter().any(|w| w.status != WaitingStatus::NoShow);
        let no_show_count = today
            .iter()
            .filter(|w| w.status == WaitingStatus::NoShow)
            .count();
        if has_active || no_show_count >= 2 {
            return Err(AppError::DuplicateJoin(format!(
                "member {} already waited for venue {} today",
                request.member_id, request.venue_id
            )));
        }

        // 4. 会员存在
        self.members
            .find_by_id(request.member_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Member {} not found", request.member_id))
            })?;

        // 5. 场次锁内取号 + 落库，防止并发登记拿到同一排号
        let lock = self.locks.lock_for(request.venue_id);
        let saved = {
            let _guard = lock.lock().await;

            let next_number = self.waiting.next_waiting_number(request.venue_id).await?;
            let statistics = self.statistics.completed_stats(request.venue_id).await?;
            let expected = statistics.expected_wait_minutes(next_number);

            let record = Waiting::create(
                request.venue_id,
                request.member_id,
                request.contact_name,
                request.contact_email,
                request.party_size,
                next_number,
                expected,
                now,
            )?;
            let saved = self.waiting.save(&record).await?;

            // 统计行与排队记录同生：登记时间 + 初始排号
            self.statistics
                .save(&VisitStatistic::reserved(
                    request.venue_id,
                    saved.id_str(),
                    next_number,
                    now,
                ))
                .await?;
            saved
        };

        // 6. 确认通知立即发送；四条待触发通知入队
        self.notifications.send_waiting_confirmed(&saved).await;
        if let Err(e) = self
            .notifications
            .schedule_waiting_notifications(&saved, &venue)
            .await
        {
            tracing::error!(
                waiting_id = %saved.id_str(),
                error = %e,
                "Failed to schedule lifecycle notifications"
            );
        }

        tracing::info!(
            waiting_id = %saved.id_str(),
            venue_id = request.venue_id,
            member_id = request.member_id,
            number = saved.waiting_number,
            "Waiting registered"
        );
        Ok(saved)
    }

    // ========================================================================
    // Enter
    // ========================================================================

    /// 入场处理
    ///
    /// 仅 0 号可入场；入场后同场次其余记录整体前移一位。
    pub async fn mark_entered(&self, waiting_id: &str) -> AppResult<Waiting> {
        let now = time::now_millis();
        let record = self.waiting.get(waiting_id).await?;

        let lock = self.locks.lock_for(record.venue_id);
        let _guard = lock.lock().await;

        // 锁内重取，避免基于过期排号做迁移
        let record = self.waiting.get(waiting_id).await?;
        let venue_id = record.venue_id;
        let entered = record.enter(now)?;
        let entered = self.waiting.save(&entered).await?;

        // 补全统计行；记录实际入场时间供评价邀请触发
        self.statistics.mark_entered(waiting_id, now).await?;
        self.scheduled
            .mark_actual_enter_time(waiting_id, now)
            .await?;

        // 队列前移：入场后统计已更新，重排用最新平均值
        let remaining = self
            .waiting
            .find_by_query(WaitingQuery::ForVenue {
                venue_id,
                status: WaitingStatus::Waiting,
            })
            .await?;
        let statistics = self.statistics.completed_stats(venue_id).await?;
        let outcome = reorder::advance_after_entry(remaining, &statistics, now)?;
        self.waiting.save_all(&outcome.reordered).await?;

        if let Some(next) = &outcome.now_at_zero {
            tracing::info!(
                waiting_id = %next.id_str(),
                venue_id,
                "Next party is now eligible to enter"
            );
        }

        tracing::info!(waiting_id = %entered.id_str(), venue_id, "Waiting entered");
        Ok(entered)
    }

    // ========================================================================
    // No-show
    // ========================================================================

    /// 爽约处理：状态迁移 → 密集重排 → 爽约通知 → 封禁升级
    pub async fn mark_no_show(&self, waiting_id: &str) -> AppResult<Waiting> {
        let now = time::now_millis();
        let record = self.waiting.get(waiting_id).await?;
        let venue_id = record.venue_id;
        let member_id = record.member_id;

        let no_show = {
            let lock = self.locks.lock_for(venue_id);
            let _guard = lock.lock().await;

            let record = self.waiting.get(waiting_id).await?;
            let no_show = record.mark_no_show()?;
            let no_show = self.waiting.save(&no_show).await?;

            // 剩余 WAITING 记录从 0 起密集重排
            let remaining = self
                .waiting
                .find_by_query(WaitingQuery::ForVenue {
                    venue_id,
                    status: WaitingStatus::Waiting,
                })
                .await?;
            let statistics = self.statistics.completed_stats(venue_id).await?;
            let outcome = reorder::renumber_after_no_show(remaining, &statistics, now)?;
            self.waiting.save_all(&outcome.reordered).await?;

            if let Some(next) = &outcome.now_at_zero {
                tracing::info!(
                    waiting_id = %next.id_str(),
                    venue_id,
                    "Next party is now eligible to enter"
                );
            }
            no_show
        };

        // 含本次的当日爽约计数驱动通知文案与封禁升级
        let no_show_count = self
            .bans
            .no_show_count_today(member_id, venue_id, now)
            .await?;
        self.notifications
            .process_no_show_notifications(&no_show, no_show_count)
            .await;

        let escalation = self
            .bans
            .escalate_after_no_show(member_id, venue_id, no_show_count, now)
            .await?;
        if escalation.global_ban.is_some() {
            self.notifications
                .send_global_ban_notification(member_id)
                .await;
        }

        tracing::info!(
            waiting_id = %no_show.id_str(),
            venue_id,
            member_id,
            no_show_count,
            "Waiting marked as no-show"
        );
        Ok(no_show)
    }

    // ========================================================================
    // Maintenance & read side
    // ========================================================================

    /// 手动重排修复：按密集重排规则重建场次排号
    pub async fn run_reordering_pass(&self, venue_id: i64) -> AppResult<usize> {
        let now = time::now_millis();
        let lock = self.locks.lock_for(venue_id);
        let _guard = lock.lock().await;

        let remaining = self
            .waiting
            .find_by_query(WaitingQuery::ForVenue {
                venue_id,
                status: WaitingStatus::Waiting,
            })
            .await?;
        let statistics = self.statistics.completed_stats(venue_id).await?;
        let outcome = reorder::renumber_after_no_show(remaining, &statistics, now)?;
        let changed = outcome.reordered.len();
        self.waiting.save_all(&outcome.reordered).await?;

        tracing::info!(venue_id, changed, "Reordering pass completed");
        Ok(changed)
    }

    /// 场次当前队列 (WAITING, 排号升序)
    pub async fn queue_snapshot(&self, venue_id: i64) -> AppResult<Vec<Waiting>> {
        Ok(self
            .waiting
            .find_by_query(WaitingQuery::ForVenue {
                venue_id,
                status: WaitingStatus::Waiting,
            })
            .await?)
    }

    /// 会员到访/排队历史 (游标分页, 登记时间倒序)
    pub async fn visit_history(
        &self,
        member_id: i64,
        size: u32,
        before_registered_at: Option<i64>,
        status: Option<WaitingStatus>,
    ) -> AppResult<Vec<Waiting>> {
        Ok(self
            .waiting
            .find_by_query(WaitingQuery::VisitHistory {
                member_id,
                size,
                before_registered_at,
                status,
            })
            .await?)
    }
}
