//! 封禁升级策略
//!
//! 爽约记录的两级升级：
//!
//! 1. **场次级**: 同一会员当日在同一场次爽约满 2 次 → 1 天 STORE 封禁
//! 2. **平台级**: 自上次 GLOBAL 封禁以来 (从未被封则全量) 累计
//!    STORE 封禁满 10 次 → 3 天 GLOBAL 封禁
//!
//! 当日仅 1 次爽约的会员当天仍可重新排队；持有有效 STORE 或
//! GLOBAL 封禁的会员在登记入口被拒绝。

use crate::db::models::{Ban, WaitingStatus};
use crate::db::repository::{BanQuery, BanRepository, RepoResult, WaitingQuery, WaitingRepository};
use crate::utils::time;
use chrono_tz::Tz;

/// 当日爽约达到该次数触发场次级封禁
pub const STORE_BAN_THRESHOLD: i64 = 2;
/// 场次级封禁时长 (天)
pub const STORE_BAN_DURATION_DAYS: u32 = 1;
/// 累计场次级封禁达到该次数触发平台级封禁
pub const GLOBAL_BAN_THRESHOLD: usize = 10;
/// 平台级封禁时长 (天)
pub const GLOBAL_BAN_DURATION_DAYS: u32 = 3;

/// 一次升级评估的结果
#[derive(Debug, Default)]
pub struct EscalationOutcome {
    pub store_ban: Option<Ban>,
    pub global_ban: Option<Ban>,
}

/// 封禁升级服务
#[derive(Clone)]
pub struct BanEscalationService {
    bans: BanRepository,
    waiting: WaitingRepository,
    tz: Tz,
}

impl BanEscalationService {
    pub fn new(bans: BanRepository, waiting: WaitingRepository, tz: Tz) -> Self {
        Self { bans, waiting, tz }
    }

    /// 会员当前是否被禁止登记 (STORE 针对该场次，GLOBAL 全平台)
    pub async fn is_banned(&self, member_id: i64, venue_id: i64, now: i64) -> RepoResult<bool> {
        let store_bans = self
            .bans
            .find_by_query(BanQuery::StoreBansFor {
                member_id,
                venue_id,
            })
            .await?;
        if store_bans.iter().any(|b| b.is_active_at(now)) {
            return Ok(true);
        }

        Ok(self
            .bans
            .find_active_global_ban(member_id, now)
            .await?
            .is_some())
    }

    /// 当日该会员在该场次的爽约次数 (按登记时间的业务时区日期)
    pub async fn no_show_count_today(
        &self,
        member_id: i64,
        venue_id: i64,
        now: i64,
    ) -> RepoResult<i64> {
        let (day_start, day_end) = time::day_bounds(now, self.tz);
        let records = self
            .waiting
            .find_by_query(WaitingQuery::ForMemberVenueOnDate {
                member_id,
                venue_id,
                day_start,
                day_end,
            })
            .await?;
        Ok(records
            .iter()
            .filter(|w| w.status == WaitingStatus::NoShow)
            .count() as i64)
    }

    /// 爽约后的升级评估：先场次级，后平台级
    ///
    /// `no_show_count_today` 为含本次爽约的当日计数。
    pub async fn escalate_after_no_show(
        &self,
        member_id: i64,
        venue_id: i64,
        no_show_count_today: i64,
        now: i64,
    ) -> RepoResult<EscalationOutcome> {
        let mut outcome = EscalationOutcome::default();

        // 场次级：当日第二次爽约
        if no_show_count_today >= STORE_BAN_THRESHOLD {
            let ban = self
                .bans
                .save(&Ban::store(
                    member_id,
                    venue_id,
                    STORE_BAN_DURATION_DAYS,
                    now,
                ))
                .await?;
            tracing::info!(
                member_id,
                venue_id,
                no_show_count = no_show_count_today,
                "Store ban applied"
            );
            outcome.store_ban = Some(ban);
        }

        // 平台级：上次全局封禁以来的场次级封禁计数 (含刚保存的一条)
        let since = self.last_global_banned_at(member_id).await?;
        let store_ban_count = self
            .bans
            .find_by_query(BanQuery::StoreBansSince { member_id, since })
            .await?
            .len();

        if store_ban_count >= GLOBAL_BAN_THRESHOLD {
            let ban = self
                .bans
                .save(&Ban::global(member_id, GLOBAL_BAN_DURATION_DAYS, now))
                .await?;
            tracing::info!(
                member_id,
                store_ban_count,
                duration_days = GLOBAL_BAN_DURATION_DAYS,
                "Global ban applied"
            );
            outcome.global_ban = Some(ban);
        }

        Ok(outcome)
    }

    /// 会员最近一次平台级封禁的开始时间
    async fn last_global_banned_at(&self, member_id: i64) -> RepoResult<Option<i64>> {
        let bans = self
            .bans
            .find_by_query(BanQuery::GlobalBansFor { member_id })
            .await?;
        Ok(bans.iter().map(|b| b.banned_at).max())
    }
}
