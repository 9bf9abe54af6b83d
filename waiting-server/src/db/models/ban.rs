//! Ban Model
//!
//! 爽约累计产生的临时封禁。
//!
//! - STORE: 绑定单个场次，当日第二次爽约触发，1 天
//! - GLOBAL: 平台级，自上次全局封禁以来累计 10 次触发，3 天
//!
//! 没有"解封"操作：封禁释放 = 删除记录 (每日扫描)，
//! 未删除但已过期的记录在 `is_active_at` 判定中视为无效。

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Ban scope enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BanScope {
    /// 场次级封禁
    Store,
    /// 平台级封禁
    Global,
}

/// Ban entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub scope: BanScope,
    pub member_id: i64,
    /// GLOBAL 封禁时为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<i64>,
    /// 封禁开始时间 (Unix millis)
    pub banned_at: i64,
    pub duration_days: u32,
}

impl Ban {
    /// 场次级封禁
    pub fn store(member_id: i64, venue_id: i64, duration_days: u32, now: i64) -> Self {
        Self {
            id: None,
            scope: BanScope::Store,
            member_id,
            venue_id: Some(venue_id),
            banned_at: now,
            duration_days,
        }
    }

    /// 平台级封禁
    pub fn global(member_id: i64, duration_days: u32, now: i64) -> Self {
        Self {
            id: None,
            scope: BanScope::Global,
            member_id,
            venue_id: None,
            banned_at: now,
            duration_days,
        }
    }

    /// 过期时间 = 开始时间 + 天数
    pub fn expires_at(&self) -> i64 {
        self.banned_at + self.duration_days as i64 * MILLIS_PER_DAY
    }

    /// 某时刻是否仍在封禁期内
    pub fn is_active_at(&self, now: i64) -> bool {
        now < self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_arithmetic() {
        let ban = Ban::store(10, 1, 1, 0);
        assert_eq!(ban.expires_at(), MILLIS_PER_DAY);
        assert!(ban.is_active_at(MILLIS_PER_DAY - 1));
        assert!(!ban.is_active_at(MILLIS_PER_DAY));
    }

    #[test]
    fn global_ban_has_no_venue() {
        let ban = Ban::global(10, 3, 0);
        assert_eq!(ban.scope, BanScope::Global);
        assert_eq!(ban.venue_id, None);
        assert_eq!(ban.expires_at(), 3 * MILLIS_PER_DAY);
    }
}
