//! Waiting Model
//!
//! 一条排队记录：某会员在某场次队列中的位置与状态。
//!
//! 不可变值 + 显式状态迁移方法，迁移返回新值而非原地修改，
//! 重排算法因此是纯数据变换 + 一次批量写入。
//!
//! ```text
//! WAITING ──enter()──────▶ VISITED   (终态, 成功)
//!    │
//!    └────mark_no_show()─▶ NO_SHOW   (终态, 爽约)
//! ```

use super::serde_helpers;
use crate::utils::validation;
use crate::waiting::{VenueWaitingStatistics, WaitingError};
use serde::{Deserialize, Serialize};
use std::fmt;
use surrealdb::RecordId;

/// Waiting status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitingStatus {
    Waiting,
    Visited,
    NoShow,
}

impl fmt::Display for WaitingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitingStatus::Waiting => write!(f, "WAITING"),
            WaitingStatus::Visited => write!(f, "VISITED"),
            WaitingStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

/// Waiting record entity
///
/// `waiting_number` 为场次内排名，0 表示可入场。
/// `initial_waiting_number` 在创建时固定，供统计引擎推算每人平均耗时。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waiting {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub venue_id: i64,
    pub member_id: i64,
    pub contact_name: String,
    pub contact_email: String,
    pub party_size: u32,
    pub waiting_number: u32,
    pub initial_waiting_number: u32,
    pub status: WaitingStatus,
    /// 排队登记时间 (Unix millis)
    pub registered_at: i64,
    /// 入场时间，仅 VISITED 时有值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_at: Option<i64>,
    /// 成为 0 号 (可入场) 的时间，用于爽约超时判定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_enter_at: Option<i64>,
    /// 预计等待分钟数，无历史统计时为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_wait_minutes: Option<u32>,
}

impl Waiting {
    /// 创建新的排队记录 (状态 WAITING)
    ///
    /// 人数、姓名、邮箱立即校验，非法输入直接拒绝，不会入库。
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        venue_id: i64,
        member_id: i64,
        contact_name: impl Into<String>,
        contact_email: impl Into<String>,
        party_size: u32,
        waiting_number: u32,
        expected_wait_minutes: Option<u32>,
        now: i64,
    ) -> Result<Self, WaitingError> {
        let contact_name = contact_name.into();
        let contact_email = contact_email.into();
        validation::validate_party_size(party_size)?;
        validation::validate_contact_name(&contact_name)?;
        validation::validate_contact_email(&contact_email)?;

        Ok(Self {
            id: None,
            venue_id,
            member_id,
            contact_name,
            contact_email,
            party_size,
            waiting_number,
            initial_waiting_number: waiting_number,
            status: WaitingStatus::Waiting,
            registered_at: now,
            entered_at: None,
            can_enter_at: None,
            expected_wait_minutes,
        })
    }

    /// 记录 ID 的字符串形式 (未持久化时为 "unsaved")
    pub fn id_str(&self) -> String {
        self.id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unsaved".to_string())
    }

    /// 入场处理
    ///
    /// 仅当状态为 WAITING 且排号为 0 时合法。
    /// `can_enter_at` 若从未设置则取入场时间。
    pub fn enter(self, now: i64) -> Result<Self, WaitingError> {
        if self.status != WaitingStatus::Waiting {
            return Err(WaitingError::InvalidStatus {
                id: self.id_str(),
                status: self.status,
            });
        }
        if self.waiting_number != 0 {
            return Err(WaitingError::NotReady {
                id: self.id_str(),
                number: self.waiting_number,
            });
        }

        Ok(Self {
            status: WaitingStatus::Visited,
            entered_at: Some(now),
            can_enter_at: self.can_enter_at.or(Some(now)),
            ..self
        })
    }

    /// 标记爽约
    ///
    /// 排号保留原值作审计历史，后续重排不再包含该记录。
    pub fn mark_no_show(self) -> Result<Self, WaitingError> {
        if self.status != WaitingStatus::Waiting {
            return Err(WaitingError::InvalidStatus {
                id: self.id_str(),
                status: self.status,
            });
        }

        Ok(Self {
            status: WaitingStatus::NoShow,
            ..self
        })
    }

    /// 排号前移一位
    ///
    /// 重排算法的唯一变更入口：排号减一，按新排号重新计算预计等待，
    /// 到达 0 号时记录可入场时间。
    pub fn decrement_position(
        self,
        statistics: &VenueWaitingStatistics,
        now: i64,
    ) -> Result<Self, WaitingError> {
        if self.status != WaitingStatus::Waiting {
            return Err(WaitingError::InvalidStatus {
                id: self.id_str(),
                status: self.status,
            });
        }
        if self.waiting_number == 0 {
            return Err(WaitingError::NotReady {
                id: self.id_str(),
                number: self.waiting_number,
            });
        }

        let new_number = self.waiting_number - 1;
        let can_enter_at = if new_number == 0 {
            Some(now)
        } else {
            self.can_enter_at
        };

        Ok(Self {
            waiting_number: new_number,
            expected_wait_minutes: statistics.expected_wait_minutes(new_number),
            can_enter_at,
            ..self
        })
    }

    /// 标记可入场 (直接以 0 号入队、未经历重排的记录)
    pub fn mark_can_enter(self, now: i64) -> Result<Self, WaitingError> {
        if self.status != WaitingStatus::Waiting {
            return Err(WaitingError::InvalidStatus {
                id: self.id_str(),
                status: self.status,
            });
        }

        Ok(Self {
            can_enter_at: Some(now),
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(number: u32) -> Waiting {
        Waiting::create(1, 10, "김민준", "minjun@example.com", 2, number, None, 1_000).unwrap()
    }

    #[test]
    fn create_validates_eagerly() {
        assert!(Waiting::create(1, 10, "김민준", "a@b.com", 0, 0, None, 0).is_err());
        assert!(Waiting::create(1, 10, "x", "a@b.com", 2, 0, None, 0).is_err());
        assert!(Waiting::create(1, 10, "김민준", "not-an-email", 2, 0, None, 0).is_err());
    }

    #[test]
    fn enter_only_at_position_zero() {
        let w = sample(3);
        let err = w.enter(2_000).unwrap_err();
        assert!(matches!(err, WaitingError::NotReady { number: 3, .. }));

        let w = sample(0);
        let entered = w.enter(2_000).unwrap();
        assert_eq!(entered.status, WaitingStatus::Visited);
        assert_eq!(entered.entered_at, Some(2_000));
        // can_enter_at 未设置时取入场时间
        assert_eq!(entered.can_enter_at, Some(2_000));
    }

    #[test]
    fn enter_keeps_existing_can_enter_at() {
        let w = sample(0).mark_can_enter(1_500).unwrap();
        let entered = w.enter(2_000).unwrap();
        assert_eq!(entered.can_enter_at, Some(1_500));
    }

    #[test]
    fn enter_rejects_terminal_states() {
        let visited = sample(0).enter(2_000).unwrap();
        assert!(matches!(
            visited.enter(3_000),
            Err(WaitingError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn no_show_preserves_number() {
        let w = sample(4);
        let no_show = w.mark_no_show().unwrap();
        assert_eq!(no_show.status, WaitingStatus::NoShow);
        assert_eq!(no_show.waiting_number, 4);
        assert!(no_show.mark_no_show().is_err());
    }

    #[test]
    fn expected_wait_never_grows_while_advancing() {
        // 平均 10 分/人：排号前移时预计等待单调不增
        let mut stat = crate::db::models::VisitStatistic::reserved(1, "waiting:h", 2, 0);
        stat.entered_at = Some(20 * 60_000);
        let stats = VenueWaitingStatistics::new(1, vec![stat]);

        let mut w = sample(3);
        w.expected_wait_minutes = stats.expected_wait_minutes(3);
        let mut last = w.expected_wait_minutes.unwrap();
        assert_eq!(last, 30);

        while w.waiting_number > 1 {
            w = w.decrement_position(&stats, 1_000).unwrap();
            let current = w.expected_wait_minutes.unwrap();
            assert!(current <= last);
            last = current;
        }
        // 0 号即刻入场，无预计等待
        let w = w.decrement_position(&stats, 1_000).unwrap();
        assert_eq!(w.expected_wait_minutes, None);
    }

    #[test]
    fn decrement_sets_can_enter_at_on_zero() {
        let stats = VenueWaitingStatistics::empty(1);
        let w = sample(2).decrement_position(&stats, 5_000).unwrap();
        assert_eq!(w.waiting_number, 1);
        assert_eq!(w.can_enter_at, None);

        let w = w.decrement_position(&stats, 6_000).unwrap();
        assert_eq!(w.waiting_number, 0);
        assert_eq!(w.can_enter_at, Some(6_000));

        assert!(matches!(
            w.decrement_position(&stats, 7_000),
            Err(WaitingError::NotReady { .. })
        ));
    }
}
