//! Visit Statistic Model
//!
//! 每条排队记录对应一行统计：登记时的初始排号与登记/入场时间。
//! 行在登记时创建，入场时补全 `entered_at`；只有补全的行
//! ("completed") 参与平均耗时计算，此后不再变更。

use super::serde_helpers;
use crate::utils::time;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Visit statistic entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitStatistic {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub venue_id: i64,
    /// 来源排队记录 ID ("waiting:xxx")
    pub waiting_id: String,
    /// 登记时分配的排号
    pub initial_waiting_number: u32,
    /// 登记时间 (Unix millis)
    pub reserved_at: i64,
    /// 入场时间，入场前为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_at: Option<i64>,
}

impl VisitStatistic {
    /// 登记时创建 (尚未入场)
    pub fn reserved(
        venue_id: i64,
        waiting_id: impl Into<String>,
        initial_waiting_number: u32,
        reserved_at: i64,
    ) -> Self {
        Self {
            id: None,
            venue_id,
            waiting_id: waiting_id.into(),
            initial_waiting_number,
            reserved_at,
            entered_at: None,
        }
    }

    /// 每人平均等待分钟数
    ///
    /// 未入场或初始排号为 0 (无人等待) 时无定义。
    pub fn time_per_person(&self) -> Option<f64> {
        let entered_at = self.entered_at?;
        if self.initial_waiting_number == 0 {
            return None;
        }
        let minutes = time::minutes_between(self.reserved_at, entered_at);
        Some(minutes as f64 / self.initial_waiting_number as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_per_person_undefined_without_entry() {
        let stat = VisitStatistic::reserved(1, "waiting:a", 4, 0);
        assert_eq!(stat.time_per_person(), None);
    }

    #[test]
    fn time_per_person_undefined_for_zero_initial() {
        let mut stat = VisitStatistic::reserved(1, "waiting:a", 0, 0);
        stat.entered_at = Some(600_000);
        assert_eq!(stat.time_per_person(), None);
    }

    #[test]
    fn time_per_person_divides_by_initial_number() {
        let mut stat = VisitStatistic::reserved(1, "waiting:a", 4, 0);
        stat.entered_at = Some(40 * 60_000);
        assert_eq!(stat.time_per_person(), Some(10.0));
    }
}
