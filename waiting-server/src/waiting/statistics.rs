//! 统计引擎
//!
//! 把已完成的到访记录换算成"每人平均等待分钟数"，
//! 并据此推算某排号的预计等待时间。
//!
//! 纯函数：只依赖传入的统计快照，内部不做缓存，
//! 每次重排前必须重新拉取最新历史。

use crate::db::models::VisitStatistic;

/// 单个场次的到访统计集合
#[derive(Debug, Clone)]
pub struct VenueWaitingStatistics {
    venue_id: i64,
    statistics: Vec<VisitStatistic>,
}

impl VenueWaitingStatistics {
    /// 从统计行构建快照
    ///
    /// 防御性过滤：其他场次或未入场的行不参与计算。
    pub fn new(venue_id: i64, statistics: Vec<VisitStatistic>) -> Self {
        let (kept, dropped): (Vec<_>, Vec<_>) = statistics
            .into_iter()
            .partition(|s| s.venue_id == venue_id && s.entered_at.is_some());

        if !dropped.is_empty() {
            tracing::warn!(
                venue_id,
                dropped = dropped.len(),
                "Ignoring statistic rows that are incomplete or belong to another venue"
            );
        }

        Self {
            venue_id,
            statistics: kept,
        }
    }

    /// 无历史数据的空快照
    pub fn empty(venue_id: i64) -> Self {
        Self {
            venue_id,
            statistics: Vec::new(),
        }
    }

    pub fn venue_id(&self) -> i64 {
        self.venue_id
    }

    /// 每人平均等待分钟数
    ///
    /// 无任何有效样本 (无历史、或初始排号全为 0) 时为 None。
    pub fn average_time_per_person(&self) -> Option<f64> {
        let samples: Vec<f64> = self
            .statistics
            .iter()
            .filter_map(VisitStatistic::time_per_person)
            .collect();

        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// 某排号的预计等待分钟数 = ceil(排号 × 平均耗时)
    ///
    /// 排号为 0 (即刻入场) 或无平均值时为 None。
    pub fn expected_wait_minutes(&self, waiting_number: u32) -> Option<u32> {
        if waiting_number == 0 {
            return None;
        }
        let average = self.average_time_per_person()?;
        Some((waiting_number as f64 * average).ceil() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(venue_id: i64, initial: u32, minutes: i64) -> VisitStatistic {
        let mut stat = VisitStatistic::reserved(venue_id, "waiting:x", initial, 0);
        stat.entered_at = Some(minutes * 60_000);
        stat
    }

    #[test]
    fn no_history_means_no_average() {
        let stats = VenueWaitingStatistics::empty(1);
        assert_eq!(stats.average_time_per_person(), None);
        assert_eq!(stats.expected_wait_minutes(4), None);
    }

    #[test]
    fn average_over_completed_visits() {
        // 3 条完成记录，每人耗时均为 10 分钟
        let stats = VenueWaitingStatistics::new(
            1,
            vec![completed(1, 2, 20), completed(1, 3, 30), completed(1, 1, 10)],
        );
        assert_eq!(stats.average_time_per_person(), Some(10.0));
        // 排号 4 → 预计 40 分钟
        assert_eq!(stats.expected_wait_minutes(4), Some(40));
    }

    #[test]
    fn position_zero_has_no_estimate() {
        let stats = VenueWaitingStatistics::new(1, vec![completed(1, 2, 20)]);
        assert_eq!(stats.expected_wait_minutes(0), None);
    }

    #[test]
    fn zero_initial_number_samples_are_excluded() {
        let stats =
            VenueWaitingStatistics::new(1, vec![completed(1, 0, 20), completed(1, 2, 30)]);
        assert_eq!(stats.average_time_per_person(), Some(15.0));
    }

    #[test]
    fn foreign_and_incomplete_rows_are_filtered() {
        let incomplete = VisitStatistic::reserved(1, "waiting:y", 2, 0);
        let stats = VenueWaitingStatistics::new(
            1,
            vec![completed(2, 2, 20), incomplete, completed(1, 2, 30)],
        );
        assert_eq!(stats.average_time_per_person(), Some(15.0));
    }

    #[test]
    fn estimate_rounds_up() {
        // 平均 10.5 分/人 → 排号 3 = ceil(31.5) = 32
        let stats =
            VenueWaitingStatistics::new(1, vec![completed(1, 2, 20), completed(1, 2, 22)]);
        assert_eq!(stats.expected_wait_minutes(3), Some(32));
    }
}
