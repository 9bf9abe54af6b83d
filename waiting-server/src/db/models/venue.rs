//! Venue Model
//!
//! 限时快闪场次。场次本体由运营后台维护，这里只保留
//! 排队引擎需要的字段：营业窗口判断与通知用的展示信息。

use super::serde_helpers;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Popup venue entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// 运营系统侧的场次 ID，排队记录以此引用
    pub venue_id: i64,
    pub name: String,
    /// 每日开门时间 "HH:MM"
    pub opens_at: String,
    /// 每日关门时间 "HH:MM"
    pub closes_at: String,
    /// 活动开始日期 "YYYY-MM-DD"
    pub starts_on: String,
    /// 活动结束日期 "YYYY-MM-DD" (含当日)
    pub ends_on: String,
    /// 场次位置链接，入场邮件中使用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_url: Option<String>,
}

impl Venue {
    /// 判断某时刻场次是否营业中 (业务时区)
    ///
    /// 开门时间与关门时间相同表示 24 小时营业。
    /// 日期越界或时间字段无法解析时一律视为不营业。
    pub fn is_open_at(&self, at_millis: i64, tz: Tz) -> bool {
        let Some(at) = DateTime::<Utc>::from_timestamp_millis(at_millis) else {
            return false;
        };
        let local = at.with_timezone(&tz);

        let (Ok(starts), Ok(ends)) = (
            NaiveDate::parse_from_str(&self.starts_on, "%Y-%m-%d"),
            NaiveDate::parse_from_str(&self.ends_on, "%Y-%m-%d"),
        ) else {
            return false;
        };
        let (Ok(opens), Ok(closes)) = (
            NaiveTime::parse_from_str(&self.opens_at, "%H:%M"),
            NaiveTime::parse_from_str(&self.closes_at, "%H:%M"),
        ) else {
            return false;
        };

        let date = local.date_naive();
        let time = local.time();
        let within_hours = opens == closes || (time >= opens && time < closes);
        date >= starts && date <= ends && within_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn venue() -> Venue {
        Venue {
            id: None,
            venue_id: 1,
            name: "Test Popup".to_string(),
            opens_at: "10:00".to_string(),
            closes_at: "20:00".to_string(),
            starts_on: "2026-03-01".to_string(),
            ends_on: "2026-03-31".to_string(),
            location_url: None,
        }
    }

    fn seoul_millis(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        chrono_tz::Asia::Seoul
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn open_within_window() {
        let v = venue();
        let tz = chrono_tz::Asia::Seoul;
        assert!(v.is_open_at(seoul_millis(2026, 3, 15, 12, 0), tz));
        assert!(!v.is_open_at(seoul_millis(2026, 3, 15, 9, 59), tz));
        assert!(!v.is_open_at(seoul_millis(2026, 3, 15, 20, 0), tz));
        assert!(!v.is_open_at(seoul_millis(2026, 4, 1, 12, 0), tz));
        assert!(!v.is_open_at(seoul_millis(2026, 2, 28, 12, 0), tz));
    }

    #[test]
    fn equal_open_close_means_around_the_clock() {
        let mut v = venue();
        v.opens_at = "00:00".to_string();
        v.closes_at = "00:00".to_string();
        let tz = chrono_tz::Asia::Seoul;
        assert!(v.is_open_at(seoul_millis(2026, 3, 15, 3, 0), tz));
        assert!(!v.is_open_at(seoul_millis(2026, 4, 1, 3, 0), tz));
    }

    #[test]
    fn malformed_fields_mean_closed() {
        let mut v = venue();
        v.opens_at = "whenever".to_string();
        assert!(!v.is_open_at(seoul_millis(2026, 3, 15, 12, 0), chrono_tz::Asia::Seoul));
    }
}
