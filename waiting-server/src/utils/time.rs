//! 时间工具函数 — 业务时区转换
//!
//! 所有实体时间戳统一使用 Unix millis (`i64`)。
//! "当日爽约次数"、封禁过期判断等以业务时区的自然日为边界，
//! 统一在这里换算。

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// 当前 Unix millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 当前业务时区日期
pub fn today_in_tz(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Unix millis 对应的业务时区日期
///
/// 非法时间戳 (超出 chrono 范围) 回退为 Unix epoch 当日。
pub fn date_of_millis(at: i64, tz: Tz) -> NaiveDate {
    DateTime::from_timestamp_millis(at)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&tz)
        .date_naive()
}

/// 两个时间戳之间的整分钟数 (向下取整，start > end 时返回 0)
pub fn minutes_between(start_millis: i64, end_millis: i64) -> i64 {
    ((end_millis - start_millis) / 60_000).max(0)
}

/// 某时间戳所在业务日的边界 (Unix millis, 右开区间)
pub fn day_bounds(at: i64, tz: Tz) -> (i64, i64) {
    let date = date_of_millis(at, tz);
    (day_start_millis(date, tz, at), day_start_millis(date + Duration::days(1), tz, at))
}

/// 某日零点的 Unix millis (业务时区)，DST 间隙回退给定缺省值
fn day_start_millis(date: NaiveDate, tz: Tz, fallback: i64) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(fallback)
}

/// 计算距离下一个业务时区零点的 Duration
///
/// 用于每日封禁释放扫描的触发时刻。
pub fn duration_until_next_midnight(tz: Tz) -> std::time::Duration {
    let now = Utc::now().with_timezone(&tz);
    let tomorrow = now.date_naive() + Duration::days(1);

    let target = tomorrow
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_local_timezone(tz)
        .earliest()
        .unwrap_or_else(|| {
            // DST edge case: fallback to one minute past midnight
            (tomorrow.and_hms_opt(0, 1, 0).unwrap())
                .and_local_timezone(tz)
                .latest()
                .unwrap_or_else(|| now + Duration::hours(24))
        });

    let duration = target.signed_duration_since(now);
    if duration.num_seconds() <= 0 {
        // Safety: 不应该发生，以防万一用 1 分钟兜底
        std::time::Duration::from_secs(60)
    } else {
        duration.to_std().unwrap_or(std::time::Duration::from_secs(60))
    }
}
