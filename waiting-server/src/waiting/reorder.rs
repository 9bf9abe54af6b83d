//! 队列重排算法
//!
//! 入场或爽约后重新计算场次内全部 WAITING 记录的排号。
//! 纯数据变换：输入记录快照 + 统计快照，输出变更后的记录，
//! 由调用方在场次级临界区内一次批量落库。
//!
//! 不变量：重排完成后，场次内 WAITING 记录的排号恰为 {0..N-1}，
//! 无重复、无空洞。

use crate::db::models::Waiting;
use crate::waiting::{VenueWaitingStatistics, WaitingError};

/// 一次重排的结果
#[derive(Debug)]
pub struct ReorderOutcome {
    /// 排号发生变化、需要落库的记录
    pub reordered: Vec<Waiting>,
    /// 本次重排后新到达 0 号的记录 (触发入场通知)
    pub now_at_zero: Option<Waiting>,
    /// 本次重排后新到达 3 号的记录 (触发 3 组前通知)
    pub now_at_three: Option<Waiting>,
}

impl ReorderOutcome {
    fn from_changes(reordered: Vec<Waiting>) -> Self {
        let now_at_zero = reordered.iter().find(|w| w.waiting_number == 0).cloned();
        let now_at_three = reordered.iter().find(|w| w.waiting_number == 3).cloned();
        Self {
            reordered,
            now_at_zero,
            now_at_three,
        }
    }
}

/// 入场后的队列前移
///
/// 0 号位已由入场者腾出：所有排号 > 0 的记录前移一位。
pub fn advance_after_entry(
    waiting: Vec<Waiting>,
    statistics: &VenueWaitingStatistics,
    now: i64,
) -> Result<ReorderOutcome, WaitingError> {
    let mut changed = Vec::new();
    for record in sort_deterministic(waiting) {
        if record.waiting_number == 0 {
            continue;
        }
        changed.push(record.decrement_position(statistics, now)?);
    }
    Ok(ReorderOutcome::from_changes(changed))
}

/// 爽约后的密集重排
///
/// 剩余 WAITING 记录按当前排号升序排序，从 0 起重新编号。
/// 排号并列 (违反不变量的脏数据) 按登记时间、记录 ID 兜底排序，
/// 保证重排结果确定。
pub fn renumber_after_no_show(
    waiting: Vec<Waiting>,
    statistics: &VenueWaitingStatistics,
    now: i64,
) -> Result<ReorderOutcome, WaitingError> {
    let mut changed = Vec::new();
    for (target, record) in sort_deterministic(waiting).into_iter().enumerate() {
        let target = target as u32;
        if record.waiting_number <= target {
            // 已就位 (或脏数据中的重号，保持不动以免与前一条冲突)
            continue;
        }
        let mut record = record;
        while record.waiting_number > target {
            record = record.decrement_position(statistics, now)?;
        }
        changed.push(record);
    }
    Ok(ReorderOutcome::from_changes(changed))
}

/// 确定性排序：排号 → 登记时间 → 记录 ID
fn sort_deterministic(mut waiting: Vec<Waiting>) -> Vec<Waiting> {
    waiting.sort_by(|a, b| {
        a.waiting_number
            .cmp(&b.waiting_number)
            .then(a.registered_at.cmp(&b.registered_at))
            .then(a.id_str().cmp(&b.id_str()))
    });
    waiting
}
