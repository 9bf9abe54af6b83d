//! 排队领域错误

use crate::db::models::WaitingStatus;

/// 排队状态机与构造校验错误
///
/// 状态冲突 (非 0 号入场、错误状态迁移) 必须显式失败，
/// 绝不静默忽略；校验错误在入库前拒绝。
#[derive(Debug, thiserror::Error)]
pub enum WaitingError {
    /// 排号不为 0，尚未轮到入场
    #[error("waiting {id} is not ready (number {number})")]
    NotReady { id: String, number: u32 },

    /// 当前状态不允许该迁移
    #[error("invalid status transition for waiting {id}: {status}")]
    InvalidStatus { id: String, status: WaitingStatus },

    #[error("invalid party size: {0} (allowed 1-6)")]
    InvalidPartySize(u32),

    #[error("invalid contact name: {0:?}")]
    InvalidContactName(String),

    #[error("invalid contact email: {0:?}")]
    InvalidEmail(String),
}
