//! 统一错误处理
//!
//! 提供应用级错误类型 [`AppError`]。
//!
//! # 错误分类
//!
//! | 分类 | 说明 |
//! |------|------|
//! | 校验错误 | 人数/姓名/邮箱不合法，入库前拒绝 |
//! | 状态冲突 | 非 0 号入场、错误状态迁移 |
//! | 策略拒绝 | 被封禁会员、重复排队、场次未营业 |
//! | 系统错误 | 数据库错误、内部错误 |

use crate::db::repository::RepoError;
use crate::waiting::WaitingError;

/// 应用错误枚举
///
/// 排队生命周期操作 (join/enter/no-show) 返回显式的类型化错误；
/// 后台扫描任务从不把错误抛给用户，只记录日志并在下个周期重试。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 校验错误 ==========
    #[error("Validation failed: {0}")]
    Validation(String),

    // ========== 业务逻辑错误 ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 状态冲突：非法状态迁移 (如非 0 号入场)
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// 策略拒绝：会员处于封禁期
    #[error("Member is banned: {0}")]
    BannedMember(String),

    /// 策略拒绝：当日已有有效排队或爽约次数超限
    #[error("Duplicate waiting: {0}")]
    DuplicateJoin(String),

    /// 策略拒绝：场次不在营业时间内
    #[error("Venue is not open: {0}")]
    VenueClosed(String),

    // ========== 系统错误 ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        AppError::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::DuplicateJoin(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<WaitingError> for AppError {
    fn from(e: WaitingError) -> Self {
        match e {
            WaitingError::NotReady { .. } | WaitingError::InvalidStatus { .. } => {
                AppError::StateConflict(e.to_string())
            }
            WaitingError::InvalidPartySize(_)
            | WaitingError::InvalidContactName(_)
            | WaitingError::InvalidEmail(_) => AppError::Validation(e.to_string()),
        }
    }
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;
