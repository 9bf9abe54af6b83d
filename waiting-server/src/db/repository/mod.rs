//! Repository Module
//!
//! Provides data access for SurrealDB tables. 排队引擎只通过这里
//! 的仓库类型访问存储，查询条件使用带标签的枚举 (每种用途一个
//! 变体)，编译期保证每个用途恰好携带它需要的字段。

// Queue domain
pub mod statistic;
pub mod waiting;

// Policy
pub mod ban;

// Notifications
pub mod notification;

// External-owned entities (read mostly)
pub mod member;
pub mod venue;

// Re-exports
pub use ban::{BanQuery, BanRepository};
pub use member::MemberRepository;
pub use notification::{NotificationRepository, ScheduledNotificationRepository};
pub use statistic::VisitStatisticRepository;
pub use venue::VenueRepository;
pub use waiting::{WaitingQuery, WaitingRepository};

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Database(format!("Serialization failed: {err}"))
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

/// 通用计数行 (`SELECT count() ... GROUP ALL`)
#[derive(Debug, serde::Deserialize)]
pub(crate) struct CountRow {
    pub count: i64,
}

/// 序列化实体并去掉 id 字段
///
/// UPDATE/UPSERT CONTENT 的载荷不允许携带与记录键冲突的 id。
pub(crate) fn strip_id<T: serde::Serialize>(entity: &T) -> RepoResult<serde_json::Value> {
    let mut value = serde_json::to_value(entity)?;
    if let Some(map) = value.as_object_mut() {
        map.remove("id");
    }
    Ok(value)
}
