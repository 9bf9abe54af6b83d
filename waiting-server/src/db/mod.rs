//! Database Module
//!
//! 嵌入式 SurrealDB (RocksDB 后端)。表结构 schemaless，
//! 启动时定义热路径查询用到的索引。

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// 打开数据库并定义索引
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        db.use_ns("waitline")
            .use_db("main")
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        Self::define_indexes(&db).await?;

        tracing::info!(path = %db_path, "Database opened (SurrealDB/RocksDB)");
        Ok(Self { db })
    }

    /// 热路径索引：重排取队列、封禁检查、统计聚合、触发更新
    async fn define_indexes(db: &Surreal<Db>) -> Result<(), AppError> {
        db.query(
            "
            DEFINE INDEX IF NOT EXISTS waiting_venue_status ON waiting FIELDS venue_id, status;
            DEFINE INDEX IF NOT EXISTS waiting_member ON waiting FIELDS member_id;
            DEFINE INDEX IF NOT EXISTS ban_member_scope ON ban FIELDS member_id, scope;
            DEFINE INDEX IF NOT EXISTS statistic_venue ON visit_statistic FIELDS venue_id;
            DEFINE INDEX IF NOT EXISTS scheduled_waiting ON scheduled_notification FIELDS waiting_id;
            ",
        )
        .await
        .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?;
        Ok(())
    }
}
