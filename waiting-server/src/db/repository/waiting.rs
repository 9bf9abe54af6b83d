//! Waiting Repository
//!
//! 排队记录的读写。记录从不删除 (保留作统计与历史)，
//! 重排的批量落库放在单个事务里，保证并发入场观察不到
//! 非连续排号。

use super::{strip_id, BaseRepository, CountRow, RepoError, RepoResult};
use crate::db::models::{Waiting, WaitingStatus};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "waiting";

/// 排队查询条件 — 每种用途一个变体
#[derive(Debug, Clone)]
pub enum WaitingQuery {
    /// 按记录 ID 单查
    ById(String),
    /// 某场次下指定状态的全部记录 (重排输入)
    ForVenue {
        venue_id: i64,
        status: WaitingStatus,
    },
    /// 全场次按状态查询 (爽约/超时扫描输入)
    ForStatus(WaitingStatus),
    /// 某会员当日在某场次的全部记录 (重复排队判定)
    ForMemberVenueOnDate {
        member_id: i64,
        venue_id: i64,
        day_start: i64,
        day_end: i64,
    },
    /// 会员到访历史，游标分页 (登记时间倒序)
    VisitHistory {
        member_id: i64,
        size: u32,
        before_registered_at: Option<i64>,
        status: Option<WaitingStatus>,
    },
    /// 0 号但尚未标记可入场时间的记录 (晋升扫描输入)
    AwaitingPromotion,
}

#[derive(Clone)]
pub struct WaitingRepository {
    base: BaseRepository,
}

impl WaitingRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 按查询条件取记录
    pub async fn find_by_query(&self, query: WaitingQuery) -> RepoResult<Vec<Waiting>> {
        match query {
            WaitingQuery::ById(id) => {
                let record_id: RecordId = id
                    .parse()
                    .map_err(|_| RepoError::NotFound(format!("Invalid waiting ID: {id}")))?;
                let record: Option<Waiting> = self.base.db().select(record_id).await?;
                Ok(record.into_iter().collect())
            }
            WaitingQuery::ForVenue { venue_id, status } => {
                let mut result = self
                    .base
                    .db()
                    .query(
                        "SELECT * FROM waiting \
                         WHERE venue_id = $venue_id AND status = $status \
                         ORDER BY waiting_number",
                    )
                    .bind(("venue_id", venue_id))
                    .bind(("status", status))
                    .await?;
                Ok(result.take(0)?)
            }
            WaitingQuery::ForStatus(status) => {
                let mut result = self
                    .base
                    .db()
                    .query("SELECT * FROM waiting WHERE status = $status")
                    .bind(("status", status))
                    .await?;
                Ok(result.take(0)?)
            }
            WaitingQuery::ForMemberVenueOnDate {
                member_id,
                venue_id,
                day_start,
                day_end,
            } => {
                let mut result = self
                    .base
                    .db()
                    .query(
                        "SELECT * FROM waiting \
                         WHERE member_id = $member_id AND venue_id = $venue_id \
                           AND registered_at >= $day_start AND registered_at < $day_end",
                    )
                    .bind(("member_id", member_id))
                    .bind(("venue_id", venue_id))
                    .bind(("day_start", day_start))
                    .bind(("day_end", day_end))
                    .await?;
                Ok(result.take(0)?)
            }
            WaitingQuery::VisitHistory {
                member_id,
                size,
                before_registered_at,
                status,
            } => {
                // 游标与状态过滤在客户端完成：嵌入式引擎的
                // WHERE + ORDER BY + LIMIT 组合会丢首行，不可依赖
                let mut result = self
                    .base
                    .db()
                    .query(
                        "SELECT * FROM waiting WHERE member_id = $member_id \
                         ORDER BY registered_at DESC",
                    )
                    .bind(("member_id", member_id))
                    .await?;
                let records: Vec<Waiting> = result.take(0)?;
                Ok(records
                    .into_iter()
                    .filter(|w| before_registered_at.is_none_or(|c| w.registered_at < c))
                    .filter(|w| status.is_none_or(|s| w.status == s))
                    .take(size as usize)
                    .collect())
            }
            WaitingQuery::AwaitingPromotion => {
                let mut result = self
                    .base
                    .db()
                    .query(
                        "SELECT * FROM waiting \
                         WHERE status = $status AND waiting_number = 0 \
                           AND can_enter_at = NONE",
                    )
                    .bind(("status", WaitingStatus::Waiting))
                    .await?;
                Ok(result.take(0)?)
            }
        }
    }

    /// 按记录 ID 单查，不存在时返回 NotFound
    pub async fn get(&self, id: &str) -> RepoResult<Waiting> {
        self.find_by_query(WaitingQuery::ById(id.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Waiting {id} not found")))
    }

    /// 下一个排号 = 场次内 WAITING 记录的最大排号 + 1，空队列为 0
    pub async fn next_waiting_number(&self, venue_id: i64) -> RepoResult<u32> {
        #[derive(Debug, serde::Deserialize)]
        struct NumberRow {
            waiting_number: u32,
        }

        let mut result = self
            .base
            .db()
            .query(
                "SELECT waiting_number FROM waiting \
                 WHERE venue_id = $venue_id AND status = $status",
            )
            .bind(("venue_id", venue_id))
            .bind(("status", WaitingStatus::Waiting))
            .await?;
        let rows: Vec<NumberRow> = result.take(0)?;

        Ok(rows
            .iter()
            .map(|r| r.waiting_number + 1)
            .max()
            .unwrap_or(0))
    }

    /// 某场次内排在指定排号之前的 WAITING 数量
    pub async fn count_waiting_before(&self, venue_id: i64, number: u32) -> RepoResult<i64> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT count() FROM waiting \
                 WHERE venue_id = $venue_id AND status = $status \
                   AND waiting_number < $number \
                 GROUP ALL",
            )
            .bind(("venue_id", venue_id))
            .bind(("status", WaitingStatus::Waiting))
            .bind(("number", number))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }

    /// 保存记录 (新建或整体覆盖)
    pub async fn save(&self, record: &Waiting) -> RepoResult<Waiting> {
        match record.id.clone() {
            Some(id) => {
                let content = strip_id(record)?;
                let updated: Option<Waiting> =
                    self.base.db().update(id.clone()).content(content).await?;
                updated.ok_or_else(|| RepoError::NotFound(format!("Waiting {id} not found")))
            }
            None => {
                let created: Option<Waiting> = self
                    .base
                    .db()
                    .create(TABLE)
                    .content(record.clone())
                    .await?;
                created.ok_or_else(|| RepoError::Database("Failed to create waiting".to_string()))
            }
        }
    }

    /// 批量保存：整批放进一个事务，避免重排中途可见
    pub async fn save_all(&self, records: &[Waiting]) -> RepoResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        for i in 0..records.len() {
            statements.push(format!("UPDATE $id{i} CONTENT $content{i};"));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut query = self.base.db().query(statements.join("\n"));
        for (i, record) in records.iter().enumerate() {
            let id = record.id.clone().ok_or_else(|| {
                RepoError::Validation("Cannot batch-save a waiting without an ID".to_string())
            })?;
            query = query
                .bind((format!("id{i}"), id))
                .bind((format!("content{i}"), strip_id(record)?));
        }
        query.await?;
        Ok(())
    }
}
