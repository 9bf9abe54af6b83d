//! Ban Repository
//!
//! 封禁记录的读写。释放 = 删除；"当前有效"的判定统一用
//! [`Ban::is_active_at`]，存储层不保存 active 标志位。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Ban, BanScope};
use surrealdb::engine::local::Db;
use surrealdb::Surreal;

const TABLE: &str = "ban";

/// 封禁查询条件 — 每种用途一个变体
#[derive(Debug, Clone)]
pub enum BanQuery {
    /// 某会员在某场次的全部场次级封禁
    StoreBansFor { member_id: i64, venue_id: i64 },
    /// 某会员的全部平台级封禁
    GlobalBansFor { member_id: i64 },
    /// 某会员自某时刻起的全部场次级封禁 (全局升级计数输入)
    ///
    /// `since` 为 None 时取全量历史。
    StoreBansSince {
        member_id: i64,
        since: Option<i64>,
    },
}

#[derive(Clone)]
pub struct BanRepository {
    base: BaseRepository,
}

impl BanRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 保存封禁记录
    pub async fn save(&self, ban: &Ban) -> RepoResult<Ban> {
        let created: Option<Ban> = self.base.db().create(TABLE).content(ban.clone()).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create ban".to_string()))
    }

    /// 按查询条件取封禁记录
    pub async fn find_by_query(&self, query: BanQuery) -> RepoResult<Vec<Ban>> {
        match query {
            BanQuery::StoreBansFor {
                member_id,
                venue_id,
            } => {
                let mut result = self
                    .base
                    .db()
                    .query(
                        "SELECT * FROM ban \
                         WHERE scope = $scope AND member_id = $member_id \
                           AND venue_id = $venue_id",
                    )
                    .bind(("scope", BanScope::Store))
                    .bind(("member_id", member_id))
                    .bind(("venue_id", venue_id))
                    .await?;
                Ok(result.take(0)?)
            }
            BanQuery::GlobalBansFor { member_id } => {
                let mut result = self
                    .base
                    .db()
                    .query(
                        "SELECT * FROM ban \
                         WHERE scope = $scope AND member_id = $member_id",
                    )
                    .bind(("scope", BanScope::Global))
                    .bind(("member_id", member_id))
                    .await?;
                Ok(result.take(0)?)
            }
            BanQuery::StoreBansSince { member_id, since } => {
                let mut result = self
                    .base
                    .db()
                    .query(
                        "SELECT * FROM ban \
                         WHERE scope = $scope AND member_id = $member_id \
                           AND banned_at >= $since",
                    )
                    .bind(("scope", BanScope::Store))
                    .bind(("member_id", member_id))
                    .bind(("since", since.unwrap_or(0)))
                    .await?;
                Ok(result.take(0)?)
            }
        }
    }

    /// 某会员当前有效的平台级封禁
    pub async fn find_active_global_ban(
        &self,
        member_id: i64,
        now: i64,
    ) -> RepoResult<Option<Ban>> {
        let bans = self
            .find_by_query(BanQuery::GlobalBansFor { member_id })
            .await?;
        Ok(bans.into_iter().find(|b| b.is_active_at(now)))
    }

    /// 已过期的平台级封禁 (每日释放扫描的输入)
    pub async fn find_expired_global_bans(&self, now: i64) -> RepoResult<Vec<Ban>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM ban WHERE scope = $scope")
            .bind(("scope", BanScope::Global))
            .await?;
        let bans: Vec<Ban> = result.take(0)?;
        Ok(bans.into_iter().filter(|b| !b.is_active_at(now)).collect())
    }

    /// 删除封禁记录 (释放)
    pub async fn delete(&self, bans: &[Ban]) -> RepoResult<usize> {
        let mut deleted = 0;
        for ban in bans {
            let Some(id) = ban.id.clone() else {
                continue;
            };
            let removed: Option<Ban> = self.base.db().delete(id).await?;
            if removed.is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
