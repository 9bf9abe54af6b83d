//! Visit Statistic Repository
//!
//! 统计行在登记时创建、入场时补全。平均值总是基于实时查询，
//! 存储层不做任何缓存。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::VisitStatistic;
use crate::waiting::VenueWaitingStatistics;
use surrealdb::engine::local::Db;
use surrealdb::Surreal;

const TABLE: &str = "visit_statistic";

#[derive(Clone)]
pub struct VisitStatisticRepository {
    base: BaseRepository,
}

impl VisitStatisticRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 登记时创建统计行
    pub async fn save(&self, stat: &VisitStatistic) -> RepoResult<VisitStatistic> {
        let created: Option<VisitStatistic> =
            self.base.db().create(TABLE).content(stat.clone()).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create visit statistic".to_string()))
    }

    /// 入场时补全统计行
    pub async fn mark_entered(&self, waiting_id: &str, entered_at: i64) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE visit_statistic SET entered_at = $entered_at \
                 WHERE waiting_id = $waiting_id AND entered_at = NONE",
            )
            .bind(("entered_at", entered_at))
            .bind(("waiting_id", waiting_id.to_string()))
            .await?;
        Ok(())
    }

    /// 某场次已完成的统计快照 (仅含已入场的行)
    pub async fn completed_stats(&self, venue_id: i64) -> RepoResult<VenueWaitingStatistics> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM visit_statistic \
                 WHERE venue_id = $venue_id AND entered_at != NONE",
            )
            .bind(("venue_id", venue_id))
            .await?;
        let rows: Vec<VisitStatistic> = result.take(0)?;
        Ok(VenueWaitingStatistics::new(venue_id, rows))
    }
}
