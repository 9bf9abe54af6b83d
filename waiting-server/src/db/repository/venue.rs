//! Venue Repository
//!
//! 场次由运营系统同步写入，这里读多写少。

use super::{strip_id, BaseRepository, RepoError, RepoResult};
use crate::db::models::Venue;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "venue";

#[derive(Clone)]
pub struct VenueRepository {
    base: BaseRepository,
}

impl VenueRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 按运营系统侧场次 ID 查找
    pub async fn find_by_id(&self, venue_id: i64) -> RepoResult<Option<Venue>> {
        let venue: Option<Venue> = self
            .base
            .db()
            .select(RecordId::from_table_key(TABLE, venue_id))
            .await?;
        Ok(venue)
    }

    /// 写入场次 (运营同步 / 测试夹具)，记录键取场次 ID 天然去重
    pub async fn save(&self, venue: &Venue) -> RepoResult<Venue> {
        let saved: Option<Venue> = self
            .base
            .db()
            .upsert(RecordId::from_table_key(TABLE, venue.venue_id))
            .content(strip_id(venue)?)
            .await?;
        saved.ok_or_else(|| RepoError::Database("Failed to save venue".to_string()))
    }
}
