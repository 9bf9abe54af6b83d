//! Member Repository

use super::{strip_id, BaseRepository, RepoError, RepoResult};
use crate::db::models::Member;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "member";

#[derive(Clone)]
pub struct MemberRepository {
    base: BaseRepository,
}

impl MemberRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 按账号系统侧会员 ID 查找
    pub async fn find_by_id(&self, member_id: i64) -> RepoResult<Option<Member>> {
        let member: Option<Member> = self
            .base
            .db()
            .select(RecordId::from_table_key(TABLE, member_id))
            .await?;
        Ok(member)
    }

    /// 写入会员 (账号系统同步 / 测试夹具)，记录键取会员 ID 天然去重
    pub async fn save(&self, member: &Member) -> RepoResult<Member> {
        let saved: Option<Member> = self
            .base
            .db()
            .upsert(RecordId::from_table_key(TABLE, member.member_id))
            .content(strip_id(member)?)
            .await?;
        saved.ok_or_else(|| RepoError::Database("Failed to save member".to_string()))
    }
}
