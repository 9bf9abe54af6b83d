//! Member Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// 平台会员，排队与通知的目标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// 账号系统侧的会员 ID
    pub member_id: i64,
    pub nickname: String,
    pub email: String,
}
