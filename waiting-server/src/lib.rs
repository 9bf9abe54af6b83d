//! Waitline Server - 快闪店现场排队引擎
//!
//! # 架构概述
//!
//! 本模块是排队服务的主入口，提供以下核心功能：
//!
//! - **排队生命周期** (`waiting`): 登记 → 入场/爽约 的状态机与队列重排
//! - **封禁策略** (`ban`): 爽约累计的场次级/平台级封禁与每日释放
//! - **通知** (`notification`): 触发条件求值、扫描投递、实时推送与邮件
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储与仓库层
//!
//! # 模块结构
//!
//! ```text
//! waiting-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── db/            # 数据库层 (models + repository)
//! ├── waiting/       # 排队领域 (状态机、重排、统计、扫描)
//! ├── ban/           # 封禁策略与释放扫描
//! ├── notification/  # 通知触发、投递、通道、邮件
//! └── utils/         # 错误、日志、时间、校验
//! ```

pub mod ban;
pub mod core;
pub mod db;
pub mod notification;
pub mod utils;
pub mod waiting;

// Re-export 公共类型
pub use crate::core::{BackgroundTasks, Config, ServerState, TaskKind};
pub use utils::{AppError, AppResult};
pub use waiting::{JoinRequest, WaitingService};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
 _       __      _ __  ___
| |     / /___ _(_) /_/ (_)___  ___
| | /| / / __ `/ / __/ / / __ \/ _ \
| |/ |/ / /_/ / / /_/ / / / / /  __/
|__/|__/\__,_/_/\__/_/_/_/ /_/\___/
    "#
    );
}
