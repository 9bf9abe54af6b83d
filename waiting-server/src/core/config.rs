//! 服务器配置
//!
//! # 环境变量
//!
//! 所有配置项都可以通过环境变量覆盖：
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | WORK_DIR | /var/lib/waitline | 工作目录 (数据库、日志) |
//! | TIMEZONE | Asia/Seoul | 业务时区 (自然日边界) |
//! | NOTIFICATION_SWEEP_SECS | 30 | 通知扫描间隔 (秒) |
//! | NO_SHOW_SWEEP_SECS | 30 | 爽约扫描间隔 (秒) |
//! | PROMOTION_SWEEP_SECS | 10 | 可入场晋升扫描间隔 (秒) |
//! | CONNECTION_TTL_MINUTES | 10 | 实时连接 TTL (分钟) |
//! | MAIL_RELAY_URL | (未设置) | 邮件中继地址，未设置时不外发 |
//! | ENVIRONMENT | development | 运行环境 |
//!
//! # 示例
//!
//! ```ignore
//! WORK_DIR=/data/waitline TIMEZONE=Asia/Seoul cargo run
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库与日志
    pub work_dir: String,
    /// 业务时区
    pub timezone: Tz,
    /// 通知扫描间隔
    pub notification_sweep_interval: Duration,
    /// 爽约扫描间隔
    pub no_show_sweep_interval: Duration,
    /// 可入场晋升扫描间隔
    pub promotion_sweep_interval: Duration,
    /// 实时连接 TTL (Unix millis)
    pub connection_ttl_millis: i64,
    /// 邮件中继地址 (未配置时邮件只记日志)
    pub mail_relay_url: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置，未设置的用默认值
    pub fn from_env() -> Self {
        let timezone = std::env::var("TIMEZONE")
            .ok()
            .and_then(|tz| tz.parse::<Tz>().ok())
            .unwrap_or(chrono_tz::Asia::Seoul);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/waitline".into()),
            timezone,
            notification_sweep_interval: Duration::from_secs(env_u64(
                "NOTIFICATION_SWEEP_SECS",
                30,
            )),
            no_show_sweep_interval: Duration::from_secs(env_u64("NO_SHOW_SWEEP_SECS", 30)),
            promotion_sweep_interval: Duration::from_secs(env_u64("PROMOTION_SWEEP_SECS", 10)),
            connection_ttl_millis: env_u64("CONNECTION_TTL_MINUTES", 10) as i64 * 60 * 1000,
            mail_relay_url: std::env::var("MAIL_RELAY_URL").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 日志目录 (work_dir/logs)
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
