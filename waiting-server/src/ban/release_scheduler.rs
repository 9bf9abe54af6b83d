//! 封禁释放调度器
//!
//! 每日业务时区零点删除已过期的 GLOBAL 封禁。删除即释放，
//! 不存在显式"解封"操作。启动时先补扫一次，弥补停机期间
//! 错过的零点触发。

use tokio_util::sync::CancellationToken;

use crate::db::repository::BanRepository;
use crate::utils::time;
use chrono_tz::Tz;

/// 封禁释放调度器
///
/// 注册为 `TaskKind::Periodic`，在 `start_background_tasks()` 中启动。
pub struct BanReleaseScheduler {
    bans: BanRepository,
    tz: Tz,
    shutdown: CancellationToken,
}

impl BanReleaseScheduler {
    pub fn new(bans: BanRepository, tz: Tz, shutdown: CancellationToken) -> Self {
        Self { bans, tz, shutdown }
    }

    /// 主循环：启动补扫 → 每日零点触发
    pub async fn run(self) {
        tracing::info!("Ban release scheduler started");

        // 启动补扫
        self.tick().await;

        loop {
            let sleep_duration = time::duration_until_next_midnight(self.tz);
            tracing::debug!(
                minutes = sleep_duration.as_secs() / 60,
                "Next ban release sweep scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Ban release scheduler received shutdown signal");
                    return;
                }
            }
            self.tick().await;
        }
    }

    /// 单次释放扫描，返回释放数量
    ///
    /// 失败只记日志：下一次触发从最新状态重扫，不存在部分删除
    /// 需要补偿的情况。
    pub async fn tick(&self) -> usize {
        let now = time::now_millis();

        let expired = match self.bans.find_expired_global_bans(now).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query expired global bans");
                return 0;
            }
        };
        if expired.is_empty() {
            tracing::debug!("No expired global bans to release");
            return 0;
        }

        match self.bans.delete(&expired).await {
            Ok(released) => {
                tracing::info!(released, "Expired global bans released");
                released
            }
            Err(e) => {
                tracing::error!(error = %e, "Ban release sweep failed, retrying next tick");
                0
            }
        }
    }
}
