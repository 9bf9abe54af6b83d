//! 爽约处理调度器
//!
//! 每 30 秒找出"可入场已超 10 分钟仍未入场"的记录，
//! 逐条走爽约流水线 (状态迁移 → 重排 → 通知 → 封禁升级)。
//! 单条失败隔离处理，下个周期从最新状态重扫。

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::db::models::WaitingStatus;
use crate::db::repository::{WaitingQuery, WaitingRepository};
use crate::utils::time;
use crate::waiting::WaitingService;

/// 可入场后允许的入场窗口 (分钟)，超过即爽约
pub const NO_SHOW_TIMEOUT_MINUTES: i64 = 10;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// 爽约处理调度器
///
/// 注册为 `TaskKind::Periodic`，在 `start_background_tasks()` 中启动。
pub struct NoShowScheduler {
    waiting: WaitingRepository,
    service: WaitingService,
    interval: Duration,
    shutdown: CancellationToken,
}

impl NoShowScheduler {
    pub fn new(
        waiting: WaitingRepository,
        service: WaitingService,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            waiting,
            service,
            interval,
            shutdown,
        }
    }

    /// 主循环
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "No-show scheduler started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("No-show scheduler received shutdown signal");
                    return;
                }
            }
            self.tick().await;
        }
    }

    /// 单次扫描，返回处理条数
    pub async fn tick(&self) -> usize {
        let now = time::now_millis();
        let deadline = now - NO_SHOW_TIMEOUT_MINUTES * MILLIS_PER_MINUTE;

        let all_waiting = match self
            .waiting
            .find_by_query(WaitingQuery::ForStatus(WaitingStatus::Waiting))
            .await
        {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch waiting records");
                return 0;
            }
        };

        let targets: Vec<_> = all_waiting
            .into_iter()
            .filter(|w| w.can_enter_at.is_some_and(|t| t < deadline))
            .collect();
        if targets.is_empty() {
            return 0;
        }
        tracing::info!(targets = targets.len(), "Processing no-show targets");

        let mut processed = 0;
        for record in targets {
            match self.service.mark_no_show(&record.id_str()).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    tracing::error!(
                        waiting_id = %record.id_str(),
                        error = %e,
                        "No-show processing failed, retrying next sweep"
                    );
                }
            }
        }
        processed
    }
}
