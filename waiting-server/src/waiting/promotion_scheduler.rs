//! 可入场晋升调度器
//!
//! 每 10 秒给"0 号但还没有可入场时间"的记录补上 `can_enter_at`。
//! 经重排降到 0 号的记录在降位时已写入；这里兜底的是
//! 空队列直接以 0 号登记的记录。

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::db::repository::{WaitingQuery, WaitingRepository};
use crate::utils::time;

/// 可入场晋升调度器
///
/// 注册为 `TaskKind::Periodic`，在 `start_background_tasks()` 中启动。
pub struct PromotionScheduler {
    waiting: WaitingRepository,
    interval: Duration,
    shutdown: CancellationToken,
}

impl PromotionScheduler {
    pub fn new(
        waiting: WaitingRepository,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            waiting,
            interval,
            shutdown,
        }
    }

    /// 主循环
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Promotion scheduler started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Promotion scheduler received shutdown signal");
                    return;
                }
            }
            self.tick().await;
        }
    }

    /// 单次扫描，返回晋升条数
    pub async fn tick(&self) -> usize {
        let now = time::now_millis();

        let awaiting = match self
            .waiting
            .find_by_query(WaitingQuery::AwaitingPromotion)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch promotion targets");
                return 0;
            }
        };
        if awaiting.is_empty() {
            return 0;
        }

        let mut promoted = Vec::new();
        for record in awaiting {
            match record.mark_can_enter(now) {
                Ok(record) => promoted.push(record),
                Err(e) => {
                    // 查询条件已限定 WAITING，到这里只剩竞态窗口
                    tracing::warn!(error = %e, "Skipping promotion for record in transition");
                }
            }
        }

        let count = promoted.len();
        if let Err(e) = self.waiting.save_all(&promoted).await {
            tracing::error!(error = %e, "Failed to persist promotions, retrying next sweep");
            return 0;
        }
        tracing::info!(promoted = count, "Marked records as eligible to enter");
        count
    }
}
