//! 服务器状态
//!
//! [`ServerState`] 持有全部服务的共享引用，Arc 浅拷贝、
//! 所有权成本极低。初始化顺序：工作目录 → 数据库 → 仓库 →
//! 通道/邮件 → 领域服务。

use std::sync::Arc;

use surrealdb::engine::local::Db;
use surrealdb::Surreal;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::ban::{BanEscalationService, BanReleaseScheduler};
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::Config;
use crate::db::repository::{
    BanRepository, MemberRepository, NotificationRepository, ScheduledNotificationRepository,
    VenueRepository, VisitStatisticRepository, WaitingRepository,
};
use crate::db::DbService;
use crate::notification::{
    EmailService, EmailWorker, NotificationService, NotificationSweepScheduler, RealtimeChannels,
};
use crate::utils::{AppError, AppResult};
use crate::waiting::{NoShowScheduler, PromotionScheduler, VenueLocks, WaitingService};

/// 服务器状态 - 持有所有服务的单例引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | 嵌入式数据库 |
/// | channels | 实时连接注册表 |
/// | waiting_service | 排队生命周期入口 |
/// | notification_service | 通知生成与投递 |
/// | ban_service | 封禁升级策略 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    /// 服务器实例 epoch - 每次启动生成，客户端据此检测重启
    epoch: String,
    pub channels: Arc<RealtimeChannels>,
    pub waiting_service: WaitingService,
    pub notification_service: NotificationService,
    pub ban_service: BanEscalationService,
    waiting_repo: WaitingRepository,
    scheduled_repo: ScheduledNotificationRepository,
    ban_repo: BanRepository,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 返回状态与邮件 worker；worker 在 `start_background_tasks`
    /// 中被移交给任务管理器。
    pub async fn initialize(
        config: &Config,
        shutdown: CancellationToken,
    ) -> AppResult<(Self, EmailWorker)> {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work directory: {e}")))?;

        // 1. Initialize DB
        let db_path = config.database_dir().join("waitline.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;
        let db = db_service.db;

        // 2. Repositories
        let waiting_repo = WaitingRepository::new(db.clone());
        let statistic_repo = VisitStatisticRepository::new(db.clone());
        let venue_repo = VenueRepository::new(db.clone());
        let member_repo = MemberRepository::new(db.clone());
        let notification_repo = NotificationRepository::new(db.clone());
        let scheduled_repo = ScheduledNotificationRepository::new(db.clone());
        let ban_repo = BanRepository::new(db.clone());

        // 3. Dispatcher capabilities
        let channels = Arc::new(RealtimeChannels::new(config.connection_ttl_millis));
        let (email, email_worker) = EmailService::new(config.mail_relay_url.clone(), shutdown);

        // 4. Domain services
        let notification_service = NotificationService::new(
            notification_repo,
            scheduled_repo.clone(),
            venue_repo.clone(),
            channels.clone(),
            email,
            config.timezone,
        );
        let ban_service =
            BanEscalationService::new(ban_repo.clone(), waiting_repo.clone(), config.timezone);
        let waiting_service = WaitingService::new(
            waiting_repo.clone(),
            statistic_repo,
            venue_repo,
            member_repo,
            scheduled_repo.clone(),
            notification_service.clone(),
            ban_service.clone(),
            Arc::new(VenueLocks::new()),
            config.timezone,
        );

        let epoch = Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "Server state initialized");

        let state = Self {
            config: config.clone(),
            db,
            epoch,
            channels,
            waiting_service,
            notification_service,
            ban_service,
            waiting_repo,
            scheduled_repo,
            ban_repo,
        };
        Ok((state, email_worker))
    }

    /// 服务器实例 epoch (每次启动唯一)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// 启动全部后台任务
    ///
    /// - 邮件投递 worker
    /// - 通知扫描 (30s)
    /// - 爽约扫描 (30s)
    /// - 可入场晋升扫描 (10s)
    /// - 封禁释放扫描 (每日零点)
    pub fn start_background_tasks(&self, email_worker: EmailWorker, tasks: &mut BackgroundTasks) {
        let token = tasks.shutdown_token();

        tasks.spawn("email_worker", TaskKind::Worker, email_worker.run());

        let sweep = NotificationSweepScheduler::new(
            self.scheduled_repo.clone(),
            self.waiting_repo.clone(),
            self.notification_service.clone(),
            self.config.notification_sweep_interval,
            token.clone(),
        );
        tasks.spawn("notification_sweep", TaskKind::Periodic, sweep.run());

        let no_show = NoShowScheduler::new(
            self.waiting_repo.clone(),
            self.waiting_service.clone(),
            self.config.no_show_sweep_interval,
            token.clone(),
        );
        tasks.spawn("no_show_sweep", TaskKind::Periodic, no_show.run());

        let promotion = PromotionScheduler::new(
            self.waiting_repo.clone(),
            self.config.promotion_sweep_interval,
            token.clone(),
        );
        tasks.spawn("promotion_sweep", TaskKind::Periodic, promotion.run());

        let ban_release =
            BanReleaseScheduler::new(self.ban_repo.clone(), self.config.timezone, token);
        tasks.spawn("ban_release_sweep", TaskKind::Periodic, ban_release.run());
    }

    /// 手动触发一次通知扫描 (维护入口)
    pub async fn run_notification_sweep(&self) -> usize {
        NotificationSweepScheduler::new(
            self.scheduled_repo.clone(),
            self.waiting_repo.clone(),
            self.notification_service.clone(),
            self.config.notification_sweep_interval,
            CancellationToken::new(),
        )
        .tick()
        .await
    }

    /// 手动触发一次爽约扫描 (维护入口)
    pub async fn run_no_show_sweep(&self) -> usize {
        NoShowScheduler::new(
            self.waiting_repo.clone(),
            self.waiting_service.clone(),
            self.config.no_show_sweep_interval,
            CancellationToken::new(),
        )
        .tick()
        .await
    }

    /// 手动触发一次可入场晋升扫描 (维护入口)
    pub async fn run_promotion_sweep(&self) -> usize {
        PromotionScheduler::new(
            self.waiting_repo.clone(),
            self.config.promotion_sweep_interval,
            CancellationToken::new(),
        )
        .tick()
        .await
    }

    /// 手动触发一次封禁释放扫描 (维护入口)
    pub async fn run_ban_release_sweep(&self) -> usize {
        BanReleaseScheduler::new(
            self.ban_repo.clone(),
            self.config.timezone,
            CancellationToken::new(),
        )
        .tick()
        .await
    }
}
