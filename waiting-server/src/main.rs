use waiting_server::{print_banner, BackgroundTasks, Config, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境与日志
    dotenv::dotenv().ok();
    waiting_server::init_logger();

    print_banner();
    tracing::info!("Waitline server starting...");

    // 2. 配置
    let config = Config::from_env();
    tracing::info!(
        timezone = %config.timezone,
        environment = %config.environment,
        "Configuration loaded"
    );

    // 3. 状态初始化 + 后台任务
    let mut tasks = BackgroundTasks::new();
    let (state, email_worker) = ServerState::initialize(&config, tasks.shutdown_token()).await?;
    state.start_background_tasks(email_worker, &mut tasks);
    tasks.log_summary();

    tracing::info!(epoch = %state.epoch(), "Waitline server ready");

    // 4. 等待退出信号，优雅关闭
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    tasks.shutdown().await;

    Ok(())
}
