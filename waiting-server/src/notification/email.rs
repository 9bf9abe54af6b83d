//! 异步邮件投递
//!
//! 队列 + 后台 worker：调用方 `send_async` 只入队不等待，
//! worker 把载荷 POST 给配置的邮件中继。投递失败只记日志；
//! 邮件属尽力而为通道，不参与生命周期事务。

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 邮件载荷
#[derive(Debug, Clone, Serialize)]
pub struct EmailPayload {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// 邮件发送句柄 (入队端)
#[derive(Clone)]
pub struct EmailService {
    tx: mpsc::UnboundedSender<EmailPayload>,
}

impl EmailService {
    /// 创建发送句柄和配套 worker
    ///
    /// `relay_url` 为 None 时 (本地开发) worker 只记日志不外发。
    pub fn new(relay_url: Option<String>, shutdown: CancellationToken) -> (Self, EmailWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = EmailWorker {
            rx,
            relay_url,
            http: reqwest::Client::new(),
            shutdown,
        };
        (Self { tx }, worker)
    }

    /// 异步投递：入队即返回，从不阻塞调用方
    pub fn send_async(&self, payload: EmailPayload) {
        if self.tx.send(payload).is_err() {
            tracing::warn!("Email worker is gone, dropping email");
        }
    }
}

/// 邮件投递 worker
///
/// 注册为 `TaskKind::Worker`，随后台任务一起启动和关闭。
pub struct EmailWorker {
    rx: mpsc::UnboundedReceiver<EmailPayload>,
    relay_url: Option<String>,
    http: reqwest::Client,
    shutdown: CancellationToken,
}

impl EmailWorker {
    pub async fn run(mut self) {
        tracing::info!("Email worker started");
        loop {
            tokio::select! {
                maybe_payload = self.rx.recv() => {
                    match maybe_payload {
                        Some(payload) => self.deliver(payload).await,
                        None => break,
                    }
                }
                _ = self.shutdown.cancelled() => {
                    // 清空剩余队列后退出
                    while let Ok(payload) = self.rx.try_recv() {
                        self.deliver(payload).await;
                    }
                    break;
                }
            }
        }
        tracing::info!("Email worker stopped");
    }

    async fn deliver(&self, payload: EmailPayload) {
        let Some(relay_url) = &self.relay_url else {
            tracing::debug!(to = %payload.to, subject = %payload.subject, "No mail relay configured, skipping email");
            return;
        };

        match self.http.post(relay_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(to = %payload.to, "Email dispatched");
            }
            Ok(response) => {
                tracing::error!(
                    to = %payload.to,
                    status = %response.status(),
                    "Mail relay rejected email"
                );
            }
            Err(e) => {
                tracing::error!(to = %payload.to, error = %e, "Failed to reach mail relay");
            }
        }
    }
}
