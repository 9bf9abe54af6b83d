//! 实时通知通道注册表
//!
//! 进程级的"谁在线"状态，收在窄接口后面注入给投递方，
//! 不做全局单例。连接按会员维度注册，超过 TTL 未活跃的
//! 连接由扫描周期顺带驱逐。

use crate::db::models::Notification;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// 默认连接 TTL：10 分钟无活跃即驱逐
pub const DEFAULT_CONNECTION_TTL_MILLIS: i64 = 10 * 60 * 1000;

struct ClientChannel {
    tx: mpsc::UnboundedSender<serde_json::Value>,
    last_seen: i64,
}

/// 实时通道注册表 (member_id → 连接)
pub struct RealtimeChannels {
    clients: DashMap<i64, ClientChannel>,
    ttl_millis: i64,
}

impl RealtimeChannels {
    pub fn new(ttl_millis: i64) -> Self {
        Self {
            clients: DashMap::new(),
            ttl_millis,
        }
    }

    /// 注册连接，返回接收端；同一会员重复注册时旧连接被替换
    pub fn connect(&self, member_id: i64, now: i64) -> mpsc::UnboundedReceiver<serde_json::Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.insert(
            member_id,
            ClientChannel {
                tx,
                last_seen: now,
            },
        );
        tracing::debug!(member_id, "Realtime channel connected");
        rx
    }

    /// 刷新活跃时间 (客户端心跳)
    pub fn touch(&self, member_id: i64, now: i64) {
        if let Some(mut entry) = self.clients.get_mut(&member_id) {
            entry.last_seen = now;
        }
    }

    /// 断开连接
    pub fn disconnect(&self, member_id: i64) {
        if self.clients.remove(&member_id).is_some() {
            tracing::debug!(member_id, "Realtime channel disconnected");
        }
    }

    /// 会员是否在线
    pub fn is_connected(&self, member_id: i64) -> bool {
        self.clients.contains_key(&member_id)
    }

    /// 推送通知；接收端已关闭时移除连接并返回 false
    pub fn push_realtime(&self, member_id: i64, notification: &Notification) -> bool {
        let Ok(payload) = serde_json::to_value(notification) else {
            return false;
        };
        let delivered = self
            .clients
            .get(&member_id)
            .map(|entry| entry.tx.send(payload).is_ok())
            .unwrap_or(false);

        if !delivered {
            self.clients.remove(&member_id);
        }
        delivered
    }

    /// 驱逐超过 TTL 未活跃的连接，返回驱逐数量
    pub fn evict_stale(&self, now: i64) -> usize {
        let before = self.clients.len();
        self.clients
            .retain(|_, entry| now - entry.last_seen < self.ttl_millis);
        let evicted = before - self.clients.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted stale realtime channels");
        }
        evicted
    }

    pub fn connected_count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for RealtimeChannels {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_TTL_MILLIS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WaitingEventType;

    fn notification() -> Notification {
        Notification::new(10, WaitingEventType::EnterNow, "now", None, 0)
    }

    #[test]
    fn push_reaches_connected_member() {
        let channels = RealtimeChannels::default();
        let mut rx = channels.connect(10, 0);

        assert!(channels.is_connected(10));
        assert!(channels.push_realtime(10, &notification()));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn push_to_offline_member_fails() {
        let channels = RealtimeChannels::default();
        assert!(!channels.push_realtime(10, &notification()));
    }

    #[test]
    fn dropped_receiver_is_cleaned_up() {
        let channels = RealtimeChannels::default();
        let rx = channels.connect(10, 0);
        drop(rx);

        assert!(!channels.push_realtime(10, &notification()));
        assert!(!channels.is_connected(10));
    }

    #[test]
    fn stale_connections_are_evicted() {
        let channels = RealtimeChannels::new(1_000);
        let _rx = channels.connect(10, 0);
        let _rx2 = channels.connect(11, 0);
        channels.touch(11, 900);

        assert_eq!(channels.evict_stale(1_500), 1);
        assert!(!channels.is_connected(10));
        assert!(channels.is_connected(11));
    }
}
