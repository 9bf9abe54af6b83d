//! 通知触发扫描端到端：求值 → 投递 → 删除 (at-most-once)
//! Run: cargo test -p waiting-server --test notification_sweep

mod common;

use common::TestApp;
use waiting_server::db::models::{NotificationTrigger, WaitingEventType};
use waiting_server::utils::time;

/// 登记创建四条待触发通知 + 一条立即投递的确认通知
#[tokio::test]
async fn join_creates_confirmation_and_scheduled_set() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    let waiting = app.join(1, 1).await;

    let notifications = app.notification_repo().find_by_member(1).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].event_type,
        WaitingEventType::WaitingConfirmed
    );

    let pending = app.scheduled_repo().find_pending().await.unwrap();
    assert_eq!(pending.len(), 4);
    assert!(pending.iter().all(|s| s.waiting_id == waiting.id_str()));
}

/// 队首的 ENTER_NOW / THREE_TEAMS_BEFORE 触发后投递并删除；
/// 第二次扫描不再重复投递 (at-most-once)
#[tokio::test]
async fn sweep_dispatches_at_most_once() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    app.join(1, 1).await;

    // 第一次扫描：ENTER_NOW + THREE_TEAMS_BEFORE 条件成立
    let dispatched = app.state.run_notification_sweep().await;
    assert_eq!(dispatched, 2);

    let notifications = app.notification_repo().find_by_member(1).await.unwrap();
    let types: Vec<_> = notifications.iter().map(|n| n.event_type).collect();
    assert!(types.contains(&WaitingEventType::EnterNow));
    assert!(types.contains(&WaitingEventType::Enter3TeamsBefore));

    // 状态未变的第二次扫描：什么都不投递
    let dispatched = app.state.run_notification_sweep().await;
    assert_eq!(dispatched, 0);
    let notifications = app.notification_repo().find_by_member(1).await.unwrap();
    assert_eq!(notifications.len(), 3); // 确认 + 入场 + 3组前，无重复

    // ENTER_NOW 已记录发送时间 (超时触发器的输入)
    let pending = app.scheduled_repo().find_pending().await.unwrap();
    assert_eq!(pending.len(), 2); // ENTER_TIME_OVER + REVIEW_REQUEST 留存
    let time_over = pending
        .iter()
        .find(|s| s.trigger == NotificationTrigger::EnterTimeOver)
        .unwrap();
    assert!(time_over.enter_notification_sent_at.is_some());
}

/// 排在后面的记录不触发入场类通知
#[tokio::test]
async fn sweep_skips_records_down_the_queue() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    for m in 1..=6 {
        app.seed_member(m).await;
    }
    for m in 1..=6 {
        app.join(1, m).await;
    }

    let dispatched = app.state.run_notification_sweep().await;
    // 队首 ENTER_NOW + 前 4 名 (ahead ≤ 3) 的 THREE_TEAMS_BEFORE
    assert_eq!(dispatched, 5);

    // 5 号 (ahead = 5) 什么都没收到
    let tail = app.notification_repo().find_by_member(6).await.unwrap();
    assert_eq!(tail.len(), 1); // 仅登记确认
    assert_eq!(tail[0].event_type, WaitingEventType::WaitingConfirmed);
}

/// 入场通知发出 5 分钟未入场 → ENTER_TIME_OVER
#[tokio::test]
async fn time_over_fires_after_grace_period() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    app.join(1, 1).await;

    // 投递 ENTER_NOW (记录发送时间)
    assert_eq!(app.state.run_notification_sweep().await, 2);
    // 发送时间拨回 6 分钟前
    let scheduled = app.scheduled_repo();
    let pending = scheduled.find_pending().await.unwrap();
    let time_over = pending
        .iter()
        .find(|s| s.trigger == NotificationTrigger::EnterTimeOver)
        .unwrap();
    scheduled
        .mark_enter_notification_sent(
            time_over.id.as_ref().unwrap(),
            time::now_millis() - 6 * 60_000,
        )
        .await
        .unwrap();

    assert_eq!(app.state.run_notification_sweep().await, 1);
    let notifications = app.notification_repo().find_by_member(1).await.unwrap();
    assert!(notifications
        .iter()
        .any(|n| n.event_type == WaitingEventType::EnterTimeOver));
}

/// 入场 2 小时后 → REVIEW_REQUEST；入场者不再收超时提醒
#[tokio::test]
async fn review_request_fires_after_visit() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    let waiting = app.join(1, 1).await;

    assert_eq!(app.state.run_notification_sweep().await, 2);
    app.state
        .waiting_service
        .mark_entered(&waiting.id_str())
        .await
        .unwrap();

    // 入场后立刻扫描：评价邀请还不到时间，超时提醒被抑制
    assert_eq!(app.state.run_notification_sweep().await, 0);

    // 实际入场时间拨回 3 小时前
    app.scheduled_repo()
        .mark_actual_enter_time(&waiting.id_str(), time::now_millis() - 3 * 60 * 60_000)
        .await
        .unwrap();

    assert_eq!(app.state.run_notification_sweep().await, 1);
    let notifications = app.notification_repo().find_by_member(1).await.unwrap();
    assert!(notifications
        .iter()
        .any(|n| n.event_type == WaitingEventType::ReviewRequest));

    // 留下的只有被入场抑制的超时提醒
    let pending = app.scheduled_repo().find_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].trigger, NotificationTrigger::EnterTimeOver);
}

/// 在线会员收到实时推送
#[tokio::test]
async fn realtime_push_reaches_connected_member() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;

    let mut rx = app.state.channels.connect(1, time::now_millis());
    app.join(1, 1).await;

    // 登记确认已实时送达
    let payload = rx.try_recv().expect("confirmation pushed");
    assert_eq!(payload["event_type"], "WAITING_CONFIRMED");

    app.state.run_notification_sweep().await;
    let payload = rx.try_recv().expect("enter-now pushed");
    assert!(payload["event_type"] == "ENTER_NOW" || payload["event_type"] == "ENTER_3TEAMS_BEFORE");
}
