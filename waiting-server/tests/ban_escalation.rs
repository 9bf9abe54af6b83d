//! 封禁升级与释放端到端
//! Run: cargo test -p waiting-server --test ban_escalation

mod common;

use common::TestApp;
use waiting_server::db::models::{Ban, BanScope, WaitingEventType};
use waiting_server::utils::time;
use waiting_server::utils::AppError;

/// 当日 1 次爽约：无封禁，允许重新排队；第 2 次：1 天场次封禁 + 拒绝登记
#[tokio::test]
async fn second_same_day_no_show_triggers_store_ban() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;

    // 第一次爽约
    let first = app.join(1, 1).await;
    app.state
        .waiting_service
        .mark_no_show(&first.id_str())
        .await
        .unwrap();

    let bans = app
        .ban_repo()
        .find_by_query(waiting_server::db::repository::BanQuery::StoreBansFor {
            member_id: 1,
            venue_id: 1,
        })
        .await
        .unwrap();
    assert!(bans.is_empty(), "one no-show must not ban");

    // 仅 1 次爽约 → 当日可重新排队
    let second = app.join(1, 1).await;

    // 第二次爽约 → 场次封禁
    app.state
        .waiting_service
        .mark_no_show(&second.id_str())
        .await
        .unwrap();

    let bans = app
        .ban_repo()
        .find_by_query(waiting_server::db::repository::BanQuery::StoreBansFor {
            member_id: 1,
            venue_id: 1,
        })
        .await
        .unwrap();
    assert_eq!(bans.len(), 1);
    assert_eq!(bans[0].scope, BanScope::Store);
    assert_eq!(bans[0].duration_days, 1);
    assert!(bans[0].is_active_at(time::now_millis()));

    // 第三次登记被拒
    let err = app
        .state
        .waiting_service
        .join_queue(app.join_request(1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BannedMember(_)));
}

/// 第 10 次场次封禁触发恰好一次平台封禁与一条平台封禁通知
#[tokio::test]
async fn tenth_store_ban_escalates_to_global() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;

    // 历史上已有 9 次场次封禁 (均已过期，不阻塞登记)
    let bans = app.ban_repo();
    let long_ago = time::now_millis() - 30 * 24 * 60 * 60 * 1000;
    for day in 0..9 {
        bans.save(&Ban::store(1, 1, 1, long_ago + day * 24 * 60 * 60 * 1000))
            .await
            .unwrap();
    }

    // 今天再爽约两次 → 第 10 次场次封禁 → 平台封禁
    let first = app.join(1, 1).await;
    app.state
        .waiting_service
        .mark_no_show(&first.id_str())
        .await
        .unwrap();
    let second = app.join(1, 1).await;
    app.state
        .waiting_service
        .mark_no_show(&second.id_str())
        .await
        .unwrap();

    let global = bans
        .find_by_query(waiting_server::db::repository::BanQuery::GlobalBansFor { member_id: 1 })
        .await
        .unwrap();
    assert_eq!(global.len(), 1, "exactly one global ban");
    assert_eq!(global[0].duration_days, 3);
    assert_eq!(global[0].venue_id, None);

    // 恰好一条平台封禁通知
    let notifications = app.notification_repo().find_by_member(1).await.unwrap();
    let ban_notices = notifications
        .iter()
        .filter(|n| n.event_type == WaitingEventType::NoshowGlobalBan)
        .count();
    assert_eq!(ban_notices, 1);

    // 其他场次同样被拒
    app.seed_venue(2).await;
    let err = app
        .state
        .waiting_service
        .join_queue(app.join_request(2, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BannedMember(_)));
}

/// 每日释放扫描删除过期的平台封禁 — 删除即解封
#[tokio::test]
async fn release_sweep_deletes_expired_global_bans() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    let bans = app.ban_repo();

    // 一条已过期、一条仍有效
    let five_days_ago = time::now_millis() - 5 * 24 * 60 * 60 * 1000;
    bans.save(&Ban::global(1, 3, five_days_ago)).await.unwrap();
    bans.save(&Ban::global(2, 3, time::now_millis())).await.unwrap();

    let released = app.state.run_ban_release_sweep().await;
    assert_eq!(released, 1);

    let remaining = bans
        .find_by_query(waiting_server::db::repository::BanQuery::GlobalBansFor { member_id: 1 })
        .await
        .unwrap();
    assert!(remaining.is_empty(), "expired ban removed");
    let kept = bans
        .find_by_query(waiting_server::db::repository::BanQuery::GlobalBansFor { member_id: 2 })
        .await
        .unwrap();
    assert_eq!(kept.len(), 1, "active ban kept");

    // 解封后可重新登记
    app.join(1, 1).await;
}
