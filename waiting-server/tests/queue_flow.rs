//! 排队生命周期端到端：登记 → 入场/爽约 → 重排
//! Run: cargo test -p waiting-server --test queue_flow

mod common;

use common::TestApp;
use waiting_server::db::models::WaitingStatus;
use waiting_server::utils::AppError;

/// 登记分配递增排号，空队列从 0 开始
#[tokio::test]
async fn join_assigns_sequential_numbers() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    for m in 1..=3 {
        app.seed_member(m).await;
    }

    let first = app.join(1, 1).await;
    let second = app.join(1, 2).await;
    let third = app.join(1, 3).await;

    assert_eq!(first.waiting_number, 0);
    assert_eq!(second.waiting_number, 1);
    assert_eq!(third.waiting_number, 2);
    assert_eq!(first.status, WaitingStatus::Waiting);
    // 无历史统计 → 预计等待未知
    assert_eq!(second.expected_wait_minutes, None);
}

/// 0 号之外入场必须失败，且错误类型固定
#[tokio::test]
async fn enter_rejected_unless_at_position_zero() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    app.seed_member(2).await;

    let _first = app.join(1, 1).await;
    let second = app.join(1, 2).await;

    let err = app
        .state
        .waiting_service
        .mark_entered(&second.id_str())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));

    // 状态未被破坏
    let queue = app.state.waiting_service.queue_snapshot(1).await.unwrap();
    assert_eq!(queue.len(), 2);
}

/// 入场后全队前移一位；再次入场同一记录失败
#[tokio::test]
async fn entry_advances_queue() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    for m in 1..=5 {
        app.seed_member(m).await;
    }
    let a = app.join(1, 1).await;
    let _b = app.join(1, 2).await;
    let _c = app.join(1, 3).await;
    let _d = app.join(1, 4).await;
    let _e = app.join(1, 5).await;

    let entered = app
        .state
        .waiting_service
        .mark_entered(&a.id_str())
        .await
        .unwrap();
    assert_eq!(entered.status, WaitingStatus::Visited);
    assert!(entered.entered_at.is_some());

    // B..E → 0..3
    let queue = app.state.waiting_service.queue_snapshot(1).await.unwrap();
    let numbers: Vec<u32> = queue.iter().map(|w| w.waiting_number).collect();
    assert_eq!(numbers, vec![0, 1, 2, 3]);

    // 新 0 号 (B) 已拿到可入场时间
    let b_now = queue.iter().find(|w| w.member_id == 2).unwrap();
    assert!(b_now.can_enter_at.is_some());
    // 位置按重排后的排号判定：E 在 3 号
    let e_now = queue.iter().find(|w| w.waiting_number == 3).unwrap();
    assert_eq!(e_now.member_id, 5);

    // 已入场的记录不能再入场
    let err = app
        .state
        .waiting_service
        .mark_entered(&a.id_str())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
}

/// 爽约后排号密集重排，集合始终为 {0..N-1}
#[tokio::test]
async fn no_show_renumbers_contiguously() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    for m in 1..=5 {
        app.seed_member(m).await;
    }
    for m in 1..=5 {
        app.join(1, m).await;
    }

    // 2 号 (member 3) 爽约
    let queue = app.state.waiting_service.queue_snapshot(1).await.unwrap();
    let victim = queue.iter().find(|w| w.waiting_number == 2).unwrap();
    let no_show = app
        .state
        .waiting_service
        .mark_no_show(&victim.id_str())
        .await
        .unwrap();
    assert_eq!(no_show.status, WaitingStatus::NoShow);
    // 爽约记录保留原排号作审计
    assert_eq!(no_show.waiting_number, 2);

    let queue = app.state.waiting_service.queue_snapshot(1).await.unwrap();
    let mut numbers: Vec<u32> = queue.iter().map(|w| w.waiting_number).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, vec![0, 1, 2, 3]);
}

/// 当日已有有效排队 → 重复登记被拒
#[tokio::test]
async fn duplicate_join_rejected() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    app.join(1, 1).await;

    let err = app
        .state
        .waiting_service
        .join_queue(app.join_request(1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateJoin(_)));
}

/// 非营业期的场次拒绝登记
#[tokio::test]
async fn closed_venue_rejects_join() {
    let app = TestApp::new().await;
    app.seed_closed_venue(9).await;
    app.seed_member(1).await;

    let err = app
        .state
        .waiting_service
        .join_queue(app.join_request(9, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::VenueClosed(_)));
}

/// 非法登记输入在入库前拒绝
#[tokio::test]
async fn invalid_registration_never_persisted() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;

    let mut request = app.join_request(1, 1);
    request.party_size = 7;
    let err = app
        .state
        .waiting_service
        .join_queue(request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let queue = app.state.waiting_service.queue_snapshot(1).await.unwrap();
    assert!(queue.is_empty());
}

/// 平均 10 分/人 × 排号 4 → 预计 40 分钟
#[tokio::test]
async fn expected_wait_follows_average() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    for m in 1..=5 {
        app.seed_member(m).await;
    }

    // 3 条已完成到访：每人耗时均 10 分钟
    let stats = app.statistic_repo();
    for (i, (initial, minutes)) in [(2u32, 20i64), (3, 30), (1, 10)].iter().enumerate() {
        let mut row = waiting_server::db::models::VisitStatistic::reserved(
            1,
            format!("waiting:history{i}"),
            *initial,
            0,
        );
        row.entered_at = Some(minutes * 60_000);
        stats.save(&row).await.unwrap();
    }

    for m in 1..=4 {
        app.join(1, m).await;
    }
    let fifth = app.join(1, 5).await;
    assert_eq!(fifth.waiting_number, 4);
    assert_eq!(fifth.expected_wait_minutes, Some(40));
}

/// 晋升扫描给直接以 0 号入队的记录补可入场时间
#[tokio::test]
async fn promotion_sweep_marks_first_in_line() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    let first = app.join(1, 1).await;
    assert!(first.can_enter_at.is_none());

    let promoted = app.state.run_promotion_sweep().await;
    assert_eq!(promoted, 1);

    let record = app.waiting_repo().get(&first.id_str()).await.unwrap();
    assert!(record.can_enter_at.is_some());

    // 再跑一次没有新目标
    assert_eq!(app.state.run_promotion_sweep().await, 0);
}

/// 爽约扫描把超时 10 分钟的 0 号转为 NO_SHOW
#[tokio::test]
async fn no_show_sweep_times_out_stale_head() {
    let app = TestApp::new().await;
    app.seed_venue(1).await;
    app.seed_member(1).await;
    app.seed_member(2).await;
    let first = app.join(1, 1).await;
    let _second = app.join(1, 2).await;

    // 可入场时间拨回 11 分钟前
    let repo = app.waiting_repo();
    let mut record = repo.get(&first.id_str()).await.unwrap();
    record.can_enter_at = Some(waiting_server::utils::time::now_millis() - 11 * 60_000);
    repo.save(&record).await.unwrap();

    let processed = app.state.run_no_show_sweep().await;
    assert_eq!(processed, 1);

    let record = repo.get(&first.id_str()).await.unwrap();
    assert_eq!(record.status, WaitingStatus::NoShow);

    // 后继者补位到 0 号
    let queue = app.state.waiting_service.queue_snapshot(1).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].member_id, 2);
    assert_eq!(queue[0].waiting_number, 0);
}
