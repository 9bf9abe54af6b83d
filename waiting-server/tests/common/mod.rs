//! 集成测试夹具：临时目录上的完整 ServerState

#![allow(dead_code)]

use tokio_util::sync::CancellationToken;

use waiting_server::core::{Config, ServerState};
use waiting_server::db::models::{Member, Venue, Waiting};
use waiting_server::db::repository::{
    BanRepository, MemberRepository, NotificationRepository, ScheduledNotificationRepository,
    VenueRepository, VisitStatisticRepository, WaitingRepository,
};
use waiting_server::waiting::JoinRequest;

pub struct TestApp {
    _tmp: tempfile::TempDir,
    pub state: ServerState,
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            work_dir: tmp.path().to_string_lossy().to_string(),
            ..Config::from_env()
        };
        // 邮件 worker 不启动：测试里投递只入队、队列关闭即丢弃
        let (state, _email_worker) = ServerState::initialize(&config, CancellationToken::new())
            .await
            .unwrap();
        Self { _tmp: tmp, state }
    }

    pub fn waiting_repo(&self) -> WaitingRepository {
        WaitingRepository::new(self.state.db.clone())
    }

    pub fn statistic_repo(&self) -> VisitStatisticRepository {
        VisitStatisticRepository::new(self.state.db.clone())
    }

    pub fn ban_repo(&self) -> BanRepository {
        BanRepository::new(self.state.db.clone())
    }

    pub fn notification_repo(&self) -> NotificationRepository {
        NotificationRepository::new(self.state.db.clone())
    }

    pub fn scheduled_repo(&self) -> ScheduledNotificationRepository {
        ScheduledNotificationRepository::new(self.state.db.clone())
    }

    /// 全天候营业、日期范围覆盖现在的场次
    pub async fn seed_venue(&self, venue_id: i64) -> Venue {
        let venue = Venue {
            id: None,
            venue_id,
            name: format!("Popup {venue_id}"),
            opens_at: "00:00".to_string(),
            closes_at: "00:00".to_string(),
            starts_on: "2000-01-01".to_string(),
            ends_on: "2099-12-31".to_string(),
            location_url: Some("https://maps.example.com/popup".to_string()),
        };
        VenueRepository::new(self.state.db.clone())
            .save(&venue)
            .await
            .unwrap()
    }

    /// 已结束的场次 (营业窗口判定恒为否)
    pub async fn seed_closed_venue(&self, venue_id: i64) -> Venue {
        let venue = Venue {
            id: None,
            venue_id,
            name: format!("Closed Popup {venue_id}"),
            opens_at: "10:00".to_string(),
            closes_at: "20:00".to_string(),
            starts_on: "2020-01-01".to_string(),
            ends_on: "2020-01-31".to_string(),
            location_url: None,
        };
        VenueRepository::new(self.state.db.clone())
            .save(&venue)
            .await
            .unwrap()
    }

    pub async fn seed_member(&self, member_id: i64) -> Member {
        let member = Member {
            id: None,
            member_id,
            nickname: format!("tester{member_id}"),
            email: format!("tester{member_id}@example.com"),
        };
        MemberRepository::new(self.state.db.clone())
            .save(&member)
            .await
            .unwrap()
    }

    pub fn join_request(&self, venue_id: i64, member_id: i64) -> JoinRequest {
        JoinRequest {
            venue_id,
            member_id,
            contact_name: format!("tester{member_id}"),
            contact_email: format!("tester{member_id}@example.com"),
            party_size: 2,
        }
    }

    pub async fn join(&self, venue_id: i64, member_id: i64) -> Waiting {
        self.state
            .waiting_service
            .join_queue(self.join_request(venue_id, member_id))
            .await
            .unwrap()
    }
}
