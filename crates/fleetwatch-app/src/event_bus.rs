//! 내부 이벤트 버스.
//!
//! `tokio::broadcast` 기반 내부 이벤트 라우팅.
//! 소켓 컨트롤러의 로그인 리다이렉트도 이 버스로 전달된다.

use fleetwatch_core::ports::navigator::LoginRedirect;
use tokio::sync::broadcast;
use tracing::debug;

/// 내부 앱 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// 세션 만료 — 재로그인 필요
    LoginRequired,
}

/// 내부 이벤트 버스
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// 새 이벤트 버스 생성
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 이벤트 발행
    pub fn publish(&self, event: AppEvent) {
        debug!("이벤트 발행: {event:?}");
        let _ = self.tx.send(event);
    }

    /// 구독자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

impl LoginRedirect for EventBus {
    fn redirect_to_login(&self) {
        self.publish(AppEvent::LoginRequired);
    }
}
