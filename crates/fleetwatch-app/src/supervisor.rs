//! 세션 감독.
//!
//! 컨트롤러가 로그인 리다이렉트를 보내면 소켓을 멈추고 재로그인한다.
//! 서버 장애처럼 일시적인 실패는 재연결 지연 간격으로 다시 시도하고,
//! 자격 증명이 거부된 경우에만 감독을 끝낸다.

use async_trait::async_trait;
use fleetwatch_core::error::CoreError;
use fleetwatch_network::auth::SessionManager;
use fleetwatch_network::connectivity::{ConnectionStatus, SharedConnectivityManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::event_bus::{AppEvent, EventBus};
use crate::lifecycle::LifecycleManager;
use crate::socket_controller::ControllerHandle;
use crate::store::SharedFleetStore;

/// 로그인 수행 포트
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// 세션 수립. 자격 증명 거부는 `CoreError::Auth`
    async fn authenticate(&self) -> Result<(), CoreError>;
}

/// 로그인 자격 증명
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { email: String, password: String },
    Token(String),
}

impl Credentials {
    /// 토큰 우선, 없으면 이메일+비밀번호. 둘 다 없으면 None
    pub fn resolve(
        token: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Option<Self> {
        if let Some(token) = token {
            return Some(Self::Token(token));
        }
        match (email, password) {
            (Some(email), Some(password)) => Some(Self::Password { email, password }),
            _ => None,
        }
    }
}

/// `SessionManager`로 로그인하는 `Authenticator`
pub struct SessionLogin {
    session: Arc<SessionManager>,
    credentials: Credentials,
}

impl SessionLogin {
    pub fn new(session: Arc<SessionManager>, credentials: Credentials) -> Self {
        Self {
            session,
            credentials,
        }
    }
}

#[async_trait]
impl Authenticator for SessionLogin {
    async fn authenticate(&self) -> Result<(), CoreError> {
        let user = match &self.credentials {
            Credentials::Password { email, password } => {
                self.session.login(email, password).await?
            }
            Credentials::Token(token) => self.session.login_with_token(token).await?,
        };
        info!("로그인 완료: {} <{}>", user.name, user.email);
        Ok(())
    }
}

/// 감독 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// 종료 신호 수신
    Shutdown,
    /// 서버가 자격 증명을 거부 — 재시도 무의미
    CredentialsRejected,
}

/// 세션 감독자
pub struct Supervisor {
    handle: ControllerHandle,
    auth: Arc<dyn Authenticator>,
    store: SharedFleetStore,
    retry_delay: Duration,
    shutdown_rx: watch::Receiver<bool>,
    bus_rx: broadcast::Receiver<AppEvent>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl Supervisor {
    /// 생성 시점에 버스/상태/종료 신호를 구독한다
    pub fn new(
        handle: ControllerHandle,
        auth: Arc<dyn Authenticator>,
        store: SharedFleetStore,
        connectivity: &SharedConnectivityManager,
        lifecycle: &LifecycleManager,
        event_bus: &EventBus,
        retry_delay: Duration,
    ) -> Self {
        Self {
            handle,
            auth,
            store,
            retry_delay,
            shutdown_rx: lifecycle.subscribe(),
            bus_rx: event_bus.subscribe(),
            status_rx: connectivity.subscribe(),
        }
    }

    /// 종료 신호 또는 자격 증명 거부까지 실행
    pub async fn run(mut self) -> SupervisorExit {
        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => return SupervisorExit::Shutdown,
                event = self.bus_rx.recv() => match event {
                    Ok(AppEvent::LoginRequired) => {
                        if let Some(exit) = self.relogin().await {
                            return exit;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => debug!("이벤트 {n}개 누락"),
                    Err(broadcast::error::RecvError::Closed) => return SupervisorExit::Shutdown,
                },
                changed = self.status_rx.changed() => {
                    if changed.is_err() {
                        return SupervisorExit::Shutdown;
                    }
                    let status = *self.status_rx.borrow_and_update();
                    info!(
                        "소켓 상태: {status:?} (장치 {}개, 최근 이벤트 {}개)",
                        self.store.device_count(),
                        self.store.events().len()
                    );
                }
            }
        }
    }

    /// 소켓 정지 → 저장소 비움 → 로그인 성공까지 재시도 → 재시작
    async fn relogin(&mut self) -> Option<SupervisorExit> {
        warn!("세션 만료 — 재로그인");
        self.handle.stop().await;
        self.store.clear();

        // 정지 전에 쌓인 리다이렉트는 이번 재로그인으로 해소된다
        loop {
            match self.bus_rx.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        loop {
            match self.auth.authenticate().await {
                Ok(()) => {
                    self.handle.start();
                    return None;
                }
                Err(e) if e.is_unauthorized() => {
                    error!("자격 증명 거부: {e}");
                    return Some(SupervisorExit::CredentialsRejected);
                }
                Err(e) => {
                    warn!("재로그인 실패, {:?} 뒤 재시도: {e}", self.retry_delay);
                    tokio::select! {
                        _ = self.shutdown_rx.changed() => return Some(SupervisorExit::Shutdown),
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }
    }
}
