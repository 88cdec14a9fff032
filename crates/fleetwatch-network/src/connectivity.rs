//! 실시간 소켓 연결 상태 관리.
//!
//! 소켓 컨트롤러가 상태를 기록하고, 나머지 구성요소는
//! `watch` 수신기로 변경을 구독한다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// 소켓 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// 연결 끊김 (초기 상태 포함)
    Disconnected,
    /// 핸드셰이크 진행 중
    Connecting,
    /// 연결됨
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting"),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}

/// 연결 상태 관리자
pub struct ConnectivityManager {
    /// 상태 변경 브로드캐스트
    status_tx: watch::Sender<ConnectionStatus>,
    /// 연결 시도 횟수 (누적)
    attempts: AtomicU64,
    /// 비정상 종료 횟수 (누적)
    drops: AtomicU64,
    /// 마지막 연결 성공 시각 (Unix timestamp)
    last_connected: AtomicU64,
}

impl ConnectivityManager {
    /// 새 연결 관리자 생성 (초기 상태: Disconnected)
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            status_tx,
            attempts: AtomicU64::new(0),
            drops: AtomicU64::new(0),
            last_connected: AtomicU64::new(0),
        }
    }

    /// 현재 연결 상태
    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// 상태 변경 수신기 생성
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// 연결 시도 시작
    pub fn record_connecting(&self) {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("소켓 연결 시도 #{attempt}");
        self.transition(ConnectionStatus::Connecting);
    }

    /// 연결 성공
    pub fn record_connected(&self) {
        self.last_connected.store(unix_now(), Ordering::Relaxed);
        self.transition(ConnectionStatus::Connected);
    }

    /// 연결 종료
    ///
    /// `unexpected`가 true면 비정상 종료로 집계한다.
    pub fn record_disconnected(&self, unexpected: bool) {
        if unexpected {
            self.drops.fetch_add(1, Ordering::Relaxed);
        }
        self.transition(ConnectionStatus::Disconnected);
    }

    fn transition(&self, next: ConnectionStatus) {
        let changed = self.status_tx.send_if_modified(|status| {
            if *status == next {
                false
            } else {
                *status = next;
                true
            }
        });
        if changed {
            info!("소켓 상태: {next}");
        }
    }

    /// 마지막 연결 성공 이후 경과 시간 (연결 이력이 없으면 None)
    pub fn time_since_last_connected(&self) -> Option<Duration> {
        let last = self.last_connected.load(Ordering::Relaxed);
        if last == 0 {
            return None;
        }
        Some(Duration::from_secs(unix_now().saturating_sub(last)))
    }

    /// 연결 상태 통계
    pub fn stats(&self) -> ConnectivityStats {
        ConnectivityStats {
            status: self.status(),
            attempts: self.attempts.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
            time_since_last_connected: self.time_since_last_connected(),
        }
    }
}

impl Default for ConnectivityManager {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 연결 상태 통계
#[derive(Debug, Clone)]
pub struct ConnectivityStats {
    /// 현재 연결 상태
    pub status: ConnectionStatus,
    /// 누적 연결 시도 횟수
    pub attempts: u64,
    /// 누적 비정상 종료 횟수
    pub drops: u64,
    /// 마지막 연결 성공 이후 경과 시간
    pub time_since_last_connected: Option<Duration>,
}

/// Arc로 감싼 ConnectivityManager
pub type SharedConnectivityManager = Arc<ConnectivityManager>;
