//! 실시간 소켓 포트.
//!
//! 구현: `fleetwatch-network` crate (tokio-tungstenite)

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;

/// 의도적 로그아웃을 뜻하는 클라이언트 종료 코드 (재연결 금지)
pub const LOGOUT_CLOSE_CODE: u16 = 4000;

/// 종료 프레임 없이 연결이 끊긴 경우의 코드
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// 소켓 상태 (WebSocket readyState와 동일한 의미)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// 소켓에서 수신한 신호
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// 텍스트 프레임 (JSON)
    Message(String),
    /// 연결 종료 (종료 코드)
    Closed { code: u16 },
}

/// 수립된 소켓 연결의 송신 측
#[async_trait]
pub trait SocketLink: Send + Sync {
    /// 현재 상태
    fn ready_state(&self) -> ReadyState;

    /// 텍스트 프레임 전송
    async fn send_text(&self, text: &str) -> Result<(), CoreError>;

    /// 종료 코드와 함께 연결 종료
    async fn close(&self, code: u16) -> Result<(), CoreError>;
}

/// 실시간 소켓 연결 생성기
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// 소켓 연결 수립
    ///
    /// 수신 신호는 반환된 `Receiver`로 전달되며,
    /// 마지막 신호는 항상 `SocketEvent::Closed`이다.
    async fn connect(
        &self,
    ) -> Result<(Box<dyn SocketLink>, mpsc::Receiver<SocketEvent>), CoreError>;
}
