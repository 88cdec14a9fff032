//! WebSocket 클라이언트.
//!
//! `tokio-tungstenite` 기반 `/api/socket` 실시간 연결. `SocketConnector` 포트 구현.

use async_trait::async_trait;
use fleetwatch_core::error::CoreError;
use fleetwatch_core::ports::socket::{
    ReadyState, SocketConnector, SocketEvent, SocketLink, ABNORMAL_CLOSE_CODE,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::auth::SessionManager;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 종료 프레임에 코드가 없을 때의 코드
const NO_STATUS_CLOSE_CODE: u16 = 1005;

const STATE_OPEN: u8 = 1;
const STATE_CLOSING: u8 = 2;
const STATE_CLOSED: u8 = 3;

/// WebSocket 연결 생성기 — `SocketConnector` 포트 구현
pub struct WsConnector {
    session: Arc<SessionManager>,
    handshake_timeout: Duration,
}

impl WsConnector {
    /// 새 WebSocket 연결 생성기
    ///
    /// `handshake_timeout`은 업그레이드 응답과 종료 응답 대기에 모두 적용된다.
    pub fn new(session: Arc<SessionManager>, handshake_timeout: Duration) -> Self {
        Self {
            session,
            handshake_timeout,
        }
    }

    /// 지정 URL로 연결 수립
    ///
    /// `cookie`가 있으면 핸드셰이크 요청의 `Cookie` 헤더로 보낸다.
    /// TCP는 받았지만 업그레이드에 응답하지 않는 서버는 `handshake_timeout` 후 `Network` 에러.
    pub async fn open(
        url: &str,
        cookie: Option<&str>,
        handshake_timeout: Duration,
    ) -> Result<(WsLink, mpsc::Receiver<SocketEvent>), CoreError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| CoreError::Config(format!("WebSocket URL 오류: {e}")))?;

        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| CoreError::Internal(format!("쿠키 헤더 오류: {e}")))?;
            request.headers_mut().insert(COOKIE, value);
        }

        info!("WebSocket 연결: {url}");

        let (ws_stream, _) =
            tokio::time::timeout(handshake_timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| {
                    CoreError::Network(format!(
                        "WebSocket 핸드셰이크 시간 초과 ({handshake_timeout:?})"
                    ))
                })?
                .map_err(|e| CoreError::Network(format!("WebSocket 연결 실패: {e}")))?;

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::channel(64);

        let state = Arc::new(AtomicU8::new(STATE_OPEN));
        let local_close = Arc::new(Mutex::new(None));
        let closing = Arc::new(Notify::new());

        tokio::spawn(read_loop(
            read,
            tx,
            ReadShared {
                state: state.clone(),
                local_close: local_close.clone(),
                closing: closing.clone(),
                close_timeout: handshake_timeout,
            },
        ));

        Ok((
            WsLink {
                write: Arc::new(tokio::sync::Mutex::new(write)),
                state,
                local_close,
                closing,
            },
            rx,
        ))
    }
}

#[async_trait]
impl SocketConnector for WsConnector {
    async fn connect(
        &self,
    ) -> Result<(Box<dyn SocketLink>, mpsc::Receiver<SocketEvent>), CoreError> {
        let url = self.session.socket_url()?;
        let cookie = self.session.cookie().await?;
        let (link, rx) = Self::open(&url, Some(&cookie), self.handshake_timeout).await?;
        Ok((Box::new(link), rx))
    }
}

/// 수신 루프와 `WsLink`가 공유하는 상태
struct ReadShared {
    state: Arc<AtomicU8>,
    local_close: Arc<Mutex<Option<u16>>>,
    /// 로컬 종료 프레임 전송 알림
    closing: Arc<Notify>,
    /// 종료 프레임 전송 후 서버 응답 대기 한도
    close_timeout: Duration,
}

/// 수신 루프
///
/// 종료 코드 우선순위: 클라이언트가 보낸 코드 → 서버 종료 프레임 코드 → 1006.
/// 로컬 종료 후 서버가 `close_timeout` 안에 응답하지 않으면 연결을 버린다.
async fn read_loop(
    mut read: SplitStream<WsStream>,
    tx: mpsc::Sender<SocketEvent>,
    shared: ReadShared,
) {
    let mut remote_code = None;
    let mut close_deadline: Option<Instant> = None;

    loop {
        let next = tokio::select! {
            next = read.next() => next,
            _ = shared.closing.notified(), if close_deadline.is_none() => {
                close_deadline = Some(Instant::now() + shared.close_timeout);
                continue;
            }
            _ = tokio::time::sleep_until(close_deadline.unwrap_or_else(Instant::now)),
                if close_deadline.is_some() => {
                debug!("종료 응답 대기 시간 초과 — 연결 폐기");
                break;
            }
        };
        let Some(msg) = next else {
            break;
        };

        match msg {
            Ok(Message::Text(text)) => {
                if tx.send(SocketEvent::Message(text.to_string())).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(frame)) => {
                remote_code = Some(
                    frame
                        .map(|f| u16::from(f.code))
                        .unwrap_or(NO_STATUS_CLOSE_CODE),
                );
                break;
            }
            Ok(_) => {} // Binary/Ping/Pong은 무시 (Pong은 자동 응답)
            Err(e) => {
                warn!("WebSocket 수신 에러: {e}");
                break;
            }
        }
    }

    shared.state.store(STATE_CLOSED, Ordering::SeqCst);
    let local_code = *shared.local_close.lock();
    let code = local_code.or(remote_code).unwrap_or(ABNORMAL_CLOSE_CODE);

    debug!("WebSocket 수신 루프 종료: code={code}");
    let _ = tx.send(SocketEvent::Closed { code }).await;
}

/// 수립된 WebSocket 연결 — `SocketLink` 포트 구현
pub struct WsLink {
    write: Arc<tokio::sync::Mutex<SplitSink<WsStream, Message>>>,
    state: Arc<AtomicU8>,
    local_close: Arc<Mutex<Option<u16>>>,
    closing: Arc<Notify>,
}

#[async_trait]
impl SocketLink for WsLink {
    fn ready_state(&self) -> ReadyState {
        match self.state.load(Ordering::SeqCst) {
            STATE_OPEN => ReadyState::Open,
            STATE_CLOSING => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        if self.ready_state() != ReadyState::Open {
            return Err(CoreError::Network("WebSocket이 열려 있지 않음".to_string()));
        }

        let mut write = self.write.lock().await;
        write
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 전송 실패: {e}")))
    }

    async fn close(&self, code: u16) -> Result<(), CoreError> {
        {
            let mut local = self.local_close.lock();
            if local.is_none() {
                *local = Some(code);
            }
        }
        if self
            .state
            .compare_exchange(STATE_OPEN, STATE_CLOSING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        let mut write = self.write.lock().await;
        let sent = write
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 종료 실패: {e}")));
        self.closing.notify_one();
        sent
    }
}
