//! 실제 전송 계층 통합 테스트.
//!
//! mockito REST 서버 + 로컬 WebSocket 서버로 세션 로그인부터
//! 실시간 수신, 비정상 종료 후 재연결, 로그아웃 종료 코드까지 검증한다.

use async_trait::async_trait;
use fleetwatch_app::event_bus::EventBus;
use fleetwatch_app::notification_manager::NotificationManager;
use fleetwatch_app::socket_controller::{ControllerDeps, ControllerHandle, SocketController};
use fleetwatch_app::store::{FleetStore, SharedFleetStore, StoreLimits};
use fleetwatch_core::config::{AppConfig, SocketConfig};
use fleetwatch_core::error::CoreError;
use fleetwatch_core::ports::notifier::Notifier;
use fleetwatch_core::ports::socket::{
    SocketConnector, SocketEvent, SocketLink, LOGOUT_CLOSE_CODE,
};
use fleetwatch_network::auth::SessionManager;
use fleetwatch_network::connectivity::{
    ConnectionStatus, ConnectivityManager, SharedConnectivityManager,
};
use fleetwatch_network::http_client::HttpFleetApi;
use fleetwatch_network::ws_client::WsConnector;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

const USER_JSON: &str = r#"{"id":1,"name":"admin","email":"admin@example.com"}"#;
const DEVICES_JSON: &str = r#"[{"id":1,"name":"Van 1","status":"online"}]"#;

const POSITIONS_FRAME: &str =
    r#"{"positions":[{"id":10,"deviceId":1,"latitude":52.52,"longitude":13.40}]}"#;
const SOS_FRAME: &str =
    r#"{"events":[{"id":99,"type":"alarm","deviceId":1,"attributes":{"alarm":"sos"}}]}"#;

/// 로컬 WebSocket 서버
struct SocketServer {
    url: String,
    accepted: Arc<AtomicUsize>,
    /// 클라이언트가 보낸 종료 코드
    closes: mpsc::UnboundedReceiver<u16>,
}

/// 연결마다 `frames`를 보낸 뒤, `drop_first`면 첫 연결을 1001로 끊는다
async fn spawn_socket_server(frames: &'static [&'static str], drop_first: bool) -> SocketServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/api/socket", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let (closes_tx, closes) = mpsc::unbounded_channel();

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let closes_tx = closes_tx.clone();

            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                for frame in frames {
                    ws.send(Message::Text((*frame).into())).await.unwrap();
                }

                if drop_first && index == 0 {
                    let _ = ws
                        .close(Some(CloseFrame {
                            code: CloseCode::Away,
                            reason: "restart".into(),
                        }))
                        .await;
                    return;
                }

                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Close(frame) = msg {
                        let code = frame.map(|f| u16::from(f.code)).unwrap_or(1005);
                        let _ = closes_tx.send(code);
                        break;
                    }
                }
            });
        }
    });

    SocketServer {
        url,
        accepted,
        closes,
    }
}

/// 세션 쿠키 없이 고정 URL로 접속하는 연결 생성기
struct DirectConnector {
    url: String,
    handshake_timeout: Duration,
}

impl DirectConnector {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl SocketConnector for DirectConnector {
    async fn connect(
        &self,
    ) -> Result<(Box<dyn SocketLink>, mpsc::Receiver<SocketEvent>), CoreError> {
        let (link, rx) = WsConnector::open(&self.url, None, self.handshake_timeout).await?;
        Ok((Box::new(link), rx))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    shown: Mutex<Vec<(String, String)>>,
    sounds: AtomicUsize,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_notification(&self, title: &str, body: &str) -> Result<(), CoreError> {
        self.shown.lock().push((title.to_string(), body.to_string()));
        Ok(())
    }

    async fn play_sound(&self) -> Result<(), CoreError> {
        self.sounds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Client {
    handle: ControllerHandle,
    store: SharedFleetStore,
    connectivity: SharedConnectivityManager,
    notifier: Arc<RecordingNotifier>,
}

async fn login(server: &mockito::ServerGuard) -> Arc<SessionManager> {
    let session = Arc::new(SessionManager::new(&server.url(), Duration::from_secs(5)).unwrap());
    session.login("admin@example.com", "secret").await.unwrap();
    session
}

fn spawn_client(session: Arc<SessionManager>, socket_url: &str, socket: SocketConfig) -> Client {
    let config = AppConfig::default_config();
    let store: SharedFleetStore = Arc::new(FleetStore::new(StoreLimits::from_config(&config)));
    let connectivity: SharedConnectivityManager = Arc::new(ConnectivityManager::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let connector = DirectConnector {
        handshake_timeout: socket.connect_timeout(),
        ..DirectConnector::new(socket_url)
    };

    let (controller, handle) = SocketController::new(
        socket,
        ControllerDeps {
            api: Arc::new(HttpFleetApi::new(session, Duration::from_secs(5)).unwrap()),
            connector: Arc::new(connector),
            redirect: Arc::new(EventBus::default()),
            store: store.clone(),
            notifications: Arc::new(NotificationManager::new(config.events, notifier.clone())),
            connectivity: connectivity.clone(),
        },
    );
    tokio::spawn(controller.run());

    Client {
        handle,
        store,
        connectivity,
        notifier,
    }
}

async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "시간 초과: {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn mock_session(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/api/session")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("set-cookie", "JSESSIONID=node0live; Path=/; HttpOnly")
        .with_body(USER_JSON)
        .create_async()
        .await
}

#[tokio::test]
async fn live_updates_then_logout_close() {
    let mut rest = mockito::Server::new_async().await;
    let _session_mock = mock_session(&mut rest).await;
    let devices = rest
        .mock("GET", "/api/devices")
        .match_header("cookie", "JSESSIONID=node0live")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DEVICES_JSON)
        .expect(1)
        .create_async()
        .await;

    let mut ws = spawn_socket_server(&[POSITIONS_FRAME, SOS_FRAME], false).await;
    let session = login(&rest).await;
    let client = spawn_client(session, &ws.url, SocketConfig::default());

    client.handle.start();

    eventually("위치 수신", || client.store.position(1).is_some()).await;
    eventually("이벤트 수신", || !client.store.events().is_empty()).await;

    assert_eq!(client.store.device(1).unwrap().name, "Van 1");
    assert_eq!(client.store.position(1).unwrap().latitude, 52.52);
    assert_eq!(client.connectivity.status(), ConnectionStatus::Connected);

    let shown = client.notifier.shown.lock().clone();
    assert_eq!(shown, vec![("Van 1".to_string(), "Alarm: sos".to_string())]);
    assert_eq!(client.notifier.sounds.load(Ordering::SeqCst), 1);

    client.handle.stop().await;
    let code = tokio::time::timeout(Duration::from_secs(5), ws.closes.recv())
        .await
        .unwrap();
    assert_eq!(code, Some(LOGOUT_CLOSE_CODE));
    assert_eq!(client.connectivity.status(), ConnectionStatus::Disconnected);
    assert_eq!(ws.accepted.load(Ordering::SeqCst), 1);

    devices.assert_async().await;
}

#[tokio::test]
async fn server_drop_resyncs_and_reconnects() {
    let mut rest = mockito::Server::new_async().await;
    let _session_mock = mock_session(&mut rest).await;
    let devices = rest
        .mock("GET", "/api/devices")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DEVICES_JSON)
        .expect(2)
        .create_async()
        .await;
    let positions = rest
        .mock("GET", "/api/positions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":11,"deviceId":1,"latitude":48.1,"longitude":11.5}]"#)
        .expect(1)
        .create_async()
        .await;

    let ws = spawn_socket_server(&[], true).await;
    let session = login(&rest).await;
    let client = spawn_client(
        session,
        &ws.url,
        SocketConfig {
            reconnect_delay_ms: 200,
            ..SocketConfig::default()
        },
    );

    client.handle.start();

    eventually("재동기화 위치", || client.store.position(1).is_some()).await;
    eventually("재연결", || ws.accepted.load(Ordering::SeqCst) == 2).await;
    eventually("연결 상태", || {
        client.connectivity.status() == ConnectionStatus::Connected
    })
    .await;

    let stats = client.connectivity.stats();
    assert_eq!(stats.drops, 1);
    assert_eq!(client.store.position(1).unwrap().latitude, 48.1);

    client.handle.shutdown().await;
    devices.assert_async().await;
    positions.assert_async().await;
}

#[tokio::test]
async fn expired_session_redirects_to_login() {
    let mut rest = mockito::Server::new_async().await;
    let _session_mock = mock_session(&mut rest).await;
    let _devices = rest
        .mock("GET", "/api/devices")
        .with_status(401)
        .create_async()
        .await;

    let ws = spawn_socket_server(&[], false).await;
    let session = login(&rest).await;

    let bus = Arc::new(EventBus::default());
    let mut bus_rx = bus.subscribe();
    let config = AppConfig::default_config();
    let (controller, handle) = SocketController::new(
        config.socket.clone(),
        ControllerDeps {
            api: Arc::new(HttpFleetApi::new(session, Duration::from_secs(5)).unwrap()),
            connector: Arc::new(DirectConnector::new(&ws.url)),
            redirect: bus.clone(),
            store: Arc::new(FleetStore::new(StoreLimits::from_config(&config))),
            notifications: Arc::new(NotificationManager::new(
                config.events.clone(),
                Arc::new(RecordingNotifier::default()),
            )),
            connectivity: Arc::new(ConnectivityManager::new()),
        },
    );
    tokio::spawn(controller.run());

    handle.start();

    let event = tokio::time::timeout(Duration::from_secs(5), bus_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, fleetwatch_app::event_bus::AppEvent::LoginRequired);
    assert_eq!(ws.accepted.load(Ordering::SeqCst), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn silent_socket_endpoint_falls_back_to_reconnect() {
    let mut rest = mockito::Server::new_async().await;
    let _session_mock = mock_session(&mut rest).await;
    let _devices = rest
        .mock("GET", "/api/devices")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DEVICES_JSON)
        .create_async()
        .await;
    let _positions = rest
        .mock("GET", "/api/positions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    // TCP 연결만 받고 업그레이드에 응답하지 않는 엔드포인트
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/api/socket", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    {
        let accepted = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                held.push(stream);
            }
        });
    }

    let session = login(&rest).await;
    let client = spawn_client(
        session,
        &url,
        SocketConfig {
            reconnect_delay_ms: 200,
            connect_timeout_ms: 200,
            ..SocketConfig::default()
        },
    );

    client.handle.start();

    eventually("핸드셰이크 시간 초과 후 재시도", || {
        accepted.load(Ordering::SeqCst) >= 2
    })
    .await;
    assert!(client.connectivity.stats().drops >= 1);
    assert_ne!(client.connectivity.status(), ConnectionStatus::Connected);

    client.handle.shutdown().await;
}
