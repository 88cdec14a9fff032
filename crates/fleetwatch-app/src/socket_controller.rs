//! 실시간 소켓 컨트롤러.
//!
//! `/api/socket` 연결 하나를 유지하며 수신 메시지를 상태 저장소에 반영한다.
//! 비정상 종료 시 REST로 장치/위치를 재동기화하고 고정 지연 후 재연결한다.
//! 종료 코드 4000은 의도적 로그아웃이므로 재연결하지 않는다.
//!
//! 모든 입력(외부 요청, 소켓 콜백, 타이머, REST 응답)은 하나의 루프에서
//! 순서대로 처리된다. 소켓마다 세대 번호를 붙여 대체된 소켓의 콜백은 버린다.

use fleetwatch_core::config::SocketConfig;
use fleetwatch_core::error::CoreError;
use fleetwatch_core::models::device::Device;
use fleetwatch_core::models::event::Event;
use fleetwatch_core::models::message::SocketMessage;
use fleetwatch_core::models::position::Position;
use fleetwatch_core::ports::fleet_api::FleetApi;
use fleetwatch_core::ports::navigator::LoginRedirect;
use fleetwatch_core::ports::socket::{
    ReadyState, SocketConnector, SocketEvent, SocketLink, ABNORMAL_CLOSE_CODE, LOGOUT_CLOSE_CODE,
};
use fleetwatch_network::connectivity::SharedConnectivityManager;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::notification_manager::NotificationManager;
use crate::reconnect_timer::ReconnectTimer;
use crate::store::SharedFleetStore;

/// 컨트롤러 입력
pub(crate) enum ControllerInput {
    /// 인증됨 — 장치 로드 후 연결
    Start,
    /// 로그아웃/해제 — 예약 취소 후 4000으로 종료
    Stop { ack: oneshot::Sender<()> },
    /// 정지 후 루프 종료
    Shutdown { ack: oneshot::Sender<()> },
    /// 네트워크 복구
    Online,
    /// 화면 표시 상태 변경
    VisibilityChanged { visible: bool },
    /// 푸시 알림 (이벤트 ID만 전달됨)
    PushNotification { event_id: i64 },

    InitialDevices {
        epoch: u64,
        result: Result<Vec<Device>, CoreError>,
    },
    SocketOpened {
        generation: u64,
        link: Arc<dyn SocketLink>,
    },
    SocketFailed {
        generation: u64,
        error: CoreError,
    },
    SocketMessage {
        generation: u64,
        text: String,
    },
    SocketClosed {
        generation: u64,
        code: u16,
    },
    ReconnectDue {
        token: u64,
    },
    /// `generation`은 재동기화를 일으킨 소켓의 세대
    Resynced {
        epoch: u64,
        generation: u64,
        devices: Result<Vec<Device>, CoreError>,
        positions: Result<Vec<Position>, CoreError>,
    },
    PushedEvent {
        epoch: u64,
        result: Result<Event, CoreError>,
    },
}

/// 현재 소켓
enum SocketSlot {
    Idle,
    Connecting,
    Open(Arc<dyn SocketLink>),
}

/// 컨트롤러 협력 객체
pub struct ControllerDeps {
    pub api: Arc<dyn FleetApi>,
    pub connector: Arc<dyn SocketConnector>,
    pub redirect: Arc<dyn LoginRedirect>,
    pub store: SharedFleetStore,
    pub notifications: Arc<NotificationManager>,
    pub connectivity: SharedConnectivityManager,
}

/// 실시간 소켓 컨트롤러
pub struct SocketController {
    config: SocketConfig,
    api: Arc<dyn FleetApi>,
    connector: Arc<dyn SocketConnector>,
    redirect: Arc<dyn LoginRedirect>,
    store: SharedFleetStore,
    notifications: Arc<NotificationManager>,
    connectivity: SharedConnectivityManager,

    input_tx: mpsc::UnboundedSender<ControllerInput>,
    input_rx: mpsc::UnboundedReceiver<ControllerInput>,

    /// 인증 상태 (Start ~ Stop 사이)
    active: bool,
    /// Start/Stop마다 증가, 이전 세션의 REST 응답 무효화
    epoch: u64,
    /// 연결 시도마다 증가, 이전 소켓의 콜백 무효화
    generation: u64,
    socket: SocketSlot,
    timer: ReconnectTimer,
}

impl SocketController {
    /// 컨트롤러와 입력 핸들 생성
    ///
    /// 컨트롤러는 `run()`으로 별도 태스크에서 구동한다.
    pub fn new(config: SocketConfig, deps: ControllerDeps) -> (Self, ControllerHandle) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let handle = ControllerHandle {
            tx: input_tx.clone(),
        };

        let controller = Self {
            config,
            api: deps.api,
            connector: deps.connector,
            redirect: deps.redirect,
            store: deps.store,
            notifications: deps.notifications,
            connectivity: deps.connectivity,
            input_tx,
            input_rx,
            active: false,
            epoch: 0,
            generation: 0,
            socket: SocketSlot::Idle,
            timer: ReconnectTimer::new(),
        };

        (controller, handle)
    }

    /// 입력 처리 루프 (`Shutdown`까지)
    pub async fn run(mut self) {
        info!("소켓 컨트롤러 시작");
        while let Some(input) = self.input_rx.recv().await {
            if !self.handle(input).await {
                break;
            }
        }
        info!("소켓 컨트롤러 종료");
    }

    /// 입력 하나 처리. 루프를 끝내야 하면 false
    async fn handle(&mut self, input: ControllerInput) -> bool {
        match input {
            ControllerInput::Start => self.start(),
            ControllerInput::Stop { ack } => {
                self.stop().await;
                let _ = ack.send(());
            }
            ControllerInput::Shutdown { ack } => {
                self.stop().await;
                let _ = ack.send(());
                return false;
            }
            ControllerInput::Online => self.heartbeat_or_reconnect("online"),
            ControllerInput::VisibilityChanged { visible } => {
                if visible {
                    self.heartbeat_or_reconnect("visible");
                }
            }
            ControllerInput::PushNotification { event_id } => self.fetch_pushed_event(event_id),
            ControllerInput::InitialDevices { epoch, result } => {
                self.on_initial_devices(epoch, result)
            }
            ControllerInput::SocketOpened { generation, link } => self.on_open(generation, link),
            ControllerInput::SocketFailed { generation, error } => {
                if generation == self.generation {
                    warn!("소켓 연결 실패: {error}");
                }
                self.on_close(generation, ABNORMAL_CLOSE_CODE);
            }
            ControllerInput::SocketMessage { generation, text } => {
                self.on_message(generation, &text).await
            }
            ControllerInput::SocketClosed { generation, code } => self.on_close(generation, code),
            ControllerInput::ReconnectDue { token } => self.on_reconnect_due(token),
            ControllerInput::Resynced {
                epoch,
                generation,
                devices,
                positions,
            } => self.on_resynced(epoch, generation, devices, positions),
            ControllerInput::PushedEvent { epoch, result } => {
                self.on_pushed_event(epoch, result).await
            }
        }
        true
    }

    // ── 수명 주기 ──

    fn start(&mut self) {
        if self.active {
            debug!("이미 시작된 컨트롤러");
            return;
        }
        self.active = true;
        self.epoch += 1;

        let api = self.api.clone();
        let tx = self.input_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = api.fetch_devices().await;
            let _ = tx.send(ControllerInput::InitialDevices { epoch, result });
        });
    }

    fn on_initial_devices(&mut self, epoch: u64, result: Result<Vec<Device>, CoreError>) {
        if epoch != self.epoch || !self.active {
            return;
        }

        match result {
            Ok(devices) => {
                info!("장치 {}개 로드", devices.len());
                self.store.refresh_devices(devices);
            }
            Err(e) if e.is_unauthorized() => {
                warn!("장치 목록 조회 인증 실패 — 로그인으로 이동");
                self.redirect.redirect_to_login();
                return;
            }
            Err(e) => warn!("초기 장치 목록 조회 실패: {e}"),
        }

        if matches!(self.socket, SocketSlot::Idle) {
            self.connect();
        }
    }

    async fn stop(&mut self) {
        if !self.active && matches!(self.socket, SocketSlot::Idle) && !self.timer.is_pending() {
            return;
        }

        self.active = false;
        self.epoch += 1;
        self.timer.cancel();
        // 진행 중인 연결과 곧 도착할 종료 콜백 무효화
        self.generation += 1;

        if let SocketSlot::Open(link) = std::mem::replace(&mut self.socket, SocketSlot::Idle) {
            if let Err(e) = link.close(LOGOUT_CLOSE_CODE).await {
                debug!("로그아웃 종료 전송 실패: {e}");
            }
        }

        self.connectivity.record_disconnected(false);
        info!("소켓 컨트롤러 정지");
    }

    // ── 연결 ──

    fn connect(&mut self) {
        self.timer.cancel();
        self.generation += 1;
        let generation = self.generation;
        self.socket = SocketSlot::Connecting;
        self.connectivity.record_connecting();

        let connector = self.connector.clone();
        let tx = self.input_tx.clone();
        tokio::spawn(async move {
            let (link, mut rx) = match connector.connect().await {
                Ok(pair) => pair,
                Err(error) => {
                    let _ = tx.send(ControllerInput::SocketFailed { generation, error });
                    return;
                }
            };

            let link: Arc<dyn SocketLink> = Arc::from(link);
            if tx
                .send(ControllerInput::SocketOpened { generation, link })
                .is_err()
            {
                return;
            }

            while let Some(event) = rx.recv().await {
                let (input, closed) = match event {
                    SocketEvent::Message(text) => {
                        (ControllerInput::SocketMessage { generation, text }, false)
                    }
                    SocketEvent::Closed { code } => {
                        (ControllerInput::SocketClosed { generation, code }, true)
                    }
                };
                if tx.send(input).is_err() || closed {
                    return;
                }
            }

            let _ = tx.send(ControllerInput::SocketClosed {
                generation,
                code: ABNORMAL_CLOSE_CODE,
            });
        });
    }

    fn on_open(&mut self, generation: u64, link: Arc<dyn SocketLink>) {
        if generation != self.generation || !self.active {
            debug!("대체된 소켓 연결 — 즉시 종료");
            tokio::spawn(async move {
                let _ = link.close(LOGOUT_CLOSE_CODE).await;
            });
            return;
        }

        self.socket = SocketSlot::Open(link);
        self.connectivity.record_connected();
    }

    fn on_close(&mut self, generation: u64, code: u16) {
        if generation != self.generation {
            debug!("이전 소켓 종료 무시 (code={code})");
            return;
        }

        self.socket = SocketSlot::Idle;
        let unexpected = code != LOGOUT_CLOSE_CODE;
        self.connectivity.record_disconnected(unexpected);

        if !unexpected {
            info!("로그아웃 종료 (code={code}) — 재연결하지 않음");
            return;
        }
        if !self.active {
            return;
        }

        let delay = self.config.reconnect_delay();
        warn!("소켓 종료 (code={code}) — 재동기화 후 {delay:?} 뒤 재연결");

        self.spawn_resync();
        self.timer
            .schedule(delay, self.input_tx.clone(), |token| {
                ControllerInput::ReconnectDue { token }
            });
    }

    fn on_reconnect_due(&mut self, token: u64) {
        if !self.timer.fire(token) {
            debug!("취소된 재연결 예약 무시");
            return;
        }
        if self.active && matches!(self.socket, SocketSlot::Idle) {
            info!("예약된 재연결 시도");
            self.connect();
        }
    }

    /// 네트워크 복구/화면 복귀 시 소켓 점검
    ///
    /// 닫혀 있으면 즉시 재연결, 열려 있으면 no-op 프레임으로 생존 확인.
    /// 하트비트 전송 실패는 무시한다 (실제로 끊겼다면 종료 콜백이 따로 온다).
    fn heartbeat_or_reconnect(&mut self, reason: &str) {
        if !self.active {
            return;
        }

        let link = match &self.socket {
            SocketSlot::Idle => None,
            SocketSlot::Connecting => return,
            SocketSlot::Open(link) => Some(link.clone()),
        };

        match link.map(|l| (l.ready_state(), l)) {
            None | Some((ReadyState::Closed, _)) => {
                info!("{reason}: 소켓 닫힘 — 즉시 재연결");
                self.socket = SocketSlot::Idle;
                self.connect();
            }
            Some((ReadyState::Open, link)) => {
                debug!("{reason}: 소켓 하트비트 전송");
                let payload = self.config.heartbeat_payload.clone();
                tokio::spawn(async move {
                    if let Err(e) = link.send_text(&payload).await {
                        debug!("하트비트 전송 실패 (무시): {e}");
                    }
                });
            }
            Some(_) => {}
        }
    }

    // ── 수신 ──

    async fn on_message(&mut self, generation: u64, text: &str) {
        if generation != self.generation {
            return;
        }

        let message = match SocketMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("소켓 메시지 파싱 실패, 무시: {e}");
                return;
            }
        };
        if message.is_empty() {
            debug!("빈 소켓 메시지");
            return;
        }

        if let Some(devices) = message.devices {
            self.store.update_devices(devices);
        }
        if let Some(positions) = message.positions {
            self.store.update_positions(positions);
        }
        if let Some(events) = message.events {
            self.dispatch_events(events).await;
        }
        if let Some(logs) = message.logs {
            self.store.append_logs(logs);
        }
    }

    /// 소켓/푸시 공통 이벤트 처리
    async fn dispatch_events(&self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        debug!("이벤트 {}개 수신", events.len());
        self.store.add_events(&events);
        self.notifications.announce(&events, &self.store).await;
    }

    // ── 재동기화 ──

    fn spawn_resync(&self) {
        let api = self.api.clone();
        let tx = self.input_tx.clone();
        let epoch = self.epoch;
        let generation = self.generation;
        tokio::spawn(async move {
            let devices = api.fetch_devices().await;
            let positions = api.fetch_positions().await;
            let _ = tx.send(ControllerInput::Resynced {
                epoch,
                generation,
                devices,
                positions,
            });
        });
    }

    /// 재동기화 결과 반영
    ///
    /// 그 사이 새 소켓이 열렸다면 스냅샷이 실시간 데이터보다 오래됐으므로
    /// 저장소는 건드리지 않는다. 401은 그래도 로그인으로 보낸다.
    fn on_resynced(
        &mut self,
        epoch: u64,
        generation: u64,
        devices: Result<Vec<Device>, CoreError>,
        positions: Result<Vec<Position>, CoreError>,
    ) {
        if epoch != self.epoch {
            return;
        }
        let current = generation == self.generation;
        if !current {
            debug!("새 소켓 이후 도착한 재동기화 결과 — 저장소 반영 생략");
        }

        let mut unauthorized = false;
        match devices {
            Ok(devices) if current => self.store.refresh_devices(devices),
            Ok(_) => {}
            Err(e) => {
                unauthorized |= e.is_unauthorized();
                debug!("재동기화 장치 조회 실패: {e}");
            }
        }
        match positions {
            Ok(positions) if current => self.store.replace_positions(positions),
            Ok(_) => {}
            Err(e) => {
                unauthorized |= e.is_unauthorized();
                debug!("재동기화 위치 조회 실패: {e}");
            }
        }

        if unauthorized {
            warn!("세션 만료 — 로그인으로 이동");
            self.redirect.redirect_to_login();
        }
    }

    // ── 푸시 ──

    fn fetch_pushed_event(&self, event_id: i64) {
        if !self.active {
            debug!("비활성 상태 푸시 무시: event_id={event_id}");
            return;
        }

        let api = self.api.clone();
        let tx = self.input_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = api.fetch_event(event_id).await;
            let _ = tx.send(ControllerInput::PushedEvent { epoch, result });
        });
    }

    async fn on_pushed_event(&mut self, epoch: u64, result: Result<Event, CoreError>) {
        if epoch != self.epoch {
            return;
        }
        match result {
            Ok(event) => self.dispatch_events(vec![event]).await,
            Err(e) => warn!("푸시 이벤트 조회 실패: {e}"),
        }
    }
}

/// 컨트롤러 입력 핸들 (복제 가능)
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControllerInput>,
}

impl ControllerHandle {
    /// 인증 완료 — 장치 로드 후 소켓 연결
    pub fn start(&self) {
        self.send(ControllerInput::Start);
    }

    /// 로그아웃 — 예약 취소, 소켓을 4000으로 종료. 처리 완료까지 대기
    pub async fn stop(&self) {
        let (ack, done) = oneshot::channel();
        self.send(ControllerInput::Stop { ack });
        let _ = done.await;
    }

    /// 정지 후 컨트롤러 루프 종료. 처리 완료까지 대기
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        self.send(ControllerInput::Shutdown { ack });
        let _ = done.await;
    }

    /// 네트워크 복구 신호
    pub fn online(&self) {
        self.send(ControllerInput::Online);
    }

    /// 화면 표시 상태 변경 신호
    pub fn visibility_changed(&self, visible: bool) {
        self.send(ControllerInput::VisibilityChanged { visible });
    }

    /// 이벤트 ID만 담긴 푸시 알림 수신
    pub fn push_notification(&self, event_id: i64) {
        self.send(ControllerInput::PushNotification { event_id });
    }

    fn send(&self, input: ControllerInput) {
        if self.tx.send(input).is_err() {
            debug!("소켓 컨트롤러가 이미 종료됨");
        }
    }

    /// 컨트롤러 없이 입력만 받아 보는 핸들
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<ControllerInput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}
