//! # fleetwatch
//!
//! 차량 관제 실시간 클라이언트 바이너리.
//! 세션 로그인, 소켓 컨트롤러 구동, 재로그인, 종료 시 로그아웃.

use anyhow::{anyhow, Result};
use clap::Parser;
use fleetwatch_app::event_bus::EventBus;
use fleetwatch_app::lifecycle::LifecycleManager;
use fleetwatch_app::notification_manager::NotificationManager;
use fleetwatch_app::notifier::ConsoleNotifier;
use fleetwatch_app::socket_controller::{ControllerDeps, ControllerHandle, SocketController};
use fleetwatch_app::store::{FleetStore, SharedFleetStore, StoreLimits};
use fleetwatch_app::supervisor::{
    Authenticator, Credentials, SessionLogin, Supervisor, SupervisorExit,
};
use fleetwatch_core::config_manager::ConfigManager;
use fleetwatch_core::ports::fleet_api::FleetApi;
use fleetwatch_core::ports::socket::SocketConnector;
use fleetwatch_network::auth::SessionManager;
use fleetwatch_network::connectivity::{ConnectivityManager, SharedConnectivityManager};
use fleetwatch_network::http_client::HttpFleetApi;
use fleetwatch_network::ws_client::WsConnector;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// FleetWatch 실시간 관제 클라이언트
#[derive(Parser, Debug)]
#[command(name = "fleetwatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 서버 URL (기본: 설정 파일의 server.base_url)
    #[arg(long, short = 's')]
    server: Option<String>,

    /// 로그인 이메일
    #[arg(long, short = 'e', env = "FLEETWATCH_EMAIL")]
    email: Option<String>,

    /// 로그인 비밀번호
    #[arg(long, short = 'p', env = "FLEETWATCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// 세션 토큰 (이메일/비밀번호 대신 사용)
    #[arg(long, env = "FLEETWATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn load_config(path: Option<PathBuf>) -> Result<ConfigManager> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new().or_else(|e| {
            warn!("설정 관리자 초기화 실패, 현재 디렉토리 사용: {e}");
            ConfigManager::with_path(PathBuf::from("fleetwatch.json"))
        })?,
    };
    info!("설정 파일: {:?}", manager.config_path());
    Ok(manager)
}

/// SIGHUP을 네트워크 복구 신호로 전달
#[cfg(unix)]
fn forward_hangup(handle: ControllerHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut hangup) = signal(SignalKind::hangup()) else {
        warn!("SIGHUP 핸들러 등록 실패");
        return;
    };
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP 수신 — 소켓 점검");
            handle.online();
        }
    });
}

#[cfg(not(unix))]
fn forward_hangup(_handle: ControllerHandle) {}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "fleetwatch={},fleetwatch_app={},fleetwatch_core={},fleetwatch_network={}",
        args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("FleetWatch 클라이언트 시작");

    let credentials = Credentials::resolve(
        args.token.clone(),
        args.email.clone(),
        args.password.clone(),
    )
    .ok_or_else(|| anyhow!("로그인 정보 필요: --email/--password 또는 --token"))?;

    // 설정 로드 + CLI 오버라이드
    let config_manager = load_config(args.config.clone())?;
    let mut config = config_manager.get();
    if let Some(ref server_url) = args.server {
        config.server.base_url = server_url.clone();
    }
    info!("서버: {}", config.server.base_url);

    // 1. 세션
    let timeout = config.server.request_timeout();
    let session = Arc::new(SessionManager::new(&config.server.base_url, timeout)?);
    let auth: Arc<dyn Authenticator> = Arc::new(SessionLogin::new(session.clone(), credentials));
    auth.authenticate().await?;

    // 2. 어댑터
    let api: Arc<dyn FleetApi> = Arc::new(HttpFleetApi::new(session.clone(), timeout)?);
    let connector: Arc<dyn SocketConnector> = Arc::new(WsConnector::new(
        session.clone(),
        config.socket.connect_timeout(),
    ));

    // 3. 상태 + 알림
    let event_bus = Arc::new(EventBus::default());
    let store: SharedFleetStore = Arc::new(FleetStore::new(StoreLimits::from_config(&config)));
    let connectivity: SharedConnectivityManager = Arc::new(ConnectivityManager::new());
    let notifications = Arc::new(NotificationManager::new(
        config.events.clone(),
        Arc::new(ConsoleNotifier),
    ));

    // 4. 소켓 컨트롤러
    let (controller, handle) = SocketController::new(
        config.socket.clone(),
        ControllerDeps {
            api,
            connector,
            redirect: event_bus.clone(),
            store: store.clone(),
            notifications,
            connectivity: connectivity.clone(),
        },
    );
    let controller_task = tokio::spawn(controller.run());

    // 5. 라이프사이클
    let lifecycle = Arc::new(LifecycleManager::new());
    {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            lifecycle.wait_for_signal().await;
        });
    }
    forward_hangup(handle.clone());

    // 6. 세션 감독 (재로그인)
    let supervisor = Supervisor::new(
        handle.clone(),
        auth,
        store.clone(),
        &connectivity,
        &lifecycle,
        &event_bus,
        config.socket.reconnect_delay(),
    );

    handle.start();
    info!("FleetWatch 실행 중 (Ctrl+C로 종료)");

    let exit = supervisor.run().await;
    if exit == SupervisorExit::CredentialsRejected {
        error!("자격 증명이 거부되어 종료");
    }

    // 소켓을 4000으로 닫은 뒤 세션 종료
    handle.shutdown().await;
    if let Err(e) = controller_task.await {
        warn!("소켓 컨트롤러 태스크 비정상 종료: {e}");
    }
    if let Err(e) = session.logout().await {
        warn!("로그아웃 실패: {e}");
    }
    store.clear();

    info!("FleetWatch 클라이언트 종료");
    Ok(())
}
