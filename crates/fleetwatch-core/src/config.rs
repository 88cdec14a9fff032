//! 애플리케이션 설정 구조체.
//!
//! 서버 URL, 소켓 재연결 주기, 이벤트/로그 보존 설정 등
//! 런타임 설정을 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 서버 연결 설정
    pub server: ServerConfig,
    /// 실시간 소켓 설정
    #[serde(default)]
    pub socket: SocketConfig,
    /// 이벤트 수신/알림 설정
    #[serde(default)]
    pub events: EventsConfig,
    /// 장치 로그 수집 설정
    #[serde(default)]
    pub logs: LogsConfig,
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:8082".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            socket: SocketConfig::default(),
            events: EventsConfig::default(),
            logs: LogsConfig::default(),
        }
    }
}

/// 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API 서버 기본 URL (예: "https://demo.example.com")
    pub base_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerConfig {
    /// 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// 실시간 소켓 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// 비정상 종료 후 재연결까지의 고정 지연 (밀리초)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// 생존 확인용 no-op 프레임
    #[serde(default = "default_heartbeat_payload")]
    pub heartbeat_payload: String,
    /// 핸드셰이크 및 종료 응답 대기 한도 (밀리초)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl SocketConfig {
    /// 재연결 지연
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_payload: default_heartbeat_payload(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// 이벤트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// 이벤트 저장 비활성화 (알림은 계속 발송)
    #[serde(default)]
    pub disabled: bool,
    /// 보관할 최근 이벤트 수
    #[serde(default = "default_events_max_retained")]
    pub max_retained: usize,
    /// 소리 알림 대상 이벤트 타입 (예: "deviceOverspeed")
    #[serde(default)]
    pub sound_events: Vec<String>,
    /// 소리 알림 대상 알람 종류 (예: "sos")
    #[serde(default)]
    pub sound_alarms: Vec<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            max_retained: default_events_max_retained(),
            sound_events: Vec::new(),
            sound_alarms: vec!["sos".to_string()],
        }
    }
}

/// 장치 로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// 소켓으로 수신한 장치 로그 보관 여부
    #[serde(default)]
    pub enabled: bool,
    /// 보관할 최대 로그 수
    #[serde(default = "default_logs_max_retained")]
    pub max_retained: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retained: default_logs_max_retained(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_reconnect_delay_ms() -> u64 {
    60_000
}

fn default_connect_timeout_ms() -> u64 {
    15_000
}

fn default_heartbeat_payload() -> String {
    "{}".to_string()
}

fn default_events_max_retained() -> usize {
    50
}

fn default_logs_max_retained() -> usize {
    500
}
