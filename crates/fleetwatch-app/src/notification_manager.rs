//! 이벤트 알림 관리자.
//!
//! 소켓/푸시로 들어온 서버 이벤트를 사용자 알림과 알림음으로 변환한다.
//! 전달 경로와 무관하게 같은 규칙을 적용한다.

use fleetwatch_core::config::EventsConfig;
use fleetwatch_core::models::event::Event;
use fleetwatch_core::ports::notifier::Notifier;
use std::sync::Arc;
use tracing::{debug, info};

use crate::store::FleetStore;

/// 장치를 찾지 못했을 때의 알림 제목
const UNKNOWN_DEVICE: &str = "Unknown device";

/// 이벤트 타입별 표시 문구
pub fn event_type_text(event_type: &str) -> &str {
    match event_type {
        "deviceOnline" => "Status online",
        "deviceUnknown" => "Status unknown",
        "deviceOffline" => "Status offline",
        "deviceInactive" => "Device inactive",
        "queuedCommandSent" => "Queued command sent",
        "deviceMoving" => "Device moving",
        "deviceStopped" => "Device stopped",
        "deviceOverspeed" => "Speed limit exceeded",
        "deviceFuelDrop" => "Fuel drop",
        "deviceFuelIncrease" => "Fuel increase",
        "commandResult" => "Command result",
        "geofenceEnter" => "Geofence entered",
        "geofenceExit" => "Geofence exited",
        "alarm" => "Alarm",
        "ignitionOn" => "Ignition on",
        "ignitionOff" => "Ignition off",
        "maintenance" => "Maintenance required",
        "textMessage" => "Text message received",
        "driverChanged" => "Driver changed",
        "media" => "Media",
        other => other,
    }
}

/// 알림 관리자
pub struct NotificationManager {
    config: EventsConfig,
    notifier: Arc<dyn Notifier>,
}

impl NotificationManager {
    pub fn new(config: EventsConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    /// 알림음 대상 이벤트 여부
    pub fn wants_sound(&self, event: &Event) -> bool {
        if self.config.sound_events.iter().any(|t| t == &event.event_type) {
            return true;
        }
        event.is_alarm()
            && event
                .alarm()
                .is_some_and(|alarm| self.config.sound_alarms.iter().any(|a| a == alarm))
    }

    /// 이벤트 본문 (서버가 만든 `attributes.message` 우선)
    pub fn describe(event: &Event) -> String {
        if let Some(message) = event.attributes.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        match event.alarm() {
            Some(alarm) if event.is_alarm() => format!("Alarm: {alarm}"),
            _ => event_type_text(&event.event_type).to_string(),
        }
    }

    /// 이벤트 묶음 알림
    ///
    /// 이벤트마다 알림을 표시하고, 알림음은 묶음당 최대 한 번 재생한다.
    /// 알림 실패는 무시한다.
    pub async fn announce(&self, events: &[Event], store: &FleetStore) {
        for event in events {
            let title = store
                .device(event.device_id)
                .map(|d| d.name)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN_DEVICE.to_string());
            let body = Self::describe(event);

            if let Err(e) = self.notifier.show_notification(&title, &body).await {
                debug!("이벤트 알림 실패: {e}");
            }
        }

        if events.iter().any(|e| self.wants_sound(e)) {
            info!("알림음 재생: 이벤트 {}개", events.len());
            if let Err(e) = self.notifier.play_sound().await {
                debug!("알림음 재생 실패: {e}");
            }
        }
    }
}
