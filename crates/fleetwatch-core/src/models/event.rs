//! 서버 이벤트 모델.
//!
//! 장치 상태 변화, 알람, 지오펜스 진입/이탈 등 서버가 생성한 이벤트.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Attributes;

/// 알람 이벤트 타입
pub const ALARM_EVENT_TYPE: &str = "alarm";

/// 서버 이벤트 (`GET /api/events/{id}`, 소켓 `events`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    /// 이벤트 타입 (예: "deviceOnline", "geofenceEnter", "alarm")
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub device_id: i64,
    #[serde(default)]
    pub position_id: Option<i64>,
    #[serde(default)]
    pub geofence_id: Option<i64>,
    #[serde(default)]
    pub maintenance_id: Option<i64>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Event {
    /// 알람 종류 (`attributes.alarm`, 알람 이벤트에만 존재)
    pub fn alarm(&self) -> Option<&str> {
        self.attributes.get("alarm").and_then(|v| v.as_str())
    }

    /// 알람 이벤트 여부
    pub fn is_alarm(&self) -> bool {
        self.event_type == ALARM_EVENT_TYPE
    }
}
