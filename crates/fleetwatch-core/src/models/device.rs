//! 장치 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Attributes;

/// 추적 장치 (`GET /api/devices`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// 장치 고유 식별자 (IMEI 등)
    #[serde(default)]
    pub unique_id: String,
    /// "online" | "offline" | "unknown"
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    /// 최신 위치 ID
    #[serde(default)]
    pub position_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Device {
    /// 온라인 여부
    pub fn is_online(&self) -> bool {
        self.status.as_deref() == Some("online")
    }
}
