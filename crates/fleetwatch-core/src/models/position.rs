//! 위치 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Attributes;

/// 장치 위치 보고 (`GET /api/positions`, 소켓 `positions`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub id: i64,
    pub device_id: i64,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub server_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub device_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fix_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outdated: bool,
    #[serde(default)]
    pub valid: bool,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    /// 속도 (knots)
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub course: f64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub geofence_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub attributes: Attributes,
}
