//! 장치 원시 로그 모델.

use serde::{Deserialize, Serialize};

/// 프로토콜 디코딩 이전의 장치 원시 메시지 (소켓 `logs`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default)]
    pub device_id: Option<i64>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub unique_id: Option<String>,
    /// 16진수 문자열 또는 텍스트 원문
    #[serde(default)]
    pub data: String,
}
