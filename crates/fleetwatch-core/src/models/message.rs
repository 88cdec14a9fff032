//! 실시간 소켓 메시지 envelope.

use serde::{Deserialize, Serialize};

use super::device::Device;
use super::event::Event;
use super::log::LogEntry;
use super::position::Position;

/// `/api/socket` 텍스트 프레임
///
/// 모든 키는 선택적이며 동시에 여러 개가 올 수 있다.
/// 알 수 없는 키는 무시한다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<Device>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<Position>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogEntry>>,
}

impl SocketMessage {
    /// 텍스트 프레임 파싱
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// 적용할 필드가 하나도 없는지 여부 (`{}` 하트비트 에코 등)
    pub fn is_empty(&self) -> bool {
        self.devices.is_none()
            && self.positions.is_none()
            && self.events.is_none()
            && self.logs.is_none()
    }
}
