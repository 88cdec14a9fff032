//! FleetWatch 도메인 모델.
//!
//! 서버 REST/WebSocket 응답을 그대로 미러링하는 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현하며,
//! 필드 이름은 서버 JSON 규약(camelCase)을 따른다.

pub mod device;
pub mod event;
pub mod log;
pub mod message;
pub mod position;
pub mod session;

/// 서버 엔티티의 자유 형식 속성 맵
pub type Attributes = serde_json::Map<String, serde_json::Value>;
