//! REST API 클라이언트 포트.
//!
//! 구현: `fleetwatch-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::device::Device;
use crate::models::event::Event;
use crate::models::position::Position;

/// 실시간 상태 동기화에 필요한 REST 조회
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// 전체 장치 목록 (`GET /api/devices`)
    async fn fetch_devices(&self) -> Result<Vec<Device>, CoreError>;

    /// 장치별 최신 위치 (`GET /api/positions`)
    async fn fetch_positions(&self) -> Result<Vec<Position>, CoreError>;

    /// 단일 이벤트 (`GET /api/events/{id}`)
    ///
    /// 푸시 알림이 이벤트 ID만 전달할 때 사용한다.
    async fn fetch_event(&self, event_id: i64) -> Result<Event, CoreError>;
}
