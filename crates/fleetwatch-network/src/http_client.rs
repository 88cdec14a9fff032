//! HTTP REST API 클라이언트.
//!
//! `FleetApi` 포트 구현. 세션 쿠키 자동 주입 + 상태 코드별 에러 매핑.

use async_trait::async_trait;
use fleetwatch_core::error::CoreError;
use fleetwatch_core::models::device::Device;
use fleetwatch_core::models::event::Event;
use fleetwatch_core::models::position::Position;
use fleetwatch_core::ports::fleet_api::FleetApi;
use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::auth::SessionManager;

/// REST API 클라이언트 — `FleetApi` 포트 구현
pub struct HttpFleetApi {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl HttpFleetApi {
    /// 새 HTTP API 클라이언트 생성
    pub fn new(session: Arc<SessionManager>, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: session.base_url().to_string(),
            session,
        })
    }

    /// 세션 쿠키가 포함된 GET 요청 후 JSON 파싱
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource_type: &str,
    ) -> Result<T, CoreError> {
        let cookie = self.session.cookie().await?;
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .header(COOKIE, cookie)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("{resource_type} 요청 실패: {e}")))?;

        let resp = check_response(resp, resource_type, path).await?;
        resp.json()
            .await
            .map_err(|e| CoreError::Internal(format!("{resource_type} 응답 파싱 실패: {e}")))
    }
}

/// 응답 상태 코드 확인 및 에러 매핑
async fn check_response(
    resp: reqwest::Response,
    resource_type: &str,
    path: &str,
) -> Result<reqwest::Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_else(|e| {
        tracing::warn!("응답 본문 읽기 실패: {e}");
        String::new()
    });

    match status.as_u16() {
        401 => Err(CoreError::Auth(format!("인증 실패: {text}"))),
        404 => Err(CoreError::NotFound {
            resource_type: resource_type.to_string(),
            id: path.to_string(),
        }),
        503 => Err(CoreError::ServiceUnavailable(text)),
        _ => Err(CoreError::Internal(format!("API 에러 ({status}): {text}"))),
    }
}

#[async_trait]
impl FleetApi for HttpFleetApi {
    async fn fetch_devices(&self) -> Result<Vec<Device>, CoreError> {
        let devices: Vec<Device> = self.get_json("/api/devices", "Device").await?;
        debug!("장치 {}개 조회", devices.len());
        Ok(devices)
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, CoreError> {
        let positions: Vec<Position> = self.get_json("/api/positions", "Position").await?;
        debug!("위치 {}개 조회", positions.len());
        Ok(positions)
    }

    async fn fetch_event(&self, event_id: i64) -> Result<Event, CoreError> {
        let path = format!("/api/events/{event_id}");
        self.get_json(&path, "Event").await
    }
}
