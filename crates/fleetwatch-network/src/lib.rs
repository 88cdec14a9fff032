//! # fleetwatch-network
//!
//! HTTP/WebSocket 네트워크 어댑터.
//! 서버 세션 로그인, REST 조회, `/api/socket` 실시간 연결을 담당한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use fleetwatch_network::auth::SessionManager;
//! use fleetwatch_network::http_client::HttpFleetApi;
//! use fleetwatch_network::ws_client::WsConnector;
//!
//! let session = Arc::new(SessionManager::new("https://gps.example.com", timeout)?);
//! session.login("admin", "admin").await?;
//! let api = HttpFleetApi::new(session.clone(), timeout)?;
//! let connector = WsConnector::new(session, Duration::from_secs(15));
//! ```

pub mod auth;
pub mod connectivity;
pub mod http_client;
pub mod ws_client;
