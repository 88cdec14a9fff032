//! # fleetwatch-app
//!
//! 차량 관제 실시간 클라이언트.
//! 소켓 컨트롤러, 상태 저장소, 이벤트 알림, 세션 감독, 라이프사이클 관리.

pub mod event_bus;
pub mod lifecycle;
pub mod notification_manager;
pub mod notifier;
pub mod reconnect_timer;
pub mod socket_controller;
pub mod store;
pub mod supervisor;
