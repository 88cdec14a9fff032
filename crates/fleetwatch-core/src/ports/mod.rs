//! 포트 인터페이스 (trait).
//!
//! 각 어댑터 crate가 이 trait들을 구현하며,
//! `fleetwatch-app`에서 `Arc<dyn T>`로 와이어링한다.
//! 컨트롤러 테스트는 같은 trait의 인메모리 구현을 사용한다.
//!
//! 모든 async trait은 `async_trait` 매크로를 사용하여
//! object safety를 보장한다.

pub mod fleet_api;
pub mod navigator;
pub mod notifier;
pub mod socket;
