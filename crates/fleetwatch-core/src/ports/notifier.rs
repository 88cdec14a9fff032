//! 이벤트 알림 포트.
//!
//! 구현: `fleetwatch-app` crate (콘솔 알림)

use async_trait::async_trait;

use crate::error::CoreError;

/// 사용자 알림 인터페이스
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 일반 알림 표시 (제목 + 본문)
    async fn show_notification(&self, title: &str, body: &str) -> Result<(), CoreError>;

    /// 알림음 재생
    async fn play_sound(&self) -> Result<(), CoreError>;
}
