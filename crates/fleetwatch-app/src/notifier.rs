//! 콘솔 알림 — `Notifier` 포트 구현.

use async_trait::async_trait;
use fleetwatch_core::error::CoreError;
use fleetwatch_core::ports::notifier::Notifier;
use std::io::Write;
use tracing::info;

/// 터미널 알림 (tracing 로그 + 벨 문자)
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn show_notification(&self, title: &str, body: &str) -> Result<(), CoreError> {
        info!(target: "fleetwatch::notify", "🔔 {title}: {body}");
        Ok(())
    }

    async fn play_sound(&self) -> Result<(), CoreError> {
        let mut stdout = std::io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}
