//! 취소 가능한 재연결 타이머.
//!
//! 한 번에 하나의 예약만 유지한다. 새 예약은 이전 예약을 중단시키고,
//! 이미 발화해 큐에 들어간 메시지는 토큰 비교로 걸러낸다.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// 재연결 타이머 핸들
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    handle: Option<JoinHandle<()>>,
    /// 마지막 예약 토큰
    token: u64,
}

impl ReconnectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `delay` 후 `message(token)`을 `tx`로 보내도록 예약
    ///
    /// 대기 중인 예약이 있으면 먼저 취소한다. 새 토큰을 반환한다.
    pub fn schedule<M, F>(
        &mut self,
        delay: Duration,
        tx: mpsc::UnboundedSender<M>,
        message: F,
    ) -> u64
    where
        M: Send + 'static,
        F: FnOnce(u64) -> M + Send + 'static,
    {
        self.cancel();
        self.token += 1;
        let token = self.token;
        let deadline = tokio::time::Instant::now() + delay;

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(message(token));
        }));

        debug!("재연결 예약: {delay:?} 후 (token={token})");
        token
    }

    /// 대기 중인 예약 취소. 취소한 예약이 있었으면 true
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug!("재연결 예약 취소 (token={})", self.token);
                true
            }
            None => false,
        }
    }

    /// 대기 중인 예약 여부
    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }

    /// 발화 메시지 수신 처리
    ///
    /// 현재 예약의 토큰이면 예약을 해제하고 true, 취소됐거나 대체된 예약이면 false.
    pub fn fire(&mut self, token: u64) -> bool {
        if self.handle.is_some() && token == self.token {
            self.handle = None;
            true
        } else {
            false
        }
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
