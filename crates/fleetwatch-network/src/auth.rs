//! 서버 세션 관리.
//!
//! `POST /api/session` 로그인으로 받은 세션 쿠키를 보관하고,
//! REST 요청과 소켓 핸드셰이크에 같은 쿠키를 주입한다.

use fleetwatch_core::error::CoreError;
use fleetwatch_core::models::session::User;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 소켓 엔드포인트 경로
const SOCKET_PATH: &str = "/api/socket";

/// 내부 세션 상태
#[derive(Debug, Clone)]
struct SessionState {
    /// `Cookie` 헤더 값 (예: "JSESSIONID=node0abc")
    cookie: String,
}

/// 세션 매니저 — 로그인/로그아웃/쿠키 보관
#[derive(Clone)]
pub struct SessionManager {
    base_url: String,
    client: reqwest::Client,
    state: Arc<RwLock<Option<SessionState>>>,
}

impl SessionManager {
    /// 새 세션 매니저 생성
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            state: Arc::new(RwLock::new(None)),
        })
    }

    /// 서버 기본 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 이메일/비밀번호 로그인
    pub async fn login(&self, email: &str, password: &str) -> Result<User, CoreError> {
        let url = format!("{}/api/session", self.base_url);
        let resp = self
            .client
            .post(&url)
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("로그인 요청 실패: {e}")))?;

        self.store_session(resp).await
    }

    /// 액세스 토큰 로그인 (`GET /api/session?token=`)
    pub async fn login_with_token(&self, token: &str) -> Result<User, CoreError> {
        let url = format!("{}/api/session", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("token", token)])
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("토큰 로그인 요청 실패: {e}")))?;

        self.store_session(resp).await
    }

    /// 로그인 응답 처리
    ///
    /// 자격 증명 거부(400/401/403)만 `Auth`로 보고, 서버 장애는 재시도 가능한 에러로 구분한다.
    async fn store_session(&self, resp: reqwest::Response) -> Result<User, CoreError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    CoreError::Auth(format!("로그인 거부 ({status}): {text}"))
                }
                StatusCode::SERVICE_UNAVAILABLE => {
                    CoreError::ServiceUnavailable(format!("로그인 서버 사용 불가: {text}"))
                }
                _ => CoreError::Internal(format!("로그인 실패 ({status}): {text}")),
            });
        }

        let cookie = session_cookie(resp.headers())
            .ok_or_else(|| CoreError::Auth("세션 쿠키 없음".to_string()))?;

        let user: User = resp
            .json()
            .await
            .map_err(|e| CoreError::Internal(format!("사용자 응답 파싱 실패: {e}")))?;

        info!("로그인 성공: user_id={}", user.id);
        *self.state.write().await = Some(SessionState { cookie });
        Ok(user)
    }

    /// 로그아웃 (`DELETE /api/session`)
    ///
    /// 서버 호출 실패와 무관하게 로컬 세션은 항상 제거한다.
    pub async fn logout(&self) -> Result<(), CoreError> {
        let previous = self.state.write().await.take();

        if let Some(session) = previous {
            let url = format!("{}/api/session", self.base_url);
            if let Err(e) = self
                .client
                .delete(&url)
                .header(COOKIE, &session.cookie)
                .send()
                .await
            {
                warn!("로그아웃 요청 실패: {e}");
            }
        }

        debug!("로그아웃 완료");
        Ok(())
    }

    /// 현재 인증 상태 확인
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// `Cookie` 헤더 값
    pub async fn cookie(&self) -> Result<String, CoreError> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.cookie.clone())
            .ok_or_else(|| CoreError::Auth("인증되지 않음".to_string()))
    }

    /// 실시간 소켓 URL (`http` → `ws`, `https` → `wss`)
    pub fn socket_url(&self) -> Result<String, CoreError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| CoreError::Config(format!("서버 URL 파싱 실패: {e}")))?;

        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(CoreError::Config(format!("지원하지 않는 스킴: {other}")));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| CoreError::Config("스킴 변경 실패".to_string()))?;

        let path = format!("{}{SOCKET_PATH}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url.to_string())
    }
}

/// `Set-Cookie` 헤더들에서 `name=value` 쌍만 모아 `Cookie` 헤더 값으로 만든다
fn session_cookie(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
