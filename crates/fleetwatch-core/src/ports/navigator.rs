//! 로그인 화면 전환 포트.

/// 인증 만료 시 로그인 흐름으로 이동시키는 대상
pub trait LoginRedirect: Send + Sync {
    /// 로그인 흐름으로 이동 (재인증 필요)
    fn redirect_to_login(&self);
}
