//! 로그인 세션 모델.

use serde::{Deserialize, Serialize};

use super::Attributes;

/// 로그인한 사용자 (`POST /api/session` 응답)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub administrator: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub attributes: Attributes,
}
