//! 调用方上下文
//!
//! 由身份协作方（网关）注入的已认证用户及其冗余资料。

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: Uuid,
    pub name: String,
    pub neighborhood: String,
    pub verified: bool,
    pub avatar: Option<String>,
}

impl CallerContext {
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        neighborhood: impl Into<String>,
        verified: bool,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            neighborhood: neighborhood.into(),
            verified,
            avatar: None,
        }
    }
}

impl From<&super::User> for CallerContext {
    fn from(user: &super::User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            neighborhood: user.neighborhood.clone(),
            verified: user.verified,
            avatar: user.avatar.clone(),
        }
    }
}
