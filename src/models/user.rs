use serde::{Deserialize, Serialize};

/// 经过认证的调用者身份,由外部认证服务随令牌下发
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Member,
    Moderator,
}

impl AuthUser {
    /// 姓和名都填写过,资料才算完整;发帖和评论都要求完整资料
    pub fn has_complete_profile(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());
        filled(&self.first_name) && filled(&self.last_name)
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.trim().is_empty() && !last.trim().is_empty() => {
                format!("{} {}", first.trim(), last.trim())
            }
            _ => self.username.clone(),
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.role == UserRole::Moderator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, last: Option<&str>) -> AuthUser {
        AuthUser {
            id: "u1".to_string(),
            username: "u1".to_string(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            avatar_url: None,
            role: UserRole::Member,
        }
    }

    #[test]
    fn test_profile_completeness() {
        assert!(user(Some("Ada"), Some("Liu")).has_complete_profile());
        assert!(!user(Some("Ada"), None).has_complete_profile());
        assert!(!user(None, Some("Liu")).has_complete_profile());
        // 空白字符串不算填写
        assert!(!user(Some("  "), Some("Liu")).has_complete_profile());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(user(Some("Ada"), Some("Liu")).display_name(), "Ada Liu");
        assert_eq!(user(Some("Ada"), None).display_name(), "u1");
    }
}
