use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::{AuthUser, UserRole},
};

/// 认证服务。会话由外部认证服务签发,这里只校验令牌并还原调用者身份
#[derive(Clone)]
pub struct AuthService {
    config: Config,
}

/// 外部认证服务签发的令牌声明
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthUser> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_ref());
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                let claims = token_data.claims;
                debug!("Token verified for user: {}", claims.sub);
                Ok(AuthUser {
                    id: claims.sub,
                    username: claims.username,
                    first_name: claims.first_name,
                    last_name: claims.last_name,
                    avatar_url: claims.avatar_url,
                    role: claims.role,
                })
            }
            Err(e) => {
                warn!("Token verification failed: {}", e);
                Err(AppError::Authentication("Invalid token".to_string()))
            }
        }
    }
}
