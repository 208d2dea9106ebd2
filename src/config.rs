use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Authentication configuration
    // 令牌由外部认证服务签发,这里只保存校验密钥
    pub jwt_secret: String,

    // Content settings
    pub max_images_per_post: usize,
    pub max_image_payload_bytes: usize,

    // Rate limiting
    pub rate_limit_requests: u32,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,

            max_images_per_post: env::var("MAX_IMAGES_PER_POST")
                .unwrap_or_else(|_| "6".to_string())
                .parse()?,
            max_image_payload_bytes: env::var("MAX_IMAGE_PAYLOAD_BYTES")
                .unwrap_or_else(|_| "5242880".to_string())
                .parse()?,

            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            jwt_secret: "campus-feed-dev-secret".to_string(),
            max_images_per_post: 6,
            max_image_payload_bytes: 5 * 1024 * 1024,
            rate_limit_requests: 300,
            cors_allowed_origins: "http://localhost:3001".to_string(),
        }
    }
}
