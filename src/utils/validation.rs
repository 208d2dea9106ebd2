use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, Result};

/// data URL 前缀,例如 `data:image/png;base64,`
static DATA_URL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:image/[a-zA-Z0-9.+-]+;base64,").expect("valid regex"));

/// 校验一组帖子图片负载。
///
/// 图片在这里是不透明的 base64 负载,不做任何解码后的图像处理,
/// 只检查数量、形态和大小上限
pub fn validate_image_payloads(images: &[String], max_count: usize, max_bytes: usize) -> Result<()> {
    if images.len() > max_count {
        return Err(AppError::Validation(format!(
            "A post can carry at most {} images",
            max_count
        )));
    }

    for (index, payload) in images.iter().enumerate() {
        validate_image_payload(payload, max_bytes).map_err(|e| {
            AppError::Validation(format!("Image {} is invalid: {}", index + 1, e))
        })?;
    }

    Ok(())
}

fn validate_image_payload(payload: &str, max_bytes: usize) -> std::result::Result<(), String> {
    let encoded = DATA_URL_PREFIX.replace(payload, "");
    let encoded = encoded.trim();

    if encoded.is_empty() {
        return Err("empty payload".to_string());
    }

    let decoded = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|_| "payload is not valid base64".to_string())?;

    if decoded.len() > max_bytes {
        return Err(format!("payload exceeds {} bytes", max_bytes));
    }

    Ok(())
}
