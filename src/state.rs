use std::sync::Arc;

use crate::config::AppConfig;
use crate::features::captcha::CaptchaService;

/// 口令下发端点的运行期设置
#[derive(Debug, Clone)]
pub struct ChallengeSettings {
    pub enabled: bool,
    pub length: usize,
    /// 口令图片地址的基础部分（不含查询串）
    pub endpoint: String,
}

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub captcha: Arc<CaptchaService>,
    pub challenge: ChallengeSettings,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        let endpoint = config
            .captcha
            .public_endpoint
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("{}/captcha.png", config.api.prefix));

        Self {
            captcha: Arc::new(CaptchaService::from_config(&config.captcha)),
            challenge: ChallengeSettings {
                enabled: config.captcha.challenge_enabled,
                length: config.captcha.challenge_length,
                endpoint,
            },
        }
    }
}
