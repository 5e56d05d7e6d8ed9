use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::features::captcha::CaptchaLayout;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        3000
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 存在时以 RUST_LOG 为准）
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    /// 由配置级别生成默认的 EnvFilter 指令
    pub fn default_directives(&self) -> String {
        format!("captcha_render={0},tower_http={0}", self.level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    #[serde(default = "ApiConfig::default_prefix")]
    pub prefix: String,
}

impl ApiConfig {
    fn default_prefix() -> String {
        "/api/v1".to_string()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
        }
    }
}

/// 验证码渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    /// 画布宽度（像素）
    #[serde(default = "CaptchaConfig::default_width")]
    pub width: u32,
    /// 画布高度（像素）
    #[serde(default = "CaptchaConfig::default_height")]
    pub height: u32,
    /// 字号
    #[serde(default = "CaptchaConfig::default_font_size")]
    pub font_size: f32,
    /// 渲染分辨率
    #[serde(default = "CaptchaConfig::default_dpi")]
    pub dpi: f32,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 是否缓存已渲染的 PNG（输出确定，命中与重新渲染字节一致）
    #[serde(default = "CaptchaConfig::default_cache_enabled")]
    pub cache_enabled: bool,
    /// 缓存最大容量（字节），按 PNG 字节大小加权
    #[serde(default = "CaptchaConfig::default_cache_max_bytes")]
    pub cache_max_bytes: u64,
    /// 缓存 TTL（秒）
    #[serde(default = "CaptchaConfig::default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// 缓存 TTI（秒）
    #[serde(default = "CaptchaConfig::default_cache_tti")]
    pub cache_tti_secs: u64,
    /// 是否开放口令下发端点（仅供受信任的 bot 后端调用）
    #[serde(default)]
    pub challenge_enabled: bool,
    /// 口令长度
    #[serde(default = "CaptchaConfig::default_challenge_length")]
    pub challenge_length: usize,
    /// 对外可访问的图片地址（为空时使用本服务的相对路径）
    #[serde(default)]
    pub public_endpoint: Option<String>,
}

impl CaptchaConfig {
    fn default_width() -> u32 {
        crate::features::captcha::CANVAS_WIDTH
    }
    fn default_height() -> u32 {
        crate::features::captcha::CANVAS_HEIGHT
    }
    fn default_font_size() -> f32 {
        crate::features::captcha::FONT_SIZE
    }
    fn default_dpi() -> f32 {
        crate::features::captcha::FONT_DPI
    }
    fn default_cache_enabled() -> bool {
        true
    }
    fn default_cache_max_bytes() -> u64 {
        16 * 1024 * 1024
    }
    fn default_cache_ttl() -> u64 {
        300
    }
    fn default_cache_tti() -> u64 {
        60
    }
    fn default_challenge_length() -> usize {
        crate::features::captcha::challenge::DEFAULT_CIPHER_LEN
    }

    /// 转换为渲染使用的布局参数
    pub fn layout(&self) -> CaptchaLayout {
        CaptchaLayout {
            width: self.width,
            height: self.height,
            font_size: self.font_size,
            dpi: self.dpi,
        }
    }

    /// 实际并发渲染许可数
    pub fn effective_parallelism(&self) -> usize {
        match self.max_parallel {
            0 => num_cpus::get(),
            n => n as usize,
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            font_size: Self::default_font_size(),
            dpi: Self::default_dpi(),
            max_parallel: 0,
            cache_enabled: Self::default_cache_enabled(),
            cache_max_bytes: Self::default_cache_max_bytes(),
            cache_ttl_secs: Self::default_cache_ttl(),
            cache_tti_secs: Self::default_cache_tti(),
            challenge_enabled: false,
            challenge_length: Self::default_challenge_length(),
            public_endpoint: None,
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// 验证码渲染配置
    #[serde(default)]
    pub captcha: CaptchaConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    ///
    /// 配置文件可缺省；缺省时全部字段取内置默认值。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            // 支持环境变量覆盖，例如：APP_SERVER__PORT=8080、APP_CAPTCHA__CACHE_ENABLED=false
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;
        config.validate()?;

        tracing::debug!("配置加载完成: {:?}", config);

        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径（APP_CONFIG 可覆盖）
    fn get_config_path() -> PathBuf {
        std::env::var_os("APP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.captcha;
        if c.width == 0 || c.height == 0 {
            return Err(ConfigError::Message(format!(
                "captcha 画布尺寸非法: {}x{}",
                c.width, c.height
            )));
        }
        if !c.font_size.is_finite() || c.font_size <= 0.0 {
            return Err(ConfigError::Message(format!(
                "captcha.font_size 必须为正数: {}",
                c.font_size
            )));
        }
        if !c.dpi.is_finite() || c.dpi <= 0.0 {
            return Err(ConfigError::Message(format!(
                "captcha.dpi 必须为正数: {}",
                c.dpi
            )));
        }
        let prefix = &self.api.prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(ConfigError::Message(format!(
                "api.prefix 必须以 / 开头、不以 / 结尾且不能为根路径: {}",
                self.api.prefix
            )));
        }
        Ok(())
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
