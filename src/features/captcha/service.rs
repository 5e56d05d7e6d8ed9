use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use moka::future::Cache;
use tokio::sync::Semaphore;

use super::layout::CaptchaLayout;
use super::renderer::render_captcha_png_async;
use super::types::{ProxyRequest, ProxyResponse};
use crate::config::CaptchaConfig;
use crate::error::AppError;

/// 验证码渲染服务：限制并发渲染数，并可选地缓存渲染结果。
///
/// 渲染输出对给定文本是确定的，因此缓存命中与重新渲染返回的字节完全一致。
/// 缓存键只取文本本身：一个服务实例只对应一套布局参数。
/// 条目权重为键长与 PNG 字节数之和，`cache_max_bytes` 同时约束两者。
#[derive(Clone)]
pub struct CaptchaService {
    layout: CaptchaLayout,
    render_semaphore: Arc<Semaphore>,
    cache: Option<Cache<String, Bytes>>,
}

impl CaptchaService {
    pub fn new(layout: CaptchaLayout, max_parallel: usize, cache: Option<Cache<String, Bytes>>) -> Self {
        Self {
            layout,
            render_semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
            cache,
        }
    }

    pub fn from_config(cfg: &CaptchaConfig) -> Self {
        let cache = cfg.cache_enabled.then(|| {
            Cache::builder()
                .weigher(|k: &String, v: &Bytes| entry_weight(k, v))
                .max_capacity(cfg.cache_max_bytes)
                .time_to_live(Duration::from_secs(cfg.cache_ttl_secs))
                .time_to_idle(Duration::from_secs(cfg.cache_tti_secs))
                .build()
        });
        Self::new(cfg.layout(), cfg.effective_parallelism(), cache)
    }

    /// 渲染（或从缓存取出）文本对应的 PNG
    pub async fn render_png(&self, text: &str) -> Result<Bytes, AppError> {
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(text).await
        {
            tracing::debug!(len = text.chars().count(), "验证码缓存命中");
            return Ok(hit);
        }

        let _permit = self
            .render_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("获取渲染许可失败: {e}")))?;

        let bytes = Bytes::from(render_captcha_png_async(text.to_string(), self.layout).await?);

        if let Some(cache) = &self.cache {
            cache.insert(text.to_string(), bytes.clone()).await;
            tracing::debug!(len = text.chars().count(), png_bytes = bytes.len(), "验证码缓存写入");
        }
        Ok(bytes)
    }

    /// 渲染并封装为网关响应信封
    pub async fn render_envelope(&self, text: &str) -> Result<ProxyResponse, AppError> {
        let png = self.render_png(text).await?;
        Ok(ProxyResponse::png(&png))
    }

    /// 处理网关事件：与 [`handle_proxy_request`](super::handle_proxy_request) 取同一个 `text`，
    /// 但经过并发许可与缓存。
    pub async fn handle_proxy_request(&self, req: &ProxyRequest) -> Result<ProxyResponse, AppError> {
        self.render_envelope(req.text()).await
    }
}

fn entry_weight(key: &str, png: &[u8]) -> u32 {
    u32::try_from(key.len().saturating_add(png.len())).unwrap_or(u32::MAX)
}
