/// 验证码渲染
pub mod captcha;

/// 健康检查
pub mod health;
