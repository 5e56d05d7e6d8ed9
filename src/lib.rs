/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 优雅退出模块
pub mod shutdown;

/// request_id 中间件
pub mod request_id;

/// OpenAPI 文档
pub mod openapi;

/// 路由装配
pub mod app;

// 导出常用类型供外部使用
pub use app::build_app;
pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;
