pub mod challenge;
mod font;
pub mod handler;
mod layout;
mod renderer;
mod service;
mod types;

pub use font::{FONT_ASSET, FontFace};
pub use handler::{create_captcha_router, handle_proxy_request};
pub use layout::{
    CANVAS_HEIGHT, CANVAS_WIDTH, CaptchaLayout, FONT_DPI, FONT_SIZE, GlyphPlacement, LayoutPlan,
    compute_spacing, plan_layout,
};
pub use renderer::{render_captcha_png, render_captcha_png_async};
pub use service::CaptchaService;
pub use types::{BASE64_FLAG_HEADER, CaptchaQuery, ChallengeResponse, ProxyRequest, ProxyResponse};
