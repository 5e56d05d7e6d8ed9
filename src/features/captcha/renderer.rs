use std::time::Instant;

use tiny_skia::{Color, FillRule, Paint, Pixmap, Transform};
use tokio::task::spawn_blocking;

use super::font::FontFace;
use super::layout::{CaptchaLayout, LayoutPlan, plan_layout};
use crate::error::AppError;

/// 渲染验证码 PNG：白底画布、内置字体、黑色字形、等间距单行排布。
///
/// 任一步骤失败（字体解析、Face 构造、PNG 编码）都直接返回错误，不产生部分结果。
pub fn render_captcha_png(text: &str, layout: &CaptchaLayout) -> Result<Vec<u8>, AppError> {
    let t0 = Instant::now();

    let mut pixmap = Pixmap::new(layout.width, layout.height).ok_or_else(|| {
        AppError::FontFace(format!(
            "无法创建画布: {}x{}",
            layout.width, layout.height
        ))
    })?;
    pixmap.fill(Color::WHITE);

    let plan = {
        let face = FontFace::embedded(layout)?;
        let plan = plan_layout(text.chars().map(|ch| (ch, face.advance(ch))), layout);
        draw_plan(&mut pixmap, &face, &plan, layout.pixels_per_em());
        plan
    };
    let t_raster = t0.elapsed();

    let png = encode_png(&pixmap)?;
    let t_encode = t0.elapsed();

    tracing::debug!(
        chars = plan.placements.len(),
        total_width = plan.total_width,
        spacing = plan.spacing,
        "验证码渲染分段: 栅格化={:?}, 编码={:?}, 总计={:?}",
        t_raster,
        t_encode - t_raster,
        t_encode
    );

    Ok(png)
}

/// 异步版本：把栅格化与编码放入 Tokio 的阻塞线程池，避免阻塞异步运行时线程。
pub async fn render_captcha_png_async(
    text: String,
    layout: CaptchaLayout,
) -> Result<Vec<u8>, AppError> {
    spawn_blocking(move || render_captcha_png(&text, &layout)).await?
}

/// 按排布逐字填充字形。
///
/// 落笔点横坐标单调不减，一旦原点越过右边缘一个 em 以上，后续字形都不可能落在画布内，
/// 直接停止；超长文本只测量宽度，不再构造轮廓。
fn draw_plan(pixmap: &mut Pixmap, face: &FontFace<'_>, plan: &LayoutPlan, ppem: f32) {
    let mut paint = Paint::default();
    paint.set_color(Color::BLACK);
    paint.anti_alias = true;

    let cutoff = pixmap.width() as f32 + ppem;
    for placement in &plan.placements {
        if placement.x as f32 >= cutoff {
            break;
        }
        let Some(path) = face.outline(placement.ch, placement.x as f32, placement.y as f32)
        else {
            continue;
        };
        // 超出画布的部分由 tiny-skia 自行裁剪
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, AppError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut out = Vec::with_capacity((width * height) as usize);
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Default);
        encoder.set_filter(png::FilterType::Paeth);
        let mut writer = encoder.write_header()?;
        // 背景与字形均不透明，预乘 alpha 与直通 alpha 在这里等价
        writer.write_image_data(pixmap.data())?;
        writer.finish()?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn decode_rgba(bytes: &[u8]) -> (u32, u32, Vec<u8>) {
        let decoder = png::Decoder::new(bytes);
        let mut reader = decoder.read_info().expect("png header");
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).expect("png frame");
        buf.truncate(info.buffer_size());
        (info.width, info.height, buf)
    }

    fn dark_columns(rgba: &[u8], width: u32) -> Vec<u32> {
        let mut cols: Vec<u32> = rgba
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[0] < 128)
            .map(|(i, _)| i as u32 % width)
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    #[test]
    fn renders_fixed_size_png() {
        let png = render_captcha_png("QWER", &CaptchaLayout::default()).expect("render");
        assert!(png.starts_with(PNG_MAGIC));
        let (w, h, rgba) = decode_rgba(&png);
        assert_eq!((w, h), (200, 100));
        assert!(rgba.chunks_exact(4).any(|px| px[0] < 128), "no ink drawn");
        assert!(rgba.chunks_exact(4).all(|px| px[3] == 255), "canvas must stay opaque");
    }

    #[test]
    fn empty_text_is_blank_white() {
        let png = render_captcha_png("", &CaptchaLayout::default()).expect("render");
        let (w, h, rgba) = decode_rgba(&png);
        assert_eq!((w, h), (200, 100));
        assert!(rgba.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn whitespace_only_text_draws_nothing() {
        let png = render_captcha_png("   ", &CaptchaLayout::default()).expect("render");
        let (_, _, rgba) = decode_rgba(&png);
        assert!(rgba.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn output_is_deterministic() {
        let layout = CaptchaLayout::default();
        let a = render_captcha_png("XKCD", &layout).expect("render");
        let b = render_captcha_png("XKCD", &layout).expect("render");
        assert_eq!(a, b);
    }

    #[test]
    fn ink_starts_after_leading_spacing() {
        let layout = CaptchaLayout::default();
        let face = FontFace::embedded(&layout).expect("face");
        let plan = plan_layout("AB".chars().map(|c| (c, face.advance(c))), &layout);
        assert!(plan.spacing > 0);
        assert_eq!(plan.placements[0].x, plan.spacing);
        let between = plan.placements[1].x - (plan.placements[0].x + plan.placements[0].advance);
        assert_eq!(between, plan.spacing);
        let right = layout.width as i32 - (plan.placements[1].x + plan.placements[1].advance);
        assert!((right - plan.spacing).abs() <= 3, "right gap {right} vs {}", plan.spacing);

        let png = render_captcha_png("AB", &layout).expect("render");
        let (w, _, rgba) = decode_rgba(&png);
        let cols = dark_columns(&rgba, w);
        let first = *cols.first().expect("ink present");
        let last = *cols.last().expect("ink present");
        assert!(first + 2 >= plan.spacing as u32, "ink starts at {first}");
        assert!(last < plan.placements[1].x as u32 + plan.placements[1].advance as u32 + 2);
    }

    #[test]
    fn overflowing_text_still_renders_full_canvas() {
        let text = "W".repeat(30);
        let png = render_captcha_png(&text, &CaptchaLayout::default()).expect("render");
        let (w, h, rgba) = decode_rgba(&png);
        assert_eq!((w, h), (200, 100));
        // 间距为 0：字形从左边缘开始，并一直铺到右边缘
        let cols = dark_columns(&rgba, w);
        assert!(cols.first().is_some_and(|&c| c <= 2));
        assert!(cols.last().is_some_and(|&c| c >= 195));
    }

    #[test]
    fn glyphs_past_right_edge_do_not_change_output() {
        let layout = CaptchaLayout::default();
        let fits = render_captcha_png(&"W".repeat(30), &layout).expect("render");
        let long = render_captcha_png(&"W".repeat(20_000), &layout).expect("render");
        assert_eq!(fits, long);

        let mixed: String = "jW".repeat(5_000);
        let prefix: String = "jW".repeat(20);
        assert_eq!(
            render_captcha_png(&prefix, &layout).expect("render"),
            render_captcha_png(&mixed, &layout).expect("render")
        );
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        let layout = CaptchaLayout {
            width: 0,
            ..CaptchaLayout::default()
        };
        let err = render_captcha_png("A", &layout).expect_err("zero width");
        assert!(matches!(err, AppError::FontFace(_)));
    }

    #[tokio::test]
    async fn async_render_matches_sync() {
        let layout = CaptchaLayout::default();
        let sync = render_captcha_png("Rust", &layout).expect("render");
        let async_png = render_captcha_png_async("Rust".to_string(), layout)
            .await
            .expect("render");
        assert_eq!(sync, async_png);
    }
}
