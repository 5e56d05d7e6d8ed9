//! 字形排布：测量总宽、计算等间距、生成逐字符的基线坐标。
//!
//! 本模块只做整数像素上的算术，不依赖具体字体；测量结果由调用方以
//! `(char, advance_px)` 序列传入，便于在没有字体的情况下验证边界行为。

use serde::{Deserialize, Serialize};

/// 画布宽度（像素）
pub const CANVAS_WIDTH: u32 = 200;
/// 画布高度（像素）
pub const CANVAS_HEIGHT: u32 = 100;
/// 字号
pub const FONT_SIZE: f32 = 24.0;
/// 渲染分辨率
pub const FONT_DPI: f32 = 72.0;

/// 一次渲染使用的布局参数（默认即固定常量）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CaptchaLayout {
    pub width: u32,
    pub height: u32,
    pub font_size: f32,
    pub dpi: f32,
}

impl Default for CaptchaLayout {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            font_size: FONT_SIZE,
            dpi: FONT_DPI,
        }
    }
}

impl CaptchaLayout {
    /// 每 em 对应的像素数（字号按 72 DPI 为 1pt = 1px 换算）
    pub fn pixels_per_em(&self) -> f32 {
        self.font_size * self.dpi / 72.0
    }

    /// 单行文本的基线纵坐标：`(H + floor(fontSize)) / 2`
    pub fn baseline_y(&self) -> i32 {
        (self.height as i32 + self.font_size.floor() as i32) / 2
    }
}

/// 单个字符的落笔位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphPlacement {
    pub ch: char,
    /// 基线原点横坐标
    pub x: i32,
    /// 基线纵坐标
    pub y: i32,
    /// 该字符自身宽度（向上取整）
    pub advance: i32,
}

/// 整串文本的排布结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    /// 整串文本宽度（各字符前进宽度之和，向上取整）
    pub total_width: i32,
    /// 字符之间（以及首尾两侧）的统一间距，溢出时为 0
    pub spacing: i32,
    pub placements: Vec<GlyphPlacement>,
}

/// 计算统一间距：`(W - totalTextWidth) / (N + 1)`，整数除法向零截断。
///
/// 文本宽度超过画布时结果为负，此处钳制为 0：字形首尾相接从 x=0 开始，
/// 超出右边界的部分由栅格化器裁剪。
pub fn compute_spacing(canvas_width: u32, total_text_width: i32, char_count: usize) -> i32 {
    let divisor = char_count as i64 + 1;
    let spare = i64::from(canvas_width) - i64::from(total_text_width);
    let spacing = (spare / divisor).max(0);
    i32::try_from(spacing).unwrap_or(i32::MAX)
}

fn ceil_px(v: f32) -> i32 {
    if v.is_finite() && v > 0.0 {
        v.ceil() as i32
    } else {
        0
    }
}

/// 根据逐字符前进宽度（像素，未取整）生成排布计划
pub fn plan_layout<I>(advances: I, layout: &CaptchaLayout) -> LayoutPlan
where
    I: IntoIterator<Item = (char, f32)>,
{
    let measured: Vec<(char, f32)> = advances.into_iter().collect();

    let total_width = ceil_px(measured.iter().map(|(_, adv)| adv.max(0.0)).sum());
    let spacing = compute_spacing(layout.width, total_width, measured.len());
    let y = layout.baseline_y();

    let mut x = spacing;
    let mut placements = Vec::with_capacity(measured.len());
    for (ch, adv) in measured {
        let advance = ceil_px(adv);
        placements.push(GlyphPlacement { ch, x, y, advance });
        x = x.saturating_add(advance).saturating_add(spacing);
    }

    LayoutPlan {
        total_width,
        spacing,
        placements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_divides_by_one_and_places_nothing() {
        let plan = plan_layout(std::iter::empty(), &CaptchaLayout::default());
        assert_eq!(plan.total_width, 0);
        assert_eq!(plan.spacing, 200);
        assert!(plan.placements.is_empty());
    }

    #[test]
    fn baseline_is_centered_on_font_size() {
        assert_eq!(CaptchaLayout::default().baseline_y(), 62);
        let odd = CaptchaLayout {
            height: 51,
            font_size: 10.9,
            ..CaptchaLayout::default()
        };
        assert_eq!(odd.baseline_y(), 30);
    }

    #[test]
    fn two_glyphs_get_equal_gaps() {
        // 20 + 20 = 40，(200 - 40) / 3 = 53
        let plan = plan_layout([('A', 20.0), ('B', 20.0)], &CaptchaLayout::default());
        assert_eq!(plan.spacing, 53);
        assert_eq!(plan.placements[0].x, 53);
        assert_eq!(plan.placements[1].x, 53 + 20 + 53);
        let right_gap = 200 - (plan.placements[1].x + plan.placements[1].advance);
        assert_eq!(right_gap, 54);
    }

    #[test]
    fn total_width_rounds_the_sum_not_each_glyph() {
        let plan = plan_layout([('i', 4.3), ('l', 4.3)], &CaptchaLayout::default());
        assert_eq!(plan.total_width, 9);
        assert_eq!(plan.placements[0].advance, 5);
        assert_eq!(plan.placements[1].advance, 5);
    }

    #[test]
    fn overflow_clamps_spacing_to_zero() {
        assert_eq!(compute_spacing(200, 201, 0), 0);
        assert_eq!(compute_spacing(200, 500, 10), 0);

        let wide: Vec<(char, f32)> = std::iter::repeat(('W', 23.7)).take(30).collect();
        let plan = plan_layout(wide, &CaptchaLayout::default());
        assert!(plan.total_width > 200);
        assert_eq!(plan.spacing, 0);
        assert_eq!(plan.placements[0].x, 0);
        assert_eq!(plan.placements[1].x, 24);
    }

    #[test]
    fn spacing_never_increases_with_length() {
        let mut prev = i32::MAX;
        for n in 0..40 {
            let spacing = compute_spacing(200, n * 13, n as usize);
            assert!(spacing <= prev, "n={n}: {spacing} > {prev}");
            prev = spacing;
        }
    }

    #[test]
    fn placements_are_left_to_right() {
        let plan = plan_layout(
            "HELLO world".chars().map(|c| (c, if c == ' ' { 7.6 } else { 14.2 })),
            &CaptchaLayout::default(),
        );
        let order: String = plan.placements.iter().map(|p| p.ch).collect();
        assert_eq!(order, "HELLO world");
        assert!(plan.placements.windows(2).all(|w| w[0].x <= w[1].x));
        assert!(plan.placements.iter().all(|p| p.y == 62));
    }

    #[test]
    fn negative_or_nan_advances_count_as_zero() {
        let plan = plan_layout([('a', f32::NAN), ('b', -3.0)], &CaptchaLayout::default());
        assert_eq!(plan.total_width, 0);
        assert!(plan.placements.iter().all(|p| p.advance == 0));
    }
}
