use tiny_skia::{Path, PathBuilder};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::layout::CaptchaLayout;
use crate::error::AppError;

/// 随二进制一同编译进来的字体（DejaVu Sans），进程内只读共享。
pub static FONT_ASSET: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSans.ttf");

/// 绑定了字号与分辨率的字体 Face。
///
/// 每次渲染单独解析，借用 `'static` 字体数据，不跨调用共享；离开作用域即释放。
pub struct FontFace<'a> {
    face: Face<'a>,
    /// font units -> 像素
    scale: f32,
}

impl<'a> FontFace<'a> {
    pub fn parse(data: &'a [u8], layout: &CaptchaLayout) -> Result<Self, AppError> {
        let face = Face::parse(data, 0)?;

        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(AppError::FontFace("units_per_em 为 0".to_string()));
        }
        let ppem = layout.pixels_per_em();
        if !ppem.is_finite() || ppem <= 0.0 {
            return Err(AppError::FontFace(format!(
                "字号/DPI 组合非法: size={}, dpi={}",
                layout.font_size, layout.dpi
            )));
        }

        Ok(Self {
            face,
            scale: ppem / f32::from(units_per_em),
        })
    }

    /// 字体缺字时回退到 `.notdef`（glyph 0）
    fn glyph_id(&self, ch: char) -> GlyphId {
        self.face.glyph_index(ch).unwrap_or(GlyphId(0))
    }

    /// 字符的水平前进宽度（像素，未取整）
    pub fn advance(&self, ch: char) -> f32 {
        let units = self.face.glyph_hor_advance(self.glyph_id(ch)).unwrap_or(0);
        f32::from(units) * self.scale
    }

    /// 以 `(origin_x, origin_y)` 为基线原点生成字形轮廓（设备坐标，y 轴向下）。
    ///
    /// 空白等无轮廓字形返回 `None`。
    pub fn outline(&self, ch: char, origin_x: f32, origin_y: f32) -> Option<Path> {
        let mut builder = GlyphPathBuilder::new(origin_x, origin_y, self.scale);
        self.face.outline_glyph(self.glyph_id(ch), &mut builder)?;
        builder.finish()
    }
}

impl FontFace<'static> {
    /// 从内置字体构造
    pub fn embedded(layout: &CaptchaLayout) -> Result<Self, AppError> {
        Self::parse(FONT_ASSET, layout)
    }
}

/// 把 font units（y 轴向上）的轮廓转换为像素坐标（y 轴向下）的 tiny-skia 路径
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
