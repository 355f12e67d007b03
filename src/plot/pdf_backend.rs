//! A Plotters drawing backend that paints onto one `printpdf` page layer.
//!
//! One backend pixel is one PDF point. Plotters' origin is top-left with `y`
//! growing downward, so every coordinate is flipped against the page height.
//!
//! Limitations:
//! - text always uses the built-in Helvetica font and sizes are estimated
//! - alpha is approximated by blending the colour with white (the page is white)

use std::convert::Infallible;

use plotters_backend::text_anchor::{HPos, VPos};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind, FontTransform,
};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{Color, IndirectFontRef, Line, Mm, PdfLayerReference, Point, Polygon, Pt, Rgb, TextMatrix};

/// Average glyph advance as a share of the font size (Helvetica is close to 0.5).
const GLYPH_WIDTH: f64 = 0.5;
/// Segments used to approximate circles.
const CIRCLE_SEGMENTS: usize = 24;

pub struct PdfBackend {
    layer: PdfLayerReference,
    font: IndirectFontRef,
    size: (u32, u32),
}

impl PdfBackend {
    /// `size` is the page size in points.
    pub fn new(layer: PdfLayerReference, font: IndirectFontRef, size: (u32, u32)) -> Self {
        Self { layer, font, size }
    }

    fn point(&self, (x, y): BackendCoord) -> Point {
        self.point_f(f64::from(x), f64::from(y))
    }

    fn point_f(&self, x: f64, y: f64) -> Point {
        Point {
            x: Pt(x as f32),
            y: Pt((f64::from(self.size.1) - y) as f32),
        }
    }

    fn stroke(&self, color: BackendColor, width: u32, points: Vec<Point>, closed: bool) {
        if color.alpha <= 0.0 || points.len() < 2 {
            return;
        }
        self.layer.set_outline_color(pdf_color(color));
        self.layer.set_outline_thickness(width.max(1) as f32);
        self.layer.add_line(Line {
            points: points.into_iter().map(|p| (p, false)).collect(),
            is_closed: closed,
        });
    }

    fn fill(&self, color: BackendColor, points: Vec<Point>) {
        if color.alpha <= 0.0 || points.len() < 3 {
            return;
        }
        self.layer.set_fill_color(pdf_color(color));
        self.layer.add_polygon(Polygon {
            rings: vec![points.into_iter().map(|p| (p, false)).collect()],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }
}

impl DrawingBackend for PdfBackend {
    type ErrorType = Infallible;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn draw_pixel(&mut self, point: BackendCoord, color: BackendColor) -> Result<(), DrawingErrorKind<Infallible>> {
        let (x, y) = (f64::from(point.0), f64::from(point.1));
        let square = vec![
            self.point_f(x, y),
            self.point_f(x + 1.0, y),
            self.point_f(x + 1.0, y + 1.0),
            self.point_f(x, y + 1.0),
        ];
        self.fill(color, square);
        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        self.stroke(style.color(), style.stroke_width(), vec![self.point(from), self.point(to)], false);
        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let corners = vec![
            self.point(upper_left),
            self.point((bottom_right.0, upper_left.1)),
            self.point(bottom_right),
            self.point((upper_left.0, bottom_right.1)),
        ];
        if fill {
            self.fill(style.color(), corners);
        } else {
            self.stroke(style.color(), style.stroke_width(), corners, true);
        }
        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let points = path.into_iter().map(|c| self.point(c)).collect();
        self.stroke(style.color(), style.stroke_width(), points, false);
        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let (cx, cy, r) = (f64::from(center.0), f64::from(center.1), f64::from(radius));
        let ring: Vec<Point> = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                self.point_f(cx + r * a.cos(), cy + r * a.sin())
            })
            .collect();
        if fill {
            self.fill(style.color(), ring);
        } else {
            self.stroke(style.color(), style.stroke_width(), ring, true);
        }
        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let points = vert.into_iter().map(|c| self.point(c)).collect();
        self.fill(style.color(), points);
        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let color = style.color();
        if text.is_empty() || color.alpha <= 0.0 {
            return Ok(());
        }
        let size = style.size();
        let (w, h) = text_extent(text, size);
        let anchor = style.anchor();
        let fx = match anchor.h_pos {
            HPos::Left => 0.0,
            HPos::Center => 0.5,
            HPos::Right => 1.0,
        };
        let fy = match anchor.v_pos {
            VPos::Top => 0.0,
            VPos::Center => 0.5,
            VPos::Bottom => 1.0,
        };
        let (x, y) = (f64::from(pos.0), f64::from(pos.1));

        // Baseline origin (pixel space) and rotation in degrees, counter-clockwise.
        let (origin, rotation) = match style.transform() {
            FontTransform::None => ((x - fx * w, y - fy * h + 0.8 * h), 0.0),
            FontTransform::Rotate90 => ((x - fx * h + 0.2 * h, y - fy * w), 270.0),
            FontTransform::Rotate180 => ((x + fx * w, y + fy * h - 0.8 * h), 180.0),
            FontTransform::Rotate270 => ((x - fx * h + 0.8 * h, y - fy * w + w), 90.0),
        };
        let origin = self.point_f(origin.0, origin.1);

        self.layer.set_fill_color(pdf_color(color));
        self.layer.begin_text_section();
        self.layer.set_font(&self.font, size as f32);
        self.layer
            .set_text_matrix(TextMatrix::TranslateRotate(origin.x, origin.y, rotation));
        self.layer.write_text(text, &self.font);
        self.layer.end_text_section();
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Infallible>> {
        let (w, h) = text_extent(text, style.size());
        Ok((w.ceil() as u32, h.ceil() as u32))
    }
}

/// Approximate `(width, height)` of unrotated text in points.
fn text_extent(text: &str, size: f64) -> (f64, f64) {
    (text.chars().count() as f64 * size * GLYPH_WIDTH, size)
}

fn pdf_color(color: BackendColor) -> Color {
    let alpha = color.alpha.clamp(0.0, 1.0);
    let blend = |v: u8| ((f64::from(v) * alpha + 255.0 * (1.0 - alpha)) / 255.0) as f32;
    let (r, g, b) = color.rgb;
    Color::Rgb(Rgb::new(blend(r), blend(g), blend(b), None))
}

/// Convert a size in points to the millimetres `printpdf` page APIs take.
pub fn pt_to_mm(points: u32) -> Mm {
    Mm::from(Pt(points as f32))
}
