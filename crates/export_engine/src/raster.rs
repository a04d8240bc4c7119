use image::RgbImage;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform,
};

use export_logging::export_debug;

use crate::fonts::FontBook;
use crate::layout::{DisplayItem, DisplayList, ImageSource};
use crate::style::Color;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RasterError {
    #[error("canvas tainted by cross-origin image {0}")]
    TaintedCanvas(String),
    #[error("unsupported embedded resource {0}")]
    UnsupportedResource(String),
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
}

/// Turns a laid-out surface into an opaque bitmap.
#[async_trait::async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(
        &self,
        list: &DisplayList,
        fonts: &dyn FontBook,
        scale: f32,
    ) -> Result<RgbImage, RasterError>;
}

/// CPU rasterizer painting the display list with tiny-skia.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkiaRasterizer;

#[async_trait::async_trait]
impl Rasterizer for SkiaRasterizer {
    async fn rasterize(
        &self,
        list: &DisplayList,
        fonts: &dyn FontBook,
        scale: f32,
    ) -> Result<RgbImage, RasterError> {
        paint(list, fonts, scale)
    }
}

fn paint(list: &DisplayList, fonts: &dyn FontBook, scale: f32) -> Result<RgbImage, RasterError> {
    let width = (list.width * scale).ceil().max(1.0) as u32;
    let height = (list.height * scale).ceil().max(1.0) as u32;
    let mut canvas = Pixmap::new(width, height).ok_or(RasterError::Canvas { width, height })?;
    canvas.fill(tiny_skia::Color::WHITE);

    let transform = Transform::from_scale(scale, scale);
    for item in &list.items {
        match item {
            DisplayItem::Rect {
                x,
                y,
                width,
                height,
                color,
            } => {
                if let Some(rect) = Rect::from_xywh(*x, *y, *width, *height) {
                    canvas.fill_rect(rect, &solid(*color), transform, None);
                }
            }
            DisplayItem::Text {
                x,
                baseline,
                text,
                face,
                size,
                color,
            } => {
                if let Some(path) = fonts.outline(text, *face, *size, *x, *baseline) {
                    canvas.fill_path(&path, &solid(*color), FillRule::Winding, transform, None);
                }
            }
            DisplayItem::Image {
                x,
                y,
                width,
                height,
                source,
            } => {
                let image = match source {
                    ImageSource::Decoded(image) => image,
                    ImageSource::CrossOrigin(src) => {
                        return Err(RasterError::TaintedCanvas(src.clone()))
                    }
                    ImageSource::Unsupported(src) => {
                        return Err(RasterError::UnsupportedResource(src.clone()))
                    }
                };
                let Some(pixels) = premultiplied(image) else {
                    continue;
                };
                let placement = Transform::from_row(
                    width / image.width() as f32,
                    0.0,
                    0.0,
                    height / image.height() as f32,
                    *x,
                    *y,
                )
                .post_concat(transform);
                let paint = PixmapPaint {
                    quality: FilterQuality::Bilinear,
                    ..PixmapPaint::default()
                };
                canvas.draw_pixmap(0, 0, pixels.as_ref(), &paint, placement, None);
            }
        }
    }

    export_debug!("rasterized {} items onto {width}x{height}", list.items.len());
    Ok(flatten(&canvas))
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = true;
    paint
}

fn premultiplied(image: &image::RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (target, source) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = source.0;
        *target = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Drops alpha; the canvas is opaque white underneath everything.
fn flatten(canvas: &Pixmap) -> RgbImage {
    let mut raw = Vec::with_capacity(canvas.pixels().len() * 3);
    for pixel in canvas.pixels() {
        let color = pixel.demultiply();
        raw.extend_from_slice(&[color.red(), color.green(), color.blue()]);
    }
    RgbImage::from_raw(canvas.width(), canvas.height(), raw)
        .unwrap_or_else(|| RgbImage::new(canvas.width(), canvas.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FaceKey, FallbackFontBook};

    fn list(items: Vec<DisplayItem>) -> DisplayList {
        DisplayList {
            width: 20.0,
            height: 10.0,
            items,
        }
    }

    #[tokio::test]
    async fn canvas_is_scaled_and_opaque() {
        let canvas = SkiaRasterizer
            .rasterize(&list(Vec::new()), &FallbackFontBook, 2.0)
            .await
            .unwrap();
        assert_eq!(canvas.dimensions(), (40, 20));
        assert_eq!(canvas.get_pixel(5, 5).0, [255, 255, 255]);
    }

    #[tokio::test]
    async fn text_paints_dark_pixels() {
        let text = DisplayItem::Text {
            x: 0.0,
            baseline: 9.0,
            text: "MM".into(),
            face: FaceKey::default(),
            size: 10.0,
            color: Color::FOREGROUND,
        };
        let canvas = SkiaRasterizer
            .rasterize(&list(vec![text]), &FallbackFontBook, 1.0)
            .await
            .unwrap();
        assert!(canvas.pixels().any(|p| p.0[0] < 128));
    }

    #[tokio::test]
    async fn cross_origin_image_taints_canvas() {
        let image = DisplayItem::Image {
            x: 0.0,
            y: 0.0,
            width: 4.0,
            height: 4.0,
            source: ImageSource::CrossOrigin("https://cdn.example.com/a.png".into()),
        };
        let err = SkiaRasterizer
            .rasterize(&list(vec![image]), &FallbackFontBook, 1.0)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RasterError::TaintedCanvas("https://cdn.example.com/a.png".into())
        );
    }
}
