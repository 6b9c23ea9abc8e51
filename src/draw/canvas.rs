use core::convert::Infallible;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Point, Size};
use image::{Rgba, RgbaImage};

/// RGBA working buffer the composer and the chart draw on
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Fully transparent, so untouched pixels come out white after binarization
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn filled(width: u32, height: u32, color: Rgb888) -> Self {
        let fill = Rgba([color.r(), color.g(), color.b(), u8::MAX]);
        Self {
            image: RgbaImage::from_pixel(width, height, fill),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    fn index(&self, point: Point) -> Option<(u32, u32)> {
        let x = u32::try_from(point.x).ok()?;
        let y = u32::try_from(point.y).ok()?;
        (x < self.image.width() && y < self.image.height()).then_some((x, y))
    }

    /// Paint `color` over the pixel with `coverage` as its opacity. Points off the canvas
    /// are ignored.
    pub fn blend(&mut self, point: Point, color: Rgb888, coverage: u8) {
        let Some((x, y)) = self.index(point) else {
            return;
        };
        if coverage == 0 {
            return;
        }

        let dst = self.image.get_pixel_mut(x, y);
        let src_a = f32::from(coverage) / 255.0;
        let dst_a = f32::from(dst[3]) / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);

        let mix = |src: u8, dst: u8| -> u8 {
            let value = (f32::from(src) * src_a + f32::from(dst) * dst_a * (1.0 - src_a)) / out_a;
            value.round().clamp(0.0, 255.0) as u8
        };
        *dst = Rgba([
            mix(color.r(), dst[0]),
            mix(color.g(), dst[1]),
            mix(color.b(), dst[2]),
            (out_a * 255.0).round() as u8,
        ]);
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.blend(point, color, u8::MAX);
        }
        Ok(())
    }
}
