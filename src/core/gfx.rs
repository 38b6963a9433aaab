use image::RgbaImage;
use log::info;
use std::{error::Error, num::NonZeroU32, sync::Arc};
use winit::{dpi::PhysicalSize, window::Window};

/// Full-viewport software presenter: one frame in, one softbuffer blit
/// out. Frames are letterboxed on black and scaled nearest-neighbour.
pub struct Presenter {
    _context: softbuffer::Context<Arc<Window>>,
    surface: softbuffer::Surface<Arc<Window>, Arc<Window>>,
    window_size: PhysicalSize<u32>,
}

pub fn init(window: Arc<Window>) -> Result<Presenter, Box<dyn Error>> {
    info!("Initializing software presenter (softbuffer)...");

    let window_size = window.inner_size();
    let context = softbuffer::Context::new(window.clone())?;
    let surface = softbuffer::Surface::new(&context, window)?;

    let mut presenter = Presenter {
        _context: context,
        surface,
        window_size,
    };
    presenter.resize(window_size.width, window_size.height);
    Ok(presenter)
}

impl Presenter {
    pub fn resize(&mut self, width: u32, height: u32) {
        let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            return;
        };
        if self.surface.resize(w, h).is_ok() {
            self.window_size = PhysicalSize::new(width, height);
        }
    }

    /// Draws `frame` scaled to the window, letterboxed, and presents.
    pub fn present(&mut self, frame: &RgbaImage) -> Result<(), Box<dyn Error>> {
        let (win_w, win_h) = (self.window_size.width, self.window_size.height);
        if win_w == 0 || win_h == 0 {
            return Ok(());
        }

        let (src_w, src_h) = (frame.width(), frame.height());
        let scale = (win_w as f32 / src_w as f32).min(win_h as f32 / src_h as f32);
        let dst_w = ((src_w as f32 * scale) as u32).max(1);
        let dst_h = ((src_h as f32 * scale) as u32).max(1);
        let x0 = (win_w - dst_w) / 2;
        let y0 = (win_h - dst_h) / 2;

        let src = frame.as_raw();
        let mut buffer = self.surface.buffer_mut()?;
        buffer.fill(0);

        for dy in 0..dst_h {
            let sy = (dy as u64 * src_h as u64 / dst_h as u64) as u32;
            let src_row = (sy * src_w) as usize * 4;
            let dst_row = ((y0 + dy) * win_w + x0) as usize;
            for dx in 0..dst_w {
                let sx = (dx as u64 * src_w as u64 / dst_w as u64) as u32;
                let p = src_row + sx as usize * 4;
                let (r, g, b) = (src[p], src[p + 1], src[p + 2]);
                // softbuffer wants 0x00RRGGBB
                buffer[dst_row + dx as usize] =
                    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
            }
        }

        buffer.present()?;
        Ok(())
    }
}

/* ============================ Frame compositing ============================ */

/// Multiplies every pixel of `image` by `factor` (0 = black, 1 = as is).
pub fn dim(image: &mut RgbaImage, factor: f32) {
    let f = factor.clamp(0.0, 1.0);
    for pixel in image.pixels_mut() {
        for c in &mut pixel.0[..3] {
            *c = (f32::from(*c) * f) as u8;
        }
    }
}

/// Alpha-blends `src` onto the center of `dst`, clipped when oversized.
pub fn blit_center(dst: &mut RgbaImage, src: &RgbaImage) {
    let x0 = dst.width().saturating_sub(src.width()) / 2;
    let y0 = dst.height().saturating_sub(src.height()) / 2;
    let w = src.width().min(dst.width());
    let h = src.height().min(dst.height());

    for sy in 0..h {
        for sx in 0..w {
            let over = src.get_pixel(sx, sy).0;
            let alpha = u32::from(over[3]);
            if alpha == 0 {
                continue;
            }
            let under = &mut dst.get_pixel_mut(x0 + sx, y0 + sy).0;
            for c in 0..3 {
                let blended =
                    (u32::from(over[c]) * alpha + u32::from(under[c]) * (255 - alpha)) / 255;
                under[c] = blended as u8;
            }
        }
    }
}

/// Fills an axis-aligned rectangle, clipped to the image bounds.
pub fn fill_rect(image: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, rgba: [u8; 4]) {
    let x1 = (x + w).min(image.width());
    let y1 = (y + h).min(image.height());
    for py in y.min(image.height())..y1 {
        for px in x.min(image.width())..x1 {
            image.put_pixel(px, py, image::Rgba(rgba));
        }
    }
}
