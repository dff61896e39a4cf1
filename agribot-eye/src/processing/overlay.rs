//! Debug overlay: translucent fill and outline per detected instance

use crate::models::Segment;
use image::{Rgb, RgbImage};

const FILL_COLOR: Rgb<u8> = Rgb([0, 200, 255]);
const FILL_ALPHA: f32 = 0.1;
const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const OUTLINE_THICKNESS: i32 = 2;

/// Draw every segment onto a copy of `frame`.
pub fn render_overlay(frame: &RgbImage, segments: &[Segment]) -> RgbImage {
    let mut canvas = frame.clone();
    for segment in segments {
        let points = rounded(&segment.polygon, canvas.width().max(canvas.height()));
        if points.len() < 2 {
            continue;
        }
        fill_polygon(&mut canvas, &points, FILL_COLOR, FILL_ALPHA);
        draw_outline(&mut canvas, &points, OUTLINE_COLOR);
    }
    canvas
}

/// Vertices far outside the frame are pulled in so line walks stay bounded.
fn rounded(polygon: &[(f64, f64)], extent: u32) -> Vec<(i32, i32)> {
    let limit = extent as f64 * 2.0 + 16.0;
    polygon
        .iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|&(x, y)| {
            (
                x.clamp(-limit, limit).round() as i32,
                y.clamp(-limit, limit).round() as i32,
            )
        })
        .collect()
}

/// Even-odd scanline fill, sampling each row at its pixel center.
fn fill_polygon(image: &mut RgbImage, points: &[(i32, i32)], color: Rgb<u8>, alpha: f32) {
    if points.len() < 3 {
        return;
    }
    let height = image.height() as i32;
    let width = image.width() as i32;
    let min_y = points.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let max_y = points.iter().map(|p| p.1).max().unwrap_or(-1).min(height - 1);

    let mut crossings = Vec::with_capacity(points.len());
    for y in min_y..=max_y {
        let sample = y as f64 + 0.5;
        crossings.clear();
        for (idx, &(x0, y0)) in points.iter().enumerate() {
            let (x1, y1) = points[(idx + 1) % points.len()];
            let (fy0, fy1) = (y0 as f64, y1 as f64);
            if (fy0 <= sample && fy1 > sample) || (fy1 <= sample && fy0 > sample) {
                let t = (sample - fy0) / (fy1 - fy0);
                crossings.push(x0 as f64 + t * (x1 - x0) as f64);
            }
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        for pair in crossings.chunks_exact(2) {
            let start = (pair[0].ceil() as i32).max(0);
            let end = (pair[1].floor() as i32).min(width - 1);
            for x in start..=end {
                blend(image.get_pixel_mut(x as u32, y as u32), color, alpha);
            }
        }
    }
}

fn blend(pixel: &mut Rgb<u8>, color: Rgb<u8>, alpha: f32) {
    for channel in 0..3 {
        let base = pixel.0[channel] as f32;
        let over = color.0[channel] as f32;
        pixel.0[channel] = (over * alpha + base * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8;
    }
}

fn draw_outline(image: &mut RgbImage, points: &[(i32, i32)], color: Rgb<u8>) {
    for (idx, &start) in points.iter().enumerate() {
        let end = points[(idx + 1) % points.len()];
        draw_line(image, start, end, color);
    }
}

fn draw_line(image: &mut RgbImage, (mut x0, mut y0): (i32, i32), (x1, y1): (i32, i32), color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(image, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn stamp(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    for oy in 0..OUTLINE_THICKNESS {
        for ox in 0..OUTLINE_THICKNESS {
            let (px, py) = (x + ox, y + oy);
            if px >= 0 && px < width && py >= 0 && py < height {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}
