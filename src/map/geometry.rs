use glam::DVec2;

use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Even-odd point-in-polygon over every ring of a shape.
/// Hole rings flip parity, so points inside a hole test as outside.
pub fn rings_contain(rings: &[Vec<DVec2>], p: DVec2) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let a = ring[i];
            let b = ring[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
    }
    inside
}

/// Scanline fill of projected rings (even-odd), lighting every `stride`-th
/// dot so fills read as shading rather than a solid block.
pub fn fill_rings(canvas: &mut BrailleCanvas, rings: &[Vec<DVec2>], stride: usize) {
    let stride = stride.max(1);
    let height = canvas.pixel_height() as i32;
    let width = canvas.pixel_width() as i32;

    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    if min_y > max_y {
        return;
    }

    let y_start = (min_y.floor() as i32).max(0);
    let y_end = (max_y.ceil() as i32).min(height - 1);
    let mut crossings: Vec<f64> = Vec::new();

    for y in y_start..=y_end {
        if (y as usize) % stride != 0 {
            continue;
        }
        let scan_y = y as f64 + 0.5;

        crossings.clear();
        for ring in rings {
            let n = ring.len();
            if n < 3 {
                continue;
            }
            let mut j = n - 1;
            for i in 0..n {
                let a = ring[i];
                let b = ring[j];
                if (a.y > scan_y) != (b.y > scan_y) {
                    crossings.push((b.x - a.x) * (scan_y - a.y) / (b.y - a.y) + a.x);
                }
                j = i;
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let x_from = (span[0].ceil() as i32).max(0);
            let x_to = (span[1].floor() as i32).min(width - 1);
            let mut x = x_from;
            while x <= x_to {
                if (x as usize) % stride == 0 {
                    canvas.set_pixel_signed(x, y);
                }
                x += 1;
            }
        }
    }
}
