use std::f64::consts::PI;

/// Zoom bounds and step, matching the web map's button behavior
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 8.0;
pub const ZOOM_STEP: f64 = 1.5;

/// Latitude limit for Web Mercator (poles project to infinity)
const MAX_LAT: f64 = 85.0;

/// Visible map area: center, zoom and canvas size in braille pixels
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level, 1.0 shows the whole world across the canvas width
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Whole-world view centered on (0, 0)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 0.0, MIN_ZOOM, width, height)
    }

    /// Back to the world view, keeping the canvas size
    pub fn reset(&mut self) {
        *self = Self::world(self.width, self.height);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Pan by a pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width.max(1) as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * 0.5;

        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = self.center_lat.clamp(-MAX_LAT, MAX_LAT);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Zoom in keeping the point under (px, py) fixed
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_STEP);
    }

    /// Zoom out keeping the point under (px, py) fixed
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / ZOOM_STEP);
    }

    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Normalized Web Mercator coordinates of the viewport center
    fn center_xy(&self) -> (f64, f64) {
        mercator_xy(self.center_lon, self.center_lat)
    }

    fn scale(&self) -> f64 {
        self.zoom * self.width as f64
    }

    /// Pixel coordinates back to (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let (center_x, center_y) = self.center_xy();
        let scale = self.scale().max(1.0);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        let mut lon = x * 360.0 - 180.0;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();

        (lon, lat)
    }

    /// Geographic coordinate to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = mercator_xy(lon, lat);
        let (center_x, center_y) = self.center_xy();
        let scale = self.scale();

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Rough bounding-box check for a segment
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }

    /// Geographic bounds currently on screen as (min_lon, min_lat, max_lon, max_lat)
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let (lon0, lat0) = self.unproject(0, self.height as i32);
        let (lon1, lat1) = self.unproject(self.width as i32, 0);
        if lon0 <= lon1 {
            (lon0, lat0, lon1, lat1)
        } else {
            // Antimeridian in view
            (-180.0, lat0, 180.0, lat1)
        }
    }
}

#[inline(always)]
fn mercator_xy(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        assert_eq!(vp.project(0.0, 0.0), (50, 50));
    }

    #[test]
    fn test_unproject_roundtrip_near_center() {
        let vp = Viewport::new(10.0, 20.0, 2.0, 400, 200);
        let (px, py) = vp.project(12.0, 18.0);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 12.0).abs() < 1.0);
        assert!((lat - 18.0).abs() < 1.0);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = Viewport::world(100, 100);
        vp.zoom_out();
        assert_eq!(vp.zoom, MIN_ZOOM);
        for _ in 0..10 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        vp.zoom_in_at(10, 10);
        assert_eq!(vp.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_reset_restores_world_view() {
        let mut vp = Viewport::world(120, 80);
        vp.zoom_in();
        vp.pan(30, -12);
        vp.reset();
        assert_eq!(vp, Viewport::world(120, 80));
    }
}
