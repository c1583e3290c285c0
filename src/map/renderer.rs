use glam::DVec2;

use crate::braille::BrailleCanvas;
use crate::catalog::{Catalog, CountryShape};
use crate::map::geometry::{draw_line, fill_rings};
use crate::map::projection::Viewport;

/// Country codes drawn with emphasis
#[derive(Clone, Copy, Debug, Default)]
pub struct Highlights<'a> {
    /// Region shown in the info panel
    pub selected: Option<&'a str>,
    /// Quiz answer, once revealed
    pub answer: Option<&'a str>,
}

/// Rendered map, one canvas per color
pub struct MapLayers {
    pub outlines: BrailleCanvas,
    pub selected: BrailleCanvas,
    pub answer: BrailleCanvas,
}

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_outlines: bool,
    /// Every n-th dot is lit when shading a highlighted country
    pub selected_fill_stride: usize,
    pub answer_fill_stride: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_outlines: true,
            selected_fill_stride: 2,
            answer_fill_stride: 1,
        }
    }
}

/// Draws the country catalog onto braille layers
pub struct MapRenderer {
    catalog: Catalog,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            settings: DisplaySettings::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Render all layers for a `width` x `height` character area
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        highlights: Highlights<'_>,
    ) -> MapLayers {
        let mut layers = MapLayers {
            outlines: BrailleCanvas::new(width, height),
            selected: BrailleCanvas::new(width, height),
            answer: BrailleCanvas::new(width, height),
        };

        if self.settings.show_outlines {
            for idx in self.catalog.shapes_in(viewport.visible_bounds()) {
                let shape = &self.catalog.shapes()[idx];
                for ring in &shape.rings {
                    draw_ring(&mut layers.outlines, ring, viewport);
                }
            }
        }

        if let Some(shape) = highlights.selected.and_then(|code| self.catalog.shape(code)) {
            shade(&mut layers.selected, shape, viewport, self.settings.selected_fill_stride);
        }
        if let Some(shape) = highlights.answer.and_then(|code| self.catalog.shape(code)) {
            shade(&mut layers.answer, shape, viewport, self.settings.answer_fill_stride);
        }

        layers
    }

    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }
}

/// Outline plus dotted fill
fn shade(canvas: &mut BrailleCanvas, shape: &CountryShape, viewport: &Viewport, stride: usize) {
    let projected: Vec<Vec<DVec2>> = shape
        .rings
        .iter()
        .map(|ring| {
            ring.iter()
                .map(|p| {
                    let (px, py) = viewport.project(p.x, p.y);
                    DVec2::new(px as f64, py as f64)
                })
                .collect()
        })
        .collect();
    fill_rings(canvas, &projected, stride);
    for ring in &shape.rings {
        draw_ring(canvas, ring, viewport);
    }
}

/// Draw a closed ring with viewport culling
fn draw_ring(canvas: &mut BrailleCanvas, ring: &[DVec2], viewport: &Viewport) {
    if ring.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for p in ring.iter().chain(ring.first()) {
        let (px, py) = viewport.project(p.x, p.y);

        if let Some((prev_x, prev_y)) = prev {
            // Segments spanning most of the screen are antimeridian wraps
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }

        prev = Some((px, py));
    }
}
