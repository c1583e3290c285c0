//! Country catalog: the selectable regions and their outlines, loaded once
//! per session from a GeoJSON world document.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geojson::{Feature, GeoJson, Value};
use glam::DVec2;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::map::geometry::rings_contain;
use crate::map::spatial::{BBox, FeatureGrid};

/// Fixed geography source used when no local file is available
pub const DEFAULT_GEO_URL: &str =
    "https://raw.githubusercontent.com/holtzy/D3-graph-gallery/master/DATA/world.geojson";

/// Grid cell size in degrees for hit-testing
const GRID_CELL_DEGREES: f64 = 10.0;

/// A selectable country or territory
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    /// ISO 3166-1 alpha-3 code, unique within a catalog
    pub code: String,
    pub name: String,
}

impl Region {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Outline of one region: every exterior and hole ring, in (lon, lat)
#[derive(Clone, Debug)]
pub struct CountryShape {
    pub rings: Vec<Vec<DVec2>>,
    pub bbox: BBox,
}

impl CountryShape {
    fn new(rings: Vec<Vec<DVec2>>) -> Self {
        let bbox = rings.iter().flatten().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        );
        Self { rings, bbox }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let (x0, y0, x1, y1) = self.bbox;
        if lon < x0 || lon > x1 || lat < y0 || lat > y1 {
            return false;
        }
        rings_contain(&self.rings, DVec2::new(lon, lat))
    }
}

/// Where the geography document comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogSource {
    File(PathBuf),
    Url(String),
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::File(path) => write!(f, "{}", path.display()),
            CatalogSource::Url(url) => f.write_str(url),
        }
    }
}

/// All regions of the session, with outlines and a hit-test index.
/// `regions[i]` is outlined by `shapes[i]`.
#[derive(Debug)]
pub struct Catalog {
    regions: Vec<Region>,
    shapes: Vec<CountryShape>,
    by_code: HashMap<String, usize>,
    grid: FeatureGrid,
}

impl Catalog {
    /// Build from regions paired with their outline rings.
    /// Empty codes are dropped; a repeated code merges its rings into the first.
    pub fn from_parts(parts: Vec<(Region, Vec<Vec<DVec2>>)>) -> Self {
        let mut merged: Vec<(Region, Vec<Vec<DVec2>>)> = Vec::with_capacity(parts.len());
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (region, rings) in parts {
            if region.code.is_empty() {
                debug!(name = %region.name, "skipping region without a code");
                continue;
            }
            match seen.get(&region.code) {
                Some(&idx) => merged[idx].1.extend(rings),
                None => {
                    seen.insert(region.code.clone(), merged.len());
                    merged.push((region, rings));
                }
            }
        }

        merged.sort_by(|a, b| a.0.name.cmp(&b.0.name).then_with(|| a.0.code.cmp(&b.0.code)));

        let shapes: Vec<CountryShape> = merged
            .par_iter()
            .map(|(_, rings)| CountryShape::new(rings.clone()))
            .collect();
        let regions: Vec<Region> = merged.into_iter().map(|(region, _)| region).collect();
        let by_code = regions
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.code.clone(), idx))
            .collect();
        let grid = FeatureGrid::build(shapes.iter().map(|s| s.bbox), GRID_CELL_DEGREES);

        Self {
            regions,
            shapes,
            by_code,
            grid,
        }
    }

    /// Parse a GeoJSON document (the buffer is used as simd-json scratch space)
    pub fn from_geojson_bytes(bytes: &mut [u8]) -> Result<Self> {
        let value: serde_json::Value =
            simd_json::serde::from_slice(bytes).context("geography document is not valid JSON")?;
        let geojson = GeoJson::from_json_value(value).context("geography document is not GeoJSON")?;

        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => anyhow::bail!("geography document has no features"),
        };

        let parts: Vec<(Region, Vec<Vec<DVec2>>)> = features
            .par_iter()
            .filter_map(|feature| {
                let code = feature_code(feature);
                if code.is_empty() || code == "-99" {
                    return None;
                }
                Some((Region::new(code, feature_name(feature)), feature_rings(feature)))
            })
            .collect();

        Ok(Self::from_parts(parts))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let mut bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_geojson_bytes(&mut bytes)
    }

    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self> {
        let response = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("geography request to {url} failed"))?;
        let mut bytes = response.bytes().await?.to_vec();
        Self::from_geojson_bytes(&mut bytes)
    }

    /// Load from a file or URL. Completes before any UI state is built.
    pub async fn load(source: &CatalogSource, client: &reqwest::Client) -> Result<Self> {
        let catalog = match source {
            CatalogSource::File(path) => Self::load_file(path)?,
            CatalogSource::Url(url) => Self::fetch(client, url).await?,
        };
        if catalog.is_empty() {
            warn!(%source, "geography document produced no regions");
        } else {
            info!(%source, regions = catalog.len(), "country catalog loaded");
        }
        Ok(catalog)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Region> {
        self.by_code.get(code).map(|&idx| &self.regions[idx])
    }

    pub fn shape(&self, code: &str) -> Option<&CountryShape> {
        self.by_code.get(code).map(|&idx| &self.shapes[idx])
    }

    pub fn shapes(&self) -> &[CountryShape] {
        &self.shapes
    }

    /// Region under a geographic point, if any
    pub fn region_at(&self, lon: f64, lat: f64) -> Option<&Region> {
        self.grid
            .query_point(lon, lat)
            .iter()
            .find(|&&idx| self.shapes[idx].contains(lon, lat))
            .map(|&idx| &self.regions[idx])
    }

    /// Indices of shapes that may be visible within the given bounds
    pub fn shapes_in(&self, bounds: BBox) -> Vec<usize> {
        let mut hits = Vec::new();
        self.grid.query_into(bounds, &mut hits);
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

fn feature_code(feature: &Feature) -> String {
    if let Some(id) = &feature.id {
        let code = match id {
            geojson::feature::Id::String(s) => s.trim().to_string(),
            geojson::feature::Id::Number(n) => n.to_string(),
        };
        if !code.is_empty() {
            return code;
        }
    }
    ["ISO_A3", "iso_a3"]
        .iter()
        .filter_map(|key| feature.property(key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn feature_name(feature: &Feature) -> String {
    ["name", "NAME", "ADMIN"]
        .iter()
        .filter_map(|key| feature.property(key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn feature_rings(feature: &Feature) -> Vec<Vec<DVec2>> {
    let Some(geometry) = &feature.geometry else {
        return Vec::new();
    };
    let mut rings = Vec::new();
    collect_rings(&geometry.value, &mut rings);
    rings
}

fn collect_rings(value: &Value, rings: &mut Vec<Vec<DVec2>>) {
    let to_ring = |coords: &Vec<Vec<f64>>| -> Vec<DVec2> {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| DVec2::new(c[0], c[1]))
            .collect()
    };
    match value {
        Value::Polygon(polygon) => rings.extend(polygon.iter().map(to_ring)),
        Value::MultiPolygon(polygons) => {
            for polygon in polygons {
                rings.extend(polygon.iter().map(to_ring));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_rings(&g.value, rings);
            }
        }
        _ => {}
    }
}
