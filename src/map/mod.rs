pub mod geometry;
pub mod projection;
mod renderer;
pub mod spatial;

pub use projection::Viewport;
pub use renderer::{DisplaySettings, Highlights, MapLayers, MapRenderer};
