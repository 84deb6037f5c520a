pub mod braille;
pub mod config;
pub mod data;
pub mod geo;
pub mod index;
pub mod map;
pub mod pick;
pub mod scene;
pub mod selection;

pub use config::GlobeConfig;
pub use geo::{Country, CountrySet, Polygon};
pub use index::{SampledPoint, SpatialIndex};
pub use pick::{resolve_pick, MissReason, Pick};
pub use scene::Scene;
pub use selection::{HighlightEvent, Selection, SelectionState};
