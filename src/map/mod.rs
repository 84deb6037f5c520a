pub mod geometry;
pub mod globe;
pub mod mesh;
pub mod projection;
pub mod renderer;
pub mod spatial;

pub use globe::GlobeViewport;
pub use mesh::{Mesh, MeshBuilder};
pub use projection::{project, project_batch, AltitudeLayer};
pub use renderer::{DisplaySettings, GlobeLayers, GlobeRenderer};
pub use spatial::{NearestSearch, SearchBackend};
