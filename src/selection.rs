use tracing::debug;

use crate::config::GlobeConfig;
use crate::geo::{Country, CountrySet};
use crate::map::mesh::{Mesh, MeshBuilder};

/// Externally visible selection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    NoSelection,
    Selected(String),
}

/// Instruction for the render layer, queued in the order it must be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightEvent {
    /// Drop the overlay for this country
    Removed { country: String },
    /// Draw the current highlight mesh for this country
    Added { country: String },
}

/// The selected country and its overlay mesh at highlight altitude.
/// `mesh` is only `None` for a `Country` built by hand with no meshable ring;
/// [`CountrySet`] never stores one.
#[derive(Debug, Clone)]
pub struct Highlight {
    pub country: String,
    pub mesh: Option<Mesh>,
}

/// Selection state machine: `NoSelection` <-> `Selected(country)`.
///
/// At most one highlight exists at any time. Every transition removes the
/// previous overlay before adding the next, and queues matching
/// [`HighlightEvent`]s for the renderer.
pub struct Selection {
    current: Option<Highlight>,
    events: Vec<HighlightEvent>,
    builder: MeshBuilder,
    altitude: f64,
}

impl Selection {
    pub fn new(config: &GlobeConfig) -> Self {
        Self {
            current: None,
            events: Vec::new(),
            builder: MeshBuilder::new(config.base_radius),
            altitude: config.layers.highlight,
        }
    }

    pub fn state(&self) -> SelectionState {
        match &self.current {
            Some(h) => SelectionState::Selected(h.country.clone()),
            None => SelectionState::NoSelection,
        }
    }

    /// Name of the selected country
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|h| h.country.as_str())
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        self.current.as_ref()
    }

    /// Select by case-insensitive substring; the first country in iteration
    /// order wins. `None` (and no state change) when nothing matches.
    pub fn select<'a>(&mut self, query: &str, countries: &'a CountrySet) -> Option<&'a str> {
        let Some(country) = countries.find(query) else {
            debug!(query, "no country matches");
            return None;
        };
        self.apply(country);
        Some(&country.name)
    }

    /// Select by exact stored name, as produced by a pick
    pub fn select_exact<'a>(&mut self, name: &str, countries: &'a CountrySet) -> Option<&'a str> {
        let country = countries.get(name)?;
        self.apply(country);
        Some(&country.name)
    }

    /// Return to `NoSelection`, removing any overlay
    pub fn clear(&mut self) {
        self.invalidate();
    }

    /// Take the queued render events
    pub fn drain_events(&mut self) -> Vec<HighlightEvent> {
        std::mem::take(&mut self.events)
    }

    fn invalidate(&mut self) {
        if let Some(old) = self.current.take() {
            if old.mesh.is_some() {
                self.events.push(HighlightEvent::Removed { country: old.country });
            }
        }
    }

    fn apply(&mut self, country: &Country) {
        self.invalidate();

        let mesh = self.builder.build_country(country, self.altitude);
        if mesh.is_some() {
            self.events.push(HighlightEvent::Added {
                country: country.name.clone(),
            });
        }
        self.current = Some(Highlight {
            country: country.name.clone(),
            mesh,
        });
    }
}
