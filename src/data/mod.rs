use anyhow::{Context, Result};
use geojson::{Feature, GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::geo::CountrySet;

/// Candidate country files under the data directory, most preferred first
const COUNTRY_FILES: [&str; 3] = [
    "ne_110m_admin_0_countries.geojson",
    "ne_110m_admin_0_countries.json",
    "countries.geojson",
];

/// Feature properties tried, in order, for the country name
const NAME_KEYS: [&str; 3] = ["NAME", "ADMIN", "name"];

/// Load the first country file found in `data_dir`, falling back to the
/// built-in outlines when none loads
pub fn load_default(data_dir: &Path) -> CountrySet {
    for filename in COUNTRY_FILES {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match load_countries(&path) {
            Ok(set) if !set.is_empty() => return set,
            Ok(_) => warn!(path = %path.display(), "no usable countries in file"),
            Err(e) => warn!(path = %path.display(), "failed to load countries: {:#}", e),
        }
    }

    info!("no country data found, using built-in outlines");
    simple_world()
}

/// Load a GeoJSON file of country features
pub fn load_countries(path: &Path) -> Result<CountrySet> {
    let geojson = parse_geojson(path).with_context(|| format!("parsing {}", path.display()))?;
    let set = countries_from_geojson(&geojson);
    info!(path = %path.display(), countries = set.len(), "loaded country boundaries");
    Ok(set)
}

/// Parse with simd-json, retrying with the plain parser if that fails.
/// simd-json rewrites its buffer in place, so the retry reads the file again.
fn parse_geojson(path: &Path) -> Result<GeoJson> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match simd_json::serde::from_slice::<GeoJson>(&mut bytes) {
        Ok(geojson) => Ok(geojson),
        Err(e) => {
            debug!("simd-json parse failed ({}), retrying", e);
            drop(bytes);
            let text = fs::read_to_string(path).with_context(|| format!("re-reading {}", path.display()))?;
            Ok(text.parse::<GeoJson>()?)
        }
    }
}

/// Build the country set from a FeatureCollection, a single Feature, or a bare geometry
pub fn countries_from_geojson(geojson: &GeoJson) -> CountrySet {
    let mut set = CountrySet::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                add_feature(&mut set, feature);
            }
        }
        GeoJson::Feature(feature) => add_feature(&mut set, feature),
        GeoJson::Geometry(geometry) => {
            set.insert_lonlat("Unknown", outer_rings(geometry));
        }
    }
    set
}

fn add_feature(set: &mut CountrySet, feature: &Feature) {
    let name = feature_name(feature);
    let Some(geometry) = feature.geometry.as_ref() else {
        debug!(country = %name, "feature has no geometry");
        return;
    };
    let rings = outer_rings(geometry);
    if rings.is_empty() {
        debug!(country = %name, "feature has no polygon rings");
        return;
    }
    set.insert_lonlat(name, rings);
}

fn feature_name(feature: &Feature) -> String {
    let props = feature.properties.as_ref();
    NAME_KEYS
        .iter()
        .find_map(|key| props.and_then(|p| p.get(*key)).and_then(|v| v.as_str()))
        .unwrap_or("Unknown")
        .to_string()
}

/// Outer ring of a Polygon, or of every part of a MultiPolygon. Holes are ignored.
fn outer_rings(geometry: &Geometry) -> Vec<Vec<(f64, f64)>> {
    let ring = |coords: &Vec<Vec<f64>>| -> Vec<(f64, f64)> {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect()
    };

    match &geometry.value {
        Value::Polygon(rings) => rings.first().map(ring).into_iter().collect(),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .filter_map(|rings| rings.first().map(ring))
            .collect(),
        Value::GeometryCollection(geometries) => geometries.iter().flat_map(outer_rings).collect(),
        _ => Vec::new(),
    }
}

/// Coarse outlines of a handful of countries, for when no data file is available
pub fn simple_world() -> CountrySet {
    let mut set = CountrySet::new();

    set.insert_lonlat(
        "Germany",
        vec![vec![
            (6.0, 51.0), (6.2, 53.5), (8.5, 54.9), (10.0, 54.7), (14.2, 53.9),
            (14.8, 51.0), (12.1, 50.3), (13.8, 48.8), (13.0, 47.5), (10.5, 47.3),
            (7.6, 47.6), (8.2, 49.0), (6.4, 49.5),
        ]],
    );

    set.insert_lonlat(
        "France",
        vec![
            vec![
                (-1.8, 43.4), (-1.2, 46.2), (-4.6, 48.4), (-1.6, 48.7), (1.6, 50.9),
                (4.2, 49.9), (8.2, 49.0), (7.6, 47.6), (6.2, 46.3), (7.0, 44.1),
                (4.2, 43.5), (3.1, 42.4),
            ],
            // Corsica
            vec![(8.6, 41.4), (9.4, 41.4), (9.5, 43.0), (8.7, 42.6)],
        ],
    );

    set.insert_lonlat(
        "United States of America",
        vec![vec![
            (-124.7, 48.4), (-123.0, 49.0), (-95.2, 49.0), (-83.0, 46.0), (-82.5, 41.7),
            (-79.0, 43.3), (-75.0, 45.0), (-67.0, 45.0), (-70.0, 41.5), (-75.5, 35.2),
            (-81.0, 31.0), (-80.0, 25.2), (-82.8, 28.0), (-84.0, 30.0), (-89.6, 29.0),
            (-97.3, 26.0), (-100.0, 28.0), (-104.5, 29.6), (-106.5, 31.8), (-111.0, 31.3),
            (-117.1, 32.5), (-120.6, 34.6), (-124.4, 40.3),
        ]],
    );

    set.insert_lonlat(
        "Brazil",
        vec![vec![
            (-73.9, -7.4), (-69.9, -4.2), (-69.4, 1.1), (-60.0, 5.2), (-51.6, 4.2),
            (-50.0, 0.0), (-44.0, -2.4), (-35.0, -5.5), (-39.0, -13.0), (-40.9, -22.0),
            (-48.6, -26.0), (-53.4, -33.7), (-57.6, -30.2), (-54.6, -25.6), (-58.2, -20.2),
            (-60.2, -16.3), (-65.3, -10.9),
        ]],
    );

    set.insert_lonlat(
        "Australia",
        vec![
            vec![
                (113.5, -22.0), (122.2, -18.2), (129.0, -14.9), (136.7, -12.0), (141.6, -12.6),
                (142.5, -10.7), (146.3, -19.0), (153.6, -28.2), (150.0, -37.5), (146.3, -39.0),
                (140.6, -38.0), (137.7, -35.1), (131.3, -31.5), (123.6, -33.9), (115.0, -34.3),
                (114.6, -28.5),
            ],
            // Tasmania
            vec![(144.7, -40.7), (148.3, -40.9), (148.0, -43.2), (146.0, -43.6)],
        ],
    );

    set.insert_lonlat(
        "Japan",
        vec![
            vec![(130.9, 34.0), (135.0, 33.5), (140.9, 35.7), (141.9, 39.2), (140.0, 41.4),
                 (139.9, 40.0), (136.7, 37.3), (132.6, 35.4)],
            vec![(140.0, 41.6), (145.5, 43.3), (143.2, 42.0), (141.1, 41.7)],
        ],
    );

    set.insert_lonlat(
        "India",
        vec![vec![
            (68.2, 23.7), (72.6, 21.4), (73.4, 16.0), (76.6, 8.9), (77.5, 8.1),
            (80.3, 13.0), (80.3, 15.9), (86.9, 21.5), (88.6, 22.0), (89.0, 26.5),
            (95.0, 27.5), (91.7, 22.9), (88.1, 27.9), (81.1, 30.2), (79.0, 32.5),
            (77.8, 35.5), (74.5, 34.8), (71.0, 28.0),
        ]],
    );

    set.insert_lonlat(
        "South Africa",
        vec![vec![
            (16.5, -28.6), (20.0, -24.8), (25.7, -25.5), (31.5, -22.0), (32.9, -26.8),
            (30.0, -31.3), (25.6, -34.0), (18.4, -34.1), (17.9, -31.0),
        ]],
    );

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "NAME": "Testland" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]],
                                    [[0.2, 0.2], [0.4, 0.2], [0.4, 0.4], [0.2, 0.2]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "ADMIN": "Twin Isles" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[10, 10], [11, 10], [11, 11], [10, 10]]],
                        [[[12, 10], [13, 10], [13, 11], [12, 10]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Pointland" },
                "geometry": { "type": "Point", "coordinates": [5, 5] }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_feature_collection() {
        let geojson: GeoJson = SAMPLE.parse().unwrap();
        let set = countries_from_geojson(&geojson);
        let names: Vec<&str> = set.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Testland", "Twin Isles"]);

        // outer ring only, closing point dropped
        let testland = set.get("Testland").unwrap();
        assert_eq!(testland.polygons.len(), 1);
        assert_eq!(testland.polygons[0].len(), 4);
        assert_eq!(set.get("Twin Isles").unwrap().polygons.len(), 2);
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("country-globe-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_countries_from_file() {
        let path = write_temp("sample.geojson", SAMPLE);
        let set = load_countries(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.get("Twin Isles").is_some());
    }

    #[test]
    fn test_load_countries_rejects_garbage() {
        let path = write_temp("broken.geojson", "{\"type\": \"FeatureCollection\", \"features\": [");
        let err = load_countries(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(format!("{:#}", err).contains("parsing"));
        assert!(load_countries(Path::new("/nonexistent/countries.geojson")).is_err());
    }

    #[test]
    fn test_missing_dir_falls_back() {
        let set = load_default(Path::new("/nonexistent/country-globe-data"));
        assert!(set.get("Germany").is_some());
        assert!(set.len() >= 5);
    }

    #[test]
    fn test_simple_world_meshable() {
        use crate::map::mesh::MeshBuilder;
        let builder = MeshBuilder::new(1.0);
        for country in simple_world().iter() {
            assert!(
                builder.build_country(country, 1.025).is_some(),
                "{} did not mesh",
                country.name
            );
        }
    }
}
