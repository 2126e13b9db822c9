//! GeoJSON import of country boundaries and export of grid cells.

use crate::error::{GridError, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use gridcrawl_types::cell::{Cell, country_key};
use serde_json::{Map, json};

/// Feature properties tried, in order, for a country code.
pub const COUNTRY_CODE_PROPERTIES: [&str; 3] = ["iso_a3", "ISO_A3", "code"];

/// Parses a GeoJSON document into `(country_code, boundary)` pairs.
///
/// Accepts a FeatureCollection or a single Feature. Features without a code
/// property or with a non-areal geometry are skipped. Codes are uppercased.
pub fn countries_from_geojson(geojson: &str) -> Result<Vec<(String, MultiPolygon)>> {
    let parsed: GeoJson = geojson
        .parse()
        .map_err(|e| GridError::InvalidInput(format!("Failed to parse GeoJSON: {}", e)))?;

    let features = match parsed {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(GridError::InvalidInput(
                "Boundary GeoJSON must contain features with a country code".to_string(),
            ));
        }
    };

    let mut countries = Vec::new();
    for feature in features {
        let Some(code) = feature_code(&feature) else {
            log::debug!("Skipping boundary feature without a country code");
            continue;
        };
        let Some(geometry) = feature.geometry else {
            continue;
        };
        match multipolygon_from_value(&geometry.value)? {
            Some(boundary) => countries.push((code, boundary)),
            None => log::debug!("Skipping non-areal geometry for {}", code),
        }
    }

    Ok(countries)
}

fn feature_code(feature: &Feature) -> Option<String> {
    COUNTRY_CODE_PROPERTIES.iter().find_map(|key| {
        feature
            .property(key)
            .and_then(|value| value.as_str())
            .map(country_key)
            .filter(|code| !code.is_empty())
    })
}

fn multipolygon_from_value(value: &Value) -> Result<Option<MultiPolygon>> {
    match value {
        Value::Polygon(rings) => Ok(Some(MultiPolygon::new(vec![polygon_from_rings(rings)?]))),
        Value::MultiPolygon(polygons) => {
            let polygons = polygons
                .iter()
                .map(|rings| polygon_from_rings(rings))
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(MultiPolygon::new(polygons)))
        }
        _ => Ok(None),
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Err(GridError::InvalidInput(
            "Polygon must have at least one ring".to_string(),
        ));
    };

    let interiors = interiors
        .iter()
        .map(|ring| ring_from_positions(ring))
        .collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(ring_from_positions(exterior)?, interiors))
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Result<LineString> {
    let coords = positions
        .iter()
        .map(|position| {
            if position.len() < 2 {
                return Err(GridError::InvalidInput(
                    "Coordinate must have at least 2 values".to_string(),
                ));
            }
            Ok(Coord {
                x: position[0],
                y: position[1],
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::from(coords))
}

/// Converts cells to a FeatureCollection of points.
///
/// Each feature carries `id`, `country`, `radius`, `level` and `processed`
/// properties.
pub fn cells_to_feature_collection(cells: &[Cell]) -> Result<String> {
    let features: Vec<Feature> = cells
        .iter()
        .map(|cell| {
            let geom = Geometry::new(Value::Point(vec![cell.center.x(), cell.center.y()]));

            let mut props = Map::new();
            props.insert("id".to_string(), json!(cell.id.0));
            props.insert("country".to_string(), json!(cell.country));
            props.insert("radius".to_string(), json!(cell.radius));
            props.insert("level".to_string(), json!(cell.level));
            props.insert("processed".to_string(), json!(cell.is_processed));

            Feature {
                bbox: None,
                geometry: Some(geom),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    serde_json::to_string(&collection).map_err(|e| {
        GridError::Serialization(format!("Failed to serialize feature collection: {}", e))
    })
}
