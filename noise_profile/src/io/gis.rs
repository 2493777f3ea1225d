//! GeoJSON layers for buildings and ground effects.

use geojson::{Feature, GeoJson, JsonValue, Value};

use super::{read_to_string, BuildingDescription, GroundEffectDescription, Ring};
use crate::error::{ProfileError, Result};

fn read_features(path: &str) -> Result<Vec<Feature>> {
    let contents = read_to_string(path)?;
    match contents.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc.features),
        GeoJson::Feature(f) => Ok(vec![f]),
        GeoJson::Geometry(_) => Err(ProfileError::UnsupportedGeometry(
            "bare geometry, expected a feature collection".into(),
        )),
    }
}

fn property<'a>(feature: &'a Feature, key: &str) -> Option<&'a JsonValue> {
    feature.properties.as_ref().and_then(|p| p.get(key))
}

fn number_property(feature: &Feature, key: &str) -> Option<f64> {
    property(feature, key).and_then(JsonValue::as_f64)
}

/// Polygons of a feature. Features without geometry yield nothing.
fn feature_polygons(feature: &Feature) -> Result<Vec<Vec<Ring>>> {
    let Some(geometry) = &feature.geometry else {
        log::warn!("Skipping feature without geometry");
        return Ok(Vec::new());
    };
    match &geometry.value {
        Value::Polygon(rings) => Ok(vec![rings.clone()]),
        Value::MultiPolygon(polygons) => Ok(polygons.clone()),
        other => Err(ProfileError::UnsupportedGeometry(format!(
            "{} feature, expected Polygon or MultiPolygon",
            value_name(other)
        ))),
    }
}

fn value_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Reads buildings from a feature collection of polygons.
///
/// `height`, `id` and `absorption` are read from the feature properties;
/// features without a height use `default_height`. Each part of a
/// multi-polygon becomes its own building sharing the feature id.
pub fn read_buildings_geojson(path: &str, default_height: f64) -> Result<Vec<BuildingDescription>> {
    let mut buildings = Vec::new();
    for feature in read_features(path)? {
        let height = number_property(&feature, "height").unwrap_or(default_height);
        let id = property(&feature, "id").and_then(JsonValue::as_i64);
        let absorption: Vec<f64> = property(&feature, "absorption")
            .and_then(JsonValue::as_array)
            .map(|values| values.iter().filter_map(JsonValue::as_f64).collect())
            .unwrap_or_default();
        for footprint in feature_polygons(&feature)? {
            buildings.push(BuildingDescription {
                footprint,
                height,
                absorption: absorption.clone(),
                id,
            });
        }
    }
    Ok(buildings)
}

/// Reads ground effect regions; the `coefficient` property defaults to 0.
pub fn read_ground_effects_geojson(path: &str) -> Result<Vec<GroundEffectDescription>> {
    let mut effects = Vec::new();
    for feature in read_features(path)? {
        let polygons = feature_polygons(&feature)?;
        if polygons.is_empty() {
            continue;
        }
        effects.push(GroundEffectDescription {
            polygons,
            coefficient: number_property(&feature, "coefficient").unwrap_or(0.0),
        });
    }
    Ok(effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    const BUILDINGS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"height": 12.5, "id": 7, "absorption": [0.1, 0.3]},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]]]}
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[10,0],[12,0],[12,2],[10,0]]],
                    [[[20,0],[22,0],[22,2],[20,0]]]
                ]}
            }
        ]
    }"#;

    #[test]
    fn buildings_from_feature_collection() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("buildings.geojson");
        file.write_str(BUILDINGS).unwrap();
        let buildings = read_buildings_geojson(file.path().to_str().unwrap(), 6.0).unwrap();
        assert_eq!(buildings.len(), 3);
        assert!((buildings[0].height - 12.5).abs() < 1e-12);
        assert_eq!(buildings[0].id, Some(7));
        assert_eq!(buildings[0].absorption, vec![0.1, 0.3]);
        assert!((buildings[1].height - 6.0).abs() < 1e-12);
        assert_eq!(buildings[2].id, None);
        dir.close().unwrap();
    }

    #[test]
    fn ground_effects_default_coefficient() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("ground.geojson");
        file.write_str(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"coefficient": 0.8},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[5,0],[5,5],[0,0]]]}},
                {"type": "Feature", "properties": null,
                 "geometry": {"type": "Polygon", "coordinates": [[[10,0],[15,0],[15,5],[10,0]]]}}
            ]}"#,
        )
        .unwrap();
        let effects = read_ground_effects_geojson(file.path().to_str().unwrap()).unwrap();
        assert_eq!(effects.len(), 2);
        assert!((effects[0].coefficient - 0.8).abs() < 1e-12);
        assert_eq!(effects[1].coefficient, 0.0);
        dir.close().unwrap();
    }

    #[test]
    fn point_features_are_unsupported() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("points.geojson");
        file.write_str(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [1, 2]}}
            ]}"#,
        )
        .unwrap();
        let err = read_buildings_geojson(file.path().to_str().unwrap(), 6.0).unwrap_err();
        assert!(matches!(err, ProfileError::UnsupportedGeometry(_)));
        dir.close().unwrap();
    }
}
