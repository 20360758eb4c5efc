use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde_json::json;

use super::route::Route;
use crate::Error;

impl Route {
    /// Converts the route to a `GeoJSON` `FeatureCollection` with one
    /// `LineString` per edge and a summary in the collection members.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let features = self
            .steps()
            .windows(2)
            .enumerate()
            .map(|(idx, pair)| {
                let (from, to) = (&pair[0], &pair[1]);
                let coords: Vec<Coord<f64>> =
                    vec![from.node.geometry().into(), to.node.geometry().into()];
                let geometry = Geometry::new(GeoJsonValue::from(&LineString::new(coords)));
                let edge = to.incoming.as_ref();

                let value = json!({
                    "type": "Feature",
                    "geometry": geometry,
                    "properties": {
                        "edge_index": idx,
                        "from_id": from.node.id,
                        "to_id": to.node.id,
                        "to_name": to.node.display_name(),
                        "distance": edge.map(|e| e.distance),
                        "accessibility_penalty": edge.map(|e| e.accessibility_penalty),
                    }
                });

                serde_json::from_value::<Feature>(value)
                    .map_err(|e| Error::GeoJsonError(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut members = serde_json::Map::new();
        members.insert("total_distance".to_string(), json!(self.total_distance()));
        members.insert("estimated_time".to_string(), json!(self.estimated_time()));
        members.insert("accessible".to_string(), json!(self.accessible()));

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: Some(members),
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{CampusGraph, EdgeRecord, NodeRecord, plan};

    #[test]
    fn renders_one_feature_per_edge() {
        let nodes = vec![
            NodeRecord::new("a", 39.9, 116.4),
            NodeRecord::new("b", 39.901, 116.4),
            NodeRecord::new("c", 39.901, 116.401),
        ];
        let edges = vec![
            EdgeRecord::new("a", "b", 111.0),
            EdgeRecord::new("b", "c", 85.0).with_penalty(3.0),
        ];
        let graph = CampusGraph::load(nodes, edges).unwrap();
        let route = plan(&graph, "a", "c", true).unwrap();

        let collection = route.to_geojson().unwrap();
        assert_eq!(collection.features.len(), 2);
        let first = &collection.features[0];
        assert!(first.geometry.is_some());
        assert_eq!(first.properties.as_ref().unwrap()["from_id"], "a");

        let second = collection.features[1].properties.as_ref().unwrap();
        assert_eq!(second["to_id"], "c");
        assert_eq!(second["accessibility_penalty"], 3.0);

        let members = collection.foreign_members.as_ref().unwrap();
        assert_eq!(members["accessible"], false);

        let text = route.to_geojson_string().unwrap();
        assert!(text.contains("FeatureCollection"));
    }
}
