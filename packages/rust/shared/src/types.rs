//! STAC document types written by the catalog generator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// STAC specification version stamped on every document.
pub const STAC_VERSION: &str = "1.0.0";

/// Schema URI of the STAC scientific citation extension (`sci:doi`).
pub const SCIENTIFIC_EXTENSION: &str =
    "https://stac-extensions.github.io/scientific/v1.0.0/schema.json";

/// Free-form fields flattened into a document (`osc:*`, `sci:*`, ...).
pub type ExtraFields = Map<String, Value>;

// ---------------------------------------------------------------------------
// OscType
// ---------------------------------------------------------------------------

/// The kind of entity a document describes (`osc:type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OscType {
    Theme,
    Variable,
    Product,
    Project,
}

impl OscType {
    /// The value stored in `osc:type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "Theme",
            Self::Variable => "Variable",
            Self::Product => "Product",
            Self::Project => "Project",
        }
    }

    /// Output subdirectory for documents of this kind (`themes`, `variables`, ...).
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Theme => "themes",
            Self::Variable => "variables",
            Self::Product => "products",
            Self::Project => "projects",
        }
    }
}

impl std::fmt::Display for OscType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// Link relation types used in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelType {
    Root,
    Parent,
    Child,
    Item,
    Collection,
    Via,
    Alternate,
    #[serde(rename = "self")]
    SelfLink,
    #[serde(other)]
    Other,
}

/// A STAC link object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: RelType,
    pub href: String,
    /// Media type of the target.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: RelType, href: impl Into<String>) -> Self {
        Self {
            rel,
            href: href.into(),
            media_type: None,
            title: None,
        }
    }

    /// A JSON link (`application/json`), used for all intra-catalog links.
    pub fn json(rel: RelType, href: impl Into<String>) -> Self {
        Self::new(rel, href).with_type("application/json")
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A GeoJSON position (`[x, y]` or `[x, y, z]`).
pub type Position = Vec<f64>;

/// The GeoJSON geometries the catalog can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    Polygon { coordinates: Vec<Vec<Position>> },
}

impl Geometry {
    /// Bounding box `[minx, miny, maxx, maxy]` over all positions.
    ///
    /// Returns `None` if no position has at least two coordinates.
    pub fn bbox(&self) -> Option<[f64; 4]> {
        let positions: Vec<&Position> = match self {
            Self::Point { coordinates } => vec![coordinates],
            Self::Polygon { coordinates } => coordinates.iter().flatten().collect(),
        };

        positions
            .into_iter()
            .filter(|p| p.len() >= 2)
            .fold(None, |acc, p| {
                let (x, y) = (p[0], p[1]);
                Some(match acc {
                    None => [x, y, x, y],
                    Some([minx, miny, maxx, maxy]) => {
                        [minx.min(x), miny.min(y), maxx.max(x), maxy.max(y)]
                    }
                })
            })
    }
}

// ---------------------------------------------------------------------------
// Extent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub interval: Vec<[Option<String>; 2]>,
}

/// Collection extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

impl Extent {
    /// Whole-globe, open-ended extent.
    pub fn global() -> Self {
        Self {
            spatial: SpatialExtent {
                bbox: vec![[-180.0, -90.0, 180.0, 90.0]],
            },
            temporal: TemporalExtent {
                interval: vec![[None, None]],
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Root `catalog.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra_fields: ExtraFields,
}

impl Catalog {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: "Catalog".into(),
            stac_version: STAC_VERSION.into(),
            id: id.into(),
            title: None,
            description: description.into(),
            links: Vec::new(),
            extra_fields: ExtraFields::new(),
        }
    }
}

/// A theme or variable collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub license: String,
    pub extent: Extent,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra_fields: ExtraFields,
}

impl Collection {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: "Collection".into(),
            stac_version: STAC_VERSION.into(),
            id: id.into(),
            title: None,
            description: description.into(),
            license: "proprietary".into(),
            extent: Extent::global(),
            links: Vec::new(),
            extra_fields: ExtraFields::new(),
        }
    }

    /// First href with the given relation, if any.
    pub fn link_href(&self, rel: RelType) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == rel)
            .map(|l| l.href.as_str())
    }
}

/// A product or project item (GeoJSON Feature).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    pub properties: ExtraFields,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub assets: ExtraFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Item {
    /// Create an item; `bbox` is derived from the geometry.
    pub fn new(id: impl Into<String>, geometry: Option<Geometry>, properties: ExtraFields) -> Self {
        let bbox = geometry.as_ref().and_then(Geometry::bbox);
        Self {
            kind: "Feature".into(),
            stac_version: STAC_VERSION.into(),
            stac_extensions: Vec::new(),
            id: id.into(),
            geometry,
            bbox,
            properties,
            links: Vec::new(),
            assets: ExtraFields::new(),
            collection: None,
        }
    }

    /// String property lookup.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// The fields shared by every document, used when walking a written catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentHeader {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_serializes_type_field() {
        let link = Link::json(RelType::Child, "./themes/land.json");
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(
            value,
            json!({"rel": "child", "href": "./themes/land.json", "type": "application/json"})
        );
    }

    #[test]
    fn unknown_rel_deserializes_as_other() {
        let link: Link = serde_json::from_value(json!({"rel": "license", "href": "x"})).unwrap();
        assert_eq!(link.rel, RelType::Other);
    }

    #[test]
    fn collection_flattens_extra_fields() {
        let mut coll = Collection::new("land", "Land theme");
        coll.extra_fields.insert("osc:type".into(), json!("Theme"));

        let value = serde_json::to_value(&coll).unwrap();
        assert_eq!(value["type"], "Collection");
        assert_eq!(value["osc:type"], "Theme");
        assert_eq!(value["license"], "proprietary");
        assert_eq!(value["extent"]["spatial"]["bbox"], json!([[-180.0, -90.0, 180.0, 90.0]]));
        assert_eq!(value["extent"]["temporal"]["interval"], json!([[null, null]]));
    }

    #[test]
    fn item_without_geometry_serializes_null() {
        let item = Item::new("project-1", None, ExtraFields::new());
        let value = serde_json::to_value(&item).unwrap();
        assert!(value["geometry"].is_null());
        assert!(value.get("bbox").is_none());
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["assets"], json!({}));
    }

    #[test]
    fn polygon_bbox_spans_all_rings() {
        let geom = Geometry::Polygon {
            coordinates: vec![
                vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![10.0, 5.0], vec![0.0, 0.0]],
                vec![vec![-2.0, 1.0], vec![1.0, 7.0], vec![-2.0, 1.0]],
            ],
        };
        assert_eq!(geom.bbox(), Some([-2.0, 0.0, 10.0, 7.0]));
    }

    #[test]
    fn geometry_tagged_by_type() {
        let point = Geometry::Point {
            coordinates: vec![12.5, 41.9],
        };
        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(value, json!({"type": "Point", "coordinates": [12.5, 41.9]}));
        assert_eq!(point.bbox(), Some([12.5, 41.9, 12.5, 41.9]));
    }

    #[test]
    fn osc_type_directories() {
        assert_eq!(OscType::Theme.dir_name(), "themes");
        assert_eq!(OscType::Project.dir_name(), "projects");
        assert_eq!(OscType::Variable.to_string(), "Variable");
    }
}
