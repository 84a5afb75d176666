//! GeoJSON point features: the record type the API stores.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::record::Record;

pub const MAX_NAME_LEN: usize = 120;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointTag {
    #[default]
    Point,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTag {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Reefer,
    Tobacco,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Reefer => "Reefer",
            Category::Tobacco => "Tobacco",
            Category::Other => "Other",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Reefer" => Ok(Category::Reefer),
            "Tobacco" => Ok(Category::Tobacco),
            "Other" => Ok(Category::Other),
            other => Err(ModelError::Validation(format!("unknown category: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Point {
    #[serde(rename = "type", default)]
    pub kind: PointTag,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { kind: PointTag::Point, coordinates: [lon, lat] }
    }

    pub fn lon(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Props {
    #[serde(deserialize_with = "trimmed")]
    pub name: String,
    pub category: Category,
    #[serde(default, deserialize_with = "trimmed_opt", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Feature {
    #[serde(default = "new_key", deserialize_with = "trimmed")]
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: FeatureTag,
    pub geometry: Point,
    pub properties: Props,
}

impl Feature {
    pub fn new(name: impl Into<String>, category: Category, lon: f64, lat: f64) -> Self {
        Self {
            key: new_key(),
            kind: FeatureTag::Feature,
            geometry: Point::new(lon, lat),
            properties: Props { name: name.into().trim().to_string(), category, description: None, version: 0 },
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let d = description.into().trim().to_string();
        self.properties.description = if d.is_empty() { None } else { Some(d) };
        self
    }
}

impl Record for Feature {
    fn key(&self) -> &str {
        &self.key
    }

    fn version(&self) -> u64 {
        self.properties.version
    }

    fn set_version(&mut self, version: u64) {
        self.properties.version = version;
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.key.is_empty() {
            return Err(ModelError::Validation("key must not be empty".into()));
        }
        let (lon, lat) = (self.geometry.lon(), self.geometry.lat());
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(ModelError::Validation("longitude must be within [-180, 180]".into()));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ModelError::Validation("latitude must be within [-90, 90]".into()));
        }
        let name = &self.properties.name;
        if name.is_empty() {
            return Err(ModelError::Validation("name must not be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ModelError::Validation(format!("name longer than {MAX_NAME_LEN} characters")));
        }
        if let Some(d) = &self.properties.description {
            if d.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(ModelError::Validation(format!(
                    "description longer than {MAX_DESCRIPTION_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    pub kind: CollectionTag,
    pub features: Vec<Feature>,
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self { kind: CollectionTag::FeatureCollection, features }
    }
}

fn new_key() -> String {
    Uuid::new_v4().to_string()
}

fn trimmed<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let s = String::deserialize(d)?;
    Ok(s.trim().to_string())
}

fn trimmed_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let s = Option::<String>::deserialize(d)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}
