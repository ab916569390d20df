use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Feature names in the order requests are encoded.
pub const FEATURE_NAMES: [&str; 6] = [
    "source_centrality",
    "target_centrality",
    "source_name_length",
    "target_name_length",
    "same_work",
    "source_in_work",
];

/// Classifier input for one relationship.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub source_centrality: f64,
    pub target_centrality: f64,
    pub source_name_length: u32,
    pub target_name_length: u32,
    #[serde(default, with = "flag")]
    pub same_work: bool,
    #[serde(default, with = "flag")]
    pub source_in_work: bool,
}

impl FeatureVector {
    pub const NAMES: [&'static str; 6] = FEATURE_NAMES;

    /// Value of a named feature, as the model sees it.
    pub fn value(&self, name: &str) -> Option<f64> {
        let value = match name {
            "source_centrality" => self.source_centrality,
            "target_centrality" => self.target_centrality,
            "source_name_length" => f64::from(self.source_name_length),
            "target_name_length" => f64::from(self.target_name_length),
            "same_work" => indicator(self.same_work),
            "source_in_work" => indicator(self.source_in_work),
            _ => return None,
        };
        Some(value)
    }

    pub fn values(&self) -> [f64; 6] {
        [
            self.source_centrality,
            self.target_centrality,
            f64::from(self.source_name_length),
            f64::from(self.target_name_length),
            indicator(self.same_work),
            indicator(self.source_in_work),
        ]
    }
}

fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// 0|1 integers on the wire, booleans in memory. `true`/`false` are accepted too.
mod flag {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Int(u64),
        Bool(bool),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Wire::deserialize(deserializer)? {
            Wire::Int(0) | Wire::Bool(false) => Ok(false),
            Wire::Int(1) | Wire::Bool(true) => Ok(true),
            Wire::Int(other) => Err(serde::de::Error::custom(format!(
                "expected 0 or 1, got {other}"
            ))),
        }
    }
}
