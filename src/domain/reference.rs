//! Reference lookup entities used by the profile form selects.

use serde::{Deserialize, Serialize};

/// Administrative region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: i64,
    pub region: String,
}

/// Town, belonging to exactly one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Town {
    pub id: i64,
    pub town: String,
    pub region_id: i64,
}

/// Entry of the static country table behind the phone code picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub phone_code: String,
    pub label: String,
    pub label_ua: String,
    pub label_ru: String,
    pub country_code: String,
}

impl Country {
    /// Icon name of the country's round flag.
    pub fn flag_icon(&self) -> String {
        format!("circle-flags:{}", self.country_code.to_lowercase())
    }
}
