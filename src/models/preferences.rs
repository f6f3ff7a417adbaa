use serde::{ Serialize, Deserialize };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sillage {
    #[serde(rename = "ModerateSillage")]
    Soft,
    #[serde(rename = "StrongSillage")]
    Moderate,
    #[serde(rename = "BeastModeSillage")]
    Strong,
}

impl Default for Sillage {
    fn default() -> Self {
        Sillage::Soft
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Longevity {
    #[serde(rename = "ShortLongevity")]
    Intimate,
    #[serde(rename = "ModerateLongevity")]
    Moderate,
    #[serde(rename = "LongLongevity")]
    LongLasting,
}

impl Default for Longevity {
    fn default() -> Self {
        Longevity::Moderate
    }
}

/// Answers collected by the scent quiz, as stored under
/// `/user/{user_id}/scent-profile`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScentProfile {
    #[serde(default)]
    pub vibe: String,
    #[serde(default)]
    pub scene: String,
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default)]
    pub loved: Option<String>,
    #[serde(default)]
    pub disliked: Option<String>,
    #[serde(default)]
    pub sillage: Option<Sillage>,
    #[serde(default)]
    pub longevity: Option<Longevity>,
    #[serde(default)]
    pub additional: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScentProfileResponse {
    pub user_id: String,
    #[serde(default)]
    pub profile: Option<ScentProfile>,
}
