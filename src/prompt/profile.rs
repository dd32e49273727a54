// src/prompt/profile.rs
// Coarse user profile used to personalize answers

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub region: String,
    pub cultural_background: String,
    #[serde(default)]
    pub interests: BTreeSet<String>,
}

impl UserProfile {
    pub fn new(region: impl Into<String>, cultural_background: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            cultural_background: cultural_background.into(),
            interests: BTreeSet::new(),
        }
    }

    pub fn with_interest(mut self, interest: impl Into<String>) -> Self {
        self.interests.insert(interest.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_wire_format() {
        let profile: UserProfile = serde_json::from_value(json!({
            "region": "South Asia",
            "culturalBackground": "Tamil",
            "interests": ["bronzes", "temple architecture", "bronzes"]
        }))
        .unwrap();

        assert_eq!(profile.cultural_background, "Tamil");
        assert_eq!(profile.interests.len(), 2);
    }

    #[test]
    fn test_interests_optional() {
        let profile: UserProfile =
            serde_json::from_value(json!({"region": "Andes", "culturalBackground": "Quechua"})).unwrap();
        assert!(profile.interests.is_empty());
    }
}
