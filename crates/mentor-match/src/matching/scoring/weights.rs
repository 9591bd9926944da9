use serde::{Deserialize, Serialize};

/// Points awarded per compatibility dimension. The defaults sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub category: f64,
    pub level: f64,
    pub interests: f64,
    pub location: f64,
    pub language: f64,
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.category + self.level + self.interests + self.location + self.language
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            category: 40.0,
            level: 20.0,
            interests: 15.0,
            location: 15.0,
            language: 10.0,
        }
    }
}
