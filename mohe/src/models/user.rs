use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub mbti: Option<String>,
    pub age_range: Option<String>,
    pub transportation: Option<String>,
    pub preferences: Option<String>,
}

impl User {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            mbti: None,
            age_range: None,
            transportation: None,
            preferences: None,
        }
    }

    pub fn with_mbti(self, mbti: impl Into<String>) -> Self {
        Self {
            mbti: Some(mbti.into()),
            ..self
        }
    }

    /// Uppercased MBTI code, ignoring blank values.
    pub fn mbti_code(&self) -> Option<String> {
        self.mbti
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_uppercase)
    }
}
