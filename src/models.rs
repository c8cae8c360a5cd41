use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform tag attached to an answer.
///
/// The four CDPs plus the `multiple` / `none` sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Segment,
    Mparticle,
    Lytics,
    Zeotap,
    Multiple,
    None,
}

impl Platform {
    /// The four supported CDPs, in detection order.
    pub const KNOWN: [Platform; 4] = [
        Platform::Segment,
        Platform::Mparticle,
        Platform::Lytics,
        Platform::Zeotap,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Platform::Segment => "segment",
            Platform::Mparticle => "mparticle",
            Platform::Lytics => "lytics",
            Platform::Zeotap => "zeotap",
            Platform::Multiple => "multiple",
            Platform::None => "none",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Segment => "Segment",
            Platform::Mparticle => "mParticle",
            Platform::Lytics => "Lytics",
            Platform::Zeotap => "Zeotap",
            Platform::Multiple => "Multiple",
            Platform::None => "None",
        }
    }

    /// Case-insensitive parse of a platform tag.
    pub fn parse(value: &str) -> Option<Platform> {
        match value.trim().to_lowercase().as_str() {
            "segment" => Some(Platform::Segment),
            "mparticle" => Some(Platform::Mparticle),
            "lytics" => Some(Platform::Lytics),
            "zeotap" => Some(Platform::Zeotap),
            "multiple" => Some(Platform::Multiple),
            "none" => Some(Platform::None),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    HowTo,
    Comparison,
    General,
    Irrelevant,
    Error,
}

impl Category {
    pub fn parse(value: &str) -> Option<Category> {
        match value.trim().to_lowercase().as_str() {
            "how-to" | "howto" => Some(Category::HowTo),
            "comparison" => Some(Category::Comparison),
            "general" => Some(Category::General),
            "irrelevant" => Some(Category::Irrelevant),
            "error" => Some(Category::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub confidence: f64,
    pub category: Category,
}

impl Metadata {
    pub fn new(platform: Platform, confidence: f64, category: Category) -> Self {
        Self {
            platform: Some(platform),
            confidence: clamp_confidence(confidence),
            category,
        }
    }
}

/// Clamp into `[0, 1]`; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Answer plus metadata for a single question, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub answer: String,
    pub metadata: Metadata,
}

/// Insert shape accepted by `POST /api/messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: u64,
    pub question: String,
    pub answer: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}
