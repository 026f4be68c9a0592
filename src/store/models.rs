use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingKind {
    Income,
    Outcome,
}

/// Seed taxonomy for fresh installs
pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "food",
    "entertainment",
    "clothing",
    "transportation",
    "utilities",
    "healthcare",
    "education",
    "shopping",
    "other",
];

/// A captured voice recording and the transaction fields extracted from it.
///
/// Freshly captured recordings carry only the clip; once transcription and
/// extraction fill in amount/kind/category/description it counts as a
/// completed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    /// Clip length in seconds
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordingKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub wallet_id: String,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    /// True once all transaction fields have been filled in
    pub fn is_transaction(&self) -> bool {
        self.amount.is_some()
            && self.kind.is_some()
            && self.category_id.is_some()
            && self.description.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub name: String,
    pub balance: f64,
}
