use serde_json::{json, Value};

/// JSON schema for a single extracted transaction.
///
/// The category enum is rebuilt per call from the caller's taxonomy so the
/// model cannot invent categories the user does not have.
pub fn extraction_schema(categories: &[String]) -> Value {
    json!({
        "type": "object",
        "properties": {
            "amount": { "type": "number" },
            "category": { "type": "string", "enum": categories },
            "description": { "type": "string" },
            "transcription": { "type": "string" },
            "type": { "type": "string", "enum": ["income", "outcome"] }
        },
        "required": ["amount", "category", "description", "transcription", "type"]
    })
}

/// Schema for a batched response: one entry per input clip, each tagged with
/// the id echoed from the prompt.
pub fn batch_schema(categories: &[String]) -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "amount": { "type": "number" },
                "category": { "type": "string", "enum": categories },
                "description": { "type": "string" },
                "transcription": { "type": "string" },
                "type": { "type": "string", "enum": ["income", "outcome"] }
            },
            "required": ["id", "amount", "category", "description", "transcription", "type"]
        }
    })
}

/// Schema for a batched text-extraction response (no per-item ids).
pub fn text_batch_schema(categories: &[String]) -> Value {
    json!({
        "type": "array",
        "items": extraction_schema(categories)
    })
}
