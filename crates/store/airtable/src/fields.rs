//! Mapping between domain rows and Airtable field maps.
//!
//! Airtable leaves unchecked checkboxes and empty cells out of responses, so
//! every optional or boolean field is read leniently.

use chrono::{DateTime, Utc};
use exposr_core::{FeedbackRecord, FeedbackType, StoredRecord, Verdict};
use exposr_store::StoreError;
use serde_json::{Map, Value, json};

pub const ANALYSIS_ID: &str = "Analysis_ID";
pub const FILENAME: &str = "Filename";
pub const CONFIDENCE: &str = "Confidence";
pub const VERDICT: &str = "Verdict";
pub const AI_DETECTED: &str = "AI_Detected";
pub const TIMESTAMP: &str = "Timestamp";
pub const FILE_FORMAT: &str = "File_Format";
pub const IMAGE_WIDTH: &str = "Image_Width";
pub const IMAGE_HEIGHT: &str = "Image_Height";
pub const FILE_SIZE_KB: &str = "File_Size_KB";
pub const MEDIA_ID: &str = "Cloudinary_Image_ID";
pub const IMAGE_URL: &str = "Image_URL";
pub const DELETE_CODE_DIGEST: &str = "Delete_Code_Digest";
pub const ENCRYPTED_DATA: &str = "Encrypted_Data";
pub const COUNTRY: &str = "Country";
pub const REGION: &str = "Region";
pub const RESEARCH_CONSENT: &str = "Research_Consent";

pub const FEEDBACK_ID: &str = "Feedback_ID";
pub const FEEDBACK_TYPE: &str = "Feedback_Type";
pub const COMMENT: &str = "Comment";

pub(crate) fn analysis_fields(record: &StoredRecord) -> Value {
    let mut fields = Map::new();
    fields.insert(ANALYSIS_ID.into(), json!(record.analysis_id));
    fields.insert(FILENAME.into(), json!(record.filename));
    fields.insert(CONFIDENCE.into(), json!(record.confidence));
    fields.insert(VERDICT.into(), json!(record.verdict.label()));
    fields.insert(AI_DETECTED.into(), json!(record.is_ai));
    fields.insert(TIMESTAMP.into(), json!(record.timestamp.to_rfc3339()));
    fields.insert(FILE_FORMAT.into(), json!(record.file_format));
    fields.insert(IMAGE_WIDTH.into(), json!(record.image_width));
    fields.insert(IMAGE_HEIGHT.into(), json!(record.image_height));
    fields.insert(FILE_SIZE_KB.into(), json!(record.file_size_kb));
    fields.insert(DELETE_CODE_DIGEST.into(), json!(record.delete_code_digest));
    fields.insert(RESEARCH_CONSENT.into(), json!(record.research_consent));

    let optional = [
        (MEDIA_ID, &record.media_id),
        (IMAGE_URL, &record.image_url),
        (ENCRYPTED_DATA, &record.encrypted_context),
        (COUNTRY, &record.country),
        (REGION, &record.region),
    ];
    for (name, value) in optional {
        if let Some(v) = value {
            fields.insert(name.into(), json!(v));
        }
    }
    json!({ "fields": fields })
}

pub(crate) fn analysis_from_fields(
    record_id: &str,
    fields: &Map<String, Value>,
) -> Result<StoredRecord, StoreError> {
    let verdict_label = required_str(fields, VERDICT)?;
    let verdict = Verdict::from_label(&verdict_label)
        .ok_or_else(|| StoreError::Serialization(format!("unknown verdict {verdict_label:?}")))?;

    Ok(StoredRecord {
        record_id: record_id.to_owned(),
        analysis_id: required_str(fields, ANALYSIS_ID)?,
        filename: opt_str(fields, FILENAME).unwrap_or_default(),
        confidence: u8::try_from(number(fields, CONFIDENCE).min(100)).unwrap_or(100),
        verdict,
        is_ai: flag(fields, AI_DETECTED),
        timestamp: timestamp(fields, TIMESTAMP)?,
        file_format: opt_str(fields, FILE_FORMAT).unwrap_or_default(),
        image_width: u32::try_from(number(fields, IMAGE_WIDTH)).unwrap_or(u32::MAX),
        image_height: u32::try_from(number(fields, IMAGE_HEIGHT)).unwrap_or(u32::MAX),
        file_size_kb: number(fields, FILE_SIZE_KB),
        delete_code_digest: opt_str(fields, DELETE_CODE_DIGEST).unwrap_or_default(),
        media_id: opt_str(fields, MEDIA_ID),
        image_url: opt_str(fields, IMAGE_URL),
        research_consent: flag(fields, RESEARCH_CONSENT),
        country: opt_str(fields, COUNTRY),
        region: opt_str(fields, REGION),
        encrypted_context: opt_str(fields, ENCRYPTED_DATA),
    })
}

pub(crate) fn feedback_fields(feedback: &FeedbackRecord) -> Value {
    let mut fields = Map::new();
    fields.insert(FEEDBACK_ID.into(), json!(feedback.feedback_id));
    fields.insert(ANALYSIS_ID.into(), json!(feedback.analysis_id));
    fields.insert(FEEDBACK_TYPE.into(), json!(feedback.feedback_type.as_str()));
    fields.insert(TIMESTAMP.into(), json!(feedback.timestamp.to_rfc3339()));
    if let Some(comment) = &feedback.comment {
        fields.insert(COMMENT.into(), json!(comment));
    }
    json!({ "fields": fields })
}

pub(crate) fn feedback_from_fields(
    fields: &Map<String, Value>,
) -> Result<FeedbackRecord, StoreError> {
    let raw_type = required_str(fields, FEEDBACK_TYPE)?;
    let feedback_type = raw_type
        .parse::<FeedbackType>()
        .map_err(StoreError::Serialization)?;
    Ok(FeedbackRecord {
        feedback_id: opt_str(fields, FEEDBACK_ID).unwrap_or_default(),
        analysis_id: opt_str(fields, ANALYSIS_ID).unwrap_or_default(),
        feedback_type,
        comment: opt_str(fields, COMMENT),
        timestamp: timestamp(fields, TIMESTAMP)?,
    })
}

/// Quote a value for use inside a `filterByFormula` string literal.
pub(crate) fn formula_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// `{field}='value'`
pub(crate) fn equals_formula(field: &str, value: &str) -> String {
    format!("{{{field}}}={}", formula_literal(value))
}

fn opt_str(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn required_str(fields: &Map<String, Value>, name: &str) -> Result<String, StoreError> {
    opt_str(fields, name).ok_or_else(|| StoreError::Serialization(format!("missing field {name}")))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn number(fields: &Map<String, Value>, name: &str) -> u64 {
    match fields.get(name) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0).round() as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn flag(fields: &Map<String, Value>, name: &str) -> bool {
    fields.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn timestamp(fields: &Map<String, Value>, name: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw = required_str(fields, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad {name} {raw:?}: {e}")))
}
