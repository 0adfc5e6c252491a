use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Consent kind gating retention of the uploaded image for research use.
pub const RESEARCH_TRAINING: &str = "research_training";

/// User-supplied consent flags, keyed by consent kind.
///
/// Kinds that are absent read as not granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConsentFlags(BTreeMap<String, bool>);

impl ConsentFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON object sent in the `consent` form field.
    ///
    /// Non-boolean values are ignored rather than rejected, so
    /// `{"research_training": "yes"}` grants nothing.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)?;
        Ok(Self(
            map.into_iter()
                .filter_map(|(k, v)| v.as_bool().map(|b| (k, b)))
                .collect(),
        ))
    }

    #[must_use]
    pub fn with(mut self, kind: impl Into<String>, granted: bool) -> Self {
        self.0.insert(kind.into(), granted);
        self
    }

    pub fn granted(&self, kind: &str) -> bool {
        self.0.get(kind).copied().unwrap_or(false)
    }

    pub fn research_training(&self) -> bool {
        self.granted(RESEARCH_TRAINING)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_owned())
    }
}
