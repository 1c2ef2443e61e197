//! Request payload decoding and validation.
//!
//! The simulation posts loosely-shaped JSON. Everything is decoded once here into typed
//! structs with declared defaults so the rest of the pipeline never inspects raw values.

use crate::error::EndpointError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_PROFILE_TITLE: &str = "Your profile";
pub const UNKNOWN_LAW: &str = "Unknown";

/// What the student did in a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Report,
    Leak,
    Silence,
    #[serde(other)]
    Other,
}

impl DecisionKind {
    /// Single-letter code used in the scenario context block
    pub fn code(kind: Option<Self>) -> char {
        match kind {
            Some(DecisionKind::Leak) => 'L',
            Some(DecisionKind::Silence) => 'S',
            _ => 'R',
        }
    }
}

/// One recorded student choice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    pub kind: Option<DecisionKind>,
    pub law: Option<String>,
    pub scenario_id: Option<i64>,
}

impl Decision {
    /// The law this decision falls under, `"Unknown"` when not given
    pub fn law_or_unknown(&self) -> &str {
        self.law.as_deref().unwrap_or(UNKNOWN_LAW)
    }

    fn from_value(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Decision::default();
        };
        Decision {
            kind: fields
                .get("type")
                .and_then(Value::as_str)
                .map(|s| serde_json::from_value::<DecisionKind>(Value::String(s.to_string())))
                .and_then(Result::ok),
            law: fields.get("law").and_then(scalar_text),
            scenario_id: fields.get("scenarioId").and_then(lenient_int),
        }
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Decision::from_value(&value))
    }
}

/// Caller-supplied totals per decision type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub report: i64,
    pub leak: i64,
    pub silence: i64,
}

impl Counters {
    /// Sum of the three counters, widened so caller-supplied extremes cannot overflow
    pub fn total(&self) -> i128 {
        i128::from(self.report) + i128::from(self.leak) + i128::from(self.silence)
    }

    /// Anything that is not an object counts as all-zero; unusable fields count as 0
    fn from_value(value: &Value) -> Self {
        let count = |name: &str| value.get(name).and_then(lenient_int).unwrap_or(0);
        Counters {
            report: count("report"),
            leak: count("leak"),
            silence: count("silence"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    decisions: Vec<Decision>,
    #[serde(default)]
    counters: Option<Value>,
    #[serde(default)]
    profile_title: Option<Value>,
    #[serde(default)]
    laws_encountered: Option<Value>,
}

/// A validated summary request with every default applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub decisions: Vec<Decision>,
    pub counters: Counters,
    pub profile_title: String,
    /// Accepted for compatibility with the simulation; not used to build the prompt
    pub laws_encountered: Vec<String>,
}

impl SummaryRequest {
    /// Decode a raw request body. Anything other than a JSON object with a `decisions`
    /// array is rejected; the optional fields fall back to their defaults instead.
    pub fn from_slice(body: &[u8]) -> Result<Self, EndpointError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| EndpointError::InvalidRequest)?;
        if !value.is_object() {
            return Err(EndpointError::InvalidRequest);
        }
        let raw: RawRequest =
            serde_json::from_value(value).map_err(|_| EndpointError::InvalidRequest)?;

        let laws_encountered = match raw.laws_encountered {
            Some(Value::Array(laws)) => laws.iter().filter_map(scalar_text).collect(),
            _ => distinct_laws(&raw.decisions),
        };

        Ok(SummaryRequest {
            counters: raw
                .counters
                .as_ref()
                .map(Counters::from_value)
                .unwrap_or_default(),
            profile_title: raw
                .profile_title
                .as_ref()
                .and_then(scalar_text)
                .unwrap_or_else(|| DEFAULT_PROFILE_TITLE.to_string()),
            laws_encountered,
            decisions: raw.decisions,
        })
    }
}

/// Laws named on decisions, in order of first appearance
fn distinct_laws(decisions: &[Decision]) -> Vec<String> {
    let mut laws: Vec<String> = Vec::new();
    for law in decisions.iter().filter_map(|d| d.law.as_ref()) {
        if !laws.contains(law) {
            laws.push(law.clone());
        }
    }
    laws
}

/// Text form of a scalar JSON value; arrays, objects and null have none
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "" }.to_string()),
        _ => None,
    }
}

/// Integer coercion for ids: integers as-is, floats truncated, numeric strings parsed
pub(crate) fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}
