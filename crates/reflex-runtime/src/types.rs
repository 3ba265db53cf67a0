//! Core runtime data types.

use indexmap::IndexMap;

/// A payload field value carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Text(String),
    Num(f64),
    Bool(bool),
}

impl PayloadValue {
    /// Numeric view; text and booleans coerce the way feature ops expect.
    pub fn as_f64(&self) -> f64 {
        match self {
            PayloadValue::Num(n) => *n,
            PayloadValue::Bool(true) => 1.0,
            PayloadValue::Bool(false) => 0.0,
            PayloadValue::Text(s) => s.parse().unwrap_or(0.0),
        }
    }

    /// String view, used for hashing payload fields.
    pub fn to_text(&self) -> String {
        match self {
            PayloadValue::Text(s) => s.clone(),
            PayloadValue::Num(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            PayloadValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::Text(s.to_owned())
    }
}

impl From<f64> for PayloadValue {
    fn from(n: f64) -> Self {
        PayloadValue::Num(n)
    }
}

/// Payload of an event: ordered field map.
pub type Payload = IndexMap<String, PayloadValue>;

/// A sensed event, timestamped by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Declaring sensor's name.
    pub sensor: String,
    /// Event type within that sensor.
    pub event_type: String,
    /// Host timestamp in milliseconds.
    pub t: f64,
    pub payload: Payload,
}

impl Event {
    pub fn new(sensor: impl Into<String>, event_type: impl Into<String>, t: f64) -> Self {
        Self {
            sensor: sensor.into(),
            event_type: event_type.into(),
            t,
            payload: Payload::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Context handed to effect bindings: the latest remembered event metadata
/// plus the aggregated feature vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextState {
    /// `target` payload field of the most recent remembered event.
    pub target: String,
    /// Type of the most recent remembered event.
    pub event_type: String,
    /// Recency-weighted aggregate over memory slots.
    pub features: Vec<f32>,
    /// Full metadata of the most recent remembered event.
    pub meta: Payload,
}

impl ContextState {
    /// Look up a context field by name, the way `ctx.<field>` bindings do.
    pub fn field(&self, name: &str) -> Option<&PayloadValue> {
        self.meta.get(name)
    }
}
