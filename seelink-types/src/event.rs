//! Control channel events
//!
//! Inbound lines are classified once, at the boundary, into an
//! [`EventRecord`] keyed by a closed [`EventKind`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Key carrying the event type on the wire
pub const EVENT_TAG: &str = "Event";

/// Event type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    ThreePpa,
    AiProcess,
    Alert,
    Annotate,
    AutoFocus,
    AutoGoto,
    AutoGotoStep,
    BalanceSensor,
    ContinuousExposure,
    DarkLibrary,
    DiskSpace,
    Exposure,
    FocuserMove,
    GSensorMove,
    Initialise,
    MountMode,
    MoveByAngle,
    PiStatus,
    PlateSolve,
    SaveImage,
    ScopeGoto,
    ScopeHome,
    ScopeMoveToHorizon,
    ScopeTrack,
    Stack,
    View,
    WheelMove,

    /// Command response tagged with its method name
    Response(String),

    /// Event tag not known to this crate
    Unknown(String),
}

impl EventKind {
    /// Map a wire tag to its kind
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "3PPA" => Self::ThreePpa,
            "AIProcess" => Self::AiProcess,
            "Alert" => Self::Alert,
            "Annotate" => Self::Annotate,
            "AutoFocus" => Self::AutoFocus,
            "AutoGoto" => Self::AutoGoto,
            "AutoGotoStep" => Self::AutoGotoStep,
            "BalanceSensor" => Self::BalanceSensor,
            "ContinuousExposure" => Self::ContinuousExposure,
            "DarkLibrary" => Self::DarkLibrary,
            "DiskSpace" => Self::DiskSpace,
            "Exposure" => Self::Exposure,
            "FocuserMove" => Self::FocuserMove,
            "GSensorMove" => Self::GSensorMove,
            "Initialise" => Self::Initialise,
            "MountMode" => Self::MountMode,
            "MoveByAngle" => Self::MoveByAngle,
            "PiStatus" => Self::PiStatus,
            "PlateSolve" => Self::PlateSolve,
            "SaveImage" => Self::SaveImage,
            "ScopeGoto" => Self::ScopeGoto,
            "ScopeHome" => Self::ScopeHome,
            "ScopeMoveToHorizon" => Self::ScopeMoveToHorizon,
            "ScopeTrack" => Self::ScopeTrack,
            "Stack" => Self::Stack,
            "View" => Self::View,
            "WheelMove" => Self::WheelMove,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire tag (or method name for responses)
    pub fn as_str(&self) -> &str {
        match self {
            Self::ThreePpa => "3PPA",
            Self::AiProcess => "AIProcess",
            Self::Alert => "Alert",
            Self::Annotate => "Annotate",
            Self::AutoFocus => "AutoFocus",
            Self::AutoGoto => "AutoGoto",
            Self::AutoGotoStep => "AutoGotoStep",
            Self::BalanceSensor => "BalanceSensor",
            Self::ContinuousExposure => "ContinuousExposure",
            Self::DarkLibrary => "DarkLibrary",
            Self::DiskSpace => "DiskSpace",
            Self::Exposure => "Exposure",
            Self::FocuserMove => "FocuserMove",
            Self::GSensorMove => "GSensorMove",
            Self::Initialise => "Initialise",
            Self::MountMode => "MountMode",
            Self::MoveByAngle => "MoveByAngle",
            Self::PiStatus => "PiStatus",
            Self::PlateSolve => "PlateSolve",
            Self::SaveImage => "SaveImage",
            Self::ScopeGoto => "ScopeGoto",
            Self::ScopeHome => "ScopeHome",
            Self::ScopeMoveToHorizon => "ScopeMoveToHorizon",
            Self::ScopeTrack => "ScopeTrack",
            Self::Stack => "Stack",
            Self::View => "View",
            Self::WheelMove => "WheelMove",
            Self::Response(method) => method,
            Self::Unknown(tag) => tag,
        }
    }

    /// Check if this is a synthesized command response
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Event type
    pub kind: EventKind,

    /// Full message as received
    pub body: Map<String, Value>,

    /// Local receive time
    pub received_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(kind: EventKind, body: Map<String, Value>) -> Self {
        Self {
            kind,
            body,
            received_at: Utc::now(),
        }
    }

    /// `state` field, present on most progress events
    pub fn state(&self) -> Option<&str> {
        self.body.get("state").and_then(Value::as_str)
    }

    /// `error` description
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    /// Numeric error/result code
    pub fn code(&self) -> Option<i64> {
        self.body.get("code").and_then(Value::as_i64)
    }

    /// `result` of a command response
    pub fn result(&self) -> Option<&Value> {
        self.body.get("result")
    }

    /// Device-side `Timestamp` (seconds since boot, as a string)
    pub fn timestamp(&self) -> Option<&str> {
        self.body.get("Timestamp").and_then(Value::as_str)
    }

    /// Field by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Deserialize the body into a typed event
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.body.clone()))?)
    }
}

/// Classify one control channel line
///
/// Returns `Ok(None)` for objects that carry neither an event tag nor a
/// `result` (nothing to store).
///
/// # Errors
///
/// Returns an error if the line is not JSON or not a JSON object.
///
/// # Examples
///
/// ```
/// use seelink_types::{classify, EventKind};
///
/// let event = classify(r#"{"Event":"PiStatus","battery_capacity":42}"#).unwrap().unwrap();
/// assert_eq!(event.kind, EventKind::PiStatus);
///
/// let response = classify(r#"{"method":"scope_get_equ_coord","result":{"ra":1.0},"code":0}"#)
///     .unwrap()
///     .unwrap();
/// assert_eq!(response.kind, EventKind::Response("scope_get_equ_coord".into()));
/// ```
pub fn classify(line: &str) -> Result<Option<EventRecord>> {
    let body = match serde_json::from_str::<Value>(line.trim())? {
        Value::Object(body) => body,
        _ => return Err(Error::NotAnObject),
    };

    let tag = body
        .get(EVENT_TAG)
        .or_else(|| body.get("event"))
        .and_then(Value::as_str)
        .map(EventKind::from_tag);

    let kind = match tag {
        Some(kind) => kind,
        None if body.contains_key("result") => {
            match body.get("method").and_then(Value::as_str) {
                Some(method) => EventKind::Response(method.to_string()),
                None => return Ok(None),
            }
        }
        None => return Ok(None),
    };

    Ok(Some(EventRecord::new(kind, body)))
}
