//! Typed event bodies
//!
//! Decode with [`EventRecord::decode`](crate::EventRecord::decode). Fields
//! the firmware omits on some states are optional; unknown fields are
//! ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Progress state shared by most long-running operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    Start,
    Working,
    Complete,
    Fail,
    Cancel,
    Stopped,
    Idle,
    #[serde(other)]
    Other,
}

impl OperationState {
    /// Check if the operation has ended, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Fail | Self::Cancel | Self::Stopped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub error: String,
    pub code: i64,
}

/// Battery and board temperature
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PiStatus {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub battery_temp: Option<i64>,
    #[serde(default)]
    pub battery_capacity: Option<i64>,
    #[serde(default)]
    pub charger_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSpace {
    pub used_percent: i64,
}

/// Live stacking progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub state: OperationState,
    #[serde(default)]
    pub lapse_ms: Option<i64>,
    #[serde(default)]
    pub frame_errcode: Option<i64>,
    #[serde(default)]
    pub stacked_frame: Option<i64>,
    #[serde(default)]
    pub dropped_frame: Option<i64>,
    #[serde(default)]
    pub total_frame: Option<i64>,
    #[serde(default)]
    pub frame_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub can_annotate: Option<bool>,
    #[serde(default)]
    pub jpg_name: Option<String>,
    #[serde(default)]
    pub route: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeGoto {
    pub state: OperationState,
    #[serde(default)]
    pub lapse_ms: Option<i64>,
    #[serde(default)]
    pub cur_ra_dec: Vec<f64>,
    #[serde(default)]
    pub dist_deg: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub route: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeTrack {
    pub state: OperationState,
    #[serde(default)]
    pub tracking: Option<bool>,
    #[serde(default)]
    pub manual: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub route: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoFocus {
    pub state: OperationState,
    #[serde(default)]
    pub lapse_ms: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub route: Vec<Value>,
    #[serde(default)]
    pub result: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateSolve {
    pub state: OperationState,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub ac_count: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub lapse_ms: Option<i64>,
    #[serde(default)]
    pub star_number: Option<i64>,
    #[serde(default)]
    pub ra_dec: Vec<f64>,
    #[serde(default)]
    pub fov: Vec<f64>,
    #[serde(default)]
    pub focal_len: Option<f64>,
    #[serde(default)]
    pub angle: Option<f64>,
    #[serde(default)]
    pub image_id: Option<i64>,
    #[serde(default)]
    pub result: Map<String, Value>,
    #[serde(default)]
    pub route: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub state: OperationState,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub ac_count: Option<i64>,
    #[serde(default)]
    pub exp_us: Option<i64>,
    #[serde(default)]
    pub gain: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub lapse_ms: Option<i64>,
    #[serde(default)]
    pub exp_ms: Option<f64>,
    #[serde(default)]
    pub route: Vec<Value>,
}

/// Current view (mode and target)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub state: OperationState,
    #[serde(default)]
    pub lapse_ms: Option<i64>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub cam_id: Option<i64>,
    #[serde(default)]
    pub target_ra_dec: Vec<f64>,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub lp_filter: Option<bool>,
    #[serde(default)]
    pub gain: Option<i64>,
    #[serde(default)]
    pub route: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::classify;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_pi_status() {
        let record = classify(
            r#"{"Event":"PiStatus","Timestamp":"1.0","temp":41.5,"battery_capacity":87,"charger_status":"Discharging"}"#,
        )
        .unwrap()
        .unwrap();
        let status: PiStatus = record.decode().unwrap();

        assert_eq!(status.temp, Some(41.5));
        assert_eq!(status.battery_capacity, Some(87));
        assert_eq!(status.battery_temp, None);
        assert_eq!(status.charger_status.as_deref(), Some("Discharging"));
    }

    #[test]
    fn test_decode_stack_progress() {
        let record = classify(
            r#"{"Event":"Stack","state":"frame_complete","stacked_frame":12,"dropped_frame":1,"total_frame":13,"route":[]}"#,
        )
        .unwrap()
        .unwrap();
        let stack: Stack = record.decode().unwrap();

        assert_eq!(stack.state, OperationState::Other);
        assert_eq!(stack.stacked_frame, Some(12));
        assert_eq!(stack.dropped_frame, Some(1));
    }

    #[test]
    fn test_decode_goto_complete() {
        let record = classify(
            r#"{"Event":"ScopeGoto","state":"complete","lapse_ms":5300,"cur_ra_dec":[5.58,-5.39],"dist_deg":0.01}"#,
        )
        .unwrap()
        .unwrap();
        let goto: ScopeGoto = record.decode().unwrap();

        assert!(goto.state.is_terminal());
        assert_eq!(goto.cur_ra_dec, vec![5.58, -5.39]);
        assert!(goto.route.is_empty());
    }

    #[test]
    fn test_decode_missing_required_field() {
        let record = classify(r#"{"Event":"Alert","error":"low battery"}"#).unwrap().unwrap();
        assert!(record.decode::<Alert>().is_err());
    }
}
