//! Coverage event model and its JSON wire form.

use crate::result::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event kind used for coverage reports
pub const TRACK_TEST_COVERAGE_EVENT: &str = "TrackTestCoverageEvent";

/// Coverage measurement carried by an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Service the measurement belongs to
    pub service_name: String,
    /// Coverage percentage, conventionally in `[0, 100]`
    pub coverage: f64,
}

impl Payload {
    /// Create a payload
    #[must_use]
    pub fn new(service_name: impl Into<String>, coverage: f64) -> Self {
        Self {
            service_name: service_name.into(),
            coverage,
        }
    }
}

/// A single test run's outcome and coverage percentage.
///
/// Field names match the JSON wire format and the `action` table columns.
/// Events are immutable once built; the store never updates them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageEvent {
    /// Event kind, e.g. `TrackTestCoverageEvent`
    pub event: String,
    /// Opaque correlation id
    #[serde(default)]
    pub venture_config_id: String,
    /// Opaque correlation id
    #[serde(default)]
    pub venture_reference: String,
    /// ISO-8601 timestamp, may be empty
    #[serde(default)]
    pub created_at: String,
    /// Locale tag
    #[serde(default)]
    pub culture: String,
    /// Action type
    #[serde(default)]
    pub action_type: String,
    /// Action reference
    #[serde(default)]
    pub action_reference: String,
    /// Version string
    #[serde(default)]
    pub version: String,
    /// Route string
    #[serde(default)]
    pub route: String,
    /// Coverage measurement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl CoverageEvent {
    /// Create an event of the given kind with freshly generated identifiers
    #[must_use]
    pub fn synthesized(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            venture_config_id: Uuid::new_v4().to_string(),
            venture_reference: Uuid::new_v4().to_string(),
            ..Self::default()
        }
    }

    /// Set the locale tag
    #[must_use]
    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = culture.into();
        self
    }

    /// Set the action type
    #[must_use]
    pub fn with_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = action_type.into();
        self
    }

    /// Set the action reference
    #[must_use]
    pub fn with_action_reference(mut self, reference: impl Into<String>) -> Self {
        self.action_reference = reference.into();
        self
    }

    /// Set the version string
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Attach a payload
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Decode an inbound event.
    ///
    /// Rejects malformed JSON and events that cannot be persisted: a
    /// missing payload, or an empty event kind or service name.
    pub fn from_json_slice(bytes: &[u8]) -> TrackerResult<Self> {
        let event: Self =
            serde_json::from_slice(bytes).map_err(TrackerError::deserialization)?;
        event.validate()?;
        Ok(event)
    }

    /// Check the invariants required of a persisted event
    pub fn validate(&self) -> TrackerResult<()> {
        if self.event.trim().is_empty() {
            return Err(TrackerError::deserialization("event kind is empty"));
        }
        match &self.payload {
            None => Err(TrackerError::deserialization("payload is missing")),
            Some(payload) if payload.service_name.trim().is_empty() => Err(
                TrackerError::deserialization("payload service_name is empty"),
            ),
            Some(payload) if !payload.coverage.is_finite() || payload.coverage < 0.0 => Err(
                TrackerError::deserialization(format!(
                    "coverage must be a non-negative number, got {}",
                    payload.coverage
                )),
            ),
            Some(_) => Ok(()),
        }
    }

    /// Serialize to the JSON wire form
    pub fn to_json(&self) -> TrackerResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Column labels in display order, matching [`CoverageEvent::fields`]
    #[must_use]
    pub const fn field_labels() -> [&'static str; 10] {
        [
            "Event",
            "VentureConfigId",
            "VentureReference",
            "CreatedAt",
            "Culture",
            "ActionType",
            "ActionReference",
            "Version",
            "Route",
            "Payload",
        ]
    }

    /// Display values of every field, in [`CoverageEvent::field_labels`] order
    #[must_use]
    pub fn fields(&self) -> [String; 10] {
        let payload = self.payload.as_ref().map_or_else(String::new, |p| {
            format!("{} {}%", p.service_name, p.coverage)
        });
        [
            self.event.clone(),
            self.venture_config_id.clone(),
            self.venture_reference.clone(),
            self.created_at.clone(),
            self.culture.clone(),
            self.action_type.clone(),
            self.action_reference.clone(),
            self.version.clone(),
            self.route.clone(),
            payload,
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const GITHUB_ACTION: &str = r#"{
        "event": "TrackTestCoverageEvent",
        "venture_config_id": "57EFFB23-1731-4348-B306-9F3819D12FEB",
        "venture_reference": "C1C9025B-AEE0-4943-886E-466301F02BED",
        "created_at": "2021-03-02T08:30:00+00:00",
        "culture": "en_EN",
        "action_type": "api",
        "action_reference": "",
        "version": "1.0.0",
        "route": "",
        "payload": {
            "service_name": "test",
            "coverage": 23.5
        }
    }"#;

    #[test]
    fn test_decode_inbound_event() {
        let event = CoverageEvent::from_json_slice(GITHUB_ACTION.as_bytes()).unwrap();
        assert_eq!(event.event, TRACK_TEST_COVERAGE_EVENT);
        assert_eq!(event.venture_config_id, "57EFFB23-1731-4348-B306-9F3819D12FEB");
        assert_eq!(event.created_at, "2021-03-02T08:30:00+00:00");
        assert_eq!(event.payload, Some(Payload::new("test", 23.5)));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = CoverageEvent::from_json_slice(b"{\"event\": ").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_decode_rejects_missing_payload() {
        let err = CoverageEvent::from_json_slice(br#"{"event": "TrackTestCoverageEvent"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("payload is missing"));
    }

    #[test]
    fn test_decode_rejects_empty_service_name() {
        let body = br#"{"event": "X", "payload": {"service_name": " ", "coverage": 1.0}}"#;
        assert!(CoverageEvent::from_json_slice(body).is_err());
    }

    #[test]
    fn test_decode_rejects_negative_coverage() {
        let body = br#"{"event": "X", "payload": {"service_name": "svc", "coverage": -3.0}}"#;
        assert!(CoverageEvent::from_json_slice(body).is_err());
    }

    #[test]
    fn test_coverage_above_hundred_is_accepted() {
        let body = br#"{"event": "X", "payload": {"service_name": "svc", "coverage": 101.5}}"#;
        let event = CoverageEvent::from_json_slice(body).unwrap();
        assert_eq!(event.payload.unwrap().coverage, 101.5);
    }

    #[test]
    fn test_missing_string_fields_default_to_empty() {
        let body = br#"{"event": "X", "payload": {"service_name": "svc", "coverage": 1}}"#;
        let event = CoverageEvent::from_json_slice(body).unwrap();
        assert!(event.route.is_empty());
        assert!(event.venture_reference.is_empty());
    }

    #[test]
    fn test_absent_payload_is_omitted_from_wire_form() {
        let json = CoverageEvent::default().to_json().unwrap();
        assert!(!json.contains("payload"));
    }

    #[test]
    fn test_wire_form_uses_snake_case_keys() {
        let event = CoverageEvent::synthesized(TRACK_TEST_COVERAGE_EVENT)
            .with_payload(Payload::new("tracker", 63.3));
        let json = event.to_json().unwrap();
        assert!(json.contains("\"venture_config_id\""));
        assert!(json.contains("\"service_name\":\"tracker\""));
        assert!(json.contains("\"coverage\":63.3"));
    }

    #[test]
    fn test_synthesized_ids_are_unique() {
        let a = CoverageEvent::synthesized("A");
        let b = CoverageEvent::synthesized("A");
        assert_ne!(a.venture_config_id, a.venture_reference);
        assert_ne!(a.venture_config_id, b.venture_config_id);
        assert_ne!(a.venture_reference, b.venture_reference);
        assert!(Uuid::parse_str(&a.venture_config_id).is_ok());
    }

    #[test]
    fn test_fields_follow_label_order() {
        let event = CoverageEvent::synthesized("Kind")
            .with_culture("en_EN")
            .with_version("1.0.0")
            .with_payload(Payload::new("svc", 50.0));
        let fields = event.fields();
        assert_eq!(fields.len(), CoverageEvent::field_labels().len());
        assert_eq!(fields[0], "Kind");
        assert_eq!(fields[4], "en_EN");
        assert_eq!(fields[7], "1.0.0");
        assert_eq!(fields[9], "svc 50%");
    }
}
