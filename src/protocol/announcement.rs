//! Discovery announcement: `{"name": .., "version": .., "ip": ..}`.

use serde::Deserialize;
use serde_json::Value;

use super::ProtocolError;

#[derive(Debug, Deserialize)]
struct RawAnnouncement {
    name: Option<Value>,
    version: Option<Value>,
    ip: Option<Value>,
}

/// A well-formed presence broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Machine title.
    pub name: String,
    /// Firmware/software version.
    pub version: String,
    /// Address the machine claims to have.
    pub reported_ip: String,
}

impl Announcement {
    /// Decodes an announcement datagram.
    ///
    /// Unknown fields are ignored. Numeric and boolean values are accepted
    /// in place of strings (`"version": 1.2` reads as `"1.2"`).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if the payload is not a JSON object,
    /// [`ProtocolError::MissingField`] if `name`, `version` or `ip` is absent
    /// or null, and [`ProtocolError::InvalidField`] if one is an array or
    /// object.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let raw: RawAnnouncement = serde_json::from_slice(payload)?;
        Ok(Self {
            name: scalar_text("name", raw.name)?,
            version: scalar_text("version", raw.version)?,
            reported_ip: scalar_text("ip", raw.ip)?,
        })
    }
}

fn scalar_text(field: &'static str, value: Option<Value>) -> Result<String, ProtocolError> {
    match value {
        None | Some(Value::Null) => Err(ProtocolError::MissingField(field)),
        Some(Value::String(text)) => Ok(text),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Ok(scalar.to_string()),
        Some(other) => Err(ProtocolError::InvalidField {
            field,
            reason: format!("expected a scalar, got {other}"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_announcement() {
        let payload = br#"{"name":"Medieval Madness","version":"1.2","ip":"10.0.0.5","extra":1}"#;
        let Ok(announcement) = Announcement::decode(payload) else {
            panic!("announcement should decode");
        };
        assert_eq!(announcement.name, "Medieval Madness");
        assert_eq!(announcement.version, "1.2");
        assert_eq!(announcement.reported_ip, "10.0.0.5");
    }

    #[test]
    fn rejects_missing_version() {
        let payload = br#"{"name":"Medieval Madness","ip":"10.0.0.5"}"#;
        assert!(matches!(
            Announcement::decode(payload),
            Err(ProtocolError::MissingField("version"))
        ));
    }

    #[test]
    fn rejects_missing_ip() {
        let payload = br#"{"name":"Medieval Madness","version":"1.2"}"#;
        assert!(matches!(
            Announcement::decode(payload),
            Err(ProtocolError::MissingField("ip"))
        ));
    }

    #[test]
    fn numeric_version_is_read_as_text() {
        let payload = br#"{"name":"Medieval Madness","version":1.2,"ip":"10.0.0.5"}"#;
        let Ok(announcement) = Announcement::decode(payload) else {
            panic!("numeric version should decode");
        };
        assert_eq!(announcement.version, "1.2");
        assert_eq!(announcement.reported_ip, "10.0.0.5");
    }

    #[test]
    fn null_counts_as_missing() {
        let payload = br#"{"name":"Medieval Madness","version":null,"ip":"10.0.0.5"}"#;
        assert!(matches!(
            Announcement::decode(payload),
            Err(ProtocolError::MissingField("version"))
        ));
    }

    #[test]
    fn rejects_structured_ip() {
        let payload = br#"{"name":"Medieval Madness","version":"1.2","ip":[10,0,0,5]}"#;
        assert!(matches!(
            Announcement::decode(payload),
            Err(ProtocolError::InvalidField { field: "ip", .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Announcement::decode(b"\xff\x00not json"),
            Err(ProtocolError::Json(_))
        ));
    }
}
