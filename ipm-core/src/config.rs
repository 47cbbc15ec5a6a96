//! Connection configuration passed to `connect_for_sends`/`connect_for_receives`.
//!
//! The core only requires a `connection_string`. Any other field is kept
//! verbatim for the transport to interpret.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::endpoint::Endpoint;
use crate::error::Result;

/// Connection string used when none is configured.
pub const DEFAULT_CONNECTION_STRING: &str = "inproc://default";

fn default_connection_string() -> String {
    DEFAULT_CONNECTION_STRING.to_string()
}

/// Connection info for one endpoint.
///
/// # Examples
///
/// ```
/// use ipm_core::config::ConnectionInfo;
/// use serde_json::json;
///
/// let info = ConnectionInfo::from_value(json!({
///     "connection_string": "tcp://127.0.0.1:5555",
///     "send_hwm": 10,
/// })).unwrap();
///
/// assert_eq!(info.connection_string, "tcp://127.0.0.1:5555");
/// assert_eq!(info.get::<i32>("send_hwm").unwrap(), Some(10));
///
/// let info = ConnectionInfo::from_value(json!({})).unwrap();
/// assert_eq!(info.connection_string, "inproc://default");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(default = "default_connection_string")]
    pub connection_string: String,

    /// Transport-specific fields, ignored by the core.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_STRING)
    }
}

impl ConnectionInfo {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            extra: Map::new(),
        }
    }

    /// Decode from a JSON object. Missing `connection_string` falls back to
    /// [`DEFAULT_CONNECTION_STRING`].
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Attach a transport-specific field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Read a transport-specific field; `Ok(None)` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.extra.get(key) {
            None => Ok(None),
            Some(value) => Ok(Some(T::deserialize(value)?)),
        }
    }

    /// Parsed view of `connection_string`.
    pub fn endpoint(&self) -> Result<Endpoint> {
        Ok(Endpoint::parse(&self.connection_string)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IpmError;
    use serde_json::json;

    #[test]
    fn test_default_connection_string() {
        let info = ConnectionInfo::from_value(json!({})).unwrap();
        assert_eq!(info.connection_string, DEFAULT_CONNECTION_STRING);
        assert_eq!(info, ConnectionInfo::default());
    }

    #[test]
    fn test_extra_fields_are_preserved() {
        let info = ConnectionInfo::from_json(
            r#"{"connection_string": "inproc://x", "recv_hwm": 3, "label": "daq"}"#,
        )
        .unwrap();
        assert_eq!(info.get::<usize>("recv_hwm").unwrap(), Some(3));
        assert_eq!(info.get::<String>("label").unwrap().as_deref(), Some("daq"));
        assert_eq!(info.get::<u32>("missing").unwrap(), None);
    }

    #[test]
    fn test_wrong_field_type_is_config_error() {
        let info = ConnectionInfo::new("inproc://x").with_field("send_hwm", "lots");
        assert!(matches!(info.get::<u32>("send_hwm"), Err(IpmError::Config(_))));
    }

    #[test]
    fn test_endpoint_view() {
        let info = ConnectionInfo::new("inproc://abc");
        assert_eq!(info.endpoint().unwrap().inproc_name(), Some("abc"));

        let info = ConnectionInfo::new("udp://nope");
        assert!(matches!(info.endpoint(), Err(IpmError::InvalidEndpoint(_))));
    }
}
