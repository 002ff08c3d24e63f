use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::value::RawValue;

/// A handler configuration payload whose schema depends on the handler.
///
/// The payload is kept as the JSON text it was received as so that it may be
/// decoded against more than one schema.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawExtension(Box<RawValue>);

impl RawExtension {
    pub fn from_json(value: &serde_json::Value) -> serde_json::Result<Self> {
        serde_json::value::to_raw_value(value).map(Self)
    }

    pub fn from_string(json: impl Into<String>) -> serde_json::Result<Self> {
        RawValue::from_string(json.into()).map(Self)
    }

    #[inline]
    pub fn raw(&self) -> &str {
        self.0.get()
    }

    /// Decodes the payload against the schema `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(self.raw())
    }

    /// Returns true when the payload carries no configuration at all.
    pub fn is_empty(&self) -> bool {
        matches!(self.raw().trim(), "" | "null" | "{}")
    }
}

impl PartialEq for RawExtension {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payloads() {
        for json in ["null", "{}"] {
            let raw = RawExtension::from_string(json).unwrap();
            assert!(raw.is_empty(), "{json} must be empty");
        }
        let raw = RawExtension::from_json(&serde_json::json!({})).unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn non_empty_payload() {
        let raw = RawExtension::from_json(&serde_json::json!({ "foo": "bar" })).unwrap();
        assert!(!raw.is_empty());
        assert_eq!(raw.raw(), r#"{"foo":"bar"}"#);
    }

    #[test]
    fn decodes_twice() {
        #[derive(Deserialize)]
        struct A {
            a: Option<String>,
        }
        #[derive(Deserialize)]
        struct B {
            b: Option<u32>,
        }

        let raw = RawExtension::from_string(r#"{"a":"x","b":1}"#).unwrap();
        assert_eq!(raw.decode::<A>().unwrap().a.as_deref(), Some("x"));
        assert_eq!(raw.decode::<B>().unwrap().b, Some(1));
    }
}
