use std::fmt;

/// A validation problem with a single attribute of an APIRule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Failure {
    /// Dot/bracket path to the attribute, e.g. `.spec.rules[0].accessStrategies[1].handler`.
    pub attribute_path: String,
    pub message: String,
}

impl Failure {
    pub fn new(attribute_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            attribute_path: attribute_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute \"{}\": {}", self.attribute_path, self.message)
    }
}

/// Renders failures as a single human readable description, or `None` when
/// there are none.
pub fn describe(failures: &[Failure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }

    let lines = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    Some(format!("Validation error: {}", lines.join("\n")))
}
