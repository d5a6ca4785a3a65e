//! Shared value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A name/value tag attached to a metric observation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    /// Label name
    pub name: String,
    /// Label value
    pub value: String,
}

impl Label {
    /// Create a new label
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_ordering_by_name_then_value() {
        let mut labels = vec![Label::new("b", "1"), Label::new("a", "2"), Label::new("a", "1")];
        labels.sort();
        assert_eq!(
            labels,
            vec![Label::new("a", "1"), Label::new("a", "2"), Label::new("b", "1")]
        );
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::new("region", "eu").to_string(), "region=eu");
    }
}
