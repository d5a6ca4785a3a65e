//! Key flattening.
//!
//! A metric is identified by its name parts plus its labels. The parts are
//! joined with `.` into a display name, and `;name=value` pairs are appended
//! to form the hash key the interval maps are keyed by. Spaces become `_`.
//!
//! Labels are sorted before hashing, so `[a=1, b=2]` and `[b=2, a=1]`
//! aggregate into the same series.

use crate::core::Label;

/// Display name and aggregation key for one observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatKey {
    /// Name parts joined with `.`, no labels
    pub name: String,
    /// `name` followed by `;label=value` for each sorted label
    pub hash: String,
    /// The labels in hash order
    pub labels: Vec<Label>,
}

#[inline]
fn push_sanitized(buf: &mut String, part: &str) {
    buf.extend(part.chars().map(|c| if c == ' ' { '_' } else { c }));
}

/// Join name parts with `.`, replacing spaces
pub fn flatten_key(parts: &[&str]) -> String {
    let mut buf = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            buf.push('.');
        }
        push_sanitized(&mut buf, part);
    }
    buf
}

/// Flatten name parts and labels into a display name and hash key
pub fn flatten_key_labels(parts: &[&str], labels: &[Label]) -> FlatKey {
    let name = flatten_key(parts);
    if labels.is_empty() {
        return FlatKey {
            hash: name.clone(),
            name,
            labels: Vec::new(),
        };
    }

    let mut sorted = labels.to_vec();
    sorted.sort();

    let mut hash = name.clone();
    for label in &sorted {
        hash.push(';');
        push_sanitized(&mut hash, &label.name);
        hash.push('=');
        push_sanitized(&mut hash, &label.value);
    }

    FlatKey {
        name,
        hash,
        labels: sorted,
    }
}

/// Name with label values appended as extra `.` segments, with spaces and
/// `:` replaced by `_`
pub fn flatten_labels(name: &str, labels: &[Label]) -> String {
    let mut buf = String::with_capacity(name.len() + labels.len() * 8);
    buf.push_str(name);
    for label in labels {
        buf.push('.');
        buf.extend(
            label
                .value
                .chars()
                .map(|c| if c == ' ' || c == ':' { '_' } else { c }),
        );
    }
    buf
}
