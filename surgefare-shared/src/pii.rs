use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Passenger-identifying text that must not show up in logs.
///
/// `Debug` and `Display` print a fixed placeholder; serialization still
/// writes the real value because tickets need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Redacted<T>(pub T);

const PLACEHOLDER: &str = "[redacted]";

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PLACEHOLDER)
    }
}

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PLACEHOLDER)
    }
}

impl<T: Serialize> Serialize for Redacted<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
