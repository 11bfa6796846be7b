// src/extract/mod.rs
pub mod dates;
pub mod dom;
pub mod money;
pub mod orchestrator;
pub mod pager;
pub mod panel;
pub mod record;

pub use orchestrator::{run, ExtractionOutcome};

/// Outcome of reading one labeled value out of the details panel.
///
/// A missing or malformed value is not an error: the panel layout varies per
/// driver (sections collapse, lines disappear when empty) and one bad read
/// must not sink the run. The caller decides how to degrade, and the
/// degradation is logged so silent zeros stay diagnosable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<T> {
    Value(T),
    Unreadable,
}

impl<T> Field<T> {
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Field::Unreadable)
    }
}

impl<T: Default> Field<T> {
    /// Unwraps the value, substituting zero for unreadable fields with a
    /// diagnostic naming the field.
    pub fn or_zero(self, what: &str) -> T {
        match self {
            Field::Value(v) => v,
            Field::Unreadable => {
                tracing::debug!("Could not read {:?} from panel, using 0", what);
                T::default()
            }
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(x) => Field::Value(x),
            None => Field::Unreadable,
        }
    }
}
