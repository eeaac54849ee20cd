use crate::{location::Loaded, model::Location};

/// Everything a resolution needs to know about who is asking and where.
///
/// Passed into the pipeline explicitly; the pipeline keeps no current
/// location or user of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub location: Location,
    pub user: String,
    /// The location is the built-in default, not one the user picked.
    pub location_is_default: bool,
}

impl Session {
    pub fn new(location: Location, user: impl Into<String>) -> Self {
        Self { location, user: user.into(), location_is_default: false }
    }

    pub fn from_loaded(location: Loaded<Location>, user: impl Into<String>) -> Self {
        Self {
            location: location.value,
            user: user.into(),
            location_is_default: location.used_default,
        }
    }
}
