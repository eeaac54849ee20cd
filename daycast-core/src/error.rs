//! Error taxonomy shared by every stage of the resolution pipeline.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    /// Transport failure or non-success response from the provider or the
    /// override service.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Provider answered, but without the day-bucket/hourly data we need.
    #[error("Data error: {0}")]
    Data(String),

    /// Malformed location or stored state.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The target calendar date could not be computed.
    #[error("Date error: {0}")]
    Date(String),
}

impl WeatherError {
    /// Short status line suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(msg) => format!("Failed to fetch weather data: {msg}"),
            Self::Data(_) => "No hourly data available for this day".to_string(),
            Self::Validation(msg) => format!("Invalid input: {msg}"),
            Self::Date(msg) => format!("Could not compute the date: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_mention_cause() {
        let err = WeatherError::Fetch("status 503".into());
        assert!(err.user_message().contains("503"));

        let err = WeatherError::Data("empty".into());
        assert!(err.user_message().contains("No hourly data"));
    }
}
