//! Shared application state.
//!
//! Owned by [`crate::app::App`]; everything else gets read access through
//! the getters. Mutation is crate-private so the shell's event loop stays
//! the only writer.

use crate::{
    error::ErrorKind,
    model::{Theme, WeatherResult},
};

/// The single error slot shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationError {
    message: String,
    kind: ErrorKind,
    generation: u64,
    persistent: bool,
}

impl OperationError {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Persistent errors are not auto-cleared, only replaced.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    weather: Option<WeatherResult>,
    error: Option<OperationError>,
    credential_validated: bool,
    theme: Theme,
    error_generation: u64,
}

impl AppState {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn weather(&self) -> Option<&WeatherResult> {
        self.weather.as_ref()
    }

    pub fn error(&self) -> Option<&OperationError> {
        self.error.as_ref()
    }

    pub fn credential_validated(&self) -> bool {
        self.credential_validated
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Replace the current result wholesale.
    pub(crate) fn set_weather(&mut self, weather: WeatherResult) {
        self.weather = Some(weather);
    }

    /// Overwrite the error slot and return the new generation.
    pub(crate) fn set_error(
        &mut self,
        message: impl Into<String>,
        kind: ErrorKind,
        persistent: bool,
    ) -> u64 {
        self.error_generation += 1;
        self.error = Some(OperationError {
            message: message.into(),
            kind,
            generation: self.error_generation,
            persistent,
        });
        self.error_generation
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }

    /// Clear the error only if it is still the one set at `generation`.
    pub(crate) fn clear_error_if(&mut self, generation: u64) -> bool {
        match &self.error {
            Some(err) if err.generation == generation => {
                self.error = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_credential_validated(&mut self) {
        self.credential_validated = true;
    }

    pub(crate) fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}
