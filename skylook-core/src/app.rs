//! The app shell: owns the shared state and is its only writer.
//!
//! Network calls run as spawned tasks and report back through an
//! unbounded channel; [`App::process_next`] applies one event at a time, so
//! state is never touched from two places at once.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{ClientError, ErrorKind, InputError},
    map::MapView,
    model::{Coordinate, CredentialCheck, LocationQuery, Theme, WeatherResult},
    provider::{WeatherProvider, provider_from_config},
    state::AppState,
};

/// How long a transient error stays on screen.
pub const ERROR_CLEAR_DELAY: Duration = Duration::from_secs(5);

/// Which input produced a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Search,
    MapClick,
}

/// Completions posted back to the shell by background tasks.
#[derive(Debug)]
pub enum AppEvent {
    CredentialChecked(CredentialCheck),
    WeatherFetched {
        request: u64,
        source: InputSource,
        outcome: Result<WeatherResult, ClientError>,
    },
    ClearError {
        generation: u64,
    },
}

/// What handling one event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    CredentialValidated,
    CredentialRejected,
    WeatherUpdated,
    ErrorRaised,
    ErrorCleared,
    /// Stale or superseded event; state untouched.
    Ignored,
}

pub struct App {
    provider: Arc<dyn WeatherProvider>,
    state: AppState,
    map: MapView,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
    started: bool,
    next_request: u64,
    last_applied: u64,
}

impl App {
    pub fn new(provider: Arc<dyn WeatherProvider>, map: MapView, theme: Theme) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            provider,
            state: AppState::new(theme),
            map,
            tx,
            rx,
            started: false,
            next_request: 0,
            last_applied: 0,
        }
    }

    /// Build the shell from configuration, logging whether a key is present.
    pub fn from_config(config: &Config) -> Self {
        match config.credential() {
            Some(credential) => {
                info!(length = credential.len(), "API key is configured");
            }
            None => warn!(
                "API key is NOT configured; set {} or run `skylook configure`",
                crate::config::CREDENTIAL_ENV_VAR
            ),
        }

        Self::new(provider_from_config(config), MapView::from_config(&config.map), config.theme)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    /// Kick off the one-time credential check. Later calls do nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self) {
        if self.started {
            debug!("app already started");
            return;
        }
        self.started = true;

        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let check = provider.check_credential().await;
            let _ = tx.send(AppEvent::CredentialChecked(check));
        });
    }

    /// Search box submit. Returns the id of the spawned request.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn submit_search(&mut self, text: &str) -> Result<u64, InputError> {
        let city = text.trim();
        if city.is_empty() {
            return Err(self.reject(InputError::EmptyCity));
        }
        self.ensure_validated("search")?;

        Ok(self.spawn_fetch(LocationQuery::city(city), InputSource::Search))
    }

    /// Map click at `coord`. Any coordinate pair is accepted.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn click_map(&mut self, coord: Coordinate) -> Result<u64, InputError> {
        self.ensure_validated("map click")?;

        info!(%coord, "map clicked");
        Ok(self.spawn_fetch(LocationQuery::Coordinates(coord), InputSource::MapClick))
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.state.toggle_theme()
    }

    /// Show `message` in the error slot and clear it after [`ERROR_CLEAR_DELAY`],
    /// unless a newer error replaces it first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn report_error(&mut self, message: impl Into<String>, kind: ErrorKind) {
        let message = message.into();
        debug!(?kind, %message, "reporting error");

        let generation = self.state.set_error(message, kind, false);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ERROR_CLEAR_DELAY).await;
            let _ = tx.send(AppEvent::ClearError { generation });
        });
    }

    /// Wait for the next background completion and apply it.
    pub async fn process_next(&mut self) -> Change {
        match self.rx.recv().await {
            Some(event) => self.handle(event),
            // The shell holds a sender, so the channel never closes under it.
            None => Change::Ignored,
        }
    }

    /// Apply one event to the state.
    ///
    /// # Panics
    ///
    /// Panics outside a Tokio runtime when the event raises a transient error.
    pub fn handle(&mut self, event: AppEvent) -> Change {
        match event {
            AppEvent::CredentialChecked(check) => match check {
                CredentialCheck::Valid => {
                    info!("API key validated");
                    self.state.mark_credential_validated();
                    Change::CredentialValidated
                }
                CredentialCheck::Invalid(err) => {
                    warn!(error = %err, "API key validation failed");
                    // Startup errors stay until something replaces them.
                    self.state.set_error(err.to_string(), err.kind(), true);
                    Change::CredentialRejected
                }
            },

            AppEvent::WeatherFetched {
                request,
                source,
                outcome,
            } => {
                if request < self.last_applied {
                    debug!(request, last_applied = self.last_applied, "dropping stale response");
                    return Change::Ignored;
                }
                self.last_applied = request;

                match outcome {
                    Ok(weather) => {
                        info!(?source, location = %weather.name, "weather updated");
                        self.map.sync(&weather);
                        self.state.set_weather(weather);
                        if source == InputSource::Search {
                            self.state.clear_error();
                        }
                        Change::WeatherUpdated
                    }
                    Err(err) => {
                        warn!(?source, error = %err, "weather fetch failed");
                        self.report_error(err.to_string(), err.kind());
                        Change::ErrorRaised
                    }
                }
            }

            AppEvent::ClearError { generation } => {
                if self.state.clear_error_if(generation) {
                    debug!(generation, "error cleared");
                    Change::ErrorCleared
                } else {
                    Change::Ignored
                }
            }
        }
    }

    fn ensure_validated(&mut self, action: &str) -> Result<(), InputError> {
        if self.state.credential_validated() {
            Ok(())
        } else {
            warn!("{action} attempted before API key was validated");
            Err(self.reject(InputError::CredentialPending))
        }
    }

    fn reject(&mut self, err: InputError) -> InputError {
        self.report_error(err.to_string(), err.kind());
        err
    }

    fn spawn_fetch(&mut self, query: LocationQuery, source: InputSource) -> u64 {
        self.next_request += 1;
        let request = self.next_request;

        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = provider.fetch_weather(&query).await;
            let _ = tx.send(AppEvent::WeatherFetched {
                request,
                source,
                outcome,
            });
        });

        request
    }
}
