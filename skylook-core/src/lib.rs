//! Core library for the `skylook` weather lookup tool.
//!
//! This crate defines:
//! - Configuration & credential handling
//! - The OpenWeather client behind the [`WeatherProvider`] trait
//! - Shared application state and the event-driven app shell
//! - Map viewport synchronization and display projections
//!
//! It is used by `skylook-cli`, but can also be reused by other front ends.

pub mod app;
pub mod config;
pub mod display;
pub mod error;
pub mod map;
pub mod model;
pub mod provider;
pub mod state;

pub use app::{App, AppEvent, Change, ERROR_CLEAR_DELAY, InputSource};
pub use config::{Config, Credential, MapConfig, OpenWeatherConfig};
pub use error::{ClientError, ErrorKind, InputError};
pub use map::{MapView, Tile, TileSource};
pub use model::{Condition, Coordinate, CredentialCheck, LocationQuery, Theme, WeatherResult};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use state::{AppState, OperationError};
