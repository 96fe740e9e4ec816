//! Pure projections of [`AppState`] into what the user sees.

use std::fmt;

use crate::{
    model::{Theme, WeatherResult},
    state::{AppState, OperationError},
};

/// Results panel for one weather result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherView {
    pub title: String,
    pub icon_url: Option<String>,
    pub description: String,
    pub temperature: String,
    pub humidity: String,
    pub wind_speed: String,
    pub observed_at: Option<String>,
}

impl WeatherView {
    pub fn from_result(weather: &WeatherResult) -> Self {
        let primary = weather.primary_condition();

        Self {
            title: weather.name.clone(),
            icon_url: primary.map(|c| c.icon_url()),
            description: primary
                .map(|c| c.description.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            temperature: format!("{}°C", round_half_up(weather.temperature_c)),
            humidity: format!("Humidity: {}%", weather.humidity_pct),
            wind_speed: format!("Wind Speed: {} m/s", weather.wind_speed_mps),
            observed_at: weather
                .observed_at
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string()),
        }
    }
}

impl fmt::Display for WeatherView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "  {}  {}", self.temperature, self.description)?;
        writeln!(f, "  {}", self.humidity)?;
        write!(f, "  {}", self.wind_speed)?;
        if let Some(icon) = &self.icon_url {
            write!(f, "\n  Icon: {icon}")?;
        }
        if let Some(at) = &self.observed_at {
            write!(f, "\n  Observed: {at}")?;
        }
        Ok(())
    }
}

/// Alert banner for the current operation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub text: String,
}

impl ErrorBanner {
    pub fn from_error(error: &OperationError) -> Self {
        Self {
            text: error.message().to_string(),
        }
    }
}

impl fmt::Display for ErrorBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[!] {}", self.text)
    }
}

pub fn render_weather(state: &AppState) -> Option<WeatherView> {
    state.weather().map(WeatherView::from_result)
}

pub fn render_error(state: &AppState) -> Option<ErrorBanner> {
    state.error().map(ErrorBanner::from_error)
}

pub fn theme_toggle_label(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "Switch to Dark Mode",
        Theme::Dark => "Switch to Light Mode",
    }
}

/// Halves round towards positive infinity: 2.5 -> 3, -2.5 -> -2.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, model::Condition};
    use chrono::DateTime;

    fn sample() -> WeatherResult {
        WeatherResult {
            name: "London".into(),
            conditions: vec![
                Condition {
                    icon: "10d".into(),
                    description: "light rain".into(),
                },
                Condition {
                    icon: "50d".into(),
                    description: "mist".into(),
                },
            ],
            temperature_c: 11.6,
            humidity_pct: 81,
            wind_speed_mps: 4.12,
            coord: None,
            observed_at: DateTime::from_timestamp(1_700_000_000, 0),
        }
    }

    #[test]
    fn weather_view_uses_first_condition() {
        let view = WeatherView::from_result(&sample());
        assert_eq!(view.title, "London");
        assert_eq!(view.description, "light rain");
        assert_eq!(view.icon_url.as_deref(), Some("https://openweathermap.org/img/w/10d.png"));
        assert_eq!(view.temperature, "12°C");
        assert_eq!(view.humidity, "Humidity: 81%");
        assert_eq!(view.wind_speed, "Wind Speed: 4.12 m/s");
        assert_eq!(view.observed_at.as_deref(), Some("2023-11-14 22:13 UTC"));
    }

    #[test]
    fn weather_view_without_conditions_does_not_panic() {
        let mut weather = sample();
        weather.conditions.clear();

        let view = WeatherView::from_result(&weather);
        assert_eq!(view.description, "Unknown");
        assert!(view.icon_url.is_none());
    }

    #[test]
    fn temperature_rounding() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-0.4), 0);
        assert_eq!(round_half_up(-0.6), -1);
    }

    #[test]
    fn empty_state_renders_nothing() {
        let state = AppState::default();
        assert!(render_weather(&state).is_none());
        assert!(render_error(&state).is_none());
    }

    #[test]
    fn error_banner_shows_message() {
        let mut state = AppState::default();
        state.set_error("Location not found. Please try again.", ErrorKind::NotFound, false);

        let banner = render_error(&state).expect("banner");
        assert_eq!(banner.to_string(), "[!] Location not found. Please try again.");
    }

    #[test]
    fn panel_lists_all_fields() {
        let text = WeatherView::from_result(&sample()).to_string();
        assert!(text.starts_with("London\n"));
        assert!(text.contains("12°C  light rain"));
        assert!(text.contains("Wind Speed: 4.12 m/s"));
    }

    #[test]
    fn toggle_label_names_the_other_theme() {
        assert_eq!(theme_toggle_label(Theme::Light), "Switch to Dark Mode");
        assert_eq!(theme_toggle_label(Theme::Dark), "Switch to Light Mode");
    }
}
