use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use skylook_core::{App, Change, Config, Coordinate, provider::provider_from_config};
use tracing::debug;

use crate::{session, view};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skylook", version, about = "Current weather by city name or map point")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key in the config file.
    Configure,

    /// Check that the configured API key is accepted.
    Check,

    /// Show current weather for a city or a coordinate pair.
    Show(ShowArgs),

    /// Interactive session: search, click the map, toggle the theme.
    Interactive,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// City name, e.g. "London" or "Paris,FR".
    #[arg(required_unless_present_all = ["lat", "lon"], conflicts_with_all = ["lat", "lon"])]
    pub city: Option<String>,

    /// Latitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lon: Option<f64>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Command::Configure) => configure(self.config.as_deref()),
            Some(Command::Check) => check(&self.load_config()?).await,
            Some(Command::Show(ref args)) => show(&self.load_config()?, args).await,
            Some(Command::Interactive) | None => {
                let app = App::from_config(&self.load_config()?);
                session::run(app).await
            }
        }
    }

    /// File config plus environment overrides, from `--config` or the platform path.
    fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => {
                debug!(path = %path.display(), "using config file");
                Config::load_with_env(path)
            }
            None => {
                debug!("using platform config file");
                Config::load()
            }
        }
    }
}

fn configure(path: Option<&Path>) -> anyhow::Result<()> {
    let file = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_file_path()?,
    };
    // File contents only; env overrides must not end up on disk.
    let mut config = Config::load_from(&file)?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Get one at https://home.openweathermap.org/api_keys")
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(api_key.trim().to_string());
    let saved = match path {
        Some(path) => {
            config.save_to(path)?;
            file
        }
        None => config.save()?,
    };

    println!("Saved API key to {}", saved.display());
    println!("Hint: run `skylook check` to verify it.");
    Ok(())
}

async fn check(config: &Config) -> anyhow::Result<()> {
    let provider = provider_from_config(config);
    let result = provider.check_credential().await;

    if result.is_valid() {
        println!("{}", result.message());
        Ok(())
    } else {
        Err(anyhow!(result.message()))
    }
}

async fn show(config: &Config, args: &ShowArgs) -> anyhow::Result<()> {
    let mut app = App::from_config(config);
    app.start();

    if app.process_next().await != Change::CredentialValidated {
        return Err(anyhow!(current_error(&app)));
    }

    let submitted = match (&args.city, args.lat, args.lon) {
        (Some(city), _, _) => app.submit_search(city),
        (None, Some(lat), Some(lon)) => app.click_map(Coordinate::new(lat, lon)),
        _ => bail!("Either a city or both --lat and --lon must be given"),
    };
    submitted?;

    loop {
        match app.process_next().await {
            Change::WeatherUpdated => break,
            Change::ErrorRaised => return Err(anyhow!(current_error(&app))),
            _ => continue,
        }
    }

    println!("{}", view::render(&app));
    Ok(())
}

fn current_error(app: &App) -> String {
    app.state()
        .error()
        .map(|e| e.message().to_string())
        .unwrap_or_else(|| "Failed to fetch weather data".to_string())
}
