use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use daycast_core::{
    Config, DateKey, Location, LocationStore, Outcome, OverrideFields, ResolutionPipeline,
    ResolvedRecord, Session, SystemClock, WeatherCache,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "daycast", version, about = "Daily forecast with personal overrides")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the user email and override service interactively.
    Configure,

    /// Show or change the selected location.
    #[command(subcommand)]
    Location(LocationCommand),

    /// Show the forecast for a day.
    Show {
        #[command(flatten)]
        day: DayArg,
    },

    /// Manage your overrides for a day.
    #[command(subcommand)]
    Override(OverrideCommand),

    /// Manage the local forecast cache.
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Debug, Subcommand)]
pub enum LocationCommand {
    /// Print the selected location.
    Show,

    /// Select a new location.
    Set {
        /// Latitude in degrees, -90..=90.
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees, -180..=180.
        #[arg(allow_negative_numbers = true)]
        lon: f64,

        /// IANA timezone, e.g. "Europe/Paris". Keeps the current zone if absent.
        #[arg(long)]
        tz: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum OverrideCommand {
    /// Replace one or more displayed values.
    Set {
        #[command(flatten)]
        day: DayArg,

        /// Temperature in °C.
        #[arg(long, allow_negative_numbers = true)]
        temp: Option<f64>,

        /// Relative humidity, 0-100.
        #[arg(long)]
        humidity: Option<u8>,

        /// Wind speed in km/h.
        #[arg(long)]
        wind: Option<f64>,

        /// Precipitation in mm.
        #[arg(long)]
        precip: Option<f64>,

        /// Condition description.
        #[arg(long)]
        condition: Option<String>,
    },

    /// Remove your override and go back to provider data.
    Remove {
        #[command(flatten)]
        day: DayArg,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Forget every cached forecast.
    Clear,
}

#[derive(Debug, Args)]
pub struct DayArg {
    /// One of "today", "tomorrow" or "dayafter".
    #[arg(long, default_value = "today")]
    pub day: String,
}

impl DayArg {
    fn key(&self) -> Result<DateKey> {
        Ok(self.day.parse::<DateKey>()?)
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Location(LocationCommand::Show) => {
                let loaded = location_store()?.load();
                let loc = loaded.value;
                println!("Location: {}, {} ({})", loc.lat, loc.lon, loc.tz);
                if loaded.used_default {
                    println!("(default location; run `daycast location set` to choose one)");
                }
                Ok(())
            }
            Command::Location(LocationCommand::Set { lat, lon, tz }) => {
                let store = location_store()?;
                let tz = tz.unwrap_or_else(|| store.load().value.tz);
                let location = Location::new(lat, lon, tz)?;
                store.save(&location)?;
                println!("Location saved.");

                let config = Config::load()?;
                if config.is_configured() {
                    let app = App::open(&config)?;
                    app.show(DateKey::Today).await?;
                }
                Ok(())
            }
            Command::Show { day } => {
                let app = App::open(&Config::load()?)?;
                app.show(day.key()?).await
            }
            Command::Override(OverrideCommand::Set {
                day,
                temp,
                humidity,
                wind,
                precip,
                condition,
            }) => {
                let date_key = day.key()?;
                let fields = OverrideFields {
                    temp_c: temp,
                    humidity_pct: humidity,
                    wind_kph: wind,
                    precip_mm: precip,
                    condition_text: condition.map(|c| c.trim().to_string()),
                };
                if fields.is_empty() {
                    bail!("Nothing to override. Pass at least one of --temp, --humidity, --wind, --precip, --condition.");
                }

                let app = App::open(&Config::load()?)?;
                let saved = app
                    .pipeline
                    .save_override(&app.session, date_key, &fields)
                    .await
                    .map_err(|e| anyhow!("Error saving override: {}", e.user_message()))?;
                println!("Override saved (v{}).", saved.version);
                app.show(date_key).await
            }
            Command::Override(OverrideCommand::Remove { day }) => {
                let date_key = day.key()?;
                let app = App::open(&Config::load()?)?;
                app.pipeline
                    .remove_override(&app.session, date_key)
                    .await
                    .map_err(|e| anyhow!("Error removing override: {}", e.user_message()))?;
                println!("Override removed.");
                app.show(date_key).await
            }
            Command::Cache(CacheCommand::Clear) => {
                let cache = WeatherCache::open(Config::cache_file_path()?, Arc::new(SystemClock));
                let dropped = cache.len();
                cache.clear()?;
                println!("Cleared {dropped} cached forecast(s).");
                Ok(())
            }
        }
    }
}

fn location_store() -> Result<LocationStore> {
    Ok(LocationStore::new(Config::location_file_path()?))
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let current_email = config.user_email.clone().unwrap_or_default();
    let email = inquire::Text::new("Email your overrides belong to:")
        .with_default(&current_email)
        .prompt()
        .context("Failed to read email")?;

    let current_url = config.overrides.base_url.clone().unwrap_or_default();
    let url = inquire::Text::new("Override service URL:")
        .with_default(&current_url)
        .with_help_message("e.g. http://localhost:3000")
        .prompt()
        .context("Failed to read override service URL")?;

    config.set_user_email(email);
    config.set_override_base_url(url);
    config.user_email()?;
    config.override_base_url()?;
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

/// Everything one command needs to resolve and print a forecast.
struct App {
    pipeline: ResolutionPipeline,
    session: Session,
}

impl App {
    fn open(config: &Config) -> Result<Self> {
        let user = config.user_email()?.to_string();
        let clock = Arc::new(SystemClock);
        let cache = WeatherCache::open(Config::cache_file_path()?, clock.clone());
        let pipeline = ResolutionPipeline::from_config(config, cache, clock)?;

        let loaded = location_store()?.load();
        if loaded.used_default {
            tracing::info!("No stored location, using default");
        }

        Ok(Self { pipeline, session: Session::from_loaded(loaded, user) })
    }

    async fn show(&self, date_key: DateKey) -> Result<()> {
        match self.pipeline.resolve(&self.session, date_key).await {
            Outcome::Ready(record) => {
                print_record(&self.session, &record);
                Ok(())
            }
            Outcome::Failed(err) => Err(anyhow!(err.user_message())),
            Outcome::Superseded { .. } => bail!("Request was superseded by a newer one"),
        }
    }
}

fn print_record(session: &Session, record: &ResolvedRecord) {
    let loc = &session.location;
    let s = &record.summary;

    if session.location_is_default {
        println!("Using default location; run `daycast location set <lat> <lon>` to change it.");
    }
    if record.used_default_bucket {
        println!(
            "Note: provider has no forecast for {}; showing {} instead.",
            record.date, s.bucket_date
        );
    }
    if record.override_unavailable {
        println!("Note: overrides could not be loaded; showing provider data.");
    }

    println!("{} ({}) at {}, {}", record.date, record.date_key, loc.lat, loc.lon);
    println!("  {} {}", s.condition_icon.glyph(), s.condition_text);
    println!("  Temperature:   {:.1}°C", s.temp_c);
    println!("  Humidity:      {}%", s.humidity_pct);
    println!("  Wind:          {:.1} km/h", s.wind_kph);
    println!("  Precipitation: {:.1} mm", s.precip_mm);
    println!("  Source: {}", record.provenance());
}
