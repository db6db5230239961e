use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use inquire::Password;
use tracing::debug;
use weather_core::{
    Advisor, AdvisoryContext, Aggregator, Config, Dashboard, PromptKind, ProviderId,
    RecentStore, SearchMode, SearchOutcome, SearchStatus, calendar,
    insights::ActivityLevel,
    provider::{
        air_quality_source_from_config, http_client, text_generator_from_config,
        uv_source_from_config, weather_source_from_config,
    },
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Multi-city weather dashboard")]
pub struct Cli {
    /// Log provider calls to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name: "openweather", "airvisual" or "gemini".
        provider: String,
    },

    /// Search one or more cities and show the dashboard.
    Search {
        /// Comma-separated city names; defaults to the most recent search.
        cities: Option<String>,

        /// City to show in detail; defaults to the first one found.
        #[arg(long)]
        select: Option<String>,

        /// Fetch cities in parallel.
        #[arg(long)]
        concurrent: bool,

        /// Print the aggregated result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Ask the text provider for advice about a city's weather.
    Advise {
        city: String,

        /// activity, gardening, flood-risk, impact, hydration, photography,
        /// clothing, sunscreen, question, aqi or uv.
        #[arg(long, default_value = "activity")]
        kind: PromptKind,

        /// Free-text question, required for `--kind question`.
        #[arg(long)]
        question: Option<String>,
    },

    /// Write an iCalendar event with a city's current conditions.
    Export {
        city: String,

        /// Event date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Target file; `-` writes to stdout. Defaults to weather-<city>-<date>.ics.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Hydration, pollen and wind figures derived from current conditions.
    Insights {
        city: String,

        /// Body weight in kilograms.
        #[arg(long, default_value_t = 70.0)]
        weight: f64,

        /// sedentary, moderate or high.
        #[arg(long, default_value = "moderate")]
        activity: ActivityLevel,
    },

    /// List recent searches, most recent first.
    Recent,

    /// Remove a city from the recent searches.
    Forget { city: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Search {
                cities,
                select,
                concurrent,
                json,
            } => {
                let mode = if concurrent {
                    SearchMode::Concurrent
                } else {
                    SearchMode::Sequential
                };
                search(cities, select, mode, json).await
            }
            Command::Advise {
                city,
                kind,
                question,
            } => advise(&city, kind, question.as_deref()).await,
            Command::Export { city, date, output } => export(&city, date, output).await,
            Command::Insights {
                city,
                weight,
                activity,
            } => insights(&city, weight, activity).await,
            Command::Recent => recent(),
            Command::Forget { city } => forget(&city),
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {} ({}):", id, id.purpose()))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key);
    config.save()?;

    println!(
        "Saved {} credentials to {}",
        id,
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn aggregator(config: &Config, mode: SearchMode) -> anyhow::Result<Aggregator> {
    let http = http_client(config.request_timeout())?;
    let weather = weather_source_from_config(config, &http)?;
    let air_quality = air_quality_source_from_config(config, &http);
    if air_quality.is_none() {
        tracing::warn!("no AirVisual key configured; air quality will be unavailable");
    }
    let uv = uv_source_from_config(config, &http);

    Ok(Aggregator::new(weather, air_quality, uv).with_mode(mode))
}

/// Runs a search and prints its notifications to stderr.
async fn run_search(aggregator: &Aggregator, input: &str) -> anyhow::Result<SearchOutcome> {
    let outcome = aggregator.search(input).await;
    for failure in &outcome.failures {
        eprintln!("{}", output::notification(failure));
    }

    match outcome.status() {
        SearchStatus::EmptyInput => bail!("Enter at least one city name"),
        SearchStatus::NoResults => bail!("No weather data found for: {input}"),
        SearchStatus::Success => Ok(outcome),
    }
}

async fn search(
    cities: Option<String>,
    select: Option<String>,
    mode: SearchMode,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = RecentStore::default_location()?;
    let mut dashboard = Dashboard::new(store.load()?);

    let input = match cities {
        Some(cities) => cities,
        None => match dashboard.recent().most_recent() {
            Some(last) => last.to_string(),
            None => bail!("No recent searches yet.\nHint: run `weather search \"London, Paris\"`."),
        },
    };
    debug!(%input, ?mode, "searching");

    let outcome = run_search(&aggregator(&config, mode)?, &input).await?;
    dashboard.apply(outcome);
    store.save(dashboard.recent())?;

    if let Some(name) = &select {
        if !dashboard.select(name) {
            eprintln!("! \"{name}\" is not part of this result; showing the first city");
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(dashboard.current())?);
        return Ok(());
    }

    if dashboard.current().snapshots.len() > 1 {
        println!("{}", output::comparison_table(dashboard.current()));
    }
    if let Some(view) = dashboard.selected_view() {
        println!("{}", output::city_detail(view, Utc::now()));
    }
    Ok(())
}

async fn advise(city: &str, kind: PromptKind, question: Option<&str>) -> anyhow::Result<()> {
    if kind == PromptKind::WeatherQuestion && question.is_none_or(|q| q.trim().is_empty()) {
        bail!("`--kind question` needs a `--question`");
    }

    let config = Config::load()?;
    let advisor = Advisor::new(text_generator_from_config(
        &config,
        &http_client(config.request_timeout())?,
    )?);

    let outcome = run_search(&aggregator(&config, SearchMode::Concurrent)?, city).await?;
    let name = outcome
        .selected()
        .context("search returned no city")?
        .to_string();
    let view = outcome
        .result
        .city(&name)
        .context("search returned no city")?;

    let mut ctx = AdvisoryContext::from_view(view);
    if let Some(question) = question {
        ctx = ctx.with_question(question);
    }

    let advice = advisor.generate(kind, &ctx).await;
    println!("{} for {}\n\n{}", kind.title(), name, advice);
    Ok(())
}

async fn export(
    city: &str,
    date: Option<NaiveDate>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let weather = weather_source_from_config(&config, &http_client(config.request_timeout())?)?;
    let snapshot = weather
        .fetch_current(city)
        .await
        .with_context(|| format!("Failed to fetch weather data for {city}"))?;

    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let ics = calendar::calendar_event(&snapshot, date);

    let path = output.unwrap_or_else(|| calendar::calendar_file_name(&snapshot.name, date).into());
    if path.as_os_str() == "-" {
        print!("{ics}");
        return Ok(());
    }

    std::fs::write(&path, ics)
        .with_context(|| format!("Failed to write calendar file: {}", path.display()))?;
    println!("Saved {}", path.display());
    Ok(())
}

async fn insights(city: &str, weight: f64, activity: ActivityLevel) -> anyhow::Result<()> {
    if !(weight.is_finite() && weight > 0.0) {
        bail!("--weight must be a positive number of kilograms");
    }

    let config = Config::load()?;
    let weather = weather_source_from_config(&config, &http_client(config.request_timeout())?)?;
    let snapshot = weather
        .fetch_current(city)
        .await
        .with_context(|| format!("Failed to fetch weather data for {city}"))?;

    println!(
        "{}",
        output::insights_report(&snapshot, weight, activity, Utc::now())
    );
    Ok(())
}

fn recent() -> anyhow::Result<()> {
    let recent = RecentStore::default_location()?.load()?;
    if recent.is_empty() {
        println!("No recent searches.");
    }
    for (i, name) in recent.names().iter().enumerate() {
        println!("{}. {name}", i + 1);
    }
    Ok(())
}

fn forget(city: &str) -> anyhow::Result<()> {
    let store = RecentStore::default_location()?;
    let mut recent = store.load()?;
    if !recent.remove(city) {
        bail!("\"{city}\" is not in the recent searches");
    }
    store.save(&recent)?;
    println!("Removed {city}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_search_flags() {
        let cli = Cli::parse_from(["weather", "search", "London, Paris", "--concurrent", "--json"]);
        match cli.command {
            Command::Search {
                cities,
                concurrent,
                json,
                select,
            } => {
                assert_eq!(cities.as_deref(), Some("London, Paris"));
                assert!(concurrent && json);
                assert!(select.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_advice_kind_and_date() {
        let cli = Cli::parse_from(["weather", "advise", "Paris", "--kind", "flood-risk"]);
        assert!(matches!(
            cli.command,
            Command::Advise {
                kind: PromptKind::FloodRisk,
                ..
            }
        ));

        let cli = Cli::parse_from(["weather", "export", "Paris", "--date", "2026-10-20"]);
        match cli.command {
            Command::Export { date, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 20));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_advice_kind() {
        assert!(Cli::try_parse_from(["weather", "advise", "Paris", "--kind", "horoscope"]).is_err());
    }
}
