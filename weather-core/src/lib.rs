//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for the weather, air-quality, UV and text-generation providers
//! - The multi-city search sequencer and the dashboard state it feeds
//! - AQI/UV classification, advisory prompts and derived local metrics
//! - Recent-search persistence and iCalendar export
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod advisory;
pub mod aggregate;
pub mod calendar;
pub mod classify;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod insights;
pub mod model;
pub mod provider;
pub mod recent;

pub use advisory::{clean_markdown, Advisor, AdvisoryContext, PromptKind, FALLBACK_TEXT};
pub use aggregate::{parse_city_list, Aggregator, SearchMode, SearchOutcome, SearchStatus};
pub use calendar::{calendar_event, calendar_file_name};
pub use classify::{AqiCategory, Metrics, UvCategory};
pub use config::{Config, ProviderConfig};
pub use dashboard::Dashboard;
pub use error::Condition;
pub use model::{
    CityFailure, CitySnapshot, CityView, Coordinates, CurrentConditions, ForecastPoint,
    ForecastSeries, SearchResult, Stage,
};
pub use provider::{AirQualitySource, ProviderId, TextGenerator, UvSource, WeatherSource};
pub use recent::{RecentSearches, RecentStore, MAX_RECENT};
