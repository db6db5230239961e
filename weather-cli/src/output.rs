//! Plain-text rendering for terminal output.

use chrono::{DateTime, Datelike, Utc};
use weather_core::{
    CityFailure, CitySnapshot, CityView, ForecastSeries, Metrics, SearchResult,
    insights::{
        ActivityLevel, FORECAST_DAYS, PollenRisk, daily_tip, hydration_liters, is_daytime,
        pollen_risk, summarize_days, temperature_band, weather_emoji, wind_direction,
    },
};

/// Forecast points covering the next 24 hours.
const NEXT_DAY_POINTS: usize = 8;

pub fn notification(failure: &CityFailure) -> String {
    format!("! {}", failure.message())
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

/// One row per city, in result order.
pub fn comparison_table(result: &SearchResult) -> String {
    let width = result
        .snapshots
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("City".len());

    let mut out = format!(
        "{:<width$}  {:>7}  {:>8}  {:>9}  {:>4}  {:>4}  Conditions\n",
        "City", "Temp", "Humidity", "Wind", "AQI", "UV"
    );
    for snapshot in &result.snapshots {
        let c = &snapshot.conditions;
        let view = result.city(&snapshot.name);
        let aqi = or_na(view.and_then(|v| v.aqi));
        let uv = or_na(view.and_then(|v| v.uv_index).map(|uv| format!("{uv:.1}")));
        out.push_str(&format!(
            "{:<width$}  {:>5.1}°C  {:>7}%  {:>5.1} m/s  {:>4}  {:>4}  {} {}\n",
            snapshot.name,
            c.temperature,
            c.humidity,
            c.wind_speed,
            aqi,
            uv,
            weather_emoji(&c.weather_main),
            c.weather_description,
        ));
    }
    out
}

fn conditions_block(snapshot: &CitySnapshot, now: DateTime<Utc>) -> String {
    let c = &snapshot.conditions;
    let offset = snapshot.local_offset();
    let visibility = or_na(c.visibility_m.map(|m| format!("{:.1} km", f64::from(m) / 1000.0)));

    [
        format!(
            "{}, {}  {} {}",
            snapshot.name,
            snapshot.country,
            weather_emoji(&c.weather_main),
            c.weather_description
        ),
        format!(
            "  Temperature: {:.1}°C (feels like {:.1}°C, {:?})",
            c.temperature,
            c.feels_like,
            temperature_band(c.temperature)
        ),
        format!("  Humidity:    {}%", c.humidity),
        format!("  Pressure:    {} hPa", c.pressure),
        format!(
            "  Wind:        {:.1} m/s {}",
            c.wind_speed,
            wind_direction(f64::from(c.wind_direction_deg))
        ),
        format!("  Clouds:      {}%", c.cloud_cover_pct),
        format!("  Visibility:  {visibility}"),
        format!(
            "  Sun:         rises {}, sets {} ({})",
            c.sunrise.with_timezone(&offset).format("%H:%M"),
            c.sunset.with_timezone(&offset).format("%H:%M"),
            if is_daytime(now, c.sunrise, c.sunset) {
                "day"
            } else {
                "night"
            }
        ),
    ]
    .join("\n")
}

fn metrics_block(metrics: &Metrics) -> String {
    let aqi = &metrics.aqi;
    let uv = &metrics.uv_index;
    [
        format!(
            "  AQI:         {} ({})",
            or_na(aqi.value),
            aqi.label
        ),
        format!("               {}", aqi.category.advice()),
        format!(
            "  UV index:    {} ({})",
            or_na(uv.value.map(|v| format!("{v:.1}"))),
            uv.label
        ),
        format!("               {}", uv.category.advice()),
    ]
    .join("\n")
}

pub fn forecast_lines(series: &ForecastSeries) -> String {
    let offset = series.local_offset();
    series
        .upcoming(NEXT_DAY_POINTS)
        .iter()
        .map(|p| {
            format!(
                "  {}  {:>5.1}°C  {:>3.0}%  {:>4.1} mm  {} {}",
                p.time.with_timezone(&offset).format("%a %H:%M"),
                p.temperature,
                p.precipitation_chance * 100.0,
                p.precipitation_mm,
                weather_emoji(&p.weather_main),
                p.weather_description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per local day: range, dominant condition and total precipitation.
pub fn daily_forecast(series: &ForecastSeries) -> String {
    summarize_days(series)
        .iter()
        .map(|d| {
            format!(
                "  {}  {:>5.1}° / {:>5.1}°C  {:>5.1} mm  {} {}",
                d.date.format("%a %d %b"),
                d.min_temp,
                d.max_temp,
                d.precipitation_mm,
                weather_emoji(&d.weather_main),
                d.weather_main
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Conditions, AQI/UV metrics with advice, the next 24 hours and the daily outlook.
pub fn city_detail(view: CityView<'_>, now: DateTime<Utc>) -> String {
    let mut out = conditions_block(view.snapshot, now);
    out.push('\n');
    out.push_str(&metrics_block(&Metrics::new(view.uv_index, view.aqi)));
    out.push_str("\n\nNext 24 hours:\n");
    match view.forecast {
        Some(series) if !series.points.is_empty() => {
            out.push_str(&forecast_lines(series));
            out.push_str(&format!("\n\n{FORECAST_DAYS}-day forecast:\n"));
            out.push_str(&daily_forecast(series));
        }
        _ => out.push_str("  Forecast unavailable"),
    }
    out
}

pub fn insights_report(
    snapshot: &CitySnapshot,
    weight_kg: f64,
    activity: ActivityLevel,
    now: DateTime<Utc>,
) -> String {
    let c = &snapshot.conditions;
    let month = now.with_timezone(&snapshot.local_offset()).month();
    let water = hydration_liters(weight_kg, activity, c.temperature);
    let PollenRisk {
        level,
        recommendation,
        predominant,
    } = pollen_risk(c.humidity, c.wind_speed, c.temperature, month);

    let tip = daily_tip(&c.weather_main, c.temperature, now.ordinal() as usize);

    let types = if predominant.is_empty() {
        "none in season".to_string()
    } else {
        predominant.join(", ")
    };

    [
        format!("{} insights", snapshot.name),
        format!(
            "  Hydration:   {water:.1} L/day ({weight_kg:.0} kg, {activity:?} activity)"
        ),
        format!("  Pollen risk: {level:.1}/5, {recommendation}"),
        format!("  Pollen:      {types}"),
        format!(
            "  Wind:        {:.1} m/s from {}",
            c.wind_speed,
            wind_direction(f64::from(c.wind_direction_deg))
        ),
        format!("  Tip:         {tip}"),
    ]
    .join("\n")
}
