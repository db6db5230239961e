//! iCalendar export of a city's conditions.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::model::CitySnapshot;

const PRODID: &str = "-//weather-dash//weather-cli//EN";

/// One VEVENT summarising `snapshot`, starting at midnight UTC on `date`.
pub fn calendar_event(snapshot: &CitySnapshot, date: NaiveDate) -> String {
    calendar_event_at(snapshot, date, Utc::now())
}

/// Same as [`calendar_event`] with an explicit `DTSTAMP`.
pub fn calendar_event_at(snapshot: &CitySnapshot, date: NaiveDate, stamp: DateTime<Utc>) -> String {
    let c = &snapshot.conditions;
    let start = date.and_time(NaiveTime::MIN).and_utc();

    let summary = format!("Weather in {}: {}", snapshot.name, c.weather_description);
    let description = format!(
        "Temperature: {}°C\nHumidity: {}%\nWind: {} m/s",
        c.temperature, c.humidity, c.wind_speed
    );
    let uid = format!(
        "{}-{}@weather-dash",
        date.format("%Y%m%d"),
        slug(&snapshot.name)
    );

    [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{}", ical_time(stamp)),
        format!("DTSTART:{}", ical_time(start)),
        format!("SUMMARY:{}", escape_text(&summary)),
        format!("DESCRIPTION:{}", escape_text(&description)),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ]
    .join("\r\n")
        + "\r\n"
}

/// Suggested name for the downloadable file.
pub fn calendar_file_name(city: &str, date: NaiveDate) -> String {
    format!("weather-{}-{}.ics", slug(city), date.format("%Y-%m-%d"))
}

fn ical_time(t: DateTime<Utc>) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// RFC 5545 TEXT escaping.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

fn slug(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::snapshot;
    use chrono::TimeZone;

    #[test]
    fn event_has_expected_lines() {
        let s = snapshot("London", 51.5, -0.12);
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let stamp = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();

        let ics = calendar_event_at(&s, date, stamp);
        let lines: Vec<&str> = ics.split("\r\n").collect();

        assert_eq!(
            lines,
            vec![
                "BEGIN:VCALENDAR",
                "VERSION:2.0",
                "PRODID:-//weather-dash//weather-cli//EN",
                "BEGIN:VEVENT",
                "UID:20261020-london@weather-dash",
                "DTSTAMP:20261019T093000Z",
                "DTSTART:20261020T000000Z",
                "SUMMARY:Weather in London: broken clouds",
                "DESCRIPTION:Temperature: 14.2°C\\nHumidity: 72%\\nWind: 4.6 m/s",
                "END:VEVENT",
                "END:VCALENDAR",
                "",
            ]
        );
    }

    #[test]
    fn text_values_are_escaped() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }

    #[test]
    fn file_name_is_slugged() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(calendar_file_name("New York", date), "weather-new-york-2026-01-02.ics");
        assert_eq!(calendar_file_name("São Paulo", date), "weather-são-paulo-2026-01-02.ics");
    }
}
