//! Fixed-breakpoint categories for air quality and UV readings.
//!
//! Absent readings always map to `Unavailable`, never to a numeric bucket.

use serde::Serialize;

const UNAVAILABLE_COLOR: &str = "#A0AEC0";

/// US EPA air quality categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    Unavailable,
}

impl AqiCategory {
    pub fn classify(aqi: Option<u32>) -> Self {
        match aqi {
            None => Self::Unavailable,
            Some(0..=50) => Self::Good,
            Some(51..=100) => Self::Moderate,
            Some(101..=150) => Self::UnhealthyForSensitiveGroups,
            Some(151..=200) => Self::Unhealthy,
            Some(201..=300) => Self::VeryUnhealthy,
            Some(_) => Self::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
            Self::Unavailable => "Unavailable",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Good => "#4ade80",
            Self::Moderate => "#facc15",
            Self::UnhealthyForSensitiveGroups => "#fb923c",
            Self::Unhealthy => "#ef4444",
            Self::VeryUnhealthy => "#8f3f97",
            Self::Hazardous => "#7e0023",
            Self::Unavailable => UNAVAILABLE_COLOR,
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::Good => "Air quality is good. Enjoy outdoor activities.",
            Self::Moderate => {
                "Moderate air quality. Sensitive individuals should consider reducing prolonged outdoor activities."
            }
            Self::UnhealthyForSensitiveGroups => {
                "Unhealthy for sensitive groups. Older adults and children should limit prolonged outdoor exertion."
            }
            Self::Unhealthy => {
                "Unhealthy air quality. Everyone may begin to experience health effects."
            }
            Self::VeryUnhealthy => "Very unhealthy air quality. Avoid prolonged outdoor activities.",
            Self::Hazardous => "Hazardous air quality. Avoid all outdoor physical activities.",
            Self::Unavailable => "Air quality data unavailable",
        }
    }

    /// Rank among the numeric buckets; `None` for `Unavailable`.
    pub fn severity(&self) -> Option<u8> {
        match self {
            Self::Good => Some(0),
            Self::Moderate => Some(1),
            Self::UnhealthyForSensitiveGroups => Some(2),
            Self::Unhealthy => Some(3),
            Self::VeryUnhealthy => Some(4),
            Self::Hazardous => Some(5),
            Self::Unavailable => None,
        }
    }
}

/// WHO UV index categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UvCategory {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
    Unavailable,
}

impl UvCategory {
    pub fn classify(uv: Option<f64>) -> Self {
        match uv {
            None => Self::Unavailable,
            Some(u) if u.is_nan() => Self::Unavailable,
            Some(u) if u <= 2.0 => Self::Low,
            Some(u) if u <= 5.0 => Self::Moderate,
            Some(u) if u <= 7.0 => Self::High,
            Some(u) if u <= 10.0 => Self::VeryHigh,
            Some(_) => Self::Extreme,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Extreme => "Extreme",
            Self::Unavailable => "Unavailable",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#4ade80",
            Self::Moderate => "#facc15",
            Self::High => "#fb923c",
            Self::VeryHigh => "#f43f5e",
            Self::Extreme => "#7e22ce",
            Self::Unavailable => UNAVAILABLE_COLOR,
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::Low => "No protection needed. You can safely stay outside.",
            Self::Moderate => "Protection recommended. Wear SPF 30+ and seek shade during midday.",
            Self::High => "Protection essential. Limit sun exposure between 10am-4pm.",
            Self::VeryHigh => "Extra protection needed. Minimize sun exposure and reapply sunscreen.",
            Self::Extreme => "Maximum protection required. Avoid sun exposure when possible.",
            Self::Unavailable => "UV data unavailable",
        }
    }

    pub fn severity(&self) -> Option<u8> {
        match self {
            Self::Low => Some(0),
            Self::Moderate => Some(1),
            Self::High => Some(2),
            Self::VeryHigh => Some(3),
            Self::Extreme => Some(4),
            Self::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Metric<V, C> {
    pub value: Option<V>,
    pub category: C,
    pub color: &'static str,
    pub label: &'static str,
}

/// AQI and UV for one city, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub uv_index: Metric<f64, UvCategory>,
    pub aqi: Metric<u32, AqiCategory>,
}

impl Metrics {
    pub fn new(uv_index: Option<f64>, aqi: Option<u32>) -> Self {
        let uv = UvCategory::classify(uv_index);
        let aq = AqiCategory::classify(aqi);
        Self {
            uv_index: Metric {
                value: uv_index,
                category: uv,
                color: uv.color(),
                label: uv.label(),
            },
            aqi: Metric {
                value: aqi,
                category: aq,
                color: aq.color(),
                label: aq.label(),
            },
        }
    }
}
