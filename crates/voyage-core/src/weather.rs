//! Weather inputs and risk scoring.
//!
//! Samples come from an external provider; the core only scores them.
//! Wind and wave directions are "coming from", currents are "flowing toward".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    #[default]
    Clear,
    Cloudy,
    Fog,
    Rain,
    Storm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub wind_speed_kn: f64,
    pub wind_direction_deg: f64,
    pub wave_height_m: f64,
    pub visibility_nm: f64,
    #[serde(default)]
    pub condition: WeatherCondition,
    #[serde(default)]
    pub wave_direction_deg: Option<f64>,
    #[serde(default)]
    pub current_speed_kn: Option<f64>,
    #[serde(default)]
    pub current_direction_deg: Option<f64>,
}

impl WeatherSample {
    /// Flat calm, unlimited visibility.
    pub fn calm() -> Self {
        Self {
            wind_speed_kn: 0.0,
            wind_direction_deg: 0.0,
            wave_height_m: 0.0,
            visibility_nm: 10.0,
            condition: WeatherCondition::Clear,
            wave_direction_deg: None,
            current_speed_kn: None,
            current_direction_deg: None,
        }
    }

    /// Wave direction, assuming wind-driven seas when the provider omits it.
    pub fn effective_wave_direction_deg(&self) -> f64 {
        self.wave_direction_deg.unwrap_or(self.wind_direction_deg)
    }
}

const WIND_SATURATION_KN: f64 = 40.0;
const WAVE_SATURATION_M: f64 = 4.0;
const VISIBILITY_THRESHOLD_NM: f64 = 5.0;

/// Score a sample from 0 (benign) to 100 (severe).
///
/// Wind contributes up to 40 points, waves 35, reduced visibility 15 and the
/// reported condition 10.
pub fn weather_risk(sample: &WeatherSample) -> f64 {
    let wind = (sample.wind_speed_kn.max(0.0) / WIND_SATURATION_KN).min(1.0) * 40.0;
    let waves = (sample.wave_height_m.max(0.0) / WAVE_SATURATION_M).min(1.0) * 35.0;
    let visibility = if sample.visibility_nm < VISIBILITY_THRESHOLD_NM {
        (1.0 - sample.visibility_nm.max(0.0) / VISIBILITY_THRESHOLD_NM) * 15.0
    } else {
        0.0
    };
    let condition = match sample.condition {
        WeatherCondition::Clear | WeatherCondition::Cloudy => 0.0,
        WeatherCondition::Fog | WeatherCondition::Rain => 5.0,
        WeatherCondition::Storm => 10.0,
    };
    (wind + waves + visibility + condition).clamp(0.0, 100.0)
}

/// Fuel multiplier for a weather risk score: up to +30% at risk 100.
pub fn weather_fuel_factor(risk: f64) -> f64 {
    1.0 + (risk.clamp(0.0, 100.0) / 100.0) * 0.3
}
