//! Vessel performance profiles.

use crate::models::Emissions;
use serde::Serialize;

/// Vessel type used when a lookup misses.
pub const DEFAULT_VESSEL_TYPE: &str = "supply_vessel";

/// Emission factors in kg per litre of fuel burned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionFactors {
    pub co2: f64,
    pub nox: f64,
    pub sox: f64,
}

/// Marine gas oil, burned by the smaller harbour and offshore craft.
const MGO: EmissionFactors = EmissionFactors {
    co2: 2.68,
    nox: 0.057,
    sox: 0.0017,
};

/// Very-low-sulphur fuel oil, burned by ocean-going ships.
const VLSFO: EmissionFactors = EmissionFactors {
    co2: 3.02,
    nox: 0.078,
    sox: 0.0095,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselProfile {
    pub vessel_type: &'static str,
    pub cruising_speed_kn: f64,
    pub min_speed_kn: f64,
    pub max_speed_kn: f64,
    /// Litres per nautical mile at cruising speed
    pub fuel_consumption_l_per_nm: f64,
    pub fuel_cost_per_l: f64,
    pub emission_factors: EmissionFactors,
}

impl VesselProfile {
    /// Profile for `vessel_type`, falling back to [`DEFAULT_VESSEL_TYPE`].
    pub fn lookup(vessel_type: &str) -> &'static VesselProfile {
        let wanted = vessel_type.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        PROFILES
            .iter()
            .find(|profile| profile.vessel_type == wanted)
            .unwrap_or_else(|| {
                tracing::debug!("Unknown vessel type {:?}, using {}", vessel_type, DEFAULT_VESSEL_TYPE);
                Self::default_profile()
            })
    }

    pub fn default_profile() -> &'static VesselProfile {
        &PROFILES[DEFAULT_PROFILE_INDEX]
    }

    pub fn all() -> &'static [VesselProfile] {
        &PROFILES
    }

    pub fn emissions_for(&self, fuel_l: f64) -> Emissions {
        Emissions {
            co2_kg: fuel_l * self.emission_factors.co2,
            nox_kg: fuel_l * self.emission_factors.nox,
            sox_kg: fuel_l * self.emission_factors.sox,
        }
    }

    pub fn clamp_speed(&self, speed_kn: f64) -> f64 {
        speed_kn.clamp(self.min_speed_kn, self.max_speed_kn)
    }
}

const DEFAULT_PROFILE_INDEX: usize = 1;

static PROFILES: [VesselProfile; 6] = [
    VesselProfile {
        vessel_type: "tugboat",
        cruising_speed_kn: 10.0,
        min_speed_kn: 4.0,
        max_speed_kn: 13.0,
        fuel_consumption_l_per_nm: 28.0,
        fuel_cost_per_l: 0.85,
        emission_factors: MGO,
    },
    VesselProfile {
        vessel_type: "supply_vessel",
        cruising_speed_kn: 12.0,
        min_speed_kn: 5.0,
        max_speed_kn: 16.0,
        fuel_consumption_l_per_nm: 35.0,
        fuel_cost_per_l: 0.85,
        emission_factors: MGO,
    },
    VesselProfile {
        vessel_type: "crew_boat",
        cruising_speed_kn: 20.0,
        min_speed_kn: 8.0,
        max_speed_kn: 28.0,
        fuel_consumption_l_per_nm: 22.0,
        fuel_cost_per_l: 0.85,
        emission_factors: MGO,
    },
    VesselProfile {
        vessel_type: "tanker",
        cruising_speed_kn: 13.0,
        min_speed_kn: 6.0,
        max_speed_kn: 16.0,
        fuel_consumption_l_per_nm: 180.0,
        fuel_cost_per_l: 0.62,
        emission_factors: VLSFO,
    },
    VesselProfile {
        vessel_type: "container_ship",
        cruising_speed_kn: 18.0,
        min_speed_kn: 8.0,
        max_speed_kn: 24.0,
        fuel_consumption_l_per_nm: 260.0,
        fuel_cost_per_l: 0.62,
        emission_factors: VLSFO,
    },
    VesselProfile {
        vessel_type: "bulk_carrier",
        cruising_speed_kn: 12.5,
        min_speed_kn: 6.0,
        max_speed_kn: 15.0,
        fuel_consumption_l_per_nm: 150.0,
        fuel_cost_per_l: 0.62,
        emission_factors: VLSFO,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_normalizes_type_names() {
        assert_eq!(VesselProfile::lookup("Tugboat").vessel_type, "tugboat");
        assert_eq!(VesselProfile::lookup("crew-boat").vessel_type, "crew_boat");
        assert_eq!(VesselProfile::lookup("container ship").vessel_type, "container_ship");
    }

    #[test]
    fn unknown_type_falls_back_to_default() {
        assert_eq!(VesselProfile::lookup("hovercraft").vessel_type, DEFAULT_VESSEL_TYPE);
    }

    #[test]
    fn speed_envelopes_are_ordered() {
        for profile in VesselProfile::all() {
            assert!(profile.min_speed_kn < profile.cruising_speed_kn, "{}", profile.vessel_type);
            assert!(profile.cruising_speed_kn < profile.max_speed_kn, "{}", profile.vessel_type);
        }
    }

    #[test]
    fn emissions_scale_linearly_with_fuel() {
        let profile = VesselProfile::lookup("tanker");
        let one = profile.emissions_for(1.0);
        let ten = profile.emissions_for(10.0);
        assert!((ten.co2_kg - one.co2_kg * 10.0).abs() < 1e-9);
        assert!((ten.sox_kg - one.sox_kg * 10.0).abs() < 1e-12);
    }
}
