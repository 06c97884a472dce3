//! Approximate land detection for the Arabian Gulf and Gulf of Oman.
//!
//! Land areas are either bounding boxes (islands, peninsulas) or coastlines
//! described as a piecewise-linear latitude threshold over longitude. This is
//! a fast filter, not hydrographic data: segment checks sample three interior
//! points, so thin land features between samples are missed. A polygon-based
//! implementation can replace [`is_on_land`] without changing its signature.

use crate::geometry::interpolate_linear;
use crate::models::GeoPoint;
use serde::Serialize;

/// Fractions along a segment that are probed for land.
pub const SEGMENT_SAMPLE_FRACTIONS: [f64; 3] = [0.25, 0.5, 0.75];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LandArea {
    RasGhurabIsland,
    AbuDhabiIsland,
    Bahrain,
    QatarPeninsula,
    MusandamPeninsula,
    HajarCoast,
    ShattAlArabDelta,
    ArabianPeninsula,
    UaeMainland,
    OmanCoast,
    IranCoast,
}

impl LandArea {
    pub fn name(&self) -> &'static str {
        match self {
            LandArea::RasGhurabIsland => "Ras Ghurab Island",
            LandArea::AbuDhabiIsland => "Abu Dhabi Island",
            LandArea::Bahrain => "Bahrain",
            LandArea::QatarPeninsula => "Qatar Peninsula",
            LandArea::MusandamPeninsula => "Musandam Peninsula",
            LandArea::HajarCoast => "Hajar Coast",
            LandArea::ShattAlArabDelta => "Shatt al-Arab Delta",
            LandArea::ArabianPeninsula => "Arabian Peninsula",
            LandArea::UaeMainland => "UAE Mainland",
            LandArea::OmanCoast => "Oman Coast",
            LandArea::IranCoast => "Iran Coast",
        }
    }
}

impl std::fmt::Display for LandArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

struct BoxRegion {
    area: LandArea,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl BoxRegion {
    fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }
}

#[derive(Clone, Copy)]
enum LandSide {
    /// Land lies south of the coastline
    South,
    /// Land lies north of the coastline
    North,
}

struct Coastline {
    area: LandArea,
    side: LandSide,
    /// Latitude beyond which the rule stops applying (inland cut-off)
    limit_lat: f64,
    /// (lon, lat) vertices with strictly increasing longitude
    vertices: &'static [(f64, f64)],
}

impl Coastline {
    fn contains(&self, point: GeoPoint) -> bool {
        let Some(coast_lat) = coast_latitude(self.vertices, point.lon) else {
            return false;
        };
        match self.side {
            LandSide::South => point.lat < coast_lat && point.lat >= self.limit_lat,
            LandSide::North => point.lat > coast_lat && point.lat <= self.limit_lat,
        }
    }
}

// Checked in order; islands and peninsulas must precede the mainland rules.
const BOX_REGIONS: [BoxRegion; 7] = [
    BoxRegion {
        area: LandArea::RasGhurabIsland,
        min_lat: 24.43,
        max_lat: 24.455,
        min_lon: 54.08,
        max_lon: 54.12,
    },
    BoxRegion {
        area: LandArea::AbuDhabiIsland,
        min_lat: 24.40,
        max_lat: 24.50,
        min_lon: 54.33,
        max_lon: 54.45,
    },
    BoxRegion {
        area: LandArea::Bahrain,
        min_lat: 25.80,
        max_lat: 26.30,
        min_lon: 50.35,
        max_lon: 50.65,
    },
    BoxRegion {
        area: LandArea::QatarPeninsula,
        min_lat: 24.50,
        max_lat: 26.15,
        min_lon: 50.75,
        max_lon: 51.60,
    },
    BoxRegion {
        area: LandArea::MusandamPeninsula,
        min_lat: 25.75,
        max_lat: 26.40,
        min_lon: 56.05,
        max_lon: 56.45,
    },
    BoxRegion {
        area: LandArea::HajarCoast,
        min_lat: 24.00,
        max_lat: 25.75,
        min_lon: 55.60,
        max_lon: 56.33,
    },
    BoxRegion {
        area: LandArea::ShattAlArabDelta,
        min_lat: 29.95,
        max_lat: 31.00,
        min_lon: 47.50,
        max_lon: 48.90,
    },
];

const ARABIAN_PENINSULA_COAST: [(f64, f64); 12] = [
    (47.50, 30.00),
    (48.00, 29.35),
    (48.40, 28.50),
    (48.90, 27.90),
    (49.60, 27.05),
    (50.05, 26.55),
    (50.15, 26.20),
    (50.30, 25.60),
    (50.55, 25.00),
    (50.85, 24.60),
    (51.30, 24.30),
    (51.60, 24.00),
];

const UAE_COAST: [(f64, f64); 10] = [
    (51.60, 24.00),
    (52.60, 24.15),
    (53.60, 24.10),
    (54.10, 24.25),
    (54.50, 24.35),
    (55.00, 24.85),
    (55.30, 25.20),
    (55.60, 25.45),
    (56.00, 25.80),
    (56.08, 25.80),
];

const OMAN_COAST: [(f64, f64); 9] = [
    (56.33, 24.90),
    (56.60, 24.50),
    (57.00, 24.00),
    (57.60, 23.70),
    (58.20, 23.65),
    (58.60, 23.55),
    (59.00, 23.20),
    (59.50, 22.70),
    (59.80, 22.40),
];

const IRAN_COAST: [(f64, f64); 17] = [
    (48.90, 30.00),
    (50.30, 29.20),
    (50.84, 28.97),
    (51.30, 28.20),
    (52.00, 27.70),
    (52.60, 27.40),
    (53.50, 26.85),
    (54.50, 26.60),
    (55.30, 26.55),
    (55.90, 26.75),
    (56.30, 27.05),
    (56.90, 26.95),
    (57.10, 26.30),
    (57.80, 25.65),
    (58.50, 25.55),
    (59.50, 25.35),
    (61.50, 25.10),
];

const COASTLINES: [Coastline; 4] = [
    Coastline {
        area: LandArea::ArabianPeninsula,
        side: LandSide::South,
        limit_lat: 20.0,
        vertices: &ARABIAN_PENINSULA_COAST,
    },
    Coastline {
        area: LandArea::UaeMainland,
        side: LandSide::South,
        limit_lat: 20.0,
        vertices: &UAE_COAST,
    },
    Coastline {
        area: LandArea::OmanCoast,
        side: LandSide::South,
        limit_lat: 20.0,
        vertices: &OMAN_COAST,
    },
    Coastline {
        area: LandArea::IranCoast,
        side: LandSide::North,
        limit_lat: 32.0,
        vertices: &IRAN_COAST,
    },
];

fn coast_latitude(vertices: &[(f64, f64)], lon: f64) -> Option<f64> {
    vertices.windows(2).find_map(|pair| {
        let (lon0, lat0) = pair[0];
        let (lon1, lat1) = pair[1];
        if lon < lon0 || lon > lon1 {
            return None;
        }
        let span = lon1 - lon0;
        if span <= f64::EPSILON {
            return Some(lat0.max(lat1));
        }
        Some(lat0 + (lon - lon0) / span * (lat1 - lat0))
    })
}

/// Classify a point as water (`None`) or the first matching land area.
pub fn is_on_land(point: GeoPoint) -> Option<LandArea> {
    if let Some(region) = BOX_REGIONS.iter().find(|region| region.contains(point)) {
        return Some(region.area);
    }
    COASTLINES
        .iter()
        .find(|coast| coast.contains(point))
        .map(|coast| coast.area)
}

/// Outcome of probing a straight segment for land.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LandCrossing {
    pub crosses: bool,
    pub land_area: Option<LandArea>,
    pub cross_point: Option<GeoPoint>,
}

impl LandCrossing {
    pub const CLEAR: LandCrossing = LandCrossing {
        crosses: false,
        land_area: None,
        cross_point: None,
    };
}

/// Probe the segment `a -> b` at [`SEGMENT_SAMPLE_FRACTIONS`].
///
/// Endpoints are not checked; callers route from ports and anchorages that
/// may sit inside a coarse land box.
pub fn segment_crosses_land(a: GeoPoint, b: GeoPoint) -> LandCrossing {
    for fraction in SEGMENT_SAMPLE_FRACTIONS {
        let sample = interpolate_linear(a, b, fraction);
        if let Some(area) = is_on_land(sample) {
            return LandCrossing {
                crosses: true,
                land_area: Some(area),
                cross_point: Some(sample),
            };
        }
    }
    LandCrossing::CLEAR
}
