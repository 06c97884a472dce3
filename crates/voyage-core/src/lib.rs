pub mod error;
pub mod geometry;
pub mod land;
pub mod models;
pub mod multi_stop;
pub mod network;
pub mod route_engine;
pub mod speed;
pub mod vessel;
pub mod weather;

pub use error::{MultiStopError, RouteError, StatusError};
pub use geometry::{bearing_deg, distance_nm, haversine_nm};
pub use land::{is_on_land, segment_crosses_land, LandArea, LandCrossing};
pub use models::{
    Emissions, GeoPoint, Route, RouteSegment, RouteSource, RouteStatus, SeaRoute,
    SeaRouteWaypoint, Stop,
};
pub use multi_stop::{
    assemble, optimize_multi_stop, plan_stop_order, DistanceMatrix, MultiStopOptions,
    MultiStopRequest, MultiStopResult, Savings, StopArrival, StopPlan, WindowStatus,
};
pub use network::{NavGraph, WaypointNode};
pub use route_engine::{
    build_route, ProviderRoute, RegionBounds, RouteEngine, RouteEngineConfig,
};
pub use speed::{
    optimize_arrival_window, optimize_speeds, virtual_arrival, ArrivalWindow, PortConditions,
    Priorities, SpeedOptimization, SpeedProfile, SpeedRequest, WindowPlan,
};
pub use vessel::VesselProfile;
pub use weather::{weather_risk, WeatherCondition, WeatherSample};
