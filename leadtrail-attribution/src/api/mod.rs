//! HTTP API handlers for leadtrail-attribution

pub mod attribution;
pub mod health;
pub mod stats;
pub mod visits;

pub use attribution::attribution_routes;
pub use health::health_routes;
pub use stats::stats_routes;
pub use visits::visit_routes;
