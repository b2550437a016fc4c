// Service exports
pub mod directions;
pub mod query_log;
pub mod weather;

pub use directions::{DirectionsClient, RouteProvider, RoutingError};
pub use query_log::{LoggingError, PostgresQueryStore, QueryLogger, QueryStore};
pub use weather::{Units, WeatherClient, WeatherFetchError, WeatherProvider};
