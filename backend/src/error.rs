use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolylineError {
    #[error("invalid polyline: {0}")]
    Invalid(String),
}

/// Failure talking to one of the third-party HTTP services.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} answered with status {status}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("{service} returned an unexpected payload: {message}")]
    Payload {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub fn http(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| UpstreamError::Http { service, source }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("model output could not be parsed: {raw}")]
    Unparseable { raw: String },
    #[error("model output is missing '{0}'")]
    MissingField(&'static str),
    #[error(transparent)]
    Model(#[from] UpstreamError),
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("No route found by OSRM with waypoints")]
    NoRoute,
    #[error("route needs at least two waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("route geometry is malformed: {0}")]
    Geometry(#[from] PolylineError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{}", shared::QUERY_INVALID)]
    InvalidQuery,
    #[error("could not interpret query: {0}")]
    Query(#[from] QueryError),
    #[error("geocoding failed: {0}")]
    Geocode(#[source] UpstreamError),
    #[error("Error processing route: {0}")]
    Route(#[from] RouteError),
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}
