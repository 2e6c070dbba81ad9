pub use shared::{
    ApiError, Coordinate, ModelKind, RouteBounds, SamplePoint, Stop, TripOutline,
    TripPlan,
};
