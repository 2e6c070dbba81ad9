use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, Query, State},
    http::Request,
    response::IntoResponse,
    routing::{get, post},
};
use backend::{
    AppState,
    config::PlannerSettings,
    create_router,
    geo::{encode_polyline, haversine_km},
    models::{ApiError, Coordinate, TripOutline, TripPlan},
    planner::Planner,
};
use hyper::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

const LAHORE: (f64, f64) = (31.5204, 74.3587);
const ISLAMABAD: (f64, f64) = (33.6844, 73.0479);
const HONOLULU: (f64, f64) = (21.3069, -157.8583);

/// What the fake upstream has been asked for.
#[derive(Default)]
struct Hits {
    searches: Mutex<Vec<Instant>>,
    summaries: Mutex<HashMap<String, usize>>,
}

impl Hits {
    fn search_times(&self) -> Vec<Instant> {
        self.searches.lock().unwrap().clone()
    }

    fn summary_count(&self, title: &str) -> usize {
        self.summaries.lock().unwrap().get(title).copied().unwrap_or(0)
    }
}

fn lerp(a: Coordinate, b: Coordinate, t: f64) -> Coordinate {
    Coordinate::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t)
}

async fn fake_search(
    State(hits): State<Arc<Hits>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    hits.searches.lock().unwrap().push(Instant::now());
    let q = params.get("q").cloned().unwrap_or_default();
    let hit = |(lat, lon): (f64, f64), name: &str| {
        json!([{ "lat": lat.to_string(), "lon": lon.to_string(), "display_name": name }])
    };
    Json(if q.contains("Lahore") {
        hit(LAHORE, "Lahore, Punjab, Pakistan")
    } else if q.contains("Islamabad") {
        hit(ISLAMABAD, "Islamabad, Pakistan")
    } else if q.contains("Honolulu") {
        hit(HONOLULU, "Honolulu, Hawaii")
    } else {
        json!([])
    })
}

fn parse_waypoints(coords: &str) -> Vec<Coordinate> {
    coords
        .split(';')
        .map(|pair| {
            let mut parts = pair.split(',').map(|v| v.parse::<f64>().unwrap());
            let lon = parts.next().unwrap();
            let lat = parts.next().unwrap();
            Coordinate::new(lat, lon)
        })
        .collect()
}

async fn fake_osrm(Path((_profile, coords)): Path<(String, String)>) -> impl IntoResponse {
    let waypoints = parse_waypoints(&coords);
    if waypoints.iter().any(|c| c.lon < -100.0) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": "NoRoute", "message": "Impossible route between points" })),
        );
    }

    let mut path = vec![waypoints[0]];
    for pair in waypoints.windows(2) {
        path.extend((1..=10).map(|i| lerp(pair[0], pair[1], i as f64 / 10.0)));
    }
    let distance: f64 = path.windows(2).map(|w| haversine_km(w[0], w[1]) * 1000.0).sum();
    let legs: Vec<Value> = (1..waypoints.len())
        .map(|leg| {
            json!({ "steps": [
                { "name": "", "maneuver": { "type": "depart" } },
                { "name": format!("Road {leg}"), "maneuver": { "type": "turn", "modifier": "right" } },
                { "name": format!("Road {leg}"), "maneuver": { "type": "new name", "modifier": "straight" } },
                { "name": "", "maneuver": { "type": "arrive" } }
            ]})
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "code": "Ok",
            "routes": [{
                "geometry": encode_polyline(&path).unwrap(),
                "distance": distance,
                "duration": distance / 20.0,
                "legs": legs
            }]
        })),
    )
}

async fn fake_geosearch(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let lat: f64 = params["gscoord"]
        .split('|')
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap();
    let landmark = if lat < 32.6 {
        json!({ "title": "Lahore Fort", "lat": 31.5879, "lon": 74.3101, "dist": 900.0 })
    } else {
        json!({ "title": "Rohtas Fort", "lat": 32.9625, "lon": 73.5889, "dist": 1500.0 })
    };
    let village = json!({ "title": "Small Village", "lat": lat, "lon": 73.9, "dist": 10.0 });
    Json(json!({ "batchcomplete": "", "query": { "geosearch": [village, landmark] } }))
}

async fn fake_summary(
    State(hits): State<Arc<Hits>>,
    Path(title): Path<String>,
) -> impl IntoResponse {
    *hits.summaries.lock().unwrap().entry(title.clone()).or_default() += 1;
    let extract = match title.as_str() {
        "Lahore Fort" => "Lahore Fort is a citadel in the city of Lahore.",
        "Rohtas Fort" => "Rohtas Fort is a 16th-century fortress near Jhelum.",
        "Small Village" => "Tiny.",
        _ => return (StatusCode::NOT_FOUND, Json(json!({ "title": "Not found." }))),
    };
    (StatusCode::OK, Json(json!({ "title": title, "extract": extract })))
}

async fn fake_t5(Json(body): Json<Value>) -> Json<Value> {
    assert!(body["inputs"].as_str().is_some());
    Json(json!([{ "generated_text": "start: Lahore, end: Islamabad" }]))
}

async fn fake_gemini(Path(model): Path<String>) -> Json<Value> {
    assert!(model.ends_with(":generateContent"));
    Json(json!({
        "candidates": [{
            "content": { "parts": [{ "text": "{\"start\": \"Lahore\", \"end\": \"Islamabad\"}" }] }
        }]
    }))
}

async fn spawn_upstream() -> (SocketAddr, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let upstream = Router::new()
        .route("/search", get(fake_search))
        .route("/route/v1/:profile/:coords", get(fake_osrm))
        .route("/w/api.php", get(fake_geosearch))
        .route("/api/rest_v1/page/summary/:title", get(fake_summary))
        .route("/t5", post(fake_t5))
        .route("/v1beta/models/:model", post(fake_gemini))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });
    (addr, hits)
}

async fn app_with(tune: impl FnOnce(&mut PlannerSettings)) -> (Router, Arc<Hits>) {
    let (addr, hits) = spawn_upstream().await;
    let mut settings = PlannerSettings::local(&format!("http://{addr}"));
    tune(&mut settings);
    let planner = Planner::new(&settings).expect("http client");
    let app = create_router(AppState {
        planner: Arc::new(planner),
    });
    (app, hits)
}

async fn test_app() -> Router {
    app_with(|_| {}).await.0
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 4 * 1024 * 1024).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn ping_answers_hello() {
    let app = test_app().await;
    let (status, body) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Hello, World!");
}

#[tokio::test]
async fn getmap_returns_outline_with_samples() {
    let app = test_app().await;
    let (status, body) = get_json(
        &app,
        "/getmap?query=drive%20from%20Lahore%20to%20Islamabad&model=rules",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let outline: TripOutline = serde_json::from_slice(&body).unwrap();
    assert_eq!(outline.start, "Lahore, Punjab, Pakistan");
    assert_eq!(outline.end, "Islamabad, Pakistan");
    assert_eq!(outline.start_lat, LAHORE.0);
    assert_eq!(outline.end_lon, ISLAMABAD.1);
    assert_eq!(outline.points.len(), 11);
    assert_eq!(outline.sample_points.len(), 5);
    assert!(
        outline
            .sample_points
            .windows(2)
            .all(|w| w[1].cum_dist() > w[0].cum_dist())
    );
}

#[tokio::test]
async fn getmap_reads_t5_output() {
    let app = test_app().await;
    let (status, body) = get_json(&app, "/getmap?query=lahore%20trip&model=t-5").await;
    assert_eq!(status, StatusCode::OK);
    let outline: TripOutline = serde_json::from_slice(&body).unwrap();
    assert_eq!(outline.start, "Lahore, Punjab, Pakistan");
    assert_eq!(outline.end, "Islamabad, Pakistan");
}

#[tokio::test]
async fn plan_builds_itinerary_with_deduplicated_stops() {
    let (app, hits) = app_with(|_| {}).await;
    let (status, body) = get_json(
        &app,
        "/api/plan?query=show%20me%20forts%20between%20Lahore%20and%20Islamabad&model=gemini",
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));

    let plan: TripPlan = serde_json::from_slice(&body).unwrap();
    let titles: Vec<_> = plan.stops.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Lahore Fort", "Rohtas Fort"]);
    assert!(plan.stops[0].cum_dist < plan.stops[1].cum_dist);
    assert_eq!(
        plan.stops[1].extract,
        "Rohtas Fort is a 16th-century fortress near Jhelum."
    );

    assert_eq!(
        plan.itinerary,
        vec![
            "Start from Lahore, Punjab, Pakistan",
            "Turn right onto Road 1",
            "Stop at Lahore Fort: Lahore Fort is a citadel in the city of Lahore.",
            "Turn right onto Road 2",
            "Stop at Rohtas Fort: Rohtas Fort is a 16th-century fortress near Jhelum.",
            "Turn right onto Road 3",
            "Arrive at Islamabad, Pakistan",
        ]
    );

    // start, two stops, end: three legs of ten segments each
    assert_eq!(plan.route.len(), 31);
    assert!(plan.distance_km > 250.0);
    assert!(plan.duration_min > 0.0);
    assert!(!plan.gpx_base64.is_empty());
    let bounds = plan.bounds.expect("bounds");
    assert!(bounds.min_lat <= LAHORE.0 + 1e-5 && bounds.max_lat >= ISLAMABAD.0 - 1e-5);

    // scoring and the stop narratives share one fetch per article
    for title in ["Lahore Fort", "Rohtas Fort", "Small Village"] {
        assert_eq!(hits.summary_count(title), 1, "{title}");
    }
}

#[tokio::test]
async fn second_geocode_waits_for_the_interval() {
    let interval = Duration::from_millis(300);
    let (app, hits) = app_with(|settings| settings.geocode_interval = interval).await;

    let before = Instant::now();
    let (status, _) = get_json(&app, "/getmap?query=from%20Lahore%20to%20Islamabad&model=rules").await;
    assert_eq!(status, StatusCode::OK);

    let searches = hits.search_times();
    assert_eq!(searches.len(), 2);
    assert!(
        searches[1].duration_since(before) >= interval,
        "second geocode after {:?}",
        searches[1].duration_since(before)
    );
}

#[tokio::test]
async fn missing_query_parameter_is_an_api_error() {
    let app = test_app().await;
    let (status, body) = get_json(&app, "/getmap?model=rules").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ApiError = serde_json::from_slice(&body).unwrap();
    assert!(error.message.contains("query"), "{}", error.message);

    let (status, body) = get_json(&app, "/api/plan").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(serde_json::from_slice::<ApiError>(&body).is_ok());
}

#[tokio::test]
async fn unknown_place_is_an_invalid_query() {
    let app = test_app().await;
    let (status, body) = get_json(&app, "/api/plan?query=from%20Atlantis%20to%20Lahore&model=rules").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: ApiError = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.message, shared::QUERY_INVALID);
}

#[tokio::test]
async fn query_without_trip_is_an_invalid_query() {
    let app = test_app().await;
    let (status, body) = get_json(&app, "/getmap?query=hello%20there&model=rules").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: ApiError = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.message, shared::QUERY_INVALID);
}

#[tokio::test]
async fn unknown_model_is_a_bad_request() {
    let app = test_app().await;
    let (status, body) = get_json(&app, "/getmap?query=from%20A%20to%20B&model=gpt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ApiError = serde_json::from_slice(&body).unwrap();
    assert!(error.message.contains("gpt"));
}

#[tokio::test]
async fn unroutable_trip_reports_route_error() {
    let app = test_app().await;
    let (status, body) = get_json(&app, "/api/plan?query=from%20Lahore%20to%20Honolulu&model=rules").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let error: ApiError = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        error.message,
        "Error processing route: No route found by OSRM with waypoints"
    );
}
