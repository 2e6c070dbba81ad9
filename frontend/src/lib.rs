use seed::{prelude::*, virtual_dom::AtValue, *};
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use shared::{
    ApiError, Coordinate, ModelKind, QUERY_VALID, RouteBounds, TripPlan, popup_excerpt,
};
use wasm_bindgen::prelude::{JsValue, wasm_bindgen};

#[wasm_bindgen(module = "/leaflet_map.js")]
extern "C" {
    #[wasm_bindgen(js_name = initMap)]
    fn init_map();
    #[wasm_bindgen(js_name = renderTrip)]
    fn render_trip_js(view: JsValue);
    #[wasm_bindgen(js_name = clearTrip)]
    fn clear_trip_js();
}

const PLACEHOLDER_MAP: &str = "/map_placeholder.svg";

fn api_root() -> String {
    if let Some(url) = option_env!("FRONTEND_API_ROOT") {
        return url.trim_end_matches('/').to_string();
    }
    "http://localhost:8080".to_string()
}

fn plan_url(root: &str, query: &str, model: ModelKind) -> String {
    format!(
        "{root}/api/plan?query={}&model={}",
        urlencoding::encode(query),
        urlencoding::encode(model.as_str())
    )
}

pub struct Model {
    form: QueryForm,
    pending: bool,
    plan: Option<TripPlan>,
    feedback: Feedback,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Feedback {
    Awaiting,
    Processing,
    Valid,
    Failed(String),
}

impl Feedback {
    fn text(&self) -> String {
        match self {
            Feedback::Awaiting => "Awaiting query...".to_string(),
            Feedback::Processing => "Processing the Query...".to_string(),
            Feedback::Valid => QUERY_VALID.to_string(),
            Feedback::Failed(message) => format!("Error: {message}"),
        }
    }

    fn class(&self) -> &'static str {
        match self {
            Feedback::Awaiting | Feedback::Processing => "feedback-idle",
            Feedback::Valid => "feedback-ok",
            Feedback::Failed(_) => "feedback-error",
        }
    }
}

#[derive(Default, Clone)]
struct QueryForm {
    query: String,
    model: ModelKind,
}

impl QueryForm {
    fn to_request(&self) -> Result<(String, ModelKind), String> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err("Enter your plan first.".to_string());
        }
        Ok((query.to_string(), self.model))
    }
}

pub enum Msg {
    QueryChanged(String),
    ModelSelected(ModelKind),
    Submit,
    PlanFetched(Result<TripPlan, String>),
}

pub fn init(_: Url, _: &mut impl Orders<Msg>) -> Model {
    Model {
        form: QueryForm::default(),
        pending: false,
        plan: None,
        feedback: Feedback::Awaiting,
    }
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::QueryChanged(val) => model.form.query = val,
        Msg::ModelSelected(kind) => model.form.model = kind,
        Msg::Submit => {
            if model.pending {
                return;
            }
            // reset the previous trip before anything else
            model.plan = None;
            clear_trip_js();
            match model.form.to_request() {
                Ok((query, kind)) => {
                    model.pending = true;
                    model.feedback = Feedback::Processing;
                    orders.perform_cmd(send_plan_request(query, kind));
                }
                Err(err) => model.feedback = Feedback::Failed(err),
            }
        }
        Msg::PlanFetched(result) => {
            model.pending = false;
            match result {
                Ok(plan) => {
                    push_trip_to_map(&plan);
                    model.plan = Some(plan);
                    model.feedback = Feedback::Valid;
                }
                Err(err) => {
                    clear_trip_js();
                    model.feedback = Feedback::Failed(err);
                }
            }
        }
    }
}

async fn send_plan_request(query: String, kind: ModelKind) -> Msg {
    web_sys::console::debug_1(&format!("[frontend] planning with {kind}: {query}").into());
    let request = Request::new(plan_url(&api_root(), &query, kind)).method(Method::Get);
    let response = match request.fetch().await {
        Err(err) => Err(format!("{err:?}")),
        Ok(resp) if resp.status().is_ok() => match resp.json::<TripPlan>().await {
            Ok(plan) => Ok(plan),
            Err(err) => Err(format!("{err:?}")),
        },
        Ok(resp) => {
            let code = resp.status().code;
            match resp.json::<ApiError>().await {
                Ok(api_error) => Err(api_error.message),
                Err(_) => Err(format!("request failed with status {code}")),
            }
        }
    };

    Msg::PlanFetched(response)
}

pub fn view(model: &Model) -> Node<Msg> {
    let title = p![C!["title"], "Generate Travel Suggestions!"];
    let body = div![C!["panels"], view_input(model), view_output(model)];

    div![C!["app-container"], title, body]
}

fn view_input(model: &Model) -> Node<Msg> {
    let model_option = |label: &str, kind: ModelKind| {
        label![
            C!["model-option"],
            input![
                attrs! {
                    At::Type => "radio",
                    At::Name => "model",
                    At::Checked => bool_attr(model.form.model == kind),
                },
                ev(Ev::Change, move |_| Msg::ModelSelected(kind)),
            ],
            span![label],
        ]
    };

    div![
        C!["input-panel"],
        div![
            C!["section"],
            p![C!["section-label"], "Travel Query"],
            textarea![
                attrs! {
                    At::Placeholder => "Enter your plan.",
                    At::Value => model.form.query,
                    At::SpellCheck => "false",
                },
                input_ev(Ev::Input, Msg::QueryChanged),
            ],
            button![
                "Submit",
                ev(Ev::Click, |event| {
                    event.prevent_default();
                    Msg::Submit
                }),
                attrs! { At::Disabled => bool_attr(model.pending) },
            ],
        ],
        div![
            C!["section"],
            p![C!["section-label"], "Model Selection"],
            model_option("T-5", ModelKind::T5),
            model_option("Gemini", ModelKind::Gemini),
        ],
        div![
            C!["section"],
            p![C!["section-label"], "Feedback"],
            p![C![model.feedback.class()], model.feedback.text()],
        ],
    ]
}

fn view_output(model: &Model) -> Node<Msg> {
    let has_route = model
        .plan
        .as_ref()
        .is_some_and(|plan| !plan.route.is_empty());

    // leaflet keeps its own DOM inside #map, so the container always exists
    let map = div![
        id!["map"],
        style! { St::Display => if has_route { "block" } else { "none" } },
    ];
    let placeholder = if has_route {
        empty![]
    } else {
        img![
            C!["map-placeholder"],
            attrs! { At::Src => PLACEHOLDER_MAP, At::Alt => "Map" },
        ]
    };

    div![
        C!["output-panel"],
        placeholder,
        map,
        view_summary(model),
        div![
            C!["itinerary"],
            p![C!["section-label"], "Itinerary suggestion"],
            div![
                C!["itinerary-lines"],
                model
                    .plan
                    .iter()
                    .flat_map(|plan| plan.itinerary.iter())
                    .map(|line| p![itinerary_line(line)]),
            ],
        ],
    ]
}

fn view_summary(model: &Model) -> Node<Msg> {
    let Some(plan) = &model.plan else {
        return empty![];
    };
    div![
        C!["trip-summary"],
        span![format!("{:.1} km", plan.distance_km)],
        span![format!("about {}", format_duration(plan.duration_min))],
        span![format!("{} stops", plan.stops.len())],
    ]
}

fn itinerary_line(line: &str) -> String {
    format!("- {line}")
}

fn format_duration(minutes: f64) -> String {
    let total = minutes.round().max(0.0) as u64;
    match (total / 60, total % 60) {
        (0, m) => format!("{m} min"),
        (h, 0) => format!("{h} h"),
        (h, m) => format!("{h} h {m:02} min"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Start,
    Stop,
    End,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub kind: MarkerKind,
    pub lat: f64,
    pub lon: f64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Everything the leaflet side draws for one trip.
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub route: Vec<[f64; 2]>,
    pub markers: Vec<MapMarker>,
    pub bounds: Option<RouteBounds>,
}

pub fn map_view(plan: &TripPlan) -> MapView {
    let outline = &plan.outline;
    let marker = |kind, coord: Coordinate, title: &str, excerpt: Option<String>| {
        coord.is_valid().then(|| MapMarker {
            kind,
            lat: coord.lat,
            lon: coord.lon,
            title: title.to_string(),
            excerpt,
        })
    };

    let start = marker(
        MarkerKind::Start,
        outline.start_coordinate(),
        &outline.start,
        None,
    );
    let stops = plan.stops.iter().filter_map(|stop| {
        marker(
            MarkerKind::Stop,
            stop.coordinate(),
            &stop.title,
            Some(popup_excerpt(&stop.extract)),
        )
    });
    let end = marker(MarkerKind::End, outline.end_coordinate(), &outline.end, None);

    MapView {
        route: plan
            .route
            .iter()
            .filter(|c| c.is_valid())
            .map(Coordinate::as_pair)
            .collect(),
        markers: start.into_iter().chain(stops).chain(end).collect(),
        bounds: plan.bounds.or_else(|| RouteBounds::from_path(&plan.route)),
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    init_map();
    App::start("app", init, update, view);
}

fn push_trip_to_map(plan: &TripPlan) {
    if plan.route.is_empty() {
        clear_trip_js();
        return;
    }
    match to_value(&map_view(plan)) {
        Ok(value) => render_trip_js(value),
        Err(err) => web_sys::console::error_1(&format!("map payload: {err:?}").into()),
    }
}

fn bool_attr(value: bool) -> AtValue {
    if value {
        AtValue::Some("true".into())
    } else {
        AtValue::Ignored
    }
}
