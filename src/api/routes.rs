use std::convert::Infallible;
use warp::filters::BoxedFilter;
use warp::{Filter, Rejection, Reply};

use super::handlers;
use super::state::AppState;
use super::websocket;

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Exact-match filter for a configured route such as `ws/game`.
fn route_path(route: &str) -> BoxedFilter<()> {
    route
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(warp::any().boxed(), |filter, segment| {
            filter.and(warp::path(segment.to_string())).boxed()
        })
        .and(warp::path::end())
        .boxed()
}

fn cors(origins: &[String]) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_methods(vec!["GET", "OPTIONS"])
        .allow_headers(vec!["content-type", "authorization"]);

    if origins.iter().any(|o| o == "*") {
        builder.allow_any_origin()
    } else {
        builder.allow_origins(origins.iter().map(String::as_str))
    }
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let server = &state.config.server;

    let game_ws = route_path(&server.ws_game_endpoint)
        .and(warp::ws())
        .and(with_state(state.clone()))
        .map(|ws: warp::ws::Ws, state: AppState| {
            ws.on_upgrade(move |socket| websocket::serve_game_client(socket, state))
        });

    let input_ws = route_path(&server.ws_input_endpoint)
        .and(warp::ws())
        .and(with_state(state.clone()))
        .map(|ws: warp::ws::Ws, state: AppState| {
            ws.on_upgrade(move |socket| websocket::serve_input_client(socket, state))
        });

    let index = warp::get()
        .and(warp::path::end())
        .and(warp::fs::file(server.phone_client_path.clone()));

    let health = warp::get()
        .and(warp::path!("health"))
        .and(with_state(state.clone()))
        .and_then(handlers::health);

    let stats = warp::get()
        .and(warp::path!("api" / "stats"))
        .and(with_state(state.clone()))
        .and_then(handlers::stats);

    let steering = warp::get()
        .and(warp::path!("api" / "steering"))
        .and(with_state(state.clone()))
        .and_then(handlers::steering);

    let metrics = warp::get()
        .and(warp::path!("metrics"))
        .and(with_state(state.clone()))
        .and_then(handlers::metrics);

    game_ws
        .or(input_ws)
        .or(index)
        .or(health)
        .or(stats)
        .or(steering)
        .or(metrics)
        .recover(handlers::handle_rejection)
        .with(cors(&state.config.allowed_origins_list()))
        .with(warp::trace::request())
}
