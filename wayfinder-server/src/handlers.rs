//! HTTP handlers over the campus graph, the planner and guidance sessions.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use geo::Point;
use serde::{Deserialize, Serialize};
use wayfinder_core::{
    Error, GuidanceEvent, GuidanceStatus, Instruction, NavigationSession, Node, Phase,
    PositionSample, ReplanContext, Route, geometry::is_valid_coordinate, plan, synthesize_with,
};

use crate::error::ApiError;
use crate::state::{AppState, SessionEntry};

const DEFAULT_NEARBY_RADIUS: f64 = 100.0;

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub lat: f64,
    pub lon: f64,
    /// Search radius in meters, nearby queries only
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NodeDistance {
    pub node: Node,
    pub distance: f64,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub start: String,
    pub goal: String,
    pub require_accessible: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub route: Route,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub id: u64,
    #[serde(flatten)]
    pub plan: RouteResponse,
}

fn checked_point(lat: f64, lon: f64) -> Result<Point<f64>, ApiError> {
    if is_valid_coordinate(lat, lon) {
        Ok(Point::new(lon, lat))
    } else {
        Err(Error::InvalidPosition(format!("coordinate ({lat}, {lon}) is out of range")).into())
    }
}

/// Plans on the blocking pool; large campuses take a few milliseconds
async fn plan_blocking(
    state: &Arc<AppState>,
    request: RouteRequest,
) -> Result<(Route, bool), ApiError> {
    let require_accessible = request
        .require_accessible
        .unwrap_or(state.config.require_accessible);
    let graph = Arc::clone(&state.graph);

    let route = tokio::task::spawn_blocking(move || {
        plan(&graph, &request.start, &request.goal, require_accessible)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Planning task failed");
        ApiError::Internal("Planning".to_string())
    })??;
    Ok((route, require_accessible))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "nodes": state.graph.node_count(),
        "edges": state.graph.edge_count(),
    }))
}

pub async fn nearest_node(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<NodeDistance>, ApiError> {
    let point = checked_point(query.lat, query.lon)?;
    let (node, distance) = state
        .graph
        .nearest_node(&point)
        .ok_or_else(|| Error::UnknownNode("no node near the given location".to_string()))?;

    Ok(Json(NodeDistance {
        node: node.clone(),
        distance,
    }))
}

pub async fn nearby_nodes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Vec<NodeDistance>>, ApiError> {
    let point = checked_point(query.lat, query.lon)?;
    let radius = query.radius.unwrap_or(DEFAULT_NEARBY_RADIUS);
    if !radius.is_finite() || radius < 0.0 {
        return Err(Error::InvalidPosition(format!("radius {radius} is not a distance")).into());
    }

    let nodes = state
        .graph
        .nodes_within(&point, radius)
        .into_iter()
        .map(|(node, distance)| NodeDistance {
            node: node.clone(),
            distance,
        })
        .collect();
    Ok(Json(nodes))
}

pub async fn list_nodes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CategoryQuery>,
) -> Json<Vec<Node>> {
    let nodes = match query.category.as_deref() {
        Some(category) => state
            .graph
            .nodes_in_category(category)
            .into_iter()
            .cloned()
            .collect(),
        None => state.graph.nodes().cloned().collect(),
    };
    Json(nodes)
}

pub async fn plan_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, ApiError> {
    let (route, _) = plan_blocking(&state, request).await?;
    let instructions = synthesize_with(&route, &state.config.guidance.instructions);
    Ok(Json(RouteResponse {
        route,
        instructions,
    }))
}

pub async fn plan_route_geojson(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (route, _) = plan_blocking(&state, request).await?;
    Ok(Json(route.to_geojson()?))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (route, require_accessible) = plan_blocking(&state, request).await?;
    let instructions = synthesize_with(&route, &state.config.guidance.instructions);

    let replan = ReplanContext {
        graph: Arc::clone(&state.graph),
        require_accessible,
    };
    let (session, events) = NavigationSession::spawn(
        state.config.guidance.clone(),
        route.clone(),
        Some(replan),
        state.config.event_capacity,
    )?;

    let id = state.next_session_id();
    let mut sessions = state.sessions.lock().await;
    state.sweep_finished(&mut sessions);
    sessions.insert(id, SessionEntry::new(session, events));
    drop(sessions);
    tracing::info!(session = id, goal = %route.goal().id, "Guidance session started");

    let body = SessionCreated {
        id,
        plan: RouteResponse {
            route,
            instructions,
        },
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// Reports a session; a finished session is removed once its final status is read
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<GuidanceStatus>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let entry = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    let status = entry.session.status();

    if status.phase == Phase::Arrived || entry.session.is_finished() {
        sessions.remove(&id);
        tracing::info!(session = id, phase = status.phase.as_str(), "Guidance session collected");
    }
    Ok(Json(status))
}

/// Clones the session handle so the table lock is not held across awaits
async fn session_handle(state: &AppState, id: u64) -> Result<Arc<NavigationSession>, ApiError> {
    let sessions = state.sessions.lock().await;
    sessions
        .get(&id)
        .map(|entry| Arc::clone(&entry.session))
        .ok_or(ApiError::SessionNotFound(id))
}

pub async fn push_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(sample): Json<PositionSample>,
) -> Result<StatusCode, ApiError> {
    checked_point(sample.lat, sample.lon)?;
    let sessions = state.sessions.lock().await;
    let entry = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    entry.session.push_sample(sample)?;
    Ok(StatusCode::ACCEPTED)
}

/// Returns and removes the events queued since the last call
pub async fn drain_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<GuidanceEvent>>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let entry = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
    let events = std::iter::from_fn(|| entry.events.try_recv().ok()).collect();
    Ok(Json(events))
}

pub async fn pause_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<GuidanceStatus>, ApiError> {
    let session = session_handle(&state, id).await?;
    session.pause().await?;
    Ok(Json(session.status()))
}

pub async fn resume_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<GuidanceStatus>, ApiError> {
    let session = session_handle(&state, id).await?;
    session.resume().await?;
    Ok(Json(session.status()))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let entry = state
        .sessions
        .lock()
        .await
        .remove(&id)
        .ok_or(ApiError::SessionNotFound(id))?;

    // An already finished task has nothing left to cancel
    if entry.session.cancel().await.is_ok() {
        if let Ok(session) = Arc::try_unwrap(entry.session) {
            session.join().await;
        }
    }
    tracing::info!(session = id, "Guidance session closed");
    Ok(StatusCode::NO_CONTENT)
}
