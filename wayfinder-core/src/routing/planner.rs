use log::{debug, warn};
use rayon::prelude::*;

use super::dijkstra::{CostModel, shortest_path};
use super::route::Route;
use crate::{CampusGraph, Error};

/// Plans the lowest-cost route from `start` to `goal`.
///
/// With `require_accessible` the search first keeps to penalty-free edges.
/// When no such path exists the accessibility penalty of every edge is added
/// to its distance and the cheapest path is still returned, with
/// [`Route::accessible`] set to `false`.
///
/// # Errors
///
/// [`Error::UnknownNode`] if either identifier is missing,
/// [`Error::Unreachable`] if no path connects them
pub fn plan(
    graph: &CampusGraph,
    start: &str,
    goal: &str,
    require_accessible: bool,
) -> Result<Route, Error> {
    let start_idx = graph.node_index(start)?;
    let goal_idx = graph.node_index(goal)?;

    let path = if require_accessible {
        shortest_path(graph, start_idx, goal_idx, CostModel::AccessibleOnly)
            .or_else(|| shortest_path(graph, start_idx, goal_idx, CostModel::Penalized))
    } else {
        shortest_path(graph, start_idx, goal_idx, CostModel::Distance)
    }
    .ok_or_else(|| Error::Unreachable {
        from: start.to_string(),
        to: goal.to_string(),
    })?;

    let route = Route::from_path(graph, &path, require_accessible);
    if !route.accessible() {
        warn!(
            "Route {start} -> {goal} includes edges without required accessibility features \
            (total penalty {:.1})",
            route.total_penalty()
        );
    }
    debug!(
        "Planned {start} -> {goal}: {} edges, {:.1} m",
        route.edge_count(),
        route.total_distance()
    );
    Ok(route)
}

/// Plans routes from one start to several goals in parallel.
///
/// Results keep the order of `goals`; unreachable goals yield `None`.
///
/// # Errors
///
/// [`Error::UnknownNode`] if the start or any goal is missing
pub fn plan_one_to_many(
    graph: &CampusGraph,
    start: &str,
    goals: &[&str],
    require_accessible: bool,
) -> Result<Vec<Option<Route>>, Error> {
    graph.node_index(start)?;
    for goal in goals {
        graph.node_index(goal)?;
    }

    goals
        .par_iter()
        .map(|goal| match plan(graph, start, goal, require_accessible) {
            Ok(route) => Ok(Some(route)),
            Err(Error::Unreachable { .. }) => Ok(None),
            Err(e) => Err(e),
        })
        .collect()
}
