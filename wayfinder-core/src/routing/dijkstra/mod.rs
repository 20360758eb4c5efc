mod search;
mod state;

pub(crate) use search::{CostModel, shortest_path};
