//! Client core of the competitive-intelligence war room: typed REST access,
//! an async query cache, the live news stream and one view-model per page.
//! The `warroom` binary renders those view-models as text.

pub mod api;
pub mod cache;
pub mod error;
pub mod forms;
pub mod graph;
pub mod helpers;
pub mod live;
pub mod pages;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;
pub mod style;
pub mod types;

pub use error::ClientError;
pub use state::AppState;
