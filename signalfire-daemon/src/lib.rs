//! Long-running signalfire process: director pollers, collation, and a
//! Unix-socket JSON query surface.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;
pub mod views;

pub use error::DaemonError;
pub use protocol::{
    request_directors, request_groups, request_status, request_stop, send_request,
    DaemonRequest, DaemonResponse,
};
pub use runtime::{run, serve, start_blocking};
pub use views::{DirectorsResponse, GroupsResponse, PollerView};
