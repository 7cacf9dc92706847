//! Python code generation.
//!
//! Generators turn classified cells into [`Stmt`] trees; [`render`] is
//! the only place those trees become text.

mod emitter;
mod http;
mod ir;
mod manager_module;
mod scheduled;
mod websocket;

pub use http::{HttpEndpoint, HttpVerb, extract_path_params};
pub use ir::{FunctionDef, ModelDef, Param, Stmt, pascal_case, py_str, render};
pub use manager_module::{MANAGER_MODULE, MANAGER_MODULE_FILE};
pub use scheduled::{CronFields, ScheduledJob, Trigger, parse_cron, parse_interval};
pub use websocket::{STREAM_RECEIVE_TIMEOUT_SECS, WebSocketEndpoint, WsType};
