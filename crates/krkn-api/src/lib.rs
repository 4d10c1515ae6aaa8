mod client;
pub mod logs;
mod traits;
pub use client::{api_error_from_body, map_reqwest_error, OperatorClient};
pub use logs::{
    build_ws_url, HttpLogSource, LogSource, LogStream, LogTarget, StreamEvent, WsLogSource,
};
pub use traits::OperatorAPI;
