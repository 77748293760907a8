//! A sequential HTTP/1.x origin server: one request per connection,
//! dispatched to either the static-file responder or a CGI/1.1 script.

pub mod cgi;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod mime;
pub mod path;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;
pub mod static_file;

pub use config::{Cli, ServerConfig};
pub use error::PipelineError;
pub use request::Request;
pub use response::Response;
