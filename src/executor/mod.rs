mod client;
mod dispatch;
mod request;
mod source;

pub use client::{ClientOptions, CommandBuilder, DEFAULT_COMMAND_TIMEOUT, SqlClient};
pub use request::CommandRequest;
pub use source::TabularSource;
