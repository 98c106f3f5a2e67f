// Event sink implementations
pub mod channel;
pub mod console;
pub mod json_lines;
pub mod log_sink;

pub use channel::ChannelSink;
pub use console::ConsoleSink;
pub use json_lines::JsonLinesSink;
pub use log_sink::LogSink;
