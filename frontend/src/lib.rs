pub mod arbiter;
pub mod line_stream;
pub mod protocol;
