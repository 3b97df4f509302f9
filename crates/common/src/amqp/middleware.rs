mod consumer_logging;

pub use consumer_logging::*;
