mod backend_forwarder;

pub use backend_forwarder::*;
