mod disposition;
mod error;
mod forwarder;
mod observation;
mod observation_relay;

pub use disposition::*;
pub use error::*;
pub use forwarder::*;
pub use observation::*;
pub use observation_relay::*;
