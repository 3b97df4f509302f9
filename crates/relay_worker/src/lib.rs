pub mod amqp;
pub mod domain;
pub mod http;
pub mod relay_worker;
pub mod session;

pub use amqp::*;
pub use domain::*;
pub use http::*;
pub use relay_worker::*;
pub use session::*;
