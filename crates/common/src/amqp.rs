mod client;
mod consumer;
mod middleware;
mod traits;
mod types;

pub use client::*;
pub use consumer::*;
pub use middleware::*;
pub use traits::*;
pub use types::*;
