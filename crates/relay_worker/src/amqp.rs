mod observation_consumer_service;

pub use observation_consumer_service::*;
