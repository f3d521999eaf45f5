pub mod pubsub;
pub mod sunrise;
