pub mod statistics;
pub mod phase;
pub mod symptoms;
pub mod prediction;
pub mod recommendations;
pub mod notifications;
