pub mod engine;
pub mod model;
pub mod recurrence;
pub mod registry;
pub mod snooze;
pub mod store;
