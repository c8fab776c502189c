pub mod event;
pub mod project;
pub mod recurrence;
pub mod temporal;
