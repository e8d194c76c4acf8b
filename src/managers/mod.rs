pub mod logging;
pub mod schedules;
