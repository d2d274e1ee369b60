pub mod scheduler;
pub mod timetable_actor;
pub mod timetable_loader;
pub mod timetable_message;
