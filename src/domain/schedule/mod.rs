pub mod timeslot;
pub mod timetable;
pub mod timetable_csv;
pub mod window_transaction;

#[cfg(test)]
mod test_timetable;
