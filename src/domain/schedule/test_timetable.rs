use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::gci_store::gci_store_trait::{GciPoint, GciStore, zone_tags};
use crate::domain::gci_store::in_memory::InMemoryGciStore;
use crate::domain::schedule::timeslot::Timeslot;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::schedule::window_transaction::{WindowTransaction, reserve_window};
use crate::domain::utils::id::{JobId, NodeName};
use crate::error::Error;

// --- Helper Functions ---

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 8, 1, 0, 0, 0).unwrap()
}

fn create_timetable(gcis: &[f64]) -> Timetable {
    let mut timetable = Timetable::new();
    for (i, gci) in gcis.iter().enumerate() {
        assert!(timetable.append(Timeslot::hourly(base() + Duration::hours(i as i64), *gci)));
    }
    timetable
}

fn hourly_points(start: DateTime<Utc>, values: &[f64]) -> Vec<GciPoint> {
    values.iter().enumerate().map(|(i, gci)| GciPoint::new(start + Duration::hours(i as i64), *gci)).collect()
}

// --- Test Cases ---

#[test]
fn test_append_rejects_gap_and_keeps_timetable() {
    let mut timetable = create_timetable(&[100.0, 50.0]);
    let before = timetable.clone();

    assert!(!timetable.append(Timeslot::hourly(base() + Duration::hours(3), 10.0)));
    assert!(!timetable.append(Timeslot::hourly(base() + Duration::hours(1), 10.0)));
    assert_eq!(timetable, before);

    assert!(timetable.append(Timeslot::hourly(base() + Duration::hours(2), 10.0)));
    for pair in timetable.timeslots.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
}

#[test]
fn test_truncate_history_drops_finished_slots_only() {
    let mut timetable = create_timetable(&[1.0, 2.0, 3.0, 4.0]);

    timetable.truncate_history(base() + Duration::hours(2));
    assert_eq!(timetable.len(), 2);
    assert_eq!(timetable.timeslots[0].gci, 3.0);

    // A slot that has started but not ended is kept.
    timetable.truncate_history(base() + Duration::minutes(150));
    assert_eq!(timetable.len(), 2);
}

#[test]
fn test_append_direct_skips_covered_points_and_keeps_reservations() {
    let mut timetable = create_timetable(&[100.0, 50.0]);
    let job = JobId::new("job-1");
    assert!(reserve_window(&mut timetable, 1..2, &job, &NodeName::new("cx16")));

    let appended = timetable.append_direct(&hourly_points(base() + Duration::hours(1), &[999.0, 30.0, 40.0])).unwrap();

    assert_eq!(appended, 2);
    assert_eq!(timetable.len(), 4);
    assert_eq!(timetable.timeslots[1].gci, 50.0);
    assert_eq!(timetable.reservations_of(&job).len(), 1);
}

#[test]
fn test_append_direct_with_gap_leaves_timetable_unchanged() {
    let mut timetable = create_timetable(&[100.0]);
    let before = timetable.clone();

    let result = timetable.append_direct(&hourly_points(base() + Duration::hours(2), &[10.0, 20.0]));

    assert!(matches!(result, Err(Error::NonContiguousTimeslot { .. })));
    assert_eq!(timetable, before);
}

#[test]
fn test_windows_and_weights() {
    let timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);

    let windows = timetable.windows(2);
    assert_eq!(windows, vec![0..2, 1..3, 2..4]);
    assert_eq!(timetable.window_weight(&windows[2]), 110.0);

    assert!(timetable.windows(5).is_empty());
    assert!(timetable.windows(0).is_empty());
}

#[test]
fn test_transaction_never_leaves_partial_reservations() {
    let mut timetable = create_timetable(&[1.0, 2.0, 3.0]);
    let node = NodeName::new("cx16");
    assert!(reserve_window(&mut timetable, 2..3, &JobId::new("blocker"), &node));

    let job = JobId::new("job-1");
    let mut transaction = WindowTransaction::new(&mut timetable, 0..3, &job, &node);
    assert!(!transaction.stage());
    assert!(transaction.commit().is_none());

    assert!(timetable.reservations_of(&job).is_empty());
    assert!(!timetable.timeslots[0].is_full());
}

#[test]
fn test_remove_job_clears_all_slots() {
    let mut timetable = create_timetable(&[1.0, 2.0, 3.0]);
    let job = JobId::new("job-1");
    assert!(reserve_window(&mut timetable, 0..3, &job, &NodeName::new("cx16")));

    assert_eq!(timetable.remove_job(&job), 3);
    assert!(timetable.reservations_of(&job).is_empty());
}

#[test]
fn test_csv_round_trip_is_exact() {
    let mut timetable = create_timetable(&[100.125, 50.0, 80.3333333333, 30.0]);
    assert!(reserve_window(&mut timetable, 1..3, &JobId::new("job-1"), &NodeName::new("cx16")));
    assert!(reserve_window(&mut timetable, 1..2, &JobId::new("job-2"), &NodeName::new("gx03")));

    let mut buffer = Vec::new();
    timetable.to_csv_writer(&mut buffer).unwrap();

    let text = String::from_utf8(buffer.clone()).unwrap();
    assert!(text.starts_with("start,end,gci,reservations"));

    let restored = Timetable::from_csv_reader(buffer.as_slice()).unwrap();
    assert_eq!(restored, timetable);
}

#[test]
fn test_csv_file_round_trip_and_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("schedule.csv");

    assert!(Timetable::read_csv(&path).unwrap().is_empty());

    let mut timetable = create_timetable(&[10.0, 20.0]);
    assert!(reserve_window(&mut timetable, 0..2, &JobId::new("job-1"), &NodeName::new("cx16")));
    timetable.write_csv(&path).unwrap();

    assert_eq!(Timetable::read_csv(&path).unwrap(), timetable);
}

#[test]
fn test_empty_timetable_writes_header() {
    let mut buffer = Vec::new();
    Timetable::new().to_csv_writer(&mut buffer).unwrap();

    assert_eq!(String::from_utf8(buffer).unwrap().trim(), "start,end,gci,reservations");
    assert!(Timetable::from_csv_reader("start,end,gci,reservations\n".as_bytes()).unwrap().is_empty());
}

#[tokio::test]
async fn test_append_forecast_from_store() {
    let tags = zone_tags("DE");
    let values: Vec<f64> = (0..48).map(|v| v as f64).collect();
    let store = InMemoryGciStore::with_series(&hourly_points(base(), &values), &tags).await.unwrap();

    let start = base() + Duration::hours(48);
    let mut timetable = Timetable::new();
    let appended = timetable.append_forecast(&store, &tags, start, 1, 2).await.unwrap();

    assert_eq!(appended, 24);
    assert_eq!(timetable.timeslots[0].start, start);
    // median of hour 24 and hour 0
    assert_eq!(timetable.timeslots[0].gci, (24.0 + 0.0) / 2.0);
}

#[tokio::test]
async fn test_append_forecast_without_history_fails_and_keeps_timetable() {
    let store = InMemoryGciStore::new();
    let mut timetable = create_timetable(&[10.0]);
    let before = timetable.clone();

    let result = timetable.append_forecast(&store, &zone_tags("DE"), base() + Duration::hours(1), 1, 2).await;

    assert!(matches!(result, Err(Error::InsufficientHistory { .. })));
    assert_eq!(timetable, before);
}

#[tokio::test]
async fn test_append_historic_and_stored_forecast() {
    let tags = zone_tags("FR");
    let store = InMemoryGciStore::new();
    store.write(&hourly_points(base(), &[5.0, 6.0, 7.0]), &tags).await.unwrap();

    let mut historic = Timetable::new();
    assert_eq!(historic.append_historic(&store, &tags, base(), base() + Duration::hours(2)).await.unwrap(), 2);
    assert_eq!(historic.timeslots[1].gci, 6.0);

    let mut stored = Timetable::new();
    assert_eq!(stored.append_stored_forecast(&store, &tags, base(), 1).await.unwrap(), 3);
    assert_eq!(stored.end(), Some(base() + Duration::hours(3)));
}
