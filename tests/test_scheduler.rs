use chrono::{DateTime, Duration, TimeZone, Utc};

use squirrel::domain::cluster::gres::parse_gres_list;
use squirrel::domain::cluster::node_info::NodeInfo;
use squirrel::domain::cluster::topology::ClusterTopology;
use squirrel::domain::schedule::timeslot::Timeslot;
use squirrel::domain::schedule::timetable::Timetable;
use squirrel::domain::scheduler::scheduler::{JobRequest, Scheduler};
use squirrel::domain::strategy::planning_strategy::PlanningStrategy;
use squirrel::domain::utils::id::{JobId, NodeName, PartitionName};
use squirrel::error::{Error, SchedulingError};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
}

fn create_timetable(gcis: &[f64]) -> Timetable {
    let mut timetable = Timetable::new();
    for (i, gci) in gcis.iter().enumerate() {
        assert!(timetable.append(Timeslot::hourly(base() + Duration::hours(i as i64), *gci)));
    }
    timetable
}

fn two_node_topology() -> ClusterTopology {
    ClusterTopology::new(vec![
        NodeInfo::new("cx16", 1).with_partitions(["jinx"]).with_tdp(Some(150), None),
        NodeInfo::new("gx03", 1).with_partitions(["jinx"]).with_gres(parse_gres_list("gpu:a100:2")).with_tdp(Some(200), Some(400)),
    ])
}

fn jinx() -> Vec<PartitionName> {
    vec![PartitionName::new("jinx")]
}

fn scheduling_error(result: squirrel::error::Result<impl std::fmt::Debug>) -> SchedulingError {
    match result {
        Err(Error::Scheduling(e)) => e,
        other => panic!("expected a scheduling error, got {:?}", other),
    }
}

#[test]
fn test_temporal_scenario_schedules_into_cheapest_hours() {
    let scheduler = Scheduler::new(PlanningStrategy::TemporalShifting, ClusterTopology::new(vec![NodeInfo::new("cx16", 1).with_partitions(["jinx"])]));
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);

    let first = scheduler.schedule(&JobId::new("a"), 1, &mut timetable, &jinx(), None, None).unwrap();
    let second = scheduler.schedule(&JobId::new("b"), 1, &mut timetable, &jinx(), None, None).unwrap();

    assert_eq!(first.window.start, 3);
    assert_eq!(first.start, base() + Duration::hours(3));
    assert_eq!(second.window.start, 1);
    assert_eq!(second.node, NodeName::new("cx16"));
}

#[test]
fn test_gpu_request_is_pinned_to_gpu_node() {
    let scheduler = Scheduler::new(PlanningStrategy::SpatialGreedyShifting, two_node_topology());
    let mut timetable = create_timetable(&[100.0, 50.0]);

    let allocation = scheduler.schedule(&JobId::new("gpu-job"), 1, &mut timetable, &jinx(), Some(1), None).unwrap();
    assert_eq!(allocation.node, NodeName::new("gx03"));

    // Without GPUs the cheaper CPU node wins.
    let allocation = scheduler.schedule(&JobId::new("cpu-job"), 1, &mut timetable, &jinx(), None, None).unwrap();
    assert_eq!(allocation.node, NodeName::new("cx16"));
}

#[test]
fn test_zero_hours_is_invalid() {
    let scheduler = Scheduler::new(PlanningStrategy::CarbonAgnosticFifo, two_node_topology());
    let mut timetable = create_timetable(&[100.0]);

    assert!(matches!(scheduling_error(scheduler.schedule(&JobId::new("a"), 0, &mut timetable, &jinx(), None, None)), SchedulingError::InvalidRequest(_)));
}

#[test]
fn test_job_longer_than_horizon() {
    let scheduler = Scheduler::new(PlanningStrategy::CarbonAgnosticFifo, two_node_topology());
    let mut timetable = create_timetable(&[100.0, 50.0]);

    let error = scheduling_error(scheduler.schedule(&JobId::new("a"), 3, &mut timetable, &jinx(), None, None));
    assert_eq!(error, SchedulingError::JobTooLong { hours: 3, horizon: 2 });
}

#[test]
fn test_no_suitable_node() {
    let scheduler = Scheduler::new(PlanningStrategy::CarbonAgnosticFifo, two_node_topology());
    let mut timetable = create_timetable(&[100.0, 50.0]);

    let error = scheduling_error(scheduler.schedule(&JobId::new("a"), 1, &mut timetable, &jinx(), Some(4), None));
    assert!(matches!(error, SchedulingError::NoSuitableNode { .. }));

    let error = scheduling_error(scheduler.schedule(&JobId::new("b"), 1, &mut timetable, &[PartitionName::new("other")], None, None));
    assert!(matches!(error, SchedulingError::NoSuitableNode { .. }));
}

#[test]
fn test_full_timetable_yields_no_window_and_no_reservation() {
    let scheduler = Scheduler::new(PlanningStrategy::SpatiotemporalShifting { switch_threshold: 0.25 }, two_node_topology());
    let mut timetable = create_timetable(&[100.0, 50.0]);

    for job in ["a", "b", "c", "d"] {
        scheduler.schedule(&JobId::new(job), 1, &mut timetable, &jinx(), None, None).unwrap();
    }
    let before = timetable.clone();

    let error = scheduling_error(scheduler.schedule(&JobId::new("e"), 1, &mut timetable, &jinx(), None, None));
    assert_eq!(error, SchedulingError::NoWindowAllocated { hours: 1 });
    assert_eq!(timetable, before);
}

#[test]
fn test_schedule_request_with_generated_id() {
    let scheduler = Scheduler::new(PlanningStrategy::TemporalShifting, two_node_topology());
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0]);

    let request = JobRequest::new(2, jinx());
    let allocation = scheduler.schedule_request(&request, &mut timetable).unwrap();

    assert_eq!(allocation.window, 1..3);
    assert_eq!(timetable.reservations_of(&request.job_id).len(), 2);
}

#[test]
fn test_scheduling_errors_are_not_retryable() {
    let error: Error = SchedulingError::NoWindowAllocated { hours: 1 }.into();
    assert!(!error.is_retryable());
    assert!(Error::Timeout("sbatch".to_string()).is_retryable());
}
