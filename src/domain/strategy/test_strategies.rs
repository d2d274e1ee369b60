use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;

use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::schedule::timeslot::Timeslot;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::schedule::window_transaction::reserve_window;
use crate::domain::strategy::planning_strategy::{Allocation, PlanningStrategy};
use crate::domain::utils::id::{JobId, NodeName};

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

fn node(name: &str, cpu_tdp: Option<u32>) -> NodeInfo {
    NodeInfo::new(name, 0).with_tdp(cpu_tdp, None)
}

fn all_strategies() -> Vec<PlanningStrategy> {
    vec![
        PlanningStrategy::CarbonAgnosticFifo,
        PlanningStrategy::TemporalShifting,
        PlanningStrategy::SpatialGreedyShifting,
        PlanningStrategy::SpatialShifting { balance_grade: 10.0 },
        PlanningStrategy::SpatiotemporalShifting { switch_threshold: 0.25 },
    ]
}

fn run(strategy: &PlanningStrategy, job: &str, hours: usize, timetable: &mut Timetable, nodes: &[NodeInfo]) -> Option<Allocation> {
    strategy.allocate(&JobId::new(job), hours, timetable, nodes, false)
}

fn placement(allocation: Option<Allocation>) -> (usize, String) {
    let allocation = allocation.expect("job should have been allocated");
    (allocation.window.start, allocation.node.to_string())
}

fn assert_no_double_booking(timetable: &Timetable) {
    for slot in &timetable.timeslots {
        let mut seen = HashSet::new();
        for node in slot.reserved_nodes() {
            assert!(seen.insert(node.clone()), "node {} booked twice in slot {}", node, slot.start);
        }
    }
}

// --- Test Cases ---

#[test]
fn test_temporal_shifting_picks_cheapest_hours() {
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);
    let nodes = vec![node("cx16", None)];
    let strategy = PlanningStrategy::TemporalShifting;

    assert_eq!(placement(run(&strategy, "a", 1, &mut timetable, &nodes)), (3, "cx16".to_string()));
    assert_eq!(placement(run(&strategy, "b", 1, &mut timetable, &nodes)), (1, "cx16".to_string()));
    assert_eq!(placement(run(&strategy, "c", 1, &mut timetable, &nodes)), (2, "cx16".to_string()));
    assert_eq!(placement(run(&strategy, "d", 1, &mut timetable, &nodes)), (0, "cx16".to_string()));
    assert!(run(&strategy, "e", 1, &mut timetable, &nodes).is_none());
}

#[test]
fn test_temporal_shifting_is_monotone_in_window_weight() {
    let gcis = [90.0, 10.0, 40.0, 40.0, 70.0, 20.0, 60.0, 30.0];
    let mut timetable = create_timetable(&gcis);
    let nodes = vec![node("cx16", None)];

    let chosen = run(&PlanningStrategy::TemporalShifting, "a", 2, &mut timetable, &nodes).unwrap();
    let chosen_weight = create_timetable(&gcis).window_weight(&chosen.window);

    for window in create_timetable(&gcis).windows(2) {
        assert!(chosen_weight <= create_timetable(&gcis).window_weight(&window));
    }
}

#[test]
fn test_temporal_shifting_breaks_ties_chronologically() {
    let mut timetable = create_timetable(&[50.0, 50.0, 50.0, 50.0]);
    let nodes = vec![node("cx16", None)];
    let strategy = PlanningStrategy::TemporalShifting;

    assert_eq!(placement(run(&strategy, "a", 1, &mut timetable, &nodes)), (0, "cx16".to_string()));
    assert_eq!(placement(run(&strategy, "b", 1, &mut timetable, &nodes)), (1, "cx16".to_string()));

    // windows 1, 2 and 3 all weigh 60
    let mut timetable = create_timetable(&[70.0, 30.0, 30.0, 30.0, 30.0]);
    assert_eq!(placement(run(&strategy, "c", 2, &mut timetable, &nodes)), (1, "cx16".to_string()));
    assert_eq!(placement(run(&strategy, "d", 2, &mut timetable, &nodes)), (3, "cx16".to_string()));
}

#[test]
fn test_fifo_takes_earliest_window_and_skips_exhausted_slots() {
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);
    let nodes = vec![node("cx16", None)];
    let strategy = PlanningStrategy::CarbonAgnosticFifo;

    assert_eq!(placement(run(&strategy, "a", 2, &mut timetable, &nodes)), (0, "cx16".to_string()));
    assert_eq!(placement(run(&strategy, "b", 2, &mut timetable, &nodes)), (2, "cx16".to_string()));
    assert!(run(&strategy, "c", 1, &mut timetable, &nodes).is_none());
}

#[test]
fn test_fifo_uses_second_node_in_same_window() {
    let mut timetable = create_timetable(&[100.0, 50.0]);
    let nodes = vec![node("cx16", None), node("cx17", None)];
    let strategy = PlanningStrategy::CarbonAgnosticFifo;

    assert_eq!(placement(run(&strategy, "a", 1, &mut timetable, &nodes)), (0, "cx16".to_string()));
    assert_eq!(placement(run(&strategy, "b", 1, &mut timetable, &nodes)), (0, "cx17".to_string()));
    assert_eq!(placement(run(&strategy, "c", 1, &mut timetable, &nodes)), (1, "cx16".to_string()));
}

#[test]
fn test_spatial_greedy_fills_lowest_tdp_node_first() {
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);
    let nodes = vec![node("a", Some(200)), node("b", Some(100)), node("c", None)];
    let strategy = PlanningStrategy::SpatialGreedyShifting;

    assert_eq!(placement(run(&strategy, "j1", 2, &mut timetable, &nodes)), (0, "b".to_string()));
    assert_eq!(placement(run(&strategy, "j2", 2, &mut timetable, &nodes)), (2, "b".to_string()));
    assert_eq!(placement(run(&strategy, "j3", 2, &mut timetable, &nodes)), (0, "a".to_string()));
    assert_eq!(placement(run(&strategy, "j4", 2, &mut timetable, &nodes)), (2, "a".to_string()));
    assert_eq!(placement(run(&strategy, "j5", 2, &mut timetable, &nodes)), (0, "c".to_string()));
}

#[test]
fn test_gpu_jobs_rank_nodes_by_combined_tdp() {
    let nodes = vec![NodeInfo::new("x", 0).with_tdp(Some(100), None), NodeInfo::new("y", 0).with_tdp(Some(50), Some(300))];
    let strategy = PlanningStrategy::SpatialGreedyShifting;

    let mut timetable = create_timetable(&[10.0, 10.0]);
    let cpu_job = strategy.allocate(&JobId::new("cpu"), 1, &mut timetable, &nodes, false).unwrap();
    assert_eq!(cpu_job.node, NodeName::new("y"));

    let mut timetable = create_timetable(&[10.0, 10.0]);
    let gpu_job = strategy.allocate(&JobId::new("gpu"), 1, &mut timetable, &nodes, true).unwrap();
    assert_eq!(gpu_job.node, NodeName::new("x"));
}

#[test]
fn test_spatial_shifting_delays_expensive_pool_until_its_marker() {
    let mut timetable = create_timetable(&[50.0; 24]);
    let nodes = vec![node("a", Some(200)), node("b", Some(100))];
    let strategy = PlanningStrategy::SpatialShifting { balance_grade: 10.0 };

    // The 100 W gap delays node "a" by 10 hours.
    for hour in 0..10 {
        assert_eq!(placement(run(&strategy, &format!("j{hour}"), 1, &mut timetable, &nodes)), (hour, "b".to_string()));
    }

    assert_eq!(placement(run(&strategy, "j10", 1, &mut timetable, &nodes)), (10, "b".to_string()));
    assert_eq!(placement(run(&strategy, "j11", 1, &mut timetable, &nodes)), (10, "a".to_string()));
    assert_no_double_booking(&timetable);
}

#[test]
fn test_spatial_shifting_falls_back_to_blackbox_nodes() {
    let mut timetable = create_timetable(&[50.0, 50.0]);
    let nodes = vec![node("b", Some(100)), node("c", None)];
    let strategy = PlanningStrategy::SpatialShifting { balance_grade: 10.0 };

    assert_eq!(placement(run(&strategy, "j1", 2, &mut timetable, &nodes)), (0, "b".to_string()));
    assert_eq!(placement(run(&strategy, "j2", 2, &mut timetable, &nodes)), (0, "c".to_string()));
    assert!(run(&strategy, "j3", 1, &mut timetable, &nodes).is_none());
}

#[test]
fn test_spatiotemporal_prefers_cheapest_pool_in_cheapest_windows() {
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);
    let nodes = vec![node("a", Some(200)), node("b", Some(100))];
    let strategy = PlanningStrategy::SpatiotemporalShifting { switch_threshold: 0.25 };

    assert_eq!(placement(run(&strategy, "j1", 1, &mut timetable, &nodes)), (3, "b".to_string()));
    // Above the threshold every pool competes for the cheapest remaining window.
    assert_eq!(placement(run(&strategy, "j2", 1, &mut timetable, &nodes)), (3, "a".to_string()));
    assert_eq!(placement(run(&strategy, "j3", 1, &mut timetable, &nodes)), (1, "b".to_string()));
}

#[test]
fn test_spatiotemporal_threshold_widens_cheap_pool_phase() {
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);
    let nodes = vec![node("a", Some(200)), node("b", Some(100))];
    let strategy = PlanningStrategy::SpatiotemporalShifting { switch_threshold: 0.5 };

    assert_eq!(placement(run(&strategy, "j1", 1, &mut timetable, &nodes)), (3, "b".to_string()));
    assert_eq!(placement(run(&strategy, "j2", 1, &mut timetable, &nodes)), (1, "b".to_string()));
    assert_eq!(placement(run(&strategy, "j3", 1, &mut timetable, &nodes)), (3, "a".to_string()));
}

#[test]
fn test_spatiotemporal_with_blackbox_nodes_only_behaves_temporally() {
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);
    let nodes = vec![node("c", None)];
    let strategy = PlanningStrategy::SpatiotemporalShifting { switch_threshold: 0.25 };

    assert_eq!(placement(run(&strategy, "j1", 1, &mut timetable, &nodes)), (3, "c".to_string()));
    assert_eq!(placement(run(&strategy, "j2", 1, &mut timetable, &nodes)), (1, "c".to_string()));
}

#[test]
fn test_failed_allocation_leaves_no_reservation() {
    for strategy in all_strategies() {
        let mut timetable = create_timetable(&[10.0, 20.0, 30.0]);
        let nodes = vec![node("a", Some(100)), node("c", None)];
        for node in &nodes {
            assert!(reserve_window(&mut timetable, 2..3, &JobId::new("blocker"), &node.name));
        }
        let before = timetable.clone();

        assert!(run(&strategy, "too-long", 3, &mut timetable, &nodes).is_none(), "{strategy}");
        assert!(timetable.reservations_of(&JobId::new("too-long")).is_empty(), "{strategy}");
        assert_eq!(timetable, before, "{strategy}");
    }
}

#[test]
fn test_no_double_booking_under_load() {
    let gcis: Vec<f64> = (0..12).map(|h| ((h * 37) % 11) as f64 * 10.0).collect();
    let nodes = vec![node("a", Some(200)), node("b", Some(100)), node("c", None), node("d", Some(100))];

    for strategy in all_strategies() {
        let mut timetable = create_timetable(&gcis);
        let mut allocated = 0;

        for job in 0..40 {
            let hours = 1 + job % 3;
            if let Some(allocation) = run(&strategy, &format!("job-{job}"), hours, &mut timetable, &nodes) {
                assert_eq!(allocation.window.len(), hours);
                assert_eq!(timetable.reservations_of(&JobId::new(format!("job-{job}"))).len(), hours);
                allocated += 1;
            }
        }

        assert!(allocated > 0, "{strategy}");
        assert_no_double_booking(&timetable);
    }
}

#[test]
fn test_allocation_start_matches_first_slot() {
    let mut timetable = create_timetable(&[100.0, 50.0, 80.0, 30.0]);
    let allocation = run(&PlanningStrategy::TemporalShifting, "a", 2, &mut timetable, &[node("cx16", None)]).unwrap();

    assert_eq!(allocation.window, 2..4);
    assert_eq!(allocation.start, base() + Duration::hours(2));
}

#[test]
fn test_empty_node_list_or_too_long_job_is_rejected() {
    let mut timetable = create_timetable(&[100.0, 50.0]);

    for strategy in all_strategies() {
        assert!(run(&strategy, "a", 1, &mut timetable, &[]).is_none());
        assert!(run(&strategy, "a", 3, &mut timetable, &[node("cx16", None)]).is_none());
        assert!(run(&strategy, "a", 0, &mut timetable, &[node("cx16", None)]).is_none());
    }
}
