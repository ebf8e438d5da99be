//! End-to-end geometry overlay tests: import, resolve, measure, merge.

#![allow(clippy::unreadable_literal, clippy::uninlined_format_args)]

use approx::assert_relative_eq;
use hitframe_core::{
    EventSelection, Filter, Grouping, ImportConfig, MemorySource,
};
use hitframe_geom::{
    GeomConfig, Hodoscope, HodoscopeConfig, HodoscopeHits, RingHodoscope, TrackerConfig,
    TrackerHits, UniformCylinder,
};

fn tracker_import() -> ImportConfig {
    ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
        .with_fields(["layer_id", "cell_id", "edep", "t"])
        .with_placeholder_fields(["trig"])
        .with_time_field("t")
}

fn tracker_config() -> TrackerConfig {
    TrackerConfig::new(tracker_import(), GeomConfig::new("edep", "t", "trig"))
}

/// Two events over a 4+6 wire cylinder, mixed signal and background.
fn sample_tracker() -> TrackerHits<UniformCylinder> {
    let source = MemorySource::new(vec![2, 3])
        .with_event_field("nhits", vec![2i64, 3])
        .unwrap()
        .with_hit_field("layer_id", vec![0i64, 1, 0, 1, 0])
        .unwrap()
        .with_hit_field("cell_id", vec![0i64, 2, 3, 5, 1])
        .unwrap()
        .with_hit_field("edep", vec![1.0, 2.0, 4.0, 6.0, 3.0])
        .unwrap()
        .with_hit_field("t", vec![5.0, 3.0, 8.0, 2.0, 6.0])
        .unwrap()
        .with_hit_field("hit_type", vec![1i64, 1, 2, 1, 1])
        .unwrap();
    TrackerHits::from_source(&source, UniformCylinder::new(vec![4, 6]), &tracker_config())
        .unwrap()
}

#[test]
fn test_tracker_measurement_pipeline() {
    let mut tracker = sample_tracker();
    assert_eq!(tracker.n_events(), 2);
    assert_eq!(tracker.n_hits(), 5);

    // construction sorted each event by time and the ids followed
    assert_eq!(
        tracker.overlay().table().values_f64("t").unwrap(),
        &[3.0, 5.0, 2.0, 6.0, 8.0]
    );
    assert_eq!(
        tracker.overlay().table().values_i64("flat_id").unwrap(),
        &[6, 0, 9, 1, 3]
    );

    let dense = tracker
        .get_measurement("edep", EventSelection::All, 0)
        .unwrap();
    assert_eq!(dense.dim(), (2, 10));
    assert_relative_eq!(dense[[0, 6]], 2.0);
    assert_relative_eq!(dense[[0, 0]], 1.0);
    assert_relative_eq!(dense[[1, 9]], 6.0);
    assert_relative_eq!(dense[[1, 1]], 3.0);
    assert_relative_eq!(dense[[1, 3]], 4.0);

    // a timing window narrows the dense view and keeps ids aligned
    let window = Filter::new().with_greater_than(2.5).with_less_than(7.5);
    tracker.trim_hits("t", &window).unwrap();
    assert_eq!(tracker.n_hits(), 3);
    let dense = tracker
        .get_measurement("edep", EventSelection::All, 0)
        .unwrap();
    assert_relative_eq!(dense[[0, 6]], 2.0);
    assert_relative_eq!(dense[[0, 0]], 1.0);
    assert_relative_eq!(dense[[1, 1]], 3.0);
    assert_relative_eq!(dense[[1, 9]], 0.0);

    assert_eq!(tracker.deepest_signal_layer(0).unwrap(), 1);
    assert_eq!(tracker.deepest_signal_layer(1).unwrap(), 0);

    let (even, odd) = tracker.get_hit_wires_even_odd(EventSelection::All).unwrap();
    assert_eq!(even, vec![0, 1]);
    assert_eq!(odd, vec![6]);
}

#[test]
fn test_hodoscope_trigger_flow() {
    let import = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
        .with_fields(["vol_name", "vol_id", "edep", "t"])
        .with_placeholder_fields(["trig"])
        .with_time_field("t");
    let config = HodoscopeConfig::new(import, GeomConfig::new("edep", "t", "trig"));
    let source = MemorySource::new(vec![3, 2])
        .with_event_field("nhits", vec![3i64, 2])
        .unwrap()
        .with_hit_field(
            "vol_name",
            vec![
                "CherenkovU".to_owned(),
                "ScintillatorD".to_owned(),
                "CherenkovGuideU".to_owned(),
                "CherenkovD".to_owned(),
                "ScintillatorU".to_owned(),
            ],
        )
        .unwrap()
        .with_hit_field("vol_id", vec![0i64, 2, 1, 3, 1])
        .unwrap()
        .with_hit_field("edep", vec![0.5, 0.25, 9.0, 1.0, 2.0])
        .unwrap()
        .with_hit_field("t", vec![12.0, 7.0, 3.0, 9.0, 4.0])
        .unwrap()
        .with_hit_field("hit_type", vec![1i64, 2, 1, 1, 1])
        .unwrap();
    let mut hodoscope = HodoscopeHits::from_source(
        &source,
        RingHodoscope::new(vec!["Cherenkov", "Scintillator"], vec!["CherenkovGuide"], 4),
        &config,
    )
    .unwrap();

    // the passive guide hit is gone, partitions cover the rest
    assert_eq!(hodoscope.n_hits(), 4);
    assert_eq!(hodoscope.up_rows(), &[1, 2]);
    assert_eq!(hodoscope.down_rows(), &[0, 3]);
    assert_eq!(
        hodoscope.get_events(0, Hodoscope::Up).unwrap(),
        vec![1]
    );

    // earliest signal time per event becomes the trigger time
    let mut triggers = Vec::new();
    for event in 0..hodoscope.n_events() {
        let rows = hodoscope.overlay().get_signal_hits(event).unwrap();
        let times = hodoscope.overlay().table().gather_f64("t", &rows).unwrap();
        triggers.push(times.iter().copied().fold(f64::INFINITY, f64::min));
    }
    assert_eq!(triggers, vec![12.0, 4.0]);
    hodoscope.set_trigger_time(&triggers).unwrap();
    assert_eq!(
        hodoscope
            .overlay()
            .get_relative_time(EventSelection::All)
            .unwrap(),
        vec![-5.0, 0.0, 0.0, 5.0]
    );
}

#[test]
fn test_merge_requires_matching_geometry() {
    let single = |layer: i64, cell: i64, t: f64, edep: f64, hit_type: i64| {
        MemorySource::new(vec![1])
            .with_event_field("nhits", vec![1i64])
            .unwrap()
            .with_hit_field("layer_id", vec![layer])
            .unwrap()
            .with_hit_field("cell_id", vec![cell])
            .unwrap()
            .with_hit_field("edep", vec![edep])
            .unwrap()
            .with_hit_field("t", vec![t])
            .unwrap()
            .with_hit_field("hit_type", vec![hit_type])
            .unwrap()
    };

    let mut first = TrackerHits::from_source(
        &single(0, 0, 1.0, 1.0, 1),
        UniformCylinder::uniform(1, 4),
        &tracker_config(),
    )
    .unwrap();
    let second = TrackerHits::from_source(
        &single(0, 2, 2.0, 5.0, 2),
        UniformCylinder::uniform(1, 4),
        &tracker_config(),
    )
    .unwrap();
    first.add_hits(&second).unwrap();
    assert_eq!(first.n_events(), 1);
    assert_eq!(first.n_hits(), 2);
    let dense = first
        .get_measurement("edep", EventSelection::All, 0)
        .unwrap();
    assert_relative_eq!(dense[[0, 0]], 1.0);
    assert_relative_eq!(dense[[0, 2]], 5.0);
    let types = first.overlay().get_hit_types(EventSelection::All).unwrap();
    assert_eq!(types[0], 1);
    assert_eq!(types[2], 2);

    let larger = TrackerHits::from_source(
        &single(0, 1, 1.0, 1.0, 1),
        UniformCylinder::uniform(2, 4),
        &tracker_config(),
    )
    .unwrap();
    assert!(matches!(
        first.add_hits(&larger),
        Err(hitframe_geom::Error::GeometryMismatch { .. })
    ));
}
