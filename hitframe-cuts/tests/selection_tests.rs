#![allow(
    clippy::unreadable_literal,
    clippy::uninlined_format_args,
    clippy::cast_possible_wrap
)]

//! End-to-end selection tests over paired in-memory sources.

use hitframe_core::{EventSelection, Grouping, ImportConfig, MemorySource};
use hitframe_cuts::{
    import_pair, overlay_background, CutSet, EventPair, PipelineConfig, TimeWindow, TimingWindows,
};
use hitframe_geom::{
    GeomConfig, HodoscopeConfig, HodoscopeHits, RingHodoscope, TrackerConfig, TrackerHits,
    UniformCylinder,
};

fn tracker_source(
    counts: Vec<usize>,
    layers: Vec<i64>,
    cells: Vec<i64>,
    t: Vec<f64>,
    types: Vec<i64>,
) -> MemorySource {
    let n = t.len();
    let nhits: Vec<i64> = counts.iter().map(|&c| c as i64).collect();
    MemorySource::new(counts)
        .with_event_field("nhits", nhits)
        .unwrap()
        .with_hit_field("layer_id", layers)
        .unwrap()
        .with_hit_field("cell_id", cells)
        .unwrap()
        .with_hit_field("edep", vec![1.0; n])
        .unwrap()
        .with_hit_field("t", t)
        .unwrap()
        .with_hit_field("hit_type", types)
        .unwrap()
}

fn tracker_config() -> TrackerConfig {
    let import = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
        .with_fields(["layer_id", "cell_id", "edep", "t"])
        .with_placeholder_fields(["trig"])
        .with_time_field("t");
    TrackerConfig::new(import, GeomConfig::new("edep", "t", "trig"))
}

fn hodoscope_source(
    counts: Vec<usize>,
    names: Vec<&str>,
    ids: Vec<i64>,
    t: Vec<f64>,
    types: Vec<i64>,
) -> MemorySource {
    let n = t.len();
    let nhits: Vec<i64> = counts.iter().map(|&c| c as i64).collect();
    let names: Vec<String> = names.into_iter().map(str::to_owned).collect();
    MemorySource::new(counts)
        .with_event_field("nhits", nhits)
        .unwrap()
        .with_hit_field("vol_name", names)
        .unwrap()
        .with_hit_field("vol_id", ids)
        .unwrap()
        .with_hit_field("edep", vec![1.0; n])
        .unwrap()
        .with_hit_field("t", t)
        .unwrap()
        .with_hit_field("hit_type", types)
        .unwrap()
}

fn hodoscope_config() -> HodoscopeConfig {
    let import = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
        .with_fields(["vol_name", "vol_id", "edep", "t"])
        .with_placeholder_fields(["trig"])
        .with_time_field("t");
    HodoscopeConfig::new(import, GeomConfig::new("edep", "t", "trig"))
}

fn scint_ring() -> RingHodoscope {
    RingHodoscope::new(vec!["Scint"], vec![], 4)
}

#[test]
fn test_timing_cut_synchronizes_pair() {
    let mut tracker = TrackerHits::from_source(
        &tracker_source(
            vec![2, 1, 1],
            vec![0, 0, 1, 1],
            vec![0, 1, 0, 1],
            vec![600.0, 1700.0, 800.0, 900.0],
            vec![1, 1, 1, 2],
        ),
        UniformCylinder::uniform(2, 4),
        &tracker_config(),
    )
    .unwrap();
    let mut hodoscope = HodoscopeHits::from_source(
        &hodoscope_source(
            vec![1, 1, 1],
            vec!["ScintU", "ScintU", "ScintD"],
            vec![0, 1, 2],
            vec![700.0, 2000.0, 800.0],
            vec![1, 1, 1],
        ),
        scint_ring(),
        &hodoscope_config(),
    )
    .unwrap();

    let windows = TimingWindows {
        tracker: Some(TimeWindow::new(500.0, 1620.0)),
        hodoscope: Some(TimeWindow::new(500.0, 1170.0)),
    };
    let mut pair = EventPair::new(&mut tracker, &mut hodoscope);
    pair.apply_timing_cut(&windows).unwrap();
    // the out-of-window tracker hit goes alone; the emptied hodoscope
    // event takes its tracker partner with it
    assert_eq!(pair.n_events(), 2);
    assert_eq!(
        tracker.overlay().table().values_f64("t").unwrap(),
        vec![600.0, 900.0]
    );
    assert_eq!(
        hodoscope.overlay().table().values_f64("t").unwrap(),
        vec![700.0, 800.0]
    );
}

#[test]
fn test_trigger_and_min_hits_cuts() {
    let mut tracker = TrackerHits::from_source(
        &tracker_source(
            vec![1, 1, 2],
            vec![0, 0, 1, 1],
            vec![0, 1, 0, 1],
            vec![600.0, 650.0, 700.0, 710.0],
            vec![1, 2, 1, 1],
        ),
        UniformCylinder::uniform(2, 4),
        &tracker_config(),
    )
    .unwrap();
    let mut hodoscope = HodoscopeHits::from_source(
        &hodoscope_source(
            vec![1, 1, 1],
            vec!["ScintU", "ScintU", "ScintD"],
            vec![0, 1, 2],
            vec![620.0, 640.0, 660.0],
            vec![1, 2, 1],
        ),
        scint_ring(),
        &hodoscope_config(),
    )
    .unwrap();

    let mut pair = EventPair::new(&mut tracker, &mut hodoscope);
    pair.apply_trigger_cut().unwrap();
    assert_eq!(pair.n_events(), 2);
    pair.apply_min_hits_cut(2).unwrap();
    assert_eq!(pair.n_events(), 1);
    assert_eq!(
        tracker.overlay().table().values_f64("t").unwrap(),
        vec![700.0, 710.0]
    );
    assert_eq!(
        hodoscope.overlay().table().values_f64("t").unwrap(),
        vec![660.0]
    );
}

#[test]
fn test_max_layer_cut_ignores_background_depth() {
    let mut tracker = TrackerHits::from_source(
        &tracker_source(
            vec![1, 2, 1],
            vec![4, 6, 9, 8],
            vec![0, 0, 1, 0],
            vec![600.0, 600.0, 610.0, 600.0],
            vec![1, 1, 2, 2],
        ),
        UniformCylinder::uniform(10, 2),
        &tracker_config(),
    )
    .unwrap();
    let mut hodoscope = HodoscopeHits::from_source(
        &hodoscope_source(
            vec![1, 1, 1],
            vec!["ScintU", "ScintU", "ScintU"],
            vec![0, 1, 2],
            vec![700.0, 710.0, 720.0],
            vec![1, 1, 1],
        ),
        scint_ring(),
        &hodoscope_config(),
    )
    .unwrap();

    let mut pair = EventPair::new(&mut tracker, &mut hodoscope);
    pair.apply_max_layer_cut(5).unwrap();
    // the shallow-signal event and the background-only event both fail;
    // the background hit at layer 9 cannot save or sink anything
    assert_eq!(pair.n_events(), 1);
    assert_eq!(
        tracker.overlay().table().values_i64("layer_id").unwrap(),
        vec![6, 9]
    );
}

#[test]
fn test_keep_common_events_matches_key_order() {
    let tracker_import = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
        .with_fields(["layer_id", "cell_id", "edep", "t", "evt_id"])
        .with_placeholder_fields(["trig"])
        .with_time_field("t");
    let mut tracker = TrackerHits::from_source(
        &tracker_source(
            vec![1, 1, 1],
            vec![0, 0, 0],
            vec![0, 1, 2],
            vec![600.0, 610.0, 620.0],
            vec![1, 1, 1],
        )
        .with_hit_field("evt_id", vec![10i64, 11, 12])
        .unwrap(),
        UniformCylinder::uniform(2, 4),
        &TrackerConfig::new(tracker_import, GeomConfig::new("edep", "t", "trig")),
    )
    .unwrap();

    let hodoscope_import = ImportConfig::new(Grouping::Counts("nhits".to_owned()), "hit_type")
        .with_fields(["vol_name", "vol_id", "edep", "t", "evt_id"])
        .with_placeholder_fields(["trig"])
        .with_time_field("t");
    let mut hodoscope = HodoscopeHits::from_source(
        &hodoscope_source(
            vec![1, 1, 1],
            vec!["ScintU", "ScintU", "ScintD"],
            vec![0, 1, 2],
            vec![700.0, 710.0, 720.0],
            vec![1, 1, 1],
        )
        .with_hit_field("evt_id", vec![10i64, 12, 13])
        .unwrap(),
        scint_ring(),
        &HodoscopeConfig::new(hodoscope_import, GeomConfig::new("edep", "t", "trig")),
    )
    .unwrap();

    let mut pair = EventPair::new(&mut tracker, &mut hodoscope);
    pair.keep_common_events("evt_id").unwrap();
    assert_eq!(pair.n_events(), 2);
    assert_eq!(
        tracker.overlay().table().values_i64("evt_id").unwrap(),
        vec![10, 12]
    );
    assert_eq!(
        hodoscope.overlay().table().values_i64("evt_id").unwrap(),
        vec![10, 12]
    );
}

#[test]
fn test_pipeline_applies_json_cut_set() {
    let cuts = CutSet::from_json(
        r#"{
            "windows": {
                "tracker": {"lower": 500.0, "upper": 1620.0},
                "hodoscope": {"lower": 500.0, "upper": 1170.0}
            },
            "require_trigger": true,
            "min_hits": 1,
            "set_trigger": true
        }"#,
    )
    .unwrap();
    let config = PipelineConfig::new(tracker_config(), hodoscope_config()).with_cuts(cuts);
    let (tracker, hodoscope) = import_pair(
        &tracker_source(
            vec![2, 1],
            vec![0, 0, 1],
            vec![0, 1, 0],
            vec![600.0, 1700.0, 800.0],
            vec![1, 1, 2],
        ),
        &hodoscope_source(
            vec![1, 1],
            vec!["ScintU", "ScintU"],
            vec![0, 1],
            vec![700.0, 750.0],
            vec![1, 1],
        ),
        UniformCylinder::uniform(2, 4),
        scint_ring(),
        &config,
    )
    .unwrap();

    // the window drops the late tracker hit, the minimum-hits cut drops
    // the background-only event, and the trigger lands on the earliest
    // hodoscope signal of what remains
    assert_eq!(tracker.n_events(), 1);
    assert_eq!(hodoscope.n_events(), 1);
    assert!(tracker.overlay().has_trigger_time());
    assert_eq!(
        tracker.overlay().get_relative_time(EventSelection::All).unwrap(),
        vec![-100.0]
    );
    assert_eq!(
        hodoscope
            .overlay()
            .get_relative_time(EventSelection::All)
            .unwrap(),
        vec![0.0]
    );
}

fn signal_pair() -> (TrackerHits<UniformCylinder>, HodoscopeHits<RingHodoscope>) {
    let tracker = TrackerHits::from_source(
        &tracker_source(
            vec![1, 1],
            vec![0, 0],
            vec![0, 1],
            vec![600.0, 620.0],
            vec![1, 1],
        ),
        UniformCylinder::uniform(2, 4),
        &tracker_config(),
    )
    .unwrap();
    let hodoscope = HodoscopeHits::from_source(
        &hodoscope_source(
            vec![1, 1],
            vec!["ScintU", "ScintU"],
            vec![0, 1],
            vec![610.0, 615.0],
            vec![1, 1],
        ),
        scint_ring(),
        &hodoscope_config(),
    )
    .unwrap();
    (tracker, hodoscope)
}

fn background_pair() -> (TrackerHits<UniformCylinder>, HodoscopeHits<RingHodoscope>) {
    let tracker = TrackerHits::from_source(
        &tracker_source(
            vec![1, 1, 1],
            vec![1, 1, 1],
            vec![2, 3, 0],
            vec![650.0, 650.0, 650.0],
            vec![2, 2, 2],
        ),
        UniformCylinder::uniform(2, 4),
        &tracker_config(),
    )
    .unwrap();
    let hodoscope = HodoscopeHits::from_source(
        &hodoscope_source(
            vec![1, 1, 1],
            vec!["ScintD", "ScintD", "ScintD"],
            vec![3, 2, 1],
            vec![655.0, 655.0, 655.0],
            vec![2, 2, 2],
        ),
        scint_ring(),
        &hodoscope_config(),
    )
    .unwrap();
    (tracker, hodoscope)
}

fn overlaid_times(seed: u64) -> (Vec<f64>, Vec<f64>) {
    let (mut signal_tracker, mut signal_hodoscope) = signal_pair();
    let (mut background_tracker, mut background_hodoscope) = background_pair();
    let mut signal = EventPair::new(&mut signal_tracker, &mut signal_hodoscope);
    let mut background = EventPair::new(&mut background_tracker, &mut background_hodoscope);
    overlay_background(&mut signal, &mut background, seed).unwrap();
    (
        signal_tracker
            .overlay()
            .table()
            .values_f64("t")
            .unwrap()
            .to_vec(),
        signal_hodoscope
            .overlay()
            .table()
            .values_f64("t")
            .unwrap()
            .to_vec(),
    )
}

#[test]
fn test_background_overlay_merges_event_by_event() {
    let (mut signal_tracker, mut signal_hodoscope) = signal_pair();
    let (mut background_tracker, mut background_hodoscope) = background_pair();
    let mut signal = EventPair::new(&mut signal_tracker, &mut signal_hodoscope);
    let mut background = EventPair::new(&mut background_tracker, &mut background_hodoscope);
    overlay_background(&mut signal, &mut background, 11).unwrap();

    // the larger background sample shrinks to the signal's two events;
    // every surviving background event contributes exactly one hit
    assert_eq!(signal_tracker.n_events(), 2);
    assert_eq!(
        signal_tracker.overlay().table().values_f64("t").unwrap(),
        vec![600.0, 650.0, 620.0, 650.0]
    );
    assert_eq!(
        signal_hodoscope.overlay().table().values_f64("t").unwrap(),
        vec![610.0, 655.0, 615.0, 655.0]
    );
    // the trigger comes from hodoscope signal hits only
    assert!(signal_hodoscope.overlay().has_trigger_time());
    assert_eq!(
        signal_hodoscope
            .overlay()
            .get_trigger_time(EventSelection::All)
            .unwrap(),
        vec![610.0, 610.0, 615.0, 615.0]
    );
}

#[test]
fn test_background_overlay_is_seeded() {
    assert_eq!(overlaid_times(7), overlaid_times(7));
    assert_eq!(overlaid_times(41), overlaid_times(41));
}
