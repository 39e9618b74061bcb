use bevy::prelude::*;
use tempfile::NamedTempFile;
use track_contact::{TrackContactConfig, TrackContactPlugin, TrackContactState, TrackRig};

fn studio_app(config: TrackContactConfig) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(TrackContactPlugin::new(config));
    app
}

#[test]
fn test_plugin_runs_contact_pipeline() {
    let mut app = studio_app(TrackContactConfig::default());

    let mut saw_tread = false;
    let mut saw_loads = false;
    for _ in 0..120 {
        app.update();
        let state = app.world().resource::<TrackContactState>();
        saw_tread |= !state.hooks.filter().wheel_collisions().is_empty();
        saw_loads |= !state.injector.loads().is_empty();
    }

    assert!(app.world().get_resource::<TrackRig>().is_some());
    let state = app.world().resource::<TrackContactState>();
    assert!(state.observer.is_bound());
    assert!(state.injector.time() > 0.0);
    assert!(saw_tread, "road wheels should press on the track shoes");
    assert!(saw_loads, "tread collisions should produce loads");
}

#[test]
fn test_disabled_interception_leaves_tread_to_engine() {
    let config = TrackContactConfig {
        idler_shoe: false,
        wheel_shoe: false,
        ..Default::default()
    };
    let mut app = studio_app(config);

    for _ in 0..60 {
        app.update();
        let state = app.world().resource::<TrackContactState>();
        assert!(state.hooks.filter().wheel_collisions().is_empty());
        assert!(state.injector.loads().is_empty());
    }
}

#[test]
fn test_snapshot_file_from_plugin_run() {
    // Engine-resolved tread contacts, with the monitored shoes under the front road wheels.
    let config = TrackContactConfig {
        wheel_shoe: false,
        shoe_index_left: 10,
        shoe_index_right: 10,
        ..Default::default()
    };
    let mut app = studio_app(config);
    for _ in 0..60 {
        app.update();
    }

    let state = app.world().resource::<TrackContactState>();
    let temp_file = NamedTempFile::with_suffix(".csv").unwrap();
    state.observer.write_contacts(temp_file.path()).unwrap();

    let text = std::fs::read_to_string(temp_file.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), state.observer.contact_log().len());
    assert!(!lines.is_empty(), "road wheels should rest on the monitored shoes");
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        assert!(fields[0].parse::<f64>().unwrap() > 0.0);
        let total: usize = fields[1..8]
            .iter()
            .map(|f| f.parse::<usize>().unwrap())
            .sum();
        assert!(total > 0);
        assert_eq!(fields.len(), 8 + 3 * total);
    }
}
