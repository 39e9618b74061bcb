//! Headless track contact run.
//!
//! Usage: `track_studio [config.json]`
//!
//! Builds the tracked rig, steps it for the configured number of steps with
//! contact monitoring and tread force injection, then writes the contact
//! snapshot CSV.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use track_contact::{
    TrackContactConfig, TrackContactPlugin, TrackContactResult, TrackContactState, TrackPart,
};

fn main() -> TrackContactResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => TrackContactConfig::load(path)?,
        None => TrackContactConfig::default(),
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(TrackContactPlugin::new(config.clone()));

    for _ in 0..config.steps {
        app.update();
    }

    let state = app.world().resource::<TrackContactState>();
    for part in TrackPart::ALL {
        if state.observer.is_flag_set(part) {
            info!("{:?}: {} contacts at the last step", part, state.observer.num_contacts(part));
        }
    }
    info!(
        "{} tread loads in the last step, {} snapshot rows",
        state.injector.loads().len(),
        state.observer.contact_log().len()
    );

    state.observer.write_contacts(&config.output)?;
    Ok(())
}
