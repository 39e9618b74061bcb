//! Track contact configuration, stored as JSON.
//!
//! ```ignore
//! let config = TrackContactConfig::load("track_contact.json")?;
//! let observer = config.build_observer();
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TrackContactError, TrackContactResult};
use crate::filter::{CollisionFilter, LateralAxis};
use crate::injector::LinearSpringDamperLaw;
use crate::observer::ContactObserver;
use crate::types::{MonitorFlags, VehicleSide};

/// Settings for contact monitoring, tread interception and the demo rig run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackContactConfig {
    /// Parts whose contacts are recorded.
    pub monitor: MonitorFlags,
    /// Collect per-step snapshot rows.
    pub collect: bool,
    /// Monitored shoe index on the left track.
    pub shoe_index_left: usize,
    /// Monitored shoe index on the right track.
    pub shoe_index_right: usize,
    /// Intercept idler-shoe tread contacts.
    pub idler_shoe: bool,
    /// Intercept road-wheel-shoe tread contacts.
    pub wheel_shoe: bool,
    /// Wheel-local axle axis used to detect guide-pin contacts. The studio rig's
    /// wheels spin about Z.
    pub lateral_axis: LateralAxis,
    /// Tread force law stiffness (N/m).
    pub tread_stiffness: f32,
    /// Tread force law damping (N s/m).
    pub tread_damping: f32,
    /// Number of simulation steps the studio binary runs.
    pub steps: u32,
    /// Snapshot output file.
    pub output: PathBuf,
}

impl Default for TrackContactConfig {
    fn default() -> Self {
        let law = LinearSpringDamperLaw::default();
        Self {
            monitor: MonitorFlags::all(),
            collect: true,
            shoe_index_left: 0,
            shoe_index_right: 0,
            idler_shoe: true,
            wheel_shoe: true,
            lateral_axis: LateralAxis::Z,
            tread_stiffness: law.stiffness,
            tread_damping: law.damping,
            steps: 600,
            output: PathBuf::from("track_contacts.csv"),
        }
    }
}

impl TrackContactConfig {
    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> TrackContactResult<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> TrackContactResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn validate(&self) -> TrackContactResult<()> {
        if !(self.tread_stiffness.is_finite() && self.tread_stiffness >= 0.0) {
            return Err(TrackContactError::InvalidConfig(format!(
                "tread_stiffness must be finite and non-negative, got {}",
                self.tread_stiffness
            )));
        }
        if !(self.tread_damping.is_finite() && self.tread_damping >= 0.0) {
            return Err(TrackContactError::InvalidConfig(format!(
                "tread_damping must be finite and non-negative, got {}",
                self.tread_damping
            )));
        }
        Ok(())
    }

    pub fn build_observer(&self) -> ContactObserver {
        let mut observer = ContactObserver::new();
        observer.monitor_contacts(self.monitor);
        observer.set_contact_collection(self.collect);
        observer.set_shoe_index(VehicleSide::Left, self.shoe_index_left);
        observer.set_shoe_index(VehicleSide::Right, self.shoe_index_right);
        observer
    }

    pub fn build_filter(&self) -> CollisionFilter {
        let mut filter = CollisionFilter::new();
        filter.set_idler_shoe(self.idler_shoe);
        filter.set_wheel_shoe(self.wheel_shoe);
        filter.set_lateral_axis(self.lateral_axis);
        filter
    }

    pub fn force_law(&self) -> LinearSpringDamperLaw {
        LinearSpringDamperLaw {
            stiffness: self.tread_stiffness,
            damping: self.tread_damping,
        }
    }
}
