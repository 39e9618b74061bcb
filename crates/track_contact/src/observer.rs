//! Per-part aggregation of resolved contacts.
//!
//! [`ContactObserver::process`] runs once per step, after contact resolution.
//! It binds to the monitored bodies on first use, clears the seven part lists,
//! walks every resolved contact the engine reports and files each one under the
//! parts it touches.
//!
//! ## Filing rules
//!
//! - Contacts with positive separation or a zero reaction force are ghosts from
//!   broad-phase margins and are never recorded.
//! - A contact is recorded under every monitored part whose body is either
//!   participant, using that participant's contact point.
//! - A shoe touching its own side's sprocket is recorded under the sprocket
//!   only, so the same mechanical contact is not counted twice.

use bevy::log::{debug, info, warn};
use bevy::math::Vec3;
use std::path::Path;

use crate::engine::{ReportContactCallback, ResolvedContact, TrackedVehicle};
use crate::error::TrackContactResult;
use crate::snapshot::{ContactLog, SnapshotRow};
use crate::types::{BodyId, ContactRecord, MonitorFlags, TrackPart, VehicleSide};

/// Body identities captured on the first `process` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MonitoredBodies {
    hull: BodyId,
    sprockets: [BodyId; 2],
    idlers: [BodyId; 2],
    /// `None` when that side's assembly has fewer shoes than the monitored index.
    shoes: [Option<BodyId>; 2],
}

impl MonitoredBodies {
    fn bind<V: TrackedVehicle + ?Sized>(vehicle: &V, shoe_index: [usize; 2]) -> Self {
        let shoes = VehicleSide::BOTH.map(|side| {
            let index = shoe_index[side.index()];
            let available = vehicle.num_track_shoes(side);
            if index < available {
                vehicle.track_shoe(side, index)
            } else {
                warn!(
                    "{:?} track has {} shoes, cannot monitor shoe {}",
                    side, available, index
                );
                None
            }
        });

        Self {
            hull: vehicle.hull(),
            sprockets: VehicleSide::BOTH.map(|side| vehicle.sprocket(side)),
            idlers: VehicleSide::BOTH.map(|side| vehicle.idler(side)),
            shoes,
        }
    }

    fn body(&self, part: TrackPart) -> Option<BodyId> {
        match part {
            TrackPart::Hull => Some(self.hull),
            TrackPart::SprocketLeft => Some(self.sprockets[0]),
            TrackPart::SprocketRight => Some(self.sprockets[1]),
            TrackPart::IdlerLeft => Some(self.idlers[0]),
            TrackPart::IdlerRight => Some(self.idlers[1]),
            TrackPart::ShoesLeft => self.shoes[0],
            TrackPart::ShoesRight => self.shoes[1],
        }
    }

    /// True if `body` is the sprocket on the same side as shoe part `part`.
    fn is_own_sprocket(&self, part: TrackPart, body: Option<BodyId>) -> bool {
        match part.side() {
            Some(side) => body == Some(self.sprockets[side.index()]),
            None => false,
        }
    }
}

/// Observes resolved contacts on the hull, sprockets, idlers and two
/// designated track shoes.
#[derive(Debug, Clone, Default)]
pub struct ContactObserver {
    flags: MonitorFlags,
    collect: bool,
    shoe_index: [usize; 2],
    bound: Option<MonitoredBodies>,
    /// Step-scoped lists, reused across steps.
    lists: [Vec<ContactRecord>; TrackPart::COUNT],
    /// Sprocket centers at the last `process`.
    sprocket_centers: [Vec3; 2],
    log: ContactLog,
}

impl ContactObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `flags` to the set of monitored parts.
    pub fn monitor_contacts(&mut self, flags: MonitorFlags) {
        self.flags |= flags;
    }

    pub fn flags(&self) -> MonitorFlags {
        self.flags
    }

    pub fn is_flag_set(&self, part: TrackPart) -> bool {
        self.flags.contains(part.flag())
    }

    /// Enable or disable snapshot collection.
    pub fn set_contact_collection(&mut self, collect: bool) {
        self.collect = collect;
    }

    /// Choose which shoe of `side` is monitored. Only effective before the
    /// first `process` call.
    pub fn set_shoe_index(&mut self, side: VehicleSide, index: usize) {
        self.shoe_index[side.index()] = index;
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Aggregate this step's resolved contacts.
    pub fn process<V: TrackedVehicle + ?Sized>(&mut self, vehicle: &V) {
        if self.bound.is_none() {
            let bound = MonitoredBodies::bind(vehicle, self.shoe_index);
            info!(
                "contact observer bound: hull {:?}, sprockets {:?}, idlers {:?}, shoes {:?}",
                bound.hull, bound.sprockets, bound.idlers, bound.shoes
            );
            self.bound = Some(bound);
        }

        if self.flags.is_empty() {
            return;
        }

        for list in &mut self.lists {
            list.clear();
        }

        vehicle.report_all_contacts(&mut *self);

        if let Some(bound) = self.bound {
            for side in VehicleSide::BOTH {
                self.sprocket_centers[side.index()] = vehicle
                    .body_frame(bound.sprockets[side.index()])
                    .map_or(Vec3::ZERO, |frame| frame.position);
            }
        }

        if self.collect {
            self.record_snapshot(vehicle);
        }
    }

    fn record_snapshot<V: TrackedVehicle + ?Sized>(&mut self, vehicle: &V) {
        let total: usize = self.lists.iter().map(Vec::len).sum();
        if total == 0 {
            return;
        }
        let Some(bound) = self.bound else {
            return;
        };

        let mut counts = [0usize; TrackPart::COUNT];
        let mut points = Vec::with_capacity(total);
        for part in TrackPart::ALL {
            let list = &self.lists[part.index()];
            counts[part.index()] = list.len();
            let frame = bound.body(part).and_then(|body| vehicle.body_frame(body));
            if frame.is_none() && !list.is_empty() {
                debug!("no frame for {:?}, logging global contact points", part);
            }
            points.extend(
                list.iter()
                    .map(|c| frame.map_or(c.point, |f| f.point_to_local(c.point))),
            );
        }

        self.log.push(SnapshotRow {
            time: vehicle.time(),
            counts,
            points,
        });
    }

    /// True if `part` had at least one contact at the last `process`.
    pub fn in_contact(&self, part: TrackPart) -> bool {
        !self.lists[part.index()].is_empty()
    }

    pub fn num_contacts(&self, part: TrackPart) -> usize {
        self.lists[part.index()].len()
    }

    pub fn contacts(&self, part: TrackPart) -> &[ContactRecord] {
        &self.lists[part.index()]
    }

    /// Net torque the contacts exert on the `side` sprocket about its center.
    ///
    /// Under the rapier backend only normal reactions are reported, so friction
    /// torque on a round sprocket does not show up here.
    pub fn sprocket_resistive_torque(&self, side: VehicleSide) -> Vec3 {
        let center = self.sprocket_centers[side.index()];
        self.lists[TrackPart::sprocket(side).index()]
            .iter()
            .fold(Vec3::ZERO, |torque, c| {
                torque + (c.point - center).cross(c.global_force()) + c.global_torque()
            })
    }

    pub fn contact_log(&self) -> &ContactLog {
        &self.log
    }

    /// Write the collected snapshot rows. A no-op unless collection is on and
    /// at least one part is monitored.
    pub fn write_contacts<P: AsRef<Path>>(&self, path: P) -> TrackContactResult<()> {
        if !self.collect || self.flags.is_empty() {
            return Ok(());
        }
        self.log.write_to_file(path.as_ref())?;
        info!(
            "wrote {} contact snapshot rows to {}",
            self.log.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    fn file(&mut self, part: TrackPart, point: Vec3, contact: &ResolvedContact) {
        self.lists[part.index()].push(ContactRecord {
            point,
            frame: contact.frame,
            force: contact.force,
            torque: contact.torque,
        });
    }
}

impl ReportContactCallback for ContactObserver {
    fn on_report_contact(&mut self, contact: &ResolvedContact) -> bool {
        if contact.distance > 0.0 || contact.force == Vec3::ZERO {
            return true;
        }
        let Some(bound) = self.bound else {
            return true;
        };

        for part in TrackPart::ALL {
            if !self.flags.contains(part.flag()) {
                continue;
            }
            let Some(body) = bound.body(part) else {
                continue;
            };
            let shoe = part.is_shoe();

            let on_a = contact.body_a == Some(body);
            if on_a && !(shoe && bound.is_own_sprocket(part, contact.body_b)) {
                self.file(part, contact.point_a, contact);
            }
            let on_b = contact.body_b == Some(body);
            if on_b && !(shoe && bound.is_own_sprocket(part, contact.body_a)) {
                self.file(part, contact.point_b, contact);
            }
        }

        true
    }
}
