//! Per-step contact snapshot rows and their CSV output.
//!
//! Row layout: `time, n_hull, n_sprocket_l, n_sprocket_r, n_idler_l, n_idler_r,
//! n_shoe_l, n_shoe_r`, followed by every contact point (x, y, z) of each part in
//! that same order, expressed in the part's local body frame.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bevy::math::Vec3;

use crate::error::TrackContactResult;
use crate::types::TrackPart;

/// One logged step.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub time: f64,
    /// Contact counts in [`TrackPart::ALL`] order.
    pub counts: [usize; TrackPart::COUNT],
    /// Local contact points, grouped by part in [`TrackPart::ALL`] order.
    pub points: Vec<Vec3>,
}

impl SnapshotRow {
    pub fn total_contacts(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Local contact points belonging to `part`.
    pub fn part_points(&self, part: TrackPart) -> &[Vec3] {
        let start: usize = self.counts[..part.index()].iter().sum();
        let end = (start + self.counts[part.index()]).min(self.points.len());
        &self.points[start.min(end)..end]
    }

    fn write_csv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "{}", self.time)?;
        for count in &self.counts {
            write!(out, ",{}", count)?;
        }
        for p in &self.points {
            write!(out, ",{},{},{}", p.x, p.y, p.z)?;
        }
        writeln!(out)
    }
}

/// Accumulated snapshot rows, one per step with at least one contact.
#[derive(Debug, Clone, Default)]
pub struct ContactLog {
    rows: Vec<SnapshotRow>,
}

impl ContactLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row. Rows without contacts are dropped.
    pub fn push(&mut self, row: SnapshotRow) {
        if row.total_contacts() == 0 {
            return;
        }
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Write all rows to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for row in &self.rows {
            row.write_csv(out)?;
        }
        Ok(())
    }

    /// Write all rows to a file, replacing it.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> TrackContactResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(time: f64, counts: [usize; 7], points: Vec<Vec3>) -> SnapshotRow {
        SnapshotRow {
            time,
            counts,
            points,
        }
    }

    #[test]
    fn test_empty_rows_are_dropped() {
        let mut log = ContactLog::new();
        log.push(row(0.1, [0; 7], Vec::new()));
        assert!(log.is_empty());
    }

    #[test]
    fn test_csv_layout() {
        let mut log = ContactLog::new();
        log.push(row(
            0.5,
            [1, 0, 0, 0, 0, 0, 1],
            vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 0.5)],
        ));

        let mut out = Vec::new();
        log.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "0.5,1,0,0,0,0,0,1,1,2,3,-1,0,0.5\n");
    }

    #[test]
    fn test_part_points_slices_by_count() {
        let r = row(
            0.0,
            [1, 2, 0, 0, 0, 0, 1],
            vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE],
        );
        assert_eq!(r.part_points(TrackPart::Hull), &[Vec3::X]);
        assert_eq!(r.part_points(TrackPart::SprocketLeft), &[Vec3::Y, Vec3::Z]);
        assert!(r.part_points(TrackPart::IdlerLeft).is_empty());
        assert_eq!(r.part_points(TrackPart::ShoesRight), &[Vec3::ONE]);
    }
}
