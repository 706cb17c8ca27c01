//! Axis groups.
//!
//! An [`AxisGroup`] binds symbolic roles ("X", "Z", "W", "Y", "R", "A",
//! "B") to axis handles and keeps a last-known status snapshot per role.
//! The snapshot is only updated by [`AxisGroup::refresh_status`]; readers
//! never refresh behind the caller's back.
//!
//! [`MotionGroup`] is the behaviour shared by arms, stages and wash
//! stations. Each implementor hands out its group and overrides only
//! what differs (wash stations guard `jog`).

use crate::error::{MotionError, MotionResult};
use lhk_common::hal::Axis;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

// ─── Status Snapshot ────────────────────────────────────────────────

/// Last-known state of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisStatus {
    /// Axis reported a completed homing routine.
    pub is_homed: bool,
    /// Drive powered.
    pub is_enabled: bool,
    /// Position [mm].
    pub position_mm: f64,
}

// ─── Axis Group ─────────────────────────────────────────────────────

/// Named bundle of axes with a cached status snapshot.
pub struct AxisGroup {
    /// Group id (1-based, unique per kind)
    id: u8,
    /// Display name, e.g. "Arm 2"
    name: String,
    /// Role bindings in insertion order
    axes: Vec<(String, Arc<dyn Axis>)>,
    /// Cached status per role
    status: Mutex<BTreeMap<String, AxisStatus>>,
}

impl std::fmt::Debug for AxisGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisGroup")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("roles", &self.roles())
            .finish()
    }
}

impl AxisGroup {
    /// Empty group.
    pub fn new(id: u8, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            axes: Vec::new(),
            status: Mutex::new(BTreeMap::new()),
        }
    }

    /// Group id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind `axis` to `role`.
    ///
    /// # Errors
    /// `MotionError::DuplicateRole` if the role is already bound.
    pub fn add_axis(&mut self, role: &str, axis: Arc<dyn Axis>) -> MotionResult<()> {
        if self.axes.iter().any(|(r, _)| r == role) {
            return Err(MotionError::DuplicateRole {
                group: self.id,
                role: role.to_string(),
            });
        }
        self.axes.push((role.to_string(), axis));
        self.status
            .lock()
            .insert(role.to_string(), AxisStatus::default());
        Ok(())
    }

    /// Axis bound to `role`.
    pub fn axis(&self, role: &str) -> MotionResult<&Arc<dyn Axis>> {
        self.axes
            .iter()
            .find(|(r, _)| r == role)
            .map(|(_, axis)| axis)
            .ok_or_else(|| MotionError::UnknownRole {
                group: self.id,
                role: role.to_string(),
            })
    }

    /// Bound roles in insertion order.
    pub fn roles(&self) -> Vec<&str> {
        self.axes.iter().map(|(r, _)| r.as_str()).collect()
    }

    /// Cached status of `role`.
    pub fn status(&self, role: &str) -> Option<AxisStatus> {
        self.status.lock().get(role).copied()
    }

    /// Clear the fault/pause latch on every axis.
    pub fn reset(&self) -> MotionResult<()> {
        for (_, axis) in &self.axes {
            axis.reset_pause()?;
        }
        Ok(())
    }

    /// Re-read homed/enabled/position of every role into the cache.
    pub fn refresh_status(&self) -> MotionResult<()> {
        let mut fresh = BTreeMap::new();
        for (role, axis) in &self.axes {
            fresh.insert(
                role.clone(),
                AxisStatus {
                    is_homed: axis.is_homed(),
                    is_enabled: axis.is_on(),
                    position_mm: axis.position_mm()?,
                },
            );
        }
        *self.status.lock() = fresh;
        Ok(())
    }

    /// Whether every role is homed.
    ///
    /// With `use_cache == false` the snapshot is refreshed first.
    pub fn is_homed(&self, use_cache: bool) -> MotionResult<bool> {
        if !use_cache {
            self.refresh_status()?;
        }
        Ok(self.status.lock().values().all(|s| s.is_homed))
    }

    /// Reset-and-home the given roles, then wait for each in turn.
    ///
    /// `timeout` is one budget for the whole call: every wait only gets
    /// what the previous waits left over.
    pub fn home(&self, roles: &[&str], timeout: Duration) -> MotionResult<()> {
        let axes = roles
            .iter()
            .map(|role| self.axis(role).map(Arc::clone))
            .collect::<MotionResult<Vec<_>>>()?;

        debug!("{}: homing {:?}", self.name, roles);
        for axis in &axes {
            axis.send_reset_and_home()?;
        }
        let deadline = Instant::now() + timeout;
        for axis in &axes {
            let remaining = deadline.saturating_duration_since(Instant::now());
            axis.wait_for_home_result(remaining)?;
        }
        debug!("{}: {:?} homed", self.name, roles);
        Ok(())
    }

    /// Run the homing routine of one role and wait for it.
    pub fn home_axis(&self, role: &str) -> MotionResult<()> {
        self.axis(role)?.home(true)?;
        Ok(())
    }

    /// Power every axis on or off.
    pub fn enable(&self, on: bool) -> MotionResult<()> {
        for (_, axis) in &self.axes {
            axis.enable(on, true)?;
        }
        Ok(())
    }

    /// Power one role on or off.
    pub fn enable_axis(&self, role: &str, on: bool) -> MotionResult<()> {
        self.axis(role)?.enable(on, true)?;
        Ok(())
    }

    /// Relative move of `role` in calibrated direction.
    pub fn jog(&self, role: &str, increment: f64) -> MotionResult<()> {
        let axis = self.axis(role)?;
        let increment = if axis.settings().flip_direction {
            -increment
        } else {
            increment
        };
        axis.move_relative(increment)?;
        Ok(())
    }
}

// ─── Shared Behaviour ───────────────────────────────────────────────

/// Behaviour common to every axis group owner.
pub trait MotionGroup: Send + Sync {
    /// Underlying axis group.
    fn group(&self) -> &AxisGroup;

    /// Group id.
    fn id(&self) -> u8 {
        self.group().id()
    }

    /// Display name.
    fn name(&self) -> &str {
        self.group().name()
    }

    /// See [`AxisGroup::reset`].
    fn reset(&self) -> MotionResult<()> {
        self.group().reset()
    }

    /// See [`AxisGroup::refresh_status`].
    fn refresh_status(&self) -> MotionResult<()> {
        self.group().refresh_status()
    }

    /// See [`AxisGroup::is_homed`].
    fn is_homed(&self, use_cache: bool) -> MotionResult<bool> {
        self.group().is_homed(use_cache)
    }

    /// See [`AxisGroup::home`].
    fn home(&self, roles: &[&str], timeout: Duration) -> MotionResult<()> {
        self.group().home(roles, timeout)
    }

    /// See [`AxisGroup::enable`].
    fn enable(&self, on: bool) -> MotionResult<()> {
        self.group().enable(on)
    }

    /// See [`AxisGroup::jog`].
    fn jog(&self, role: &str, increment: f64) -> MotionResult<()> {
        self.group().jog(role, increment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lhk_common::hal::AxisSettings;
    use lhk_hal::{AxisCommand, SimAxis};

    fn make_axis(id: u8, flip: bool) -> Arc<SimAxis> {
        Arc::new(SimAxis::new(
            id,
            format!("axis{id}"),
            AxisSettings::new(100.0, 1000.0, -50.0, 200.0).flipped(flip),
        ))
    }

    fn make_group(axes: &[(&str, Arc<SimAxis>)]) -> AxisGroup {
        let mut group = AxisGroup::new(1, "Test 1");
        for (role, axis) in axes {
            group.add_axis(role, axis.clone()).unwrap();
        }
        group
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let mut group = make_group(&[("X", make_axis(11, false))]);
        let err = group.add_axis("X", make_axis(12, false)).unwrap_err();
        assert_eq!(
            err,
            MotionError::DuplicateRole {
                group: 1,
                role: "X".to_string()
            }
        );
        assert_eq!(group.roles(), vec!["X"]);
    }

    #[test]
    fn test_cache_is_stale_until_refresh() {
        let x = make_axis(11, false);
        let z = make_axis(13, false);
        let group = make_group(&[("X", x.clone()), ("Z", z.clone())]);

        x.set_homed(true);
        z.set_homed(true);
        assert!(!group.is_homed(true).unwrap());
        assert!(group.is_homed(false).unwrap());

        z.set_homed(false);
        assert!(group.is_homed(true).unwrap());
        assert!(!group.is_homed(false).unwrap());
    }

    #[test]
    fn test_refresh_reads_position_and_enable() {
        let x = make_axis(11, false);
        let group = make_group(&[("X", x.clone())]);
        x.set_position(42.5);
        x.enable(true, true).unwrap();

        assert_eq!(group.status("X"), Some(AxisStatus::default()));
        group.refresh_status().unwrap();
        let status = group.status("X").unwrap();
        assert_eq!(status.position_mm, 42.5);
        assert!(status.is_enabled);
        assert!(group.status("Q").is_none());
    }

    #[test]
    fn test_jog_inverts_flipped_axis() {
        let plain = make_axis(11, false);
        let flipped = make_axis(13, true);
        let group = make_group(&[("X", plain.clone()), ("Z", flipped.clone())]);

        group.jog("X", 2.0).unwrap();
        group.jog("Z", 2.0).unwrap();

        assert_eq!(plain.commands(), vec![AxisCommand::MoveRelative { delta: 2.0 }]);
        assert_eq!(flipped.commands(), vec![AxisCommand::MoveRelative { delta: -2.0 }]);
        assert_eq!(flipped.position_mm().unwrap(), -2.0);
    }

    #[test]
    fn test_home_unknown_role_commands_nothing() {
        let x = make_axis(11, false);
        let group = make_group(&[("X", x.clone())]);
        let err = group.home(&["X", "Q"], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, MotionError::UnknownRole { .. }));
        assert!(x.commands().is_empty());
    }

    #[test]
    fn test_home_issues_all_resets_before_waiting() {
        let w = make_axis(14, false);
        let z = make_axis(13, false);
        let group = make_group(&[("W", w.clone()), ("Z", z.clone())]);

        group.home(&["W", "Z"], Duration::from_secs(1)).unwrap();
        assert_eq!(w.commands(), vec![AxisCommand::ResetAndHome]);
        assert_eq!(z.commands(), vec![AxisCommand::ResetAndHome]);
        assert!(group.is_homed(false).unwrap());
    }

    #[test]
    fn test_home_fault_propagates_unchanged() {
        let x = make_axis(11, false);
        let group = make_group(&[("X", x.clone())]);
        x.fail_next_home("home switch not found");
        let err = group.home(&["X"], Duration::from_secs(1)).unwrap_err();
        match err {
            MotionError::Axis(fault) => {
                assert_eq!(fault.axis_id, 11);
                assert_eq!(fault.message, "home switch not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enable_and_reset_reach_every_axis() {
        let x = make_axis(11, false);
        let z = make_axis(13, false);
        let group = make_group(&[("X", x.clone()), ("Z", z.clone())]);

        group.enable(true).unwrap();
        group.reset().unwrap();
        group.enable_axis("Z", false).unwrap();
        assert!(x.is_on());
        assert!(!z.is_on());
        assert_eq!(
            z.commands(),
            vec![
                AxisCommand::Enable(true),
                AxisCommand::ResetPause,
                AxisCommand::Enable(false)
            ]
        );
    }

    #[test]
    fn test_home_axis_homes_one_role() {
        let x = make_axis(11, false);
        let z = make_axis(13, false);
        let group = make_group(&[("X", x.clone()), ("Z", z.clone())]);

        group.home_axis("Z").unwrap();
        assert_eq!(z.commands(), vec![AxisCommand::Home]);
        assert!(z.is_homed());
        assert!(x.commands().is_empty());
        assert!(!x.is_homed());

        assert!(matches!(
            group.home_axis("W"),
            Err(MotionError::UnknownRole { .. })
        ));
    }
}
