//! Timed pulse guiding on top of the guide outputs.
//!
//! The two axes are independent: a pulse on one axis cancels only that axis's pending
//! stop, and the other axis keeps its state. Time is passed in by the caller so the same
//! state machine serves an event loop, a blocking tool, or a test.

use crate::{HostError, ScopeTemp, UsbBackend};
use std::time::{Duration, Instant};

/// Something that can drive all four guide outputs at once.
pub trait GuideSink {
    /// Replace the guide output state.
    fn set_guide(
        &mut self,
        north: bool,
        south: bool,
        west: bool,
        east: bool,
    ) -> Result<(), HostError>;
}

impl<B: UsbBackend> GuideSink for ScopeTemp<B> {
    fn set_guide(
        &mut self,
        north: bool,
        south: bool,
        west: bool,
        east: bool,
    ) -> Result<(), HostError> {
        self.set_guide_outputs(north, south, west, east)
    }
}

/// Guide axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Declination, north/south.
    Dec,
    /// Right ascension, west/east.
    Ra,
}

/// Guide direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// DEC+
    North,
    /// DEC-
    South,
    /// RA+
    West,
    /// RA-
    East,
}

impl Direction {
    /// Axis this direction moves on.
    pub fn axis(self) -> Axis {
        match self {
            Self::North | Self::South => Axis::Dec,
            Self::West | Self::East => Axis::Ra,
        }
    }
}

/// Current state of the four outputs as the guider last set them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outputs {
    /// DEC+
    pub north: bool,
    /// DEC-
    pub south: bool,
    /// RA+
    pub west: bool,
    /// RA-
    pub east: bool,
}

impl Outputs {
    fn clear(&mut self, axis: Axis) {
        match axis {
            Axis::Dec => (self.north, self.south) = (false, false),
            Axis::Ra => (self.west, self.east) = (false, false),
        }
    }

    fn set(&mut self, direction: Direction) {
        self.clear(direction.axis());
        match direction {
            Direction::North => self.north = true,
            Direction::South => self.south = true,
            Direction::West => self.west = true,
            Direction::East => self.east = true,
        }
    }
}

/// Pulse guiding with one stop timer per axis.
#[derive(Debug, Default)]
pub struct Guider {
    outputs: Outputs,
    dec_stop: Option<Instant>,
    ra_stop: Option<Instant>,
}

impl Guider {
    /// All outputs off, no timers.
    pub fn new() -> Self {
        Self::default()
    }

    fn timer(&mut self, axis: Axis) -> &mut Option<Instant> {
        match axis {
            Axis::Dec => &mut self.dec_stop,
            Axis::Ra => &mut self.ra_stop,
        }
    }

    /// Send `next` and keep it as the current state only once the sink took it.
    fn apply<S: GuideSink>(&mut self, sink: &mut S, next: Outputs) -> Result<(), HostError> {
        sink.set_guide(next.north, next.south, next.west, next.east)?;
        self.outputs = next;
        Ok(())
    }

    /// Guide in `direction` for `duration`.
    ///
    /// Cancels the axis's pending stop, switches the output on at once and arms a new stop
    /// at `now + duration`. A zero duration just stops the axis.
    ///
    /// If the sink fails, outputs and timers are left as they were.
    pub fn pulse<S: GuideSink>(
        &mut self,
        sink: &mut S,
        direction: Direction,
        duration: Duration,
        now: Instant,
    ) -> Result<(), HostError> {
        let axis = direction.axis();
        let mut next = self.outputs;
        if duration.is_zero() {
            next.clear(axis);
        } else {
            next.set(direction);
        }
        self.apply(sink, next)?;
        *self.timer(axis) = (!duration.is_zero()).then(|| now + duration);
        log::debug!("guiding {direction:?} for {} ms", duration.as_millis());
        Ok(())
    }

    /// Stop an axis now and cancel its timer.
    pub fn stop<S: GuideSink>(&mut self, sink: &mut S, axis: Axis) -> Result<(), HostError> {
        let mut next = self.outputs;
        next.clear(axis);
        self.apply(sink, next)?;
        *self.timer(axis) = None;
        Ok(())
    }

    /// Fire the stop timers that have expired by `now`.
    ///
    /// Both axes expiring together produce a single output update. Expired timers stay
    /// armed until the update goes through, so a failed update is retried on the next poll.
    pub fn poll<S: GuideSink>(&mut self, sink: &mut S, now: Instant) -> Result<(), HostError> {
        let expired: Vec<Axis> = [Axis::Dec, Axis::Ra]
            .into_iter()
            .filter(|&axis| self.stop_time(axis).is_some_and(|stop| stop <= now))
            .collect();
        if expired.is_empty() {
            return Ok(());
        }
        let mut next = self.outputs;
        for &axis in &expired {
            next.clear(axis);
        }
        self.apply(sink, next)?;
        for axis in expired {
            *self.timer(axis) = None;
        }
        Ok(())
    }

    /// Manual move.
    ///
    /// Opposite directions on the same axis cancel out to off. Both stop timers are
    /// cancelled once the state is applied.
    pub fn manual<S: GuideSink>(
        &mut self,
        sink: &mut S,
        north: bool,
        south: bool,
        west: bool,
        east: bool,
    ) -> Result<(), HostError> {
        let (north, south) = if north && south { (false, false) } else { (north, south) };
        let (west, east) = if west && east { (false, false) } else { (west, east) };
        self.apply(
            sink,
            Outputs {
                north,
                south,
                west,
                east,
            },
        )?;
        self.dec_stop = None;
        self.ra_stop = None;
        Ok(())
    }

    /// Output state as last applied.
    pub fn outputs(&self) -> Outputs {
        self.outputs
    }

    /// Pending stop time of an axis.
    pub fn stop_time(&self, axis: Axis) -> Option<Instant> {
        match axis {
            Axis::Dec => self.dec_stop,
            Axis::Ra => self.ra_stop,
        }
    }

    /// Number of armed stop timers.
    pub fn active_timers(&self) -> usize {
        self.dec_stop.is_some() as usize + self.ra_stop.is_some() as usize
    }

    /// Earliest pending stop time.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.dec_stop, self.ra_stop) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        states: Vec<(bool, bool, bool, bool)>,
        failures: usize,
    }

    impl GuideSink for Recorder {
        fn set_guide(
            &mut self,
            north: bool,
            south: bool,
            west: bool,
            east: bool,
        ) -> Result<(), HostError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(HostError::LinkUnavailable);
            }
            self.states.push((north, south, west, east));
            Ok(())
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn reissue_on_same_axis_replaces_timer() {
        let mut sink = Recorder::default();
        let mut guider = Guider::new();
        let t0 = Instant::now();

        guider.pulse(&mut sink, Direction::North, secs(5), t0).unwrap();
        guider
            .pulse(&mut sink, Direction::South, secs(3), t0 + secs(1))
            .unwrap();

        assert_eq!(guider.active_timers(), 1);
        assert_eq!(guider.stop_time(Axis::Dec), Some(t0 + secs(4)));
        // north dropped in the same update that raised south
        assert_eq!(
            sink.states,
            vec![(true, false, false, false), (false, true, false, false)]
        );

        // the cancelled north stop never fires
        guider.poll(&mut sink, t0 + secs(3)).unwrap();
        assert_eq!(sink.states.len(), 2);
        guider.poll(&mut sink, t0 + secs(4)).unwrap();
        assert_eq!(sink.states.last(), Some(&(false, false, false, false)));
        assert_eq!(guider.active_timers(), 0);
    }

    #[test]
    fn axes_are_independent() {
        let mut sink = Recorder::default();
        let mut guider = Guider::new();
        let t0 = Instant::now();

        guider.pulse(&mut sink, Direction::North, secs(2), t0).unwrap();
        guider.pulse(&mut sink, Direction::East, secs(5), t0).unwrap();
        assert_eq!(guider.active_timers(), 2);
        assert_eq!(guider.next_deadline(), Some(t0 + secs(2)));

        guider.poll(&mut sink, t0 + secs(2)).unwrap();
        assert_eq!(sink.states.last(), Some(&(false, false, false, true)));
        assert_eq!(guider.next_deadline(), Some(t0 + secs(5)));
    }

    #[test]
    fn zero_duration_stops_without_timer() {
        let mut sink = Recorder::default();
        let mut guider = Guider::new();
        let t0 = Instant::now();

        guider.pulse(&mut sink, Direction::West, secs(5), t0).unwrap();
        guider
            .pulse(&mut sink, Direction::West, Duration::ZERO, t0)
            .unwrap();
        assert_eq!(guider.active_timers(), 0);
        assert_eq!(guider.outputs(), Outputs::default());
        assert_eq!(sink.states.last(), Some(&(false, false, false, false)));
    }

    #[test]
    fn manual_move_cancels_timers_and_contradictions() {
        let mut sink = Recorder::default();
        let mut guider = Guider::new();
        let t0 = Instant::now();

        guider.pulse(&mut sink, Direction::North, secs(5), t0).unwrap();
        guider.pulse(&mut sink, Direction::West, secs(5), t0).unwrap();
        guider.manual(&mut sink, true, true, false, true).unwrap();

        assert_eq!(guider.active_timers(), 0);
        assert_eq!(sink.states.last(), Some(&(false, false, false, true)));

        // the old timers are gone, so nothing fires later
        guider.poll(&mut sink, t0 + secs(10)).unwrap();
        assert_eq!(sink.states.len(), 3);
    }

    #[test]
    fn failed_update_leaves_no_output_behind() {
        let mut sink = Recorder {
            failures: 1,
            ..Default::default()
        };
        let mut guider = Guider::new();
        let t0 = Instant::now();

        assert!(guider.pulse(&mut sink, Direction::North, secs(1), t0).is_err());
        assert_eq!(guider.outputs(), Outputs::default());
        assert_eq!(guider.active_timers(), 0);

        guider.pulse(&mut sink, Direction::East, secs(1), t0).unwrap();
        guider.poll(&mut sink, t0 + secs(60)).unwrap();
        assert_eq!(
            sink.states,
            vec![(false, false, false, true), (false, false, false, false)]
        );
        assert_eq!(guider.outputs(), Outputs::default());
    }

    #[test]
    fn failed_stop_is_retried_on_next_poll() {
        let mut sink = Recorder::default();
        let mut guider = Guider::new();
        let t0 = Instant::now();

        guider.pulse(&mut sink, Direction::South, secs(1), t0).unwrap();
        sink.failures = 1;
        assert!(guider.poll(&mut sink, t0 + secs(1)).is_err());
        assert_eq!(guider.stop_time(Axis::Dec), Some(t0 + secs(1)));
        assert!(guider.outputs().south);

        guider.poll(&mut sink, t0 + secs(2)).unwrap();
        assert_eq!(guider.active_timers(), 0);
        assert_eq!(sink.states.last(), Some(&(false, false, false, false)));
    }

    #[test]
    fn failed_manual_move_keeps_previous_state() {
        let mut sink = Recorder::default();
        let mut guider = Guider::new();
        let t0 = Instant::now();

        guider.pulse(&mut sink, Direction::West, secs(5), t0).unwrap();
        sink.failures = 1;
        assert!(guider.manual(&mut sink, true, false, false, false).is_err());
        assert!(guider.outputs().west);
        assert!(!guider.outputs().north);
        assert_eq!(guider.stop_time(Axis::Ra), Some(t0 + secs(5)));
    }
}
