//! Snapshot interpolation for the remote puck and smoothing for the opponent paddle
//!
//! Puck updates arrive from the host at an uneven rate. Rendering a fixed delay
//! behind the newest receipt lets most frames fall between two known
//! snapshots; past the newest one the puck is extrapolated briefly along its
//! last velocity.

use std::collections::VecDeque;
use std::time::Duration;

use crate::util::time::{MonotonicClock, SharedClock};

/// Length of one host physics step in milliseconds; snapshot velocities are per step
pub const PHYSICS_TICK_MS: f64 = 1000.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationConfig {
    /// How far behind "now" the puck is rendered
    pub delay: Duration,
    /// Snapshots retained
    pub capacity: usize,
    /// Longest time to extrapolate past the newest snapshot
    pub max_extrapolation: Duration,
    pub tick_ms: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(50),
            capacity: 30,
            max_extrapolation: Duration::from_millis(100),
            tick_ms: PHYSICS_TICK_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub seq: u64,
    /// Local receipt time in milliseconds
    pub received_at: u64,
}

/// Ring of recent puck snapshots in receipt order
pub struct SnapshotBuffer {
    config: InterpolationConfig,
    clock: SharedClock,
    snapshots: VecDeque<Snapshot>,
    last_seq: Option<u64>,
}

impl SnapshotBuffer {
    pub fn new(config: InterpolationConfig, clock: SharedClock) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(config.capacity),
            config,
            clock,
            last_seq: None,
        }
    }

    /// Receipt and render times read from a monotonic clock
    pub fn monotonic(config: InterpolationConfig) -> Self {
        Self::new(config, MonotonicClock::shared())
    }

    /// Record a snapshot; stale or duplicate sequence numbers are ignored
    pub fn add_snapshot(&mut self, x: f64, y: f64, vx: f64, vy: f64, seq: u64) -> bool {
        if self.last_seq.is_some_and(|last| seq <= last) {
            return false;
        }

        self.last_seq = Some(seq);
        self.snapshots.push_back(Snapshot {
            x,
            y,
            vx,
            vy,
            seq,
            received_at: self.clock.now_millis(),
        });
        while self.snapshots.len() > self.config.capacity.max(1) {
            self.snapshots.pop_front();
        }
        true
    }

    /// Position to draw this frame, or `None` before the first snapshot
    pub fn interpolated_position(&self) -> Option<(f64, f64)> {
        let newest = self.snapshots.back()?;
        if self.snapshots.len() == 1 {
            return Some((newest.x, newest.y));
        }

        let now = self.clock.now_millis() as f64;
        let render_time = now - self.config.delay.as_millis() as f64;

        let straddling = self
            .snapshots
            .iter()
            .zip(self.snapshots.iter().skip(1))
            .find(|(a, b)| {
                a.received_at as f64 <= render_time && render_time <= b.received_at as f64
            });

        if let Some((before, after)) = straddling {
            let span = (after.received_at - before.received_at) as f64;
            let t = if span > 0.0 {
                ((render_time - before.received_at as f64) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            return Some((lerp(before.x, after.x, t), lerp(before.y, after.y, t)));
        }

        let oldest = self.snapshots.front()?;
        if render_time < oldest.received_at as f64 {
            return Some((oldest.x, oldest.y));
        }

        // Past the newest receipt; extrapolation age counts from now, not render time
        let elapsed = (now - newest.received_at as f64).max(0.0);
        if elapsed > self.config.max_extrapolation.as_millis() as f64 {
            return Some((newest.x, newest.y));
        }
        let steps = elapsed / self.config.tick_ms;
        Some((newest.x + newest.vx * steps, newest.y + newest.vy * steps))
    }

    pub fn latest_position(&self) -> Option<(f64, f64)> {
        self.snapshots.back().map(|s| (s.x, s.y))
    }

    pub fn velocity(&self) -> Option<(f64, f64)> {
        self.snapshots.back().map(|s| (s.vx, s.vy))
    }

    /// Drop everything, including the sequence high-water mark
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.last_seq = None;
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Default fraction of the remaining distance covered per step
pub const DEFAULT_PADDLE_SMOOTHING: f64 = 0.3;

/// Exponential smoother for the opponent paddle
#[derive(Debug, Clone)]
pub struct PaddleSmoother {
    gain: f64,
    current: Option<(f64, f64)>,
    target: Option<(f64, f64)>,
}

impl Default for PaddleSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_PADDLE_SMOOTHING)
    }
}

impl PaddleSmoother {
    pub fn new(gain: f64) -> Self {
        Self {
            gain: gain.clamp(0.0, 1.0),
            current: None,
            target: None,
        }
    }

    /// The first target also becomes the current position
    pub fn set_target(&mut self, x: f64, y: f64) {
        self.target = Some((x, y));
        if self.current.is_none() {
            self.current = Some((x, y));
        }
    }

    pub fn step(&mut self) -> Option<(f64, f64)> {
        let (tx, ty) = self.target?;
        let (cx, cy) = self.current.unwrap_or((tx, ty));
        let next = (lerp(cx, tx, self.gain), lerp(cy, ty, self.gain));
        self.current = Some(next);
        Some(next)
    }

    pub fn current(&self) -> Option<(f64, f64)> {
        self.current
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.target = None;
    }
}
