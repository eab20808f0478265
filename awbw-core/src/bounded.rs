use serde::{Deserialize, Serialize};

/// A value clamped to an integer range.
/// Used for: hit points in tenths (0 to 100), capture progress (0 to 20).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundedInt {
    value: i32,
    min: i32,
    max: i32,
}

impl BoundedInt {
    pub const fn new(value: i32, min: i32, max: i32) -> Self {
        let value = if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        };
        Self { value, min, max }
    }

    pub fn get(&self) -> i32 {
        self.value
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn add(&mut self, delta: i32) {
        self.value = (self.value + delta).clamp(self.min, self.max);
    }

    pub fn set(&mut self, value: i32) {
        self.value = value.clamp(self.min, self.max);
    }

    pub fn is_min(&self) -> bool {
        self.value == self.min
    }

    pub fn is_max(&self) -> bool {
        self.value == self.max
    }
}

/// Unit health in tenths of a hit point. Displayed as 1-10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct HitPoints(BoundedInt);

impl HitPoints {
    pub const MAX_TENTHS: i32 = 100;
    pub const FULL: HitPoints = HitPoints::from_tenths(100);

    pub const fn from_tenths(tenths: i32) -> Self {
        Self(BoundedInt::new(tenths, 0, Self::MAX_TENTHS))
    }

    /// Whole hit points on the 0-10 scale.
    pub const fn from_whole(hp: i32) -> Self {
        Self::from_tenths(hp * 10)
    }

    pub fn tenths(&self) -> i32 {
        self.0.get()
    }

    /// The number shown on the unit: `ceil(hp)`, so 0.1 shows as 1.
    pub fn display(&self) -> i32 {
        (self.tenths() + 9) / 10
    }

    pub fn is_dead(&self) -> bool {
        self.0.is_min()
    }

    /// Apply a change in tenths without clamping away the sign information:
    /// returns the unclamped result alongside the stored (clamped) value.
    pub fn with_change(self, delta_tenths: i32) -> (HitPoints, i32) {
        let raw = self.tenths() + delta_tenths;
        (HitPoints::from_tenths(raw), raw)
    }

    /// `floor(hp / 10 * cost)`.
    pub fn value_of(&self, cost: i64) -> i64 {
        self.tenths() as i64 * cost / Self::MAX_TENTHS as i64
    }
}

impl Default for HitPoints {
    fn default() -> Self {
        Self::FULL
    }
}

impl From<f32> for HitPoints {
    fn from(hp: f32) -> Self {
        HitPoints::from_tenths((hp * 10.0).round() as i32)
    }
}

impl From<HitPoints> for f32 {
    fn from(hp: HitPoints) -> f32 {
        hp.tenths() as f32 / 10.0
    }
}

/// Building capture progress: 20 = untouched, 0 = captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct CaptureProgress(BoundedInt);

impl CaptureProgress {
    pub const FULL: i32 = 20;

    pub const fn new(value: i32) -> Self {
        Self(BoundedInt::new(value, 0, Self::FULL))
    }

    pub const fn full() -> Self {
        Self::new(Self::FULL)
    }

    pub fn get(&self) -> i32 {
        self.0.get()
    }

    pub fn is_complete(&self) -> bool {
        self.0.is_min()
    }

    pub fn is_untouched(&self) -> bool {
        self.0.is_max()
    }
}

impl Default for CaptureProgress {
    fn default() -> Self {
        Self::full()
    }
}

impl From<i32> for CaptureProgress {
    fn from(value: i32) -> Self {
        CaptureProgress::new(value)
    }
}

impl From<CaptureProgress> for i32 {
    fn from(value: CaptureProgress) -> i32 {
        value.get()
    }
}
