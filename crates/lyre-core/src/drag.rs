//! Progress bar geometry and the scrub-drag flag.

/// Horizontal extent of the progress bar in the host's pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub left: f64,
    pub width: f64,
}

impl BarGeometry {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Map a pointer x to a fraction of the bar, clamped into `[0, 1]`.
    ///
    /// A collapsed bar (zero or non-finite width) maps everything to 0.
    pub fn fraction_at(&self, pointer_x: f64) -> f64 {
        if !self.width.is_finite() || self.width <= 0.0 || !pointer_x.is_finite() {
            return 0.0;
        }
        let offset = (pointer_x - self.left).clamp(0.0, self.width);
        offset / self.width
    }
}

impl Default for BarGeometry {
    /// A bar at the origin one unit wide, so pointer x doubles as a fraction.
    fn default() -> Self {
        Self { left: 0.0, width: 1.0 }
    }
}

/// Clamp an arbitrary seek fraction into `[0, 1]`; NaN becomes 0.
pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Pointer-drag state. Only `begin` arms it; moves while disarmed are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeekDrag {
    dragging: bool,
}

impl SeekDrag {
    pub fn begin(&mut self) {
        self.dragging = true;
    }

    pub fn end(&mut self) {
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
