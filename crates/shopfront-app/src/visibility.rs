// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Edge detector for the load-more sentinel at the end of a list.
///
/// The view reports whether the sentinel currently intersects the viewport
/// every time it lays the list out. [`VisibilityTrigger::observe`] fires on a
/// transition into view, and once more after [`VisibilityTrigger::rearm`] if
/// a fresh observation still finds the sentinel in view. A sentinel that
/// stays visible while a fetch is in flight fires nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilityTrigger {
    intersecting: bool,
    rearmed: bool,
}

impl VisibilityTrigger {
    pub const fn new() -> Self {
        Self {
            intersecting: false,
            rearmed: false,
        }
    }

    /// Records a fresh observation. Returns true when the list should be
    /// asked for its next page.
    pub fn observe(&mut self, intersecting: bool) -> bool {
        let entered = intersecting && !self.intersecting;
        let recheck = intersecting && self.rearmed;
        self.intersecting = intersecting;
        self.rearmed = false;
        entered || recheck
    }

    /// Call when a fetch settles; the next observation re-checks visibility
    /// instead of trusting the flag recorded before the list grew.
    pub fn rearm(&mut self) {
        self.rearmed = true;
    }

    /// Forget the last observation, e.g. after the list was replaced.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
