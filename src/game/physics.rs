//! Collision predicates shared by movement and projectile resolution

/// Axis-aligned rectangle described by its centre and half extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub half_width: f32,
    pub half_height: f32,
}

impl Rect {
    /// Build from a centre point and full width/height, the way map files store geometry
    pub fn from_center(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.x - self.half_width
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.half_width
    }

    pub fn min_y(&self) -> f32 {
        self.y - self.half_height
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.half_height
    }

    /// Same centre, half extents grown by `by` on every side
    pub fn inflate(&self, by: f32) -> Self {
        Self {
            half_width: self.half_width + by,
            half_height: self.half_height + by,
            ..*self
        }
    }
}

/// Pure geometric predicates, no side effects
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Point inside a rectangle, edges inclusive
    pub fn rect_contains(px: f32, py: f32, rect: &Rect) -> bool {
        px >= rect.min_x() && px <= rect.max_x() && py >= rect.min_y() && py <= rect.max_y()
    }

    /// Open-interval overlap on both axes; touching edges do not count
    pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
        a.min_x() < b.max_x() && a.max_x() > b.min_x() && a.min_y() < b.max_y() && a.max_y() > b.min_y()
    }

    /// Circle against rectangle, approximated as the centre inside the rectangle
    /// inflated by the radius
    pub fn circle_hits_rect(cx: f32, cy: f32, radius: f32, rect: &Rect) -> bool {
        Self::rect_contains(cx, cy, &rect.inflate(radius))
    }

    /// Euclidean distance strictly below the combined radii
    pub fn circles_overlap(x1: f32, y1: f32, radius1: f32, x2: f32, y2: f32, radius2: f32) -> bool {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let combined = radius1 + radius2;
        dx * dx + dy * dy < combined * combined
    }

    /// Clamp a point into `[inset, extent - inset]` on both axes
    pub fn clamp_to_bounds(x: f32, y: f32, width: f32, height: f32, inset: f32) -> (f32, f32) {
        (
            x.max(inset).min(width - inset),
            y.max(inset).min(height - inset),
        )
    }

    /// Whether a point lies within `[0, width] x [0, height]`
    pub fn in_bounds(x: f32, y: f32, width: f32, height: f32) -> bool {
        x >= 0.0 && x <= width && y >= 0.0 && y <= height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_includes_edges() {
        let rect = Rect::from_center(130.0, 100.0, 40.0, 40.0);
        assert!(PhysicsSystem::rect_contains(110.0, 100.0, &rect));
        assert!(PhysicsSystem::rect_contains(150.0, 120.0, &rect));
        assert!(!PhysicsSystem::rect_contains(109.9, 100.0, &rect));
    }

    #[test]
    fn rects_touching_edges_do_not_overlap() {
        let a = Rect::from_center(0.0, 0.0, 20.0, 20.0);
        let b = Rect::from_center(20.0, 0.0, 20.0, 20.0);
        assert!(!PhysicsSystem::rects_overlap(&a, &b));

        let c = Rect::from_center(19.0, 5.0, 20.0, 20.0);
        assert!(PhysicsSystem::rects_overlap(&a, &c));
        assert!(PhysicsSystem::rects_overlap(&c, &a));
    }

    #[test]
    fn player_box_overlap_catches_what_centre_point_misses() {
        let wall = Rect::from_center(130.0, 100.0, 40.0, 40.0);
        let player = Rect::from_center(105.0, 100.0, 20.0, 20.0);
        assert!(!PhysicsSystem::rect_contains(player.x, player.y, &wall));
        assert!(PhysicsSystem::rects_overlap(&player, &wall));
    }

    #[test]
    fn circle_hits_rect_uses_inflated_bounds() {
        let rect = Rect::from_center(100.0, 100.0, 20.0, 20.0);
        assert!(PhysicsSystem::circle_hits_rect(113.0, 100.0, 4.0, &rect));
        assert!(!PhysicsSystem::circle_hits_rect(115.0, 100.0, 4.0, &rect));
    }

    #[test]
    fn circles_overlap_is_strict() {
        assert!(PhysicsSystem::circles_overlap(0.0, 0.0, 4.0, 13.9, 0.0, 10.0));
        assert!(!PhysicsSystem::circles_overlap(0.0, 0.0, 4.0, 14.0, 0.0, 10.0));
    }

    #[test]
    fn clamp_keeps_inset_from_every_edge() {
        assert_eq!(
            PhysicsSystem::clamp_to_bounds(-50.0, 900.0, 800.0, 600.0, 10.0),
            (10.0, 590.0)
        );
        assert_eq!(
            PhysicsSystem::clamp_to_bounds(400.0, 300.0, 800.0, 600.0, 10.0),
            (400.0, 300.0)
        );
    }
}
