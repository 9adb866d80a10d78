use super::layout::Rect;

/// Centre a window of the given outer size inside `area`.
pub fn center_in(area: Rect, width: i32, height: i32, border: i32) -> Rect {
    let x = area.x + (area.width - width - 2 * border) / 2;
    let y = area.y + (area.height - height - 2 * border) / 2;
    Rect::new(x.max(area.x), y.max(area.y), width, height)
}

/// Pull a new window back inside `area` when it would start past its
/// right or bottom edge or before its origin.
pub fn clamp_into(area: Rect, geometry: Rect, border: i32) -> Rect {
    let mut placed = geometry;
    let outer = geometry.outer(border);
    if placed.x + outer.width > area.right() {
        placed.x = area.right() - outer.width;
    }
    if placed.y + outer.height > area.bottom() {
        placed.y = area.bottom() - outer.height;
    }
    placed.x = placed.x.max(area.x);
    placed.y = placed.y.max(area.y);
    placed
}

/// Keep a resized window reachable: a window pushed entirely off `bounds`
/// is moved back to the nearest edge.
pub fn keep_reachable(bounds: Rect, geometry: Rect, border: i32) -> Rect {
    let mut placed = geometry;
    let outer = geometry.outer(border);
    if placed.x >= bounds.right() {
        placed.x = bounds.right() - outer.width;
    }
    if placed.y >= bounds.bottom() {
        placed.y = bounds.bottom() - outer.height;
    }
    if placed.x + outer.width <= bounds.x {
        placed.x = bounds.x;
    }
    if placed.y + outer.height <= bounds.y {
        placed.y = bounds.y;
    }
    placed
}

/// Snap an edge coordinate to `target` when within `distance`.
pub fn snap(value: i32, target: i32, distance: i32) -> Option<i32> {
    ((target - value).abs() < distance).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: Rect = Rect::new(0, 20, 1280, 780);

    #[test]
    fn test_center_in() {
        assert_eq!(center_in(AREA, 400, 300, 1), Rect::new(439, 259, 400, 300));
        // larger than the area sticks to its origin
        assert_eq!(center_in(AREA, 2000, 2000, 0), Rect::new(0, 20, 2000, 2000));
    }

    #[test]
    fn test_clamp_into_pulls_back() {
        let placed = clamp_into(AREA, Rect::new(1200, 700, 200, 200), 1);
        assert_eq!(placed, Rect::new(1078, 598, 200, 200));
        let placed = clamp_into(AREA, Rect::new(-50, 0, 100, 100), 1);
        assert_eq!(placed, Rect::new(0, 20, 100, 100));
    }

    #[test]
    fn test_keep_reachable() {
        assert_eq!(keep_reachable(AREA, Rect::new(1300, 40, 100, 100), 0).x, 1180);
        assert_eq!(keep_reachable(AREA, Rect::new(-200, 40, 100, 100), 0).x, 0);
        let inside = Rect::new(10, 40, 100, 100);
        assert_eq!(keep_reachable(AREA, inside, 0), inside);
    }

    #[test]
    fn test_snap() {
        assert_eq!(snap(10, 0, 32), Some(0));
        assert_eq!(snap(40, 0, 32), None);
    }
}
