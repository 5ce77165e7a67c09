/// A pixel coordinate in frame space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned box given by its top-left corner and size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest box that covers every point. `None` for an empty slice.
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Row just past the box, the `y + h` of the classic bounding rect.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_is_inclusive() {
        let points = [Point::new(3, 4), Point::new(7, 4), Point::new(5, 9)];
        let rect = Rect::bounding(&points).unwrap();
        assert_eq!(rect, Rect::new(3, 4, 5, 6));
        assert_eq!(rect.bottom(), 10);
        assert_eq!(rect.area(), 30);
    }

    #[test]
    fn single_point_has_unit_box() {
        assert_eq!(Rect::bounding(&[Point::new(2, 2)]), Some(Rect::new(2, 2, 1, 1)));
        assert_eq!(Rect::bounding(&[]), None);
    }
}
