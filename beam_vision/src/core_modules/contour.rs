// THEORY:
// The contour finder turns the binary bright-spot mask into discrete light
// sources. It is a stateless utility: one mask in, a list of `Region`s out, no
// memory of previous frames.
//
// Algorithm steps:
// 1.  **Component Labeling**: Foreground pixels are grouped into 8-connected
//     components with an iterative region grow over a `labels` grid. The first
//     pixel of each component in raster order is remembered as its seed.
// 2.  **Outside Detection**: Background reachable from the image border through
//     4-connected steps is "outside". Components that never touch the outside
//     sit inside a hole of another component and are dropped, so only outer
//     borders are reported (a bright ring with a bright dot in its middle is
//     one light source, not two).
// 3.  **Border Tracing**: Each surviving component is walked clockwise along
//     its outer border with Moore-neighbor tracing, starting at the seed and
//     stopping once the walk would repeat its first step.
// 4.  **Measurement**: The traced polygon gives the region's area via the
//     shoelace formula and its bounding box. Polygon area through pixel centers
//     is smaller than the pixel count; a w x h block measures (w-1)(h-1).

use crate::core_modules::color::MASK_OFF;
use crate::core_modules::geometry::{Point, Rect};
use image::GrayImage;

/// A single bright region found in a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Outer border, clockwise, starting at the top-left-most pixel.
    pub contour: Vec<Point>,
    /// Polygon area enclosed by `contour`.
    pub area: f64,
    /// Box around the border points.
    pub bounding_box: Rect,
    /// Foreground pixels in the component.
    pub pixel_count: usize,
}

pub mod contour_finder {
    use super::*;

    /// Clockwise ring of neighbor offsets starting at West (y grows downward).
    const NEIGHBORS: [(i32, i32); 8] = [
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
    ];
    const WEST: usize = 0;
    const UNLABELED: u32 = 0;

    /// Labeled components of a mask. Label `i + 1` belongs to `seeds[i]`.
    struct Components {
        width: i32,
        height: i32,
        labels: Vec<u32>,
        seeds: Vec<Point>,
        sizes: Vec<usize>,
    }

    impl Components {
        fn label_at(&self, x: i32, y: i32) -> u32 {
            if x < 0 || y < 0 || x >= self.width || y >= self.height {
                UNLABELED
            } else {
                self.labels[(y * self.width + x) as usize]
            }
        }
    }

    /// Finds the outer border of every bright region in `mask`.
    pub fn find_external_contours(mask: &GrayImage) -> Vec<Region> {
        // --- 1. Component Labeling ---
        let components = label_components(mask);

        // --- 2. Outside Detection ---
        let external = external_labels(&components);

        // --- 3 & 4. Border Tracing and Measurement ---
        components
            .seeds
            .iter()
            .enumerate()
            .filter(|(i, _)| external[*i])
            .map(|(i, seed)| {
                let label = i as u32 + 1;
                let contour = trace_border(&components, label, *seed, components.sizes[i]);
                let area = polygon_area(&contour);
                // A traced border always holds at least the seed.
                let bounding_box =
                    Rect::bounding(&contour).unwrap_or(Rect::new(seed.x, seed.y, 1, 1));
                Region {
                    contour,
                    area,
                    bounding_box,
                    pixel_count: components.sizes[i],
                }
            })
            .collect()
    }

    fn label_components(mask: &GrayImage) -> Components {
        let (width, height) = (mask.width() as i32, mask.height() as i32);
        let mut labels = vec![UNLABELED; (width * height) as usize];
        let mut seeds = Vec::new();
        let mut sizes = Vec::new();
        let mut stack: Vec<(i32, i32)> = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let index = (y * width + x) as usize;
                let lit = mask.get_pixel(x as u32, y as u32).0[0] != MASK_OFF;
                if labels[index] != UNLABELED || !lit {
                    continue;
                }

                seeds.push(Point::new(x as u32, y as u32));
                let label = seeds.len() as u32;
                let mut size = 0usize;
                labels[index] = label;
                stack.push((x, y));

                while let Some((cx, cy)) = stack.pop() {
                    size += 1;
                    for (dx, dy) in NEIGHBORS {
                        let (nx, ny) = (cx + dx, cy + dy);
                        if nx < 0 || ny < 0 || nx >= width || ny >= height {
                            continue;
                        }
                        let n_index = (ny * width + nx) as usize;
                        if labels[n_index] == UNLABELED
                            && mask.get_pixel(nx as u32, ny as u32).0[0] != MASK_OFF
                        {
                            labels[n_index] = label;
                            stack.push((nx, ny));
                        }
                    }
                }
                sizes.push(size);
            }
        }

        Components {
            width,
            height,
            labels,
            seeds,
            sizes,
        }
    }

    /// Marks which components touch the outside background or the frame edge.
    fn external_labels(components: &Components) -> Vec<bool> {
        let (width, height) = (components.width, components.height);
        let mut external = vec![false; components.seeds.len()];
        let mut outside = vec![false; components.labels.len()];
        let mut stack: Vec<(i32, i32)> = Vec::new();

        // Foreground on the frame edge is external by definition; edge
        // background seeds the outside flood.
        for y in 0..height {
            for x in 0..width {
                if x != 0 && y != 0 && x != width - 1 && y != height - 1 {
                    continue;
                }
                let index = (y * width + x) as usize;
                match components.labels[index] {
                    UNLABELED => {
                        if !outside[index] {
                            outside[index] = true;
                            stack.push((x, y));
                        }
                    }
                    label => external[(label - 1) as usize] = true,
                }
            }
        }

        while let Some((cx, cy)) = stack.pop() {
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (cx + dx, cy + dy);
                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                    continue;
                }
                let index = (ny * width + nx) as usize;
                match components.labels[index] {
                    UNLABELED => {
                        if !outside[index] {
                            outside[index] = true;
                            stack.push((nx, ny));
                        }
                    }
                    label => external[(label - 1) as usize] = true,
                }
            }
        }

        external
    }

    fn direction_of(dx: i32, dy: i32) -> usize {
        NEIGHBORS
            .iter()
            .position(|&offset| offset == (dx, dy))
            .unwrap_or(WEST)
    }

    /// Moore-neighbor tracing of one component's outer border.
    ///
    /// Stops when the walk is back at the seed and about to repeat its first
    /// move, which also terminates on one-pixel-wide shapes.
    fn trace_border(components: &Components, label: u32, seed: Point, size: usize) -> Vec<Point> {
        let start = (seed.x as i32, seed.y as i32);
        let mut contour = vec![seed];
        let mut current = start;
        let mut back_dir = WEST;
        let mut first_move = None;
        // Every border pixel is entered at most once per neighbor direction.
        let max_steps = 8 * size + 8;

        for _ in 0..max_steps {
            let mut next = None;
            for k in 1..=8 {
                let dir = (back_dir + k) % 8;
                let (dx, dy) = NEIGHBORS[dir];
                let candidate = (current.0 + dx, current.1 + dy);
                if components.label_at(candidate.0, candidate.1) == label {
                    let (px, py) = NEIGHBORS[(back_dir + k - 1) % 8];
                    let previous = (current.0 + px, current.1 + py);
                    next = Some((candidate, previous));
                    break;
                }
            }

            // Isolated pixel.
            let Some((candidate, previous)) = next else {
                break;
            };

            match first_move {
                None => first_move = Some(candidate),
                Some(first) if current == start && candidate == first => break,
                Some(_) => {}
            }

            back_dir = direction_of(previous.0 - candidate.0, previous.1 - candidate.1);
            current = candidate;
            contour.push(Point::new(current.0 as u32, current.1 as u32));
        }

        if contour.len() > 1 && contour.last() == Some(&seed) {
            contour.pop();
        }
        contour
    }

    /// Shoelace area of a closed polygon.
    pub fn polygon_area(contour: &[Point]) -> f64 {
        if contour.len() < 3 {
            return 0.0;
        }
        let mut twice_area: i64 = 0;
        for (i, p) in contour.iter().enumerate() {
            let q = contour[(i + 1) % contour.len()];
            twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }
}
