// THEORY:
// The `BlobDetector` turns a refined mask into at most one `Blob`. It answers "where is
// the biggest patch of this color, and is it big enough to be the object?"
//
// Algorithm steps:
// 1.  **Hole Filling**: Only a region's outer boundary matters. Background pixels that
//     cannot reach the frame border (4-neighbour flood from the border) are enclosed by
//     some region, so they are folded into the foreground. Anything nested inside a
//     hole merges with its enclosing region.
// 2.  **Region Growing**: The filled mask is scanned in raster order. Every unvisited
//     foreground pixel seeds a new region, which is grown with an iterative 8-neighbour
//     search using a shared `visited` grid so no pixel is claimed twice.
// 3.  **Data Aggregation**: Each region reports its pixel count and its extreme
//     coordinates, which become the bounding box.
// 4.  **Selection**: The largest region wins (the earliest in scan order on ties). If
//     it is not larger than the minimum area it is treated as speckle and rejected.
//
// Like the rest of the spatial layer the detector is stateless: one mask in, one
// answer out, no memory of previous frames.

use crate::core_modules::color_classifier::Mask;
use crate::core_modules::smart_blob::{Blob, BoundingBox, Point};

pub mod blob_detector {
    use super::*;

    /// One externally bounded region of the mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Region {
        pub bounding_box: BoundingBox,
        pub area: u32,
    }

    /// Finds every outer region in the mask, in raster-scan order of their first pixel.
    pub fn find_regions(mask: &Mask) -> Vec<Region> {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let filled = fill_holes(mask);
        let mut visited = vec![false; filled.len()];
        let mut regions = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let index = (y * width + x) as usize;
                if filled[index] && !visited[index] {
                    regions.push(grow_region(
                        Point { x, y },
                        &filled,
                        &mut visited,
                        width,
                        height,
                    ));
                }
            }
        }

        regions
    }

    /// Picks the largest region and accepts it only if its area is above `min_area`.
    pub fn select_blob(mask: &Mask, min_area: u32) -> Option<Blob> {
        let mut largest: Option<Region> = None;
        for region in find_regions(mask) {
            // Strictly greater keeps the first region on ties.
            if largest.is_none_or(|best| region.area > best.area) {
                largest = Some(region);
            }
        }

        let region = largest?;
        if region.area <= min_area {
            tracing::trace!(area = region.area, min_area, "largest region rejected as noise");
            return None;
        }

        Some(Blob {
            bounding_box: region.bounding_box,
            centroid: region.bounding_box.center(),
            area: region.area,
        })
    }

    /// Foreground plus every background pixel the border flood cannot reach.
    fn fill_holes(mask: &Mask) -> Vec<bool> {
        let (width, height) = mask.dimensions();
        let foreground: Vec<bool> = mask.as_raw().iter().map(|&v| v != 0).collect();
        let mut outside = vec![false; foreground.len()];
        let mut queue: Vec<Point> = Vec::new();

        let seed = |x: u32, y: u32, outside: &mut Vec<bool>, queue: &mut Vec<Point>| {
            let index = (y * width + x) as usize;
            if !foreground[index] && !outside[index] {
                outside[index] = true;
                queue.push(Point { x, y });
            }
        };

        for x in 0..width {
            seed(x, 0, &mut outside, &mut queue);
            seed(x, height - 1, &mut outside, &mut queue);
        }
        for y in 0..height {
            seed(0, y, &mut outside, &mut queue);
            seed(width - 1, y, &mut outside, &mut queue);
        }

        while let Some(current) = queue.pop() {
            // Background only connects through the 4 direct neighbours.
            for (dx, dy) in &[(0, 1), (0, -1), (1, 0), (-1, 0)] {
                let nx = current.x as i64 + dx;
                let ny = current.y as i64 + dy;
                if nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64 {
                    seed(nx as u32, ny as u32, &mut outside, &mut queue);
                }
            }
        }

        outside.into_iter().map(|is_outside| !is_outside).collect()
    }

    /// Iterative 8-neighbour search from `seed`, aggregating area and extent.
    fn grow_region(
        seed: Point,
        filled: &[bool],
        visited: &mut [bool],
        width: u32,
        height: u32,
    ) -> Region {
        let mut queue: Vec<Point> = vec![seed];
        visited[(seed.y * width + seed.x) as usize] = true;

        let mut min = seed;
        let mut max = seed;
        let mut area = 0u32;

        while let Some(current) = queue.pop() {
            area += 1;
            min.x = min.x.min(current.x);
            min.y = min.y.min(current.y);
            max.x = max.x.max(current.x);
            max.y = max.y.max(current.y);

            for dy in -1..=1i64 {
                for dx in -1..=1i64 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = current.x as i64 + dx;
                    let ny = current.y as i64 + dy;
                    if nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64 {
                        let index = (ny as u32 * width + nx as u32) as usize;
                        if filled[index] && !visited[index] {
                            visited[index] = true;
                            queue.push(Point {
                                x: nx as u32,
                                y: ny as u32,
                            });
                        }
                    }
                }
            }
        }

        Region {
            bounding_box: BoundingBox::from_corners(min, max),
            area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::blob_detector::*;
    use crate::core_modules::color_classifier::{FOREGROUND, Mask};
    use crate::core_modules::smart_blob::{BoundingBox, Point};
    use image::Luma;

    const MIN_AREA: u32 = 800;

    fn paint(mask: &mut Mask, x0: u32, y0: u32, width: u32, height: u32) {
        for y in y0..y0 + height {
            for x in x0..x0 + width {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    #[test]
    fn empty_mask_has_no_blob() {
        let mask = Mask::new(64, 64);
        assert!(find_regions(&mask).is_empty());
        assert_eq!(select_blob(&mask, MIN_AREA), None);
    }

    #[test]
    fn region_of_799_pixels_is_rejected() {
        let mut mask = Mask::new(200, 200);
        paint(&mut mask, 10, 10, 17, 47); // 799
        assert_eq!(find_regions(&mask)[0].area, 799);
        assert_eq!(select_blob(&mask, MIN_AREA), None);
    }

    #[test]
    fn region_of_801_pixels_is_accepted() {
        let mut mask = Mask::new(200, 200);
        paint(&mut mask, 10, 10, 9, 89); // 801
        let blob = select_blob(&mask, MIN_AREA).expect("801 > 800");
        assert_eq!(blob.area, 801);
        assert_eq!(
            blob.bounding_box,
            BoundingBox { x: 10, y: 10, width: 9, height: 89 }
        );
        assert_eq!(blob.centroid, Point::new(14, 54));
    }

    #[test]
    fn largest_region_wins() {
        let mut mask = Mask::new(300, 200);
        paint(&mut mask, 0, 0, 30, 30); // 900
        paint(&mut mask, 100, 100, 40, 40); // 1600
        let blob = select_blob(&mask, MIN_AREA).expect("large region");
        assert_eq!(blob.area, 1600);
        assert_eq!(blob.centroid, Point::new(120, 120));
    }

    #[test]
    fn ties_go_to_first_region_in_scan_order() {
        let mut mask = Mask::new(300, 200);
        paint(&mut mask, 200, 10, 30, 30);
        paint(&mut mask, 10, 100, 30, 30);
        let blob = select_blob(&mask, MIN_AREA).expect("tie");
        assert_eq!(blob.bounding_box.top_left(), Point::new(200, 10));
    }

    #[test]
    fn diagonal_neighbours_join_one_region() {
        let mut mask = Mask::new(10, 10);
        mask.put_pixel(2, 2, Luma([FOREGROUND]));
        mask.put_pixel(3, 3, Luma([FOREGROUND]));
        mask.put_pixel(4, 4, Luma([FOREGROUND]));
        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 3);
    }

    #[test]
    fn holes_count_toward_the_outer_region() {
        let mut mask = Mask::new(100, 100);
        paint(&mut mask, 10, 10, 40, 40);
        // Hollow out the middle, then put an island inside the hole.
        for y in 20..40 {
            for x in 20..40 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        paint(&mut mask, 28, 28, 4, 4);

        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 1600);
    }

    #[test]
    fn notch_open_to_the_border_is_not_a_hole() {
        let mut mask = Mask::new(50, 50);
        paint(&mut mask, 0, 0, 30, 30);
        for y in 0..10 {
            mask.put_pixel(15, y, Luma([0]));
        }
        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 900 - 10);
    }

    #[test]
    fn selection_is_deterministic() {
        let mut mask = Mask::new(120, 120);
        paint(&mut mask, 5, 5, 35, 35);
        paint(&mut mask, 60, 60, 35, 35);
        assert_eq!(select_blob(&mask, MIN_AREA), select_blob(&mask, MIN_AREA));
    }
}
