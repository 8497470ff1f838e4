//! Grid layout inference from a set of holes

use crate::domain::{AspectRatio, CellLayout, Hole, LayoutDescriptor};

/// Holes whose top edges differ by less than this belong to the same row
pub const ROW_TOLERANCE_PX: u32 = 20;

/// Infer aspect ratio and `COLSxROWS` grid shape from template holes.
///
/// The aspect ratio comes from the largest hole (first one in reading order
/// on ties). Rows are clustered on the `y` of each row's first member, and the
/// column count is the rounded average, so the result is only exact for grids
/// where every row holds the same number of holes. Returns `None` for an
/// empty slice.
pub fn infer_layout(holes: &[Hole]) -> Option<LayoutDescriptor> {
    let mut sorted = holes.to_vec();
    sorted.sort_by_key(|hole| (hole.y, hole.x));

    let largest = sorted.iter().rev().max_by_key(|hole| hole.area())?;
    let aspect_ratio = AspectRatio::reduced(largest.w, largest.h)?;

    let mut row_starts: Vec<u32> = Vec::new();
    for hole in &sorted {
        let joins_row = row_starts
            .iter()
            .any(|&row_y| hole.y.abs_diff(row_y) < ROW_TOLERANCE_PX);
        if !joins_row {
            row_starts.push(hole.y);
        }
    }

    let rows = row_starts.len() as u32;
    // Ties round to even
    let cols = (sorted.len() as f64 / rows as f64).round_ties_even() as u32;
    let cell_layout = CellLayout::new(cols, rows)?;

    Some(LayoutDescriptor {
        aspect_ratio,
        cell_layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cols: u32, rows: u32, w: u32, h: u32, gap: u32) -> Vec<Hole> {
        let mut holes = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                holes.push(Hole::new(10 + c * (w + gap), 10 + r * (h + gap), w, h));
            }
        }
        holes
    }

    #[test]
    fn test_clean_three_by_two_grid() {
        let mut holes = grid(3, 2, 300, 200, 30);
        holes.reverse();

        let layout = infer_layout(&holes).unwrap();
        assert_eq!(layout.aspect_ratio.to_string(), "3:2");
        assert_eq!(layout.cell_layout.to_string(), "3x2");
    }

    #[test]
    fn test_vertical_strip() {
        let holes = grid(1, 4, 480, 360, 30);
        let layout = infer_layout(&holes).unwrap();
        assert_eq!(layout.aspect_ratio.to_string(), "4:3");
        assert_eq!(layout.cell_layout.to_string(), "1x4");
    }

    #[test]
    fn test_jitter_within_tolerance_is_one_row() {
        let holes = vec![
            Hole::new(0, 100, 50, 50),
            Hole::new(60, 112, 50, 50),
            Hole::new(120, 95, 50, 50),
        ];
        let layout = infer_layout(&holes).unwrap();
        assert_eq!(layout.cell_layout.to_string(), "3x1");
    }

    #[test]
    fn test_largest_hole_sets_aspect_ratio() {
        let holes = vec![Hole::new(0, 0, 100, 100), Hole::new(200, 0, 400, 300)];
        let layout = infer_layout(&holes).unwrap();
        assert_eq!(layout.aspect_ratio.to_string(), "4:3");
    }

    #[test]
    fn test_jagged_grid_rounds_column_count() {
        // 3 holes on top, 2 below: 5 / 2 = 2.5 rounds to 2
        let holes = vec![
            Hole::new(0, 0, 50, 50),
            Hole::new(60, 0, 50, 50),
            Hole::new(120, 0, 50, 50),
            Hole::new(0, 100, 50, 50),
            Hole::new(60, 100, 50, 50),
        ];
        let layout = infer_layout(&holes).unwrap();
        assert_eq!(layout.cell_layout.to_string(), "2x2");
    }

    #[test]
    fn test_empty_input() {
        assert!(infer_layout(&[]).is_none());
    }
}
