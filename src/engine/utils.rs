use crate::types::{Cell, ScreenPos};

pub(super) fn manhattan(a: Cell, b: Cell) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

pub(super) fn cell_center(cell: Cell, cell_size: f32) -> ScreenPos {
    ScreenPos {
        x: cell.x as f32 * cell_size + cell_size / 2.0,
        y: cell.y as f32 * cell_size + cell_size / 2.0,
    }
}
