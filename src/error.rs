use thiserror::Error;

/// Reasons a maze definition is refused at load time.
#[derive(Error, Debug)]
pub enum MazeError {
    #[error("failed to read maze file: {0}")]
    Io(#[from] std::io::Error),
    #[error("maze header is missing the {0} line")]
    MissingHeader(&'static str),
    #[error("line {line}: `{value}` is not a valid {field}")]
    InvalidDimension {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("maze is {rows}x{cols}, the limit is {max} per side")]
    DimensionTooLarge { rows: usize, cols: usize, max: usize },
    #[error("maze has {open} open cells, the limit is {max}")]
    TooManyOpenCells { open: usize, max: usize },
    #[error("header declares {declared} rows but {actual} were found")]
    RowCountMismatch { declared: usize, actual: usize },
    #[error("row {row} has {actual} cells, header declares {declared}")]
    RowLengthMismatch {
        row: usize,
        declared: usize,
        actual: usize,
    },
    #[error("unknown tile `{glyph}` at row {row}, column {col}")]
    UnknownTile { row: usize, col: usize, glyph: char },
    #[error("maze has no player spawn `P`")]
    MissingPlayerSpawn,
    #[error("second player spawn at row {row}, column {col}")]
    DuplicatePlayerSpawn { row: usize, col: usize },
}
