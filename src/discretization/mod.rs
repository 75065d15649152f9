pub mod generator;
pub mod geometry;
pub mod mesh;
pub mod su2;

use thiserror::Error;

/// Problems with the textual mesh description or its connectivity.
#[derive(Debug, Error)]
pub enum MeshFormatError {
    #[error("required section `{0}` is missing")]
    MissingSection(&'static str),
    #[error("line {line}: cannot read `{token}` as a number")]
    InvalidNumber { line: usize, token: String },
    #[error("section `{section}` ends before all {expected} records were read")]
    UnexpectedEof { section: String, expected: usize },
    #[error("line {line}: mesh dimension {dim} is not supported, expected 2")]
    UnsupportedDimension { line: usize, dim: usize },
    #[error("line {line}: element type {kind} is not supported in `{section}`")]
    UnsupportedElement {
        line: usize,
        kind: usize,
        section: String,
    },
    #[error("unknown boundary marker `{0}` (expected WALL, BODY, INLET or OUTLET)")]
    UnknownMarker(String),
    #[error("node index {index} is out of range ({count} nodes)")]
    NodeOutOfRange { index: usize, count: usize },
    #[error("boundary edge ({0}, {1}) appears more than once")]
    DuplicateBoundaryEdge(usize, usize),
    #[error("boundary edge ({0}, {1}) is not an edge of any triangle")]
    OrphanBoundaryEdge(usize, usize),
    #[error("boundary edge ({0}, {1}) is shared by two triangles")]
    InteriorBoundaryEdge(usize, usize),
    #[error("edge ({0}, {1}) lies on the domain boundary but carries no marker")]
    UntaggedBoundaryEdge(usize, usize),
    #[error("edge ({0}, {1}) is shared by more than two triangles")]
    NonManifoldEdge(usize, usize),
}

/// Geometry that cannot be discretised.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("cell {cell} has non-positive signed area {area:.3e} (degenerate or clockwise)")]
    DegenerateCell { cell: usize, area: f64 },
    #[error("face {face} has zero length")]
    DegenerateFace { face: usize },
    #[error("face {face}: normal is orthogonal to the cell connecting vector")]
    OrthogonalConnection { face: usize },
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("malformed mesh: {0}")]
    Format(#[from] MeshFormatError),
    #[error("degenerate geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("cannot read mesh file: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_offender() {
        let err = MeshFormatError::NodeOutOfRange { index: 9, count: 4 };
        assert_eq!(format!("{err}"), "node index 9 is out of range (4 nodes)");

        let err: MeshError = GeometryError::DegenerateCell { cell: 3, area: -0.5 }.into();
        assert!(format!("{err}").contains("cell 3"));
    }
}
