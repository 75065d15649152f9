use super::MeshError;
use super::mesh::{FaceKind, Mesh, MeshInput};
use glam::DVec2;
use std::ops::Range;

/// Rectangular channel `[0, length] x [0, height]` split into `nx` by `ny`
/// quads, each cut into two counter-clockwise triangles. Inflow enters on
/// the left, leaves on the right, top and bottom are walls. An optional
/// block of quads can be cut out to act as an immersed body.
#[derive(Clone, Debug)]
pub struct Channel {
    pub length: f64,
    pub height: f64,
    pub nx: usize,
    pub ny: usize,
    /// Quad index ranges `(i, j)` removed from the grid.
    pub block: Option<(Range<usize>, Range<usize>)>,
}

impl Channel {
    pub fn new(length: f64, height: f64, nx: usize, ny: usize) -> Self {
        Self {
            length,
            height,
            nx,
            ny,
            block: None,
        }
    }

    pub fn with_block(mut self, i: Range<usize>, j: Range<usize>) -> Self {
        self.block = Some((i, j));
        self
    }

    fn node(&self, i: usize, j: usize) -> usize {
        j * (self.nx + 1) + i
    }

    fn is_fluid(&self, i: usize, j: usize) -> bool {
        match &self.block {
            Some((bi, bj)) => !(bi.contains(&i) && bj.contains(&j)),
            None => true,
        }
    }

    /// Class of the edge between quad `(i, j)` and the quad at offset
    /// `(di, dj)`, or `None` when that neighbour is fluid.
    fn edge_kind(&self, i: usize, j: usize, di: isize, dj: isize) -> Option<FaceKind> {
        let ni = i as isize + di;
        let nj = j as isize + dj;
        if ni < 0 {
            Some(FaceKind::Inlet)
        } else if ni >= self.nx as isize {
            Some(FaceKind::Outlet)
        } else if nj < 0 || nj >= self.ny as isize {
            Some(FaceKind::Wall)
        } else if self.is_fluid(ni as usize, nj as usize) {
            None
        } else {
            Some(FaceKind::Body)
        }
    }

    /// Raw connectivity. Boundary edges follow the counter-clockwise edge
    /// order of the quad they bound, so their normals already point out of
    /// the fluid.
    pub fn input(&self) -> MeshInput {
        let dx = self.length / self.nx as f64;
        let dy = self.height / self.ny as f64;

        let mut nodes = Vec::with_capacity((self.nx + 1) * (self.ny + 1));
        for j in 0..=self.ny {
            for i in 0..=self.nx {
                nodes.push(DVec2::new(i as f64 * dx, j as f64 * dy));
            }
        }

        let mut triangles = Vec::with_capacity(2 * self.nx * self.ny);
        let mut boundary_edges = Vec::new();
        for j in 0..self.ny {
            for i in 0..self.nx {
                if !self.is_fluid(i, j) {
                    continue;
                }
                let a = self.node(i, j);
                let b = self.node(i + 1, j);
                let c = self.node(i + 1, j + 1);
                let d = self.node(i, j + 1);
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);

                for (edge, (di, dj)) in [
                    ([a, b], (0, -1)),
                    ([b, c], (1, 0)),
                    ([c, d], (0, 1)),
                    ([d, a], (-1, 0)),
                ] {
                    if let Some(kind) = self.edge_kind(i, j, di, dj) {
                        boundary_edges.push((kind, edge));
                    }
                }
            }
        }

        MeshInput {
            nodes,
            boundary_edges,
            triangles,
        }
    }

    pub fn build(&self) -> Result<Mesh, MeshError> {
        Mesh::from_input(&self.input())
    }
}

/// Unobstructed channel mesh.
pub fn create_channel_mesh(
    length: f64,
    height: f64,
    nx: usize,
    ny: usize,
) -> Result<Mesh, MeshError> {
    Channel::new(length, height, nx, ny).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn counts_match_the_grid() {
        let (nx, ny) = (6, 3);
        let mesh = create_channel_mesh(3.0, 1.0, nx, ny).unwrap();
        assert_eq!(mesh.num_cells(), 2 * nx * ny);
        assert_eq!(mesh.count_faces(FaceKind::Wall), 2 * nx);
        assert_eq!(mesh.count_faces(FaceKind::Inlet), ny);
        assert_eq!(mesh.count_faces(FaceKind::Outlet), ny);
        assert_eq!(mesh.count_faces(FaceKind::Body), 0);
        let edges = nx * (ny + 1) + (nx + 1) * ny + nx * ny;
        assert_eq!(mesh.num_faces(), edges);
        assert_abs_diff_eq!(mesh.total_area(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn boundary_normals_face_outward_without_repair() {
        let channel = Channel::new(2.0, 1.0, 4, 2);
        let input = channel.input();
        let mesh = channel.build().unwrap();
        for f in mesh.faces_of_kind(FaceKind::Inlet) {
            assert_abs_diff_eq!(mesh.faces[f].normal.x, -1.0, epsilon = 1e-14);
        }
        for f in mesh.faces_of_kind(FaceKind::Outlet) {
            assert_abs_diff_eq!(mesh.faces[f].normal.x, 1.0, epsilon = 1e-14);
        }
        for face in mesh.faces.iter().filter(|f| f.kind.is_boundary()) {
            assert!(input.boundary_edges.iter().any(|(_, e)| *e == face.node_ids));
        }
    }

    #[test]
    fn block_becomes_a_body() {
        let channel = Channel::new(4.0, 2.0, 8, 4).with_block(3..5, 1..3);
        let mesh = channel.build().unwrap();
        assert_eq!(mesh.num_cells(), 2 * (8 * 4 - 4));
        assert_eq!(mesh.count_faces(FaceKind::Body), 8);
        assert_abs_diff_eq!(mesh.total_area(), 8.0 - 1.0, epsilon = 1e-12);

        let centre = DVec2::new(2.0, 1.0);
        for f in mesh.faces_of_kind(FaceKind::Body) {
            let face = &mesh.faces[f];
            assert!(face.normal.dot(centre - face.centroid) > 0.0);
        }
    }
}
