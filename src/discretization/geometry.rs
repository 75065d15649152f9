//! One-off geometric preprocessing of cells and faces.
//!
//! For every face the area vector `S n` is split into an orthogonal part
//! `E e` along the cell connecting line and a cross-diffusion remainder
//! `T = S n - E e` (over-relaxed decomposition).

use super::GeometryError;
use super::mesh::Mesh;
use glam::DVec2;
use tracing::warn;

/// Fill in all cell and face geometry of a freshly built topology.
pub(crate) fn precompute(mesh: &mut Mesh) -> Result<(), GeometryError> {
    cell_geometry(mesh)?;
    face_geometry(mesh)
}

fn cell_geometry(mesh: &mut Mesh) -> Result<(), GeometryError> {
    for cell in mesh.cells.iter_mut() {
        let [a, b, c] = cell.node_ids.map(|n| mesh.nodes[n].position);
        let area = 0.5 * (b - a).perp_dot(c - a);
        if !(area > 0.0 && area.is_finite()) {
            return Err(GeometryError::DegenerateCell {
                cell: cell.id,
                area,
            });
        }
        cell.centroid = (a + b + c) / 3.0;
        cell.volume = area;
    }
    Ok(())
}

fn face_geometry(mesh: &mut Mesh) -> Result<(), GeometryError> {
    let mut reoriented = 0usize;

    for (face_id, face) in mesh.faces.iter_mut().enumerate() {
        let p1 = mesh.nodes[face.node_ids[0]].position;
        let p2 = mesh.nodes[face.node_ids[1]].position;
        let edge = p2 - p1;
        let length = edge.length();
        if !(length > 0.0 && length.is_finite()) {
            return Err(GeometryError::DegenerateFace { face: face_id });
        }

        face.centroid = 0.5 * (p1 + p2);
        face.area = length;
        face.tangent = edge / length;
        face.normal = DVec2::new(face.tangent.y, -face.tangent.x);

        let owner = &mesh.cells[face.owner()];
        let connecting = match face.neighbor_cell_ids.1 {
            Some(n) => mesh.cells[n].centroid - owner.centroid,
            None => face.centroid - owner.centroid,
        };

        let alignment = face.normal.dot(connecting);
        if alignment == 0.0 || !alignment.is_finite() {
            return Err(GeometryError::OrthogonalConnection { face: face_id });
        }
        if alignment < 0.0 {
            face.node_ids.swap(0, 1);
            face.tangent = -face.tangent;
            face.normal = -face.normal;
            reoriented += 1;
        }

        face.distance = connecting.length();
        face.direction = connecting / face.distance;

        let s = face.area_vector();
        face.ortho_coeff = s.dot(s) / s.dot(face.direction);
        face.cross_diffusion = s - face.direction * face.ortho_coeff;
        face.normal_distance = (face.direction * face.distance).dot(face.normal);

        let v1 = owner.volume;
        let v2 = face.neighbor_cell_ids.1.map_or(v1, |n| mesh.cells[n].volume);
        face.weight = v1 / (v1 + v2);
    }

    if reoriented > 0 {
        warn!(reoriented, "Flipped faces whose normal pointed into the owner cell");
    }
    Ok(())
}

/// Signed sum of the area vectors around a cell; zero for a closed polygon.
pub fn surface_closure(mesh: &Mesh, cell: usize) -> DVec2 {
    let cell = &mesh.cells[cell];
    cell.face_ids
        .iter()
        .zip(cell.face_signs)
        .map(|(&f, sign)| mesh.faces[f].area_vector() * sign)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::MeshError;
    use crate::discretization::mesh::{FaceKind, MeshInput};
    use approx::assert_abs_diff_eq;

    fn skewed_pair() -> MeshInput {
        MeshInput {
            nodes: vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(2.0, 0.0),
                DVec2::new(2.5, 1.0),
                DVec2::new(0.3, 1.4),
            ],
            boundary_edges: vec![
                (FaceKind::Wall, [0, 1]),
                (FaceKind::Outlet, [1, 2]),
                (FaceKind::Wall, [2, 3]),
                (FaceKind::Inlet, [3, 0]),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    #[test]
    fn cell_area_and_centroid() {
        let mesh = Mesh::from_input(&skewed_pair()).unwrap();
        let cell = &mesh.cells[0];
        assert_abs_diff_eq!(cell.volume, 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(cell.centroid.x, 4.5 / 3.0, epsilon = 1e-14);
        assert_abs_diff_eq!(cell.centroid.y, 1.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn normals_point_out_of_the_owner() {
        let mesh = Mesh::from_input(&skewed_pair()).unwrap();
        for face in &mesh.faces {
            let owner = mesh.cells[face.owner()].centroid;
            assert!(face.normal.dot(face.centroid - owner) > 0.0);
            assert_abs_diff_eq!(face.normal.length(), 1.0, epsilon = 1e-14);
            assert_abs_diff_eq!(face.normal.dot(face.tangent), 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn decomposition_reassembles_the_area_vector() {
        let mesh = Mesh::from_input(&skewed_pair()).unwrap();
        for face in &mesh.faces {
            let rebuilt = face.direction * face.ortho_coeff + face.cross_diffusion;
            assert_abs_diff_eq!(rebuilt.x, face.area_vector().x, epsilon = 1e-12);
            assert_abs_diff_eq!(rebuilt.y, face.area_vector().y, epsilon = 1e-12);
            assert!(face.ortho_coeff >= face.area - 1e-12);
            assert!(face.normal_distance > 0.0);
        }
    }

    #[test]
    fn closed_polygon_identity() {
        let mesh = Mesh::from_input(&skewed_pair()).unwrap();
        for c in 0..mesh.num_cells() {
            let sum = surface_closure(&mesh, c);
            assert_abs_diff_eq!(sum.x, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(sum.y, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn weights_are_volume_fractions() {
        let mesh = Mesh::from_input(&skewed_pair()).unwrap();
        let diagonal = mesh.faces.iter().find(|f| f.kind == FaceKind::Interior).unwrap();
        let (a, b) = (mesh.cells[0].volume, mesh.cells[1].volume);
        assert_abs_diff_eq!(diagonal.weight, a / (a + b), epsilon = 1e-14);
        for face in &mesh.faces {
            assert!(face.weight > 0.0 && face.weight < 1.0);
        }
    }

    #[test]
    fn inward_boundary_edge_is_flipped() {
        let mut input = skewed_pair();
        input.boundary_edges[1] = (FaceKind::Outlet, [2, 1]);
        let mesh = Mesh::from_input(&input).unwrap();
        let outlet = mesh.faces.iter().find(|f| f.kind == FaceKind::Outlet).unwrap();
        assert_eq!(outlet.node_ids, [1, 2]);
        assert!(outlet.normal.x > 0.0);
    }

    #[test]
    fn clockwise_triangle_is_rejected() {
        let mut input = skewed_pair();
        input.triangles[0] = [0, 2, 1];
        let err = Mesh::from_input(&input).err().unwrap();
        assert!(matches!(
            err,
            MeshError::Geometry(GeometryError::DegenerateCell { cell: 0, .. })
        ));
    }
}
