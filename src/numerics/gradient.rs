//! Green-Gauss cell gradients and corrected face gradients.

use crate::discretization::mesh::Mesh;
use glam::DVec2;
use nalgebra::DVector;

/// Weighted average of cell values onto every face. Boundary faces take the
/// owner value.
pub fn interpolate_to_faces(mesh: &Mesh, cell_values: &DVector<f64>) -> DVector<f64> {
    DVector::from_fn(mesh.num_faces(), |f, _| {
        let face = &mesh.faces[f];
        face.interpolate(cell_values[face.owner()], cell_values[face.far_cell()])
    })
}

/// `grad phi_C = (1 / V_C) sum_f phi_f (s_f n_f) S_f` over the three faces.
pub fn cell_gradients(mesh: &Mesh, face_values: &DVector<f64>) -> Vec<DVec2> {
    mesh.cells
        .iter()
        .map(|cell| {
            let flux: DVec2 = cell
                .face_ids
                .iter()
                .zip(cell.face_signs)
                .map(|(&f, sign)| mesh.faces[f].area_vector() * (sign * face_values[f]))
                .sum();
            flux / cell.volume
        })
        .collect()
}

/// Face gradients. Interior faces average the two cell gradients and
/// replace the component along the connecting line by the finite difference
/// of the cell values; boundary faces use the one-sided difference between
/// face and owner value along that line.
pub fn face_gradients(
    mesh: &Mesh,
    cell_values: &DVector<f64>,
    face_values: &DVector<f64>,
    cell_grads: &[DVec2],
) -> Vec<DVec2> {
    mesh.faces
        .iter()
        .enumerate()
        .map(|(f, face)| {
            let owner = face.owner();
            let e = face.direction;
            match face.neighbor_cell_ids.1 {
                Some(neighbour) => {
                    let average = face.interpolate_vec(cell_grads[owner], cell_grads[neighbour]);
                    let difference = (cell_values[neighbour] - cell_values[owner]) / face.distance;
                    average + e * (difference - average.dot(e))
                }
                None => e * ((face_values[f] - cell_values[owner]) / face.distance),
            }
        })
        .collect()
}
