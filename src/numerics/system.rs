use crate::discretization::mesh::Mesh;
use nalgebra::DVector;

/// Per-cell linear system on a triangle mesh: one diagonal, three
/// neighbour coefficients (indexed by local face) and a source,
///
/// `aC phi_C + sum_j aF_j phi_F(j) = b_C`.
///
/// Coefficients on boundary faces have no neighbour and are ignored.
#[derive(Clone, Debug)]
pub struct LinearSystem {
    pub diag: DVector<f64>,
    pub off: Vec<[f64; 3]>,
    pub source: DVector<f64>,
}

impl LinearSystem {
    pub fn new(num_cells: usize) -> Self {
        Self {
            diag: DVector::zeros(num_cells),
            off: vec![[0.0; 3]; num_cells],
            source: DVector::zeros(num_cells),
        }
    }

    pub fn len(&self) -> usize {
        self.diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    pub fn reset(&mut self) {
        self.diag.fill(0.0);
        self.source.fill(0.0);
        self.off.iter_mut().for_each(|row| *row = [0.0; 3]);
    }

    #[inline]
    fn neighbour_sum(&self, mesh: &Mesh, cell: usize, phi: &DVector<f64>) -> f64 {
        mesh.cells[cell]
            .neighbor_ids
            .iter()
            .zip(&self.off[cell])
            .filter_map(|(n, a)| n.map(|n| a * phi[n]))
            .sum()
    }

    /// One Jacobi update from `phi`. Rows with a zero diagonal keep their
    /// current value.
    pub fn jacobi(&self, mesh: &Mesh, phi: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.len(), |c, _| {
            let a = self.diag[c];
            if a == 0.0 {
                phi[c]
            } else {
                (self.source[c] - self.neighbour_sum(mesh, c, phi)) / a
            }
        })
    }

    /// One in-place Gauss-Seidel sweep in cell order.
    pub fn gauss_seidel_sweep(&self, mesh: &Mesh, phi: &mut DVector<f64>) {
        for c in 0..self.len() {
            let a = self.diag[c];
            if a == 0.0 {
                continue;
            }
            phi[c] = (self.source[c] - self.neighbour_sum(mesh, c, phi)) / a;
        }
    }

    /// `b - A phi` per cell.
    pub fn residual(&self, mesh: &Mesh, phi: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.len(), |c, _| {
            self.source[c] - self.diag[c] * phi[c] - self.neighbour_sum(mesh, c, phi)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::create_channel_mesh;
    use approx::assert_abs_diff_eq;

    /// Diagonally dominant system built from the mesh graph.
    fn laplacian(mesh: &Mesh) -> LinearSystem {
        let mut system = LinearSystem::new(mesh.num_cells());
        for (c, cell) in mesh.cells.iter().enumerate() {
            for (j, n) in cell.neighbor_ids.iter().enumerate() {
                system.diag[c] += 1.0;
                if n.is_some() {
                    system.off[c][j] = -1.0;
                } else {
                    system.diag[c] += 1.0;
                }
            }
            system.source[c] = 1.0 + c as f64 * 0.1;
        }
        system
    }

    #[test]
    fn gauss_seidel_drives_residual_down() {
        let mesh = create_channel_mesh(2.0, 1.0, 4, 2).unwrap();
        let system = laplacian(&mesh);
        let mut phi = DVector::zeros(mesh.num_cells());
        let start = system.residual(&mesh, &phi).amax();
        for _ in 0..400 {
            system.gauss_seidel_sweep(&mesh, &mut phi);
        }
        assert!(system.residual(&mesh, &phi).amax() < 1e-8 * start);
    }

    #[test]
    fn jacobi_fixed_point_is_the_solution() {
        let mesh = create_channel_mesh(2.0, 1.0, 4, 2).unwrap();
        let system = laplacian(&mesh);
        let mut phi = DVector::zeros(mesh.num_cells());
        for _ in 0..400 {
            system.gauss_seidel_sweep(&mesh, &mut phi);
        }
        let next = system.jacobi(&mesh, &phi);
        for c in 0..phi.len() {
            assert_abs_diff_eq!(next[c], phi[c], epsilon = 1e-9);
        }
    }

    #[test]
    fn zero_diagonal_rows_are_left_alone() {
        let mesh = create_channel_mesh(1.0, 1.0, 1, 1).unwrap();
        let mut system = LinearSystem::new(mesh.num_cells());
        system.source.fill(3.0);
        let mut phi = DVector::from_element(mesh.num_cells(), 7.0);
        system.gauss_seidel_sweep(&mesh, &mut phi);
        assert!(phi.iter().all(|&x| x == 7.0));
        assert_eq!(system.jacobi(&mesh, &phi)[0], 7.0);
    }
}
