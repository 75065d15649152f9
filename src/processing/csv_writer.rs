use crate::discretization::mesh::Mesh;
use crate::numerics::solver::IterationRecord;
use crate::physics::state::FlowState;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write equally long columns under a header row.
pub fn write_columns<P: AsRef<Path>>(
    path: P,
    headers: &[&str],
    columns: &[Vec<f64>],
) -> io::Result<()> {
    if headers.len() != columns.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} headers for {} columns",
                headers.len(),
                columns.len()
            ),
        ));
    }
    let rows = columns.first().map_or(0, Vec::len);
    if let Some(bad) = columns.iter().position(|c| c.len() != rows) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("column `{}` has {} rows, expected {rows}", headers[bad], columns[bad].len()),
        ));
    }

    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "{}", headers.join(","))?;
    for i in 0..rows {
        let row: Vec<String> = columns.iter().map(|col| format!("{:.15e}", col[i])).collect();
        writeln!(file, "{}", row.join(","))?;
    }
    file.flush()
}

/// Cell-centred solution: centroid, velocity, pressure and speed per cell.
pub fn write_cell_fields<P: AsRef<Path>>(
    path: P,
    mesh: &Mesh,
    state: &FlowState,
) -> io::Result<()> {
    let x: Vec<f64> = mesh.cells.iter().map(|c| c.centroid.x).collect();
    let y: Vec<f64> = mesh.cells.iter().map(|c| c.centroid.y).collect();
    let speed: Vec<f64> = (0..mesh.num_cells()).map(|c| state.velocity(c).length()).collect();
    write_columns(
        path,
        &["x", "y", "u", "v", "p", "speed"],
        &[
            x,
            y,
            state.u.as_slice().to_vec(),
            state.v.as_slice().to_vec(),
            state.p.as_slice().to_vec(),
            speed,
        ],
    )
}

/// Per-iteration diagnostics of a run.
pub fn write_history<P: AsRef<Path>>(path: P, history: &[IterationRecord]) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "iteration,mass_imbalance,update_norm,pressure_sweeps,pressure_residual")?;
    for r in history {
        writeln!(
            file,
            "{},{:.15e},{:.15e},{},{:.15e}",
            r.iteration, r.mass_imbalance, r.update_norm, r.pressure_sweeps, r.pressure_residual
        )?;
    }
    file.flush()
}

/// Node coordinates and triangle connectivity, for plotting.
pub fn write_mesh<P: AsRef<Path>>(nodes_path: P, cells_path: P, mesh: &Mesh) -> io::Result<()> {
    write_columns(
        nodes_path,
        &["x", "y"],
        &[
            mesh.nodes.iter().map(|n| n.position.x).collect(),
            mesh.nodes.iter().map(|n| n.position.y).collect(),
        ],
    )?;
    let mut file = BufWriter::new(File::create(cells_path)?);
    writeln!(file, "n1,n2,n3")?;
    for cell in &mesh.cells {
        let [a, b, c] = cell.node_ids;
        writeln!(file, "{a},{b},{c}")?;
    }
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::create_channel_mesh;
    use crate::physics::bc::BoundaryConditions;
    use std::fs;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ufvm_csv_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let path = scratch("bad.csv");
        let err = write_columns(&path, &["a", "b"], &[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(write_columns(&path, &["a"], &[vec![1.0], vec![2.0]]).is_err());
    }

    #[test]
    fn cell_fields_have_one_row_per_cell() {
        let mesh = create_channel_mesh(1.0, 1.0, 2, 2).unwrap();
        let state = FlowState::new(&mesh, &BoundaryConditions::channel(1.0));
        let path = scratch("cells.csv");
        write_cell_fields(&path, &mesh, &state).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("x,y,u,v,p,speed"));
        assert_eq!(lines.count(), mesh.num_cells());
        fs::remove_file(path).ok();
    }

    #[test]
    fn history_rows() {
        let history = vec![
            IterationRecord {
                iteration: 0,
                mass_imbalance: -100.0,
                update_norm: 1.0,
                pressure_sweeps: 10,
                pressure_residual: 0.5,
            },
            IterationRecord {
                iteration: 1,
                mass_imbalance: -50.0,
                update_norm: 0.5,
                pressure_sweeps: 10,
                pressure_residual: 0.25,
            },
        ];
        let path = scratch("history.csv");
        write_history(&path, &history).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().nth(2).unwrap().starts_with("1,-5.0"));
        fs::remove_file(path).ok();
    }
}
