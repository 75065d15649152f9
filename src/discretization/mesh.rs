use super::geometry;
use super::{MeshError, MeshFormatError};
use glam::DVec2;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info};

/// Class of a face. Boundary classes come from the mesh markers, every
/// other edge discovered while scanning the triangles is `Interior`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceKind {
    Wall,
    Body,
    Inlet,
    Outlet,
    Interior,
}

impl FaceKind {
    /// Boundary classes in the order their faces are stored.
    pub const BOUNDARY: [FaceKind; 4] = [
        FaceKind::Wall,
        FaceKind::Body,
        FaceKind::Inlet,
        FaceKind::Outlet,
    ];

    pub fn from_marker(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "WALL" => Some(FaceKind::Wall),
            "BODY" => Some(FaceKind::Body),
            "INLET" => Some(FaceKind::Inlet),
            "OUTLET" => Some(FaceKind::Outlet),
            _ => None,
        }
    }

    pub fn is_boundary(self) -> bool {
        self != FaceKind::Interior
    }
}

/// Raw connectivity as it comes out of a mesh file or a generator.
/// Boundary edges must already be oriented so that their normal points out
/// of the domain (body edges reversed with respect to the file).
#[derive(Clone, Debug, Default)]
pub struct MeshInput {
    pub nodes: Vec<DVec2>,
    pub boundary_edges: Vec<(FaceKind, [usize; 2])>,
    pub triangles: Vec<[usize; 3]>,
}

/// The complete computational grid.
pub struct Mesh {
    pub cells: Vec<Cell>,
    pub faces: Vec<Face>,
    pub nodes: Vec<Node>,
}

/// A single triangular control volume.
pub struct Cell {
    pub id: usize,
    pub node_ids: [usize; 3],
    pub face_ids: [usize; 3],
    /// +1 where this cell is the first owner of the face (the stored normal
    /// points out of it), -1 where it is the second owner.
    pub face_signs: [f64; 3],
    /// Cell across each local face, `None` on the boundary.
    pub neighbor_ids: [Option<usize>; 3],
    pub volume: f64,
    pub centroid: DVec2,
}

/// An edge of the triangulation together with its precomputed geometry.
pub struct Face {
    pub node_ids: [usize; 2],
    pub kind: FaceKind,
    /// Tuple of (owner, optional neighbour). `None` indicates a boundary face.
    pub neighbor_cell_ids: (usize, Option<usize>),
    pub centroid: DVec2,
    /// Edge length, the face "area" of a 2-D mesh.
    pub area: f64,
    /// Unit normal pointing out of the owner.
    pub normal: DVec2,
    pub tangent: DVec2,
    /// Owner-to-neighbour distance (owner-to-face on the boundary).
    pub distance: f64,
    /// Unit vector along the connecting line.
    pub direction: DVec2,
    /// Orthogonal part of the area vector, `|S|^2 / (S . e)`.
    pub ortho_coeff: f64,
    /// Non-orthogonal remainder `S - E e`.
    pub cross_diffusion: DVec2,
    /// Connecting vector projected on the normal.
    pub normal_distance: f64,
    /// Owner volume fraction `V1 / (V1 + V2)`.
    pub weight: f64,
}

pub struct Node {
    pub position: DVec2,
}

impl Face {
    fn new(node_ids: [usize; 2], kind: FaceKind, owner: usize, neighbor: Option<usize>) -> Self {
        Self {
            node_ids,
            kind,
            neighbor_cell_ids: (owner, neighbor),
            centroid: DVec2::ZERO,
            area: 0.0,
            normal: DVec2::ZERO,
            tangent: DVec2::ZERO,
            distance: 0.0,
            direction: DVec2::ZERO,
            ortho_coeff: 0.0,
            cross_diffusion: DVec2::ZERO,
            normal_distance: 0.0,
            weight: 0.5,
        }
    }

    #[inline]
    pub fn owner(&self) -> usize {
        self.neighbor_cell_ids.0
    }

    /// Second owner, or the owner itself on the boundary.
    #[inline]
    pub fn far_cell(&self) -> usize {
        self.neighbor_cell_ids.1.unwrap_or(self.neighbor_cell_ids.0)
    }

    /// Area-scaled normal `S n`.
    #[inline]
    pub fn area_vector(&self) -> DVec2 {
        self.normal * self.area
    }

    /// Weighted average of a cell quantity onto this face.
    #[inline]
    pub fn interpolate(&self, owner_value: f64, far_value: f64) -> f64 {
        self.weight * far_value + (1.0 - self.weight) * owner_value
    }

    #[inline]
    pub fn interpolate_vec(&self, owner_value: DVec2, far_value: DVec2) -> DVec2 {
        far_value * self.weight + owner_value * (1.0 - self.weight)
    }
}

#[derive(Default)]
struct EdgeOwners {
    first: Option<usize>,
    second: Option<usize>,
}

impl Mesh {
    /// Build topology and geometry from raw connectivity.
    ///
    /// Boundary faces are stored first, grouped wall, body, inlet, outlet,
    /// followed by interior faces in the order the triangle scan finds them.
    pub fn from_input(input: &MeshInput) -> Result<Self, MeshError> {
        let node_count = input.nodes.len();
        let check = |index: usize| -> Result<(), MeshFormatError> {
            if index < node_count {
                Ok(())
            } else {
                Err(MeshFormatError::NodeOutOfRange {
                    index,
                    count: node_count,
                })
            }
        };
        for (_, edge) in &input.boundary_edges {
            edge.iter().try_for_each(|&n| check(n))?;
        }
        for tri in &input.triangles {
            tri.iter().try_for_each(|&n| check(n))?;
        }

        let mut face_nodes: Vec<[usize; 2]> = Vec::new();
        let mut face_kinds: Vec<FaceKind> = Vec::new();
        let mut lookup: HashMap<(usize, usize), usize> = HashMap::new();

        for kind in FaceKind::BOUNDARY {
            for (_, edge) in input.boundary_edges.iter().filter(|(k, _)| *k == kind) {
                match lookup.entry(edge_key(edge[0], edge[1])) {
                    Entry::Occupied(_) => {
                        return Err(MeshFormatError::DuplicateBoundaryEdge(edge[0], edge[1]).into());
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(face_nodes.len());
                    }
                }
                face_nodes.push(*edge);
                face_kinds.push(kind);
            }
        }
        let boundary_count = face_nodes.len();

        let mut owners: Vec<EdgeOwners> =
            (0..boundary_count).map(|_| EdgeOwners::default()).collect();
        let mut cell_faces: Vec<[usize; 3]> = Vec::with_capacity(input.triangles.len());

        for (cell_id, tri) in input.triangles.iter().enumerate() {
            let mut local = [0usize; 3];
            for (j, (a, b)) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
                .into_iter()
                .enumerate()
            {
                let face_id = *lookup.entry(edge_key(a, b)).or_insert_with(|| {
                    face_nodes.push([a, b]);
                    face_kinds.push(FaceKind::Interior);
                    owners.push(EdgeOwners::default());
                    face_nodes.len() - 1
                });

                let slot = &mut owners[face_id];
                if slot.first.is_none() {
                    slot.first = Some(cell_id);
                } else if slot.second.is_none() {
                    slot.second = Some(cell_id);
                } else {
                    return Err(MeshFormatError::NonManifoldEdge(a, b).into());
                }
                local[j] = face_id;
            }
            cell_faces.push(local);
        }

        let mut faces = Vec::with_capacity(face_nodes.len());
        for (face_id, (nodes, kind)) in face_nodes.iter().zip(&face_kinds).enumerate() {
            let [a, b] = *nodes;
            let face = match (owners[face_id].first, owners[face_id].second, kind.is_boundary()) {
                (None, _, _) => return Err(MeshFormatError::OrphanBoundaryEdge(a, b).into()),
                (Some(_), Some(_), true) => {
                    return Err(MeshFormatError::InteriorBoundaryEdge(a, b).into());
                }
                (Some(_), None, false) => {
                    return Err(MeshFormatError::UntaggedBoundaryEdge(a, b).into());
                }
                (Some(owner), neighbor, _) => Face::new(*nodes, *kind, owner, neighbor),
            };
            faces.push(face);
        }

        let cells = input
            .triangles
            .iter()
            .zip(&cell_faces)
            .enumerate()
            .map(|(id, (tri, face_ids))| {
                let mut face_signs = [1.0; 3];
                let mut neighbor_ids = [None; 3];
                for (j, &f) in face_ids.iter().enumerate() {
                    let (first, second) = faces[f].neighbor_cell_ids;
                    if first == id {
                        neighbor_ids[j] = second;
                    } else {
                        face_signs[j] = -1.0;
                        neighbor_ids[j] = Some(first);
                    }
                }
                Cell {
                    id,
                    node_ids: *tri,
                    face_ids: *face_ids,
                    face_signs,
                    neighbor_ids,
                    volume: 0.0,
                    centroid: DVec2::ZERO,
                }
            })
            .collect();

        let nodes = input
            .nodes
            .iter()
            .map(|&position| Node { position })
            .collect();

        let mut mesh = Mesh {
            cells,
            faces,
            nodes,
        };
        debug!(
            boundary_faces = boundary_count,
            interior_faces = mesh.faces.len() - boundary_count,
            "Topology built"
        );

        geometry::precompute(&mut mesh)?;

        info!(
            nodes = mesh.nodes.len(),
            cells = mesh.cells.len(),
            faces = mesh.faces.len(),
            wall = mesh.count_faces(FaceKind::Wall),
            body = mesh.count_faces(FaceKind::Body),
            inlet = mesh.count_faces(FaceKind::Inlet),
            outlet = mesh.count_faces(FaceKind::Outlet),
            "Mesh ready"
        );
        Ok(mesh)
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn count_faces(&self, kind: FaceKind) -> usize {
        self.faces.iter().filter(|f| f.kind == kind).count()
    }

    /// Ids of all faces of the given class.
    pub fn faces_of_kind(&self, kind: FaceKind) -> impl Iterator<Item = usize> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.kind == kind)
            .map(|(i, _)| i)
    }

    /// A boundary cell has at least one boundary face.
    pub fn is_boundary_cell(&self, cell: usize) -> bool {
        self.cells[cell]
            .face_ids
            .iter()
            .any(|&f| self.faces[f].kind.is_boundary())
    }

    pub fn boundary_cells(&self) -> Vec<usize> {
        (0..self.cells.len())
            .filter(|&c| self.is_boundary_cell(c))
            .collect()
    }

    pub fn interior_cells(&self) -> Vec<usize> {
        (0..self.cells.len())
            .filter(|&c| !self.is_boundary_cell(c))
            .collect()
    }

    /// Smallest and largest centroid-to-centroid distance over interior faces.
    pub fn spacing(&self) -> Option<(f64, f64)> {
        self.faces
            .iter()
            .filter(|f| f.kind == FaceKind::Interior)
            .map(|f| f.distance)
            .fold(None, |acc, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }

    pub fn total_area(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }
}

#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}
