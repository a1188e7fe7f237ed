use crate::*;

/// Triangle represented by 3 points (A, B, C).
pub type Tri = [Point3; 3];

/// An indexed triangle mesh, ready for export.
///
/// Vertex ids are **1-based**, assigned in the order points are first seen. Faces reference
/// vertices by id and keep the winding order of the input triangles.
#[derive(Debug, PartialEq, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Mesh {
    /// The _distinct_ points.
    vertices: Vec<Point3>,
    /// Each face is a triplet of 1-based vertex ids.
    faces: Vec<[u32; 3]>,
}

/// Exact coordinate key.
///
/// `-0.0` is folded onto `0.0` so the key agrees with float equality. There is no tolerance, points
/// that differ in any bit otherwise are distinct vertices.
fn key(p: Point3) -> [u64; 3] {
    p.map(|f| (f + 0.0).to_bits())
}

impl Mesh {
    /// Build a mesh from a triangle soup.
    ///
    /// Every triangle must carry exactly 3 points which resolve to 3 distinct vertices, otherwise
    /// the whole build fails with [`GradeError::MalformedTriangle`] and nothing is returned.
    ///
    /// # Example
    /// ```rust
    /// # use pilegrade::*;
    /// let a = [0.0, 0.0, 1.0];
    /// let b = [1.0, 0.0, 1.0];
    /// let c = [1.0, 1.0, 2.0];
    /// let d = [0.0, 1.0, 2.0];
    /// let mesh = Mesh::from_triangles([[a, b, c], [a, c, d]]).unwrap();
    ///
    /// assert_eq!(mesh.vertex_len(), 4);
    /// assert_eq!(mesh.faces(), &[[1, 2, 3], [1, 3, 4]]);
    /// ```
    pub fn from_triangles<I, T>(triangles: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[Point3]>,
    {
        let mut map: HashMap<[u64; 3], u32> = HashMap::default();
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        let mut get_or_add = |p: Point3| {
            *map.entry(key(p)).or_insert_with(|| {
                vertices.push(p);
                vertices.len() as u32
            })
        };

        for (index, tri) in triangles.into_iter().enumerate() {
            let tri = tri.as_ref();
            let malformed = || GradeError::MalformedTriangle {
                index,
                points: tri.to_vec(),
            };

            let &[a, b, c] = tri else {
                return Err(malformed());
            };
            let f = [get_or_add(a), get_or_add(b), get_or_add(c)];
            if f[0] == f[1] || f[1] == f[2] || f[0] == f[2] {
                return Err(malformed());
            }
            faces.push(f);
        }

        log::debug!(
            "built mesh with {} vertices and {} faces",
            vertices.len(),
            faces.len()
        );

        Ok(Self { vertices, faces })
    }

    /// Build a mesh from raw vertices and 1-based faces.
    ///
    /// Faces must reference existing vertices and be non-degenerate.
    pub fn from_raw(vertices: Vec<Point3>, faces: Vec<[u32; 3]>) -> Result<Self> {
        let n = vertices.len() as u32;
        let bad = faces.iter().position(|f| {
            f.iter().any(|&i| i == 0 || i > n) || f[0] == f[1] || f[1] == f[2] || f[0] == f[2]
        });
        match bad {
            Some(index) => Err(GradeError::MalformedTriangle {
                index,
                points: faces[index]
                    .iter()
                    .filter_map(|&i| vertices.get((i as usize).wrapping_sub(1)).copied())
                    .collect(),
            }),
            None => Ok(Self { vertices, faces }),
        }
    }

    pub fn decompose(self) -> (Vec<Point3>, Vec<[u32; 3]>) {
        let Self { vertices, faces } = self;
        (vertices, faces)
    }

    pub fn vertex_len(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Vertices paired with their 1-based id.
    pub fn vertices_with_ids(&self) -> impl ExactSizeIterator<Item = (u32, Point3)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, &p)| (i as u32 + 1, p))
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Get a vertex by its 1-based id.
    pub fn vertex(&self, id: u32) -> Option<Point3> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.vertices.get(i))
            .copied()
    }

    pub fn tris(&self) -> impl ExactSizeIterator<Item = Tri> + '_ {
        let v = |i: u32| self.vertices[i as usize - 1];
        self.faces.iter().map(move |&[a, b, c]| [v(a), v(b), v(c)])
    }

    /// The 3D bounding box as `(min, max)`, `None` if there are no vertices.
    pub fn extents(&self) -> Option<(Point3, Point3)> {
        let mut it = self.vertices.iter().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(min, max), p| {
            (
                [min[0].min(p[0]), min[1].min(p[1]), min[2].min(p[2])],
                [max[0].max(p[0]), max[1].max(p[1]), max[2].max(p[2])],
            )
        }))
    }
}
