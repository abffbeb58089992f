use crate::render::{Material, MeshSource};

/// Geometry of one `usemtl` group, de-indexed: every face corner is its own
/// vertex.
#[derive(Debug, Clone, Default)]
pub struct ObjMesh {
    material: Material,
    positions: Vec<f32>,
    normals: Vec<f32>,
    texcoords: Vec<f32>,
    indices: Vec<u32>,
}

impl ObjMesh {
    pub fn new(material: Material) -> Self {
        Self {
            material,
            ..Self::default()
        }
    }

    pub fn add_vertex(&mut self, position: [f32; 3], normal: [f32; 3], texcoord: [f32; 2]) {
        self.positions.extend_from_slice(&position);
        self.normals.extend_from_slice(&normal);
        self.texcoords.extend_from_slice(&texcoord);
        self.indices.push(self.indices.len() as u32);
    }

    pub fn material_ref(&self) -> &Material {
        &self.material
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn texcoords(&self) -> &[f32] {
        &self.texcoords
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl MeshSource for ObjMesh {
    fn vertex_positions(&self) -> Vec<f32> {
        self.positions.clone()
    }

    fn vertex_indices(&self) -> Vec<u32> {
        self.indices.clone()
    }

    fn vertex_normals(&self) -> Vec<f32> {
        self.normals.clone()
    }

    fn texture_coordinates(&self) -> Vec<f32> {
        self.texcoords.clone()
    }

    fn material(&self) -> Material {
        self.material.clone()
    }
}
