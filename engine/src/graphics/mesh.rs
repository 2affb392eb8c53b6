//! Mesh data and vertex structures
//!
//! Provides the skinned vertex layout shared by every pipeline and
//! primitive generation functions for common 3D shapes.

use bytemuck::{Pod, Zeroable};

/// Vertex data structure for GPU rendering
///
/// Tightly packed for efficient GPU transfer using bytemuck. Static
/// meshes carry zeroed joint weights; the vertex shader falls back to the
/// plain model matrix for them.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Surface normal vector (normalized)
    pub normal: [f32; 3],
    /// Texture coordinates (UV mapping)
    pub uv: [f32; 2],
    /// Tangent with handedness in w (bitangent = cross(normal, tangent.xyz) * w)
    pub tangent: [f32; 4],
    /// Indices of up to four influencing bones
    pub joints: [u32; 4],
    /// Weights of the influencing bones
    pub weights: [f32; 4],
}

impl Vertex {
    /// Create an unskinned vertex with the given attributes
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: [1.0, 0.0, 0.0, 1.0],
            joints: [0; 4],
            weights: [0.0; 4],
        }
    }

    /// Get the vertex attribute layout for wgpu
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // UV
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // Tangent
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // Joints
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Uint32x4,
                },
                // Weights
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }

    /// Attach a bone influence to the first free weight slot
    ///
    /// Influences past the fourth are dropped, matching the four-weight
    /// vertex layout.
    pub fn add_bone_influence(&mut self, joint: u32, weight: f32) {
        if weight <= 0.0 {
            return;
        }
        for i in 0..4 {
            if self.weights[i] == 0.0 {
                self.joints[i] = joint;
                self.weights[i] = weight;
                return;
            }
        }
    }
}

/// Mesh data: vertices, triangle indices and the material slot they use
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Vertex data for the mesh
    pub vertices: Vec<Vertex>,
    /// Index data for triangle assembly
    pub indices: Vec<u32>,
    /// Index into the owning model's material list
    pub material_index: usize,
}

impl MeshData {
    /// Create a new mesh from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            material_index: 0,
        }
    }

    /// Axis-aligned cube centered at the origin with edge length `size`
    ///
    /// Corners are not shared between faces so each face gets flat
    /// normals and its own UV quad: 24 vertices, 36 indices.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;

        // One entry per face: normal, then the four corners counter-
        // clockwise as seen from outside.
        #[rustfmt::skip]
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0],  [[-h, -h,  h], [ h, -h,  h], [ h,  h,  h], [-h,  h,  h]]),
            ([0.0, 0.0, -1.0], [[ h, -h, -h], [-h, -h, -h], [-h,  h, -h], [ h,  h, -h]]),
            ([0.0, 1.0, 0.0],  [[-h,  h,  h], [ h,  h,  h], [ h,  h, -h], [-h,  h, -h]]),
            ([0.0, -1.0, 0.0], [[-h, -h, -h], [ h, -h, -h], [ h, -h,  h], [-h, -h,  h]]),
            ([1.0, 0.0, 0.0],  [[ h, -h,  h], [ h, -h, -h], [ h,  h, -h], [ h,  h,  h]]),
            ([-1.0, 0.0, 0.0], [[-h, -h, -h], [-h, -h,  h], [-h,  h,  h], [-h,  h, -h]]),
        ];
        const CORNER_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            for (corner, uv) in corners.into_iter().zip(CORNER_UVS) {
                vertices.push(Vertex::new(corner, normal, uv));
            }
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(vertices, indices)
    }

    /// Double-sided quad on the XZ plane, centered at the origin
    pub fn plane(width: f32, depth: f32) -> Self {
        let hw = width * 0.5;
        let hd = depth * 0.5;

        let vertices = vec![
            Vertex::new([-hw, 0.0, -hd], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex::new([hw, 0.0, -hd], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new([hw, 0.0, hd], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex::new([-hw, 0.0, hd], [0.0, 1.0, 0.0], [0.0, 1.0]),
        ];

        // Both winding orders, so the plane is visible from below too
        let indices = vec![0, 1, 2, 0, 2, 3, 0, 2, 1, 0, 3, 2];

        Self::new(vertices, indices)
    }

    /// UV sphere with `sectors` longitude and `stacks` latitude divisions
    ///
    /// Produces `(sectors + 1) * (stacks + 1)` vertices; the seam column
    /// is duplicated so UVs wrap cleanly. Sectors are clamped to at least
    /// 3 and stacks to at least 2.
    pub fn sphere(radius: f32, sectors: u32, stacks: u32) -> Self {
        use std::f32::consts::PI;

        let sectors = sectors.max(3);
        let stacks = stacks.max(2);

        let mut vertices = Vec::with_capacity(((sectors + 1) * (stacks + 1)) as usize);
        for i in 0..=stacks {
            // Latitude from +PI/2 (north pole) down to -PI/2
            let lat = PI / 2.0 - i as f32 * PI / stacks as f32;
            let ring_radius = radius * lat.cos();
            let y = radius * lat.sin();

            for j in 0..=sectors {
                let lon = j as f32 * 2.0 * PI / sectors as f32;
                let position = [ring_radius * lon.cos(), y, ring_radius * lon.sin()];
                let normal = [
                    position[0] / radius,
                    position[1] / radius,
                    position[2] / radius,
                ];
                let uv = [j as f32 / sectors as f32, i as f32 / stacks as f32];
                vertices.push(Vertex::new(position, normal, uv));
            }
        }

        // Counter-clockwise seen from outside, matching the cube winding
        let mut indices = Vec::with_capacity((sectors * stacks * 6) as usize);
        for i in 0..stacks {
            for j in 0..sectors {
                let first = i * (sectors + 1) + j;
                let second = first + sectors + 1;
                indices.extend([first, first + 1, second, second, first + 1, second + 1]);
            }
        }

        Self::new(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        use std::mem;
        // Ensure vertex is tightly packed for GPU: 16 floats + 4 uints
        assert_eq!(mem::size_of::<Vertex>(), 80);
    }

    #[test]
    fn test_mesh_cube_vertices() {
        let cube = MeshData::cube(1.0);
        assert_eq!(cube.vertices.len(), 24); // 6 faces * 4 vertices
        assert_eq!(cube.indices.len(), 36); // 6 faces * 2 triangles * 3 indices
    }

    #[test]
    fn test_mesh_plane() {
        let plane = MeshData::plane(10.0, 10.0);
        assert_eq!(plane.vertices.len(), 4); // 4 corners
        assert_eq!(plane.indices.len(), 12); // 2 faces * 2 triangles * 3 indices

        // Check that all vertices have Y=0 (on XZ plane)
        for vertex in &plane.vertices {
            assert_eq!(vertex.position[1], 0.0);
        }
    }

    #[test]
    fn test_mesh_sphere() {
        let sphere = MeshData::sphere(1.0, 16, 8);
        // Verify we have the expected number of vertices
        assert_eq!(sphere.vertices.len(), (16 + 1) * (8 + 1));
        // Verify we have the expected number of indices
        assert_eq!(sphere.indices.len(), 16 * 8 * 6);
    }

    #[test]
    fn test_cube_normals() {
        let cube = MeshData::cube(2.0);

        // Check that first 4 vertices (front face) have positive Z normal
        for i in 0..4 {
            assert_eq!(cube.vertices[i].normal, [0.0, 0.0, 1.0]);
        }

        // Check that next 4 vertices (back face) have negative Z normal
        for i in 4..8 {
            assert_eq!(cube.vertices[i].normal, [0.0, 0.0, -1.0]);
        }
    }

    #[test]
    fn test_primitives_are_unskinned() {
        let cube = MeshData::cube(1.0);
        for vertex in &cube.vertices {
            assert_eq!(vertex.weights, [0.0; 4]);
        }
    }

    #[test]
    fn test_add_bone_influence_fills_free_slots() {
        let mut vertex = Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]);
        vertex.add_bone_influence(3, 0.5);
        vertex.add_bone_influence(7, 0.5);
        assert_eq!(vertex.joints[0], 3);
        assert_eq!(vertex.weights[0], 0.5);
        assert_eq!(vertex.joints[1], 7);
        assert_eq!(vertex.weights[1], 0.5);

        // A fifth influence is dropped
        vertex.add_bone_influence(9, 0.1);
        vertex.add_bone_influence(10, 0.1);
        vertex.add_bone_influence(11, 0.1);
        assert_eq!(vertex.weights, [0.5, 0.5, 0.1, 0.1]);
    }

    #[test]
    fn test_zero_weight_influence_is_ignored() {
        let mut vertex = Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]);
        vertex.add_bone_influence(3, 0.0);
        assert_eq!(vertex.joints, [0; 4]);
        assert_eq!(vertex.weights, [0.0; 4]);
    }
}
