//! Cube geometry description and GPU buffer upload.
//!
//! The cube is described as 6 quads of 4 vertices each. Faces duplicate
//! shared corners so every face carries its own flat normal and its own
//! texture coordinates; index data then stitches each quad into two
//! triangles sharing the 0-2 diagonal.

use wgpu::util::DeviceExt;

pub const VERTEX_COUNT: usize = 24;
pub const INDEX_COUNT: usize = 36;
const FACE_COUNT: usize = 6;

/// Per-face vertex blocks in fixed order: front, back, top, bottom, right,
/// left. Winding is counter-clockwise seen from outside the cube.
const POSITIONS: [[f32; 3]; VERTEX_COUNT] = [
    // Front face
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    // Back face
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    // Top face
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    // Bottom face
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [-1.0, -1.0, 1.0],
    // Right face
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
    // Left face
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
];

/// One outward unit normal per face, same order as `POSITIONS`.
const FACE_NORMALS: [[f32; 3]; FACE_COUNT] = [
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
];

/// Unit-square corners applied identically to every face. This stretches
/// the image across each face and produces visible seams at cube edges;
/// that repetition is the intended mapping.
const FACE_TEX_COORDS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// CPU-side cube description. Deterministic; built once, never mutated.
pub struct CubeGeometry {
    pub positions: [[f32; 3]; VERTEX_COUNT],
    pub normals: [[f32; 3]; VERTEX_COUNT],
    pub tex_coords: [[f32; 2]; VERTEX_COUNT],
    pub indices: [u16; INDEX_COUNT],
}

impl CubeGeometry {
    pub fn new() -> Self {
        let mut normals = [[0.0; 3]; VERTEX_COUNT];
        let mut tex_coords = [[0.0; 2]; VERTEX_COUNT];
        let mut indices = [0u16; INDEX_COUNT];

        for face in 0..FACE_COUNT {
            let base = face * 4;
            for corner in 0..4 {
                normals[base + corner] = FACE_NORMALS[face];
                tex_coords[base + corner] = FACE_TEX_COORDS[corner];
            }

            // Two triangles per quad, sharing the 0-2 diagonal.
            let b = base as u16;
            indices[face * 6..face * 6 + 6].copy_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);
        }

        Self {
            positions: POSITIONS,
            normals,
            tex_coords,
            indices,
        }
    }
}

impl Default for CubeGeometry {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU-resident cube buffers: one vertex buffer per attribute plus the
/// 16-bit index buffer. Static for the process lifetime.
pub struct GeometryBuffers {
    pub position: wgpu::Buffer,
    pub normal: wgpu::Buffer,
    pub tex_coord: wgpu::Buffer,
    pub index: wgpu::Buffer,
}

impl GeometryBuffers {
    pub fn upload(device: &wgpu::Device, geometry: &CubeGeometry) -> Self {
        let vertex_buffer = |label, contents: &[u8]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            })
        };

        Self {
            position: vertex_buffer("tumbler cube positions", bytemuck::cast_slice(&geometry.positions)),
            normal: vertex_buffer("tumbler cube normals", bytemuck::cast_slice(&geometry.normals)),
            tex_coord: vertex_buffer("tumbler cube tex coords", bytemuck::cast_slice(&geometry.tex_coords)),
            index: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tumbler cube indices"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
        }
    }
}
