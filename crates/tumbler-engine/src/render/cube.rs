//! Cube renderer: program setup once, then one linear pass per frame
//! (clear, transform, bind, draw).

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::error::{RenderError, StageKind};
use crate::geometry::{CubeGeometry, GeometryBuffers, INDEX_COUNT};
use crate::shader::{self, AttributeLocations, ProgramDesc, UniformBindings};
use crate::texture::CubeTexture;

use super::{DEPTH_FORMAT, RenderCtx, RenderTarget};

const VERTEX_SHADER: &str = include_str!("shaders/cube.vert.wgsl");
const FRAGMENT_SHADER: &str = include_str!("shaders/cube.frag.wgsl");

const FOV_Y: f32 = 45.0 * PI / 180.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.0;
const MODEL_OFFSET: Vec3 = Vec3::new(0.0, 0.0, -6.0);
const ROTATION_AXIS: Vec3 = Vec3::new(0.0, -1.0, 1.0);

/// Angular speed in radians per accumulated second. Applied exactly once,
/// when the model-view matrix is built; `AnimationState` stores unscaled
/// time.
const ANGULAR_SPEED: f32 = 0.7;

/// Per-frame mutable rotation state, owned by the loop driver and passed
/// into every `render` call. Advancing with a fixed sequence of deltas is
/// reproducible bit-for-bit.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct AnimationState {
    /// Accumulated unscaled seconds since animation start.
    pub rotation: f32,
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the accumulator by one frame's delta time in seconds.
    pub fn advance(&mut self, dt: f32) {
        self.rotation += dt;
    }
}

pub(crate) fn projection_matrix(aspect: f32) -> Mat4 {
    Mat4::perspective_rh(FOV_Y, aspect, Z_NEAR, Z_FAR)
}

pub(crate) fn model_view_matrix(rotation: f32) -> Mat4 {
    Mat4::from_translation(MODEL_OFFSET)
        * Mat4::from_axis_angle(ROTATION_AXIS.normalize(), rotation * ANGULAR_SPEED)
}

/// Inverse-transpose of the model-view matrix. With only rotation and
/// translation applied this reduces to the rotation itself, but the full
/// form keeps normals correct under any future non-uniform scale.
pub(crate) fn normal_matrix(model_view: Mat4) -> Mat4 {
    model_view.inverse().transpose()
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SceneUniforms {
    projection: [[f32; 4]; 4],
    model_view: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
}

impl SceneUniforms {
    fn new(aspect: f32, rotation: f32) -> Self {
        let model_view = model_view_matrix(rotation);
        Self {
            projection: projection_matrix(aspect).to_cols_array_2d(),
            model_view: model_view.to_cols_array_2d(),
            normal_matrix: normal_matrix(model_view).to_cols_array_2d(),
        }
    }
}

/// Owns the linked cube program, its location tables, geometry buffers,
/// and uniform storage. Construction compiles and links the shader pair;
/// any stage or link failure aborts with the backend diagnostic.
pub struct CubeRenderer {
    pipeline: wgpu::RenderPipeline,
    attributes: AttributeLocations,
    uniforms: UniformBindings,
    bind_group_layout: wgpu::BindGroupLayout,
    scene_ubo: wgpu::Buffer,
    geometry: GeometryBuffers,
    /// Bind group cache keyed by the texture generation that produced it.
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl CubeRenderer {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        let vertex = shader::compile(device, StageKind::Vertex, VERTEX_SHADER)?;
        let fragment = shader::compile(device, StageKind::Fragment, FRAGMENT_SHADER)?;

        let (attributes, uniforms) = shader::resolve_locations(VERTEX_SHADER, FRAGMENT_SHADER);

        let bind_group_layout = create_bind_group_layout(device, &uniforms);

        // One buffer per attribute; slot order matches the set_vertex_buffer
        // calls in `render`.
        let attr_specs = [
            (attributes.position, wgpu::VertexFormat::Float32x3, 12u64),
            (attributes.normal, wgpu::VertexFormat::Float32x3, 12),
            (attributes.tex_coord, wgpu::VertexFormat::Float32x2, 8),
        ];
        let attr_storage: Vec<[wgpu::VertexAttribute; 1]> = attr_specs
            .iter()
            .filter_map(|&(location, format, _)| {
                location.map(|shader_location| {
                    [wgpu::VertexAttribute {
                        format,
                        offset: 0,
                        shader_location,
                    }]
                })
            })
            .collect();
        let layouts: Vec<wgpu::VertexBufferLayout<'_>> = attr_specs
            .iter()
            .filter(|(location, ..)| location.is_some())
            .zip(&attr_storage)
            .map(|(&(_, _, stride), attributes)| wgpu::VertexBufferLayout {
                array_stride: stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let pipeline = shader::link(
            device,
            vertex,
            fragment,
            &ProgramDesc {
                label: "tumbler cube program",
                color_format,
                depth_format: Some(DEPTH_FORMAT),
                vertex_buffers: &layouts,
                bind_group_layouts: &[&bind_group_layout],
            },
        )?;

        let scene_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tumbler scene uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let geometry = GeometryBuffers::upload(device, &CubeGeometry::new());

        Ok(Self {
            pipeline,
            attributes,
            uniforms,
            bind_group_layout,
            scene_ubo,
            geometry,
            bind_group: None,
        })
    }

    /// Renders one frame: clears color (opaque black) and depth (1.0),
    /// uploads the transform chain, binds buffers and the texture, and
    /// issues the indexed draw.
    ///
    /// A zero-area viewport skips the frame entirely, leaving the previous
    /// target contents untouched. A shader variant without a `position`
    /// attribute is a configuration defect and fails every frame.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        state: &AnimationState,
        texture: &CubeTexture,
    ) -> Result<(), RenderError> {
        let Some(aspect) = ctx.viewport.aspect() else {
            return Ok(());
        };

        if self.attributes.position.is_none() {
            return Err(RenderError::MissingAttribute { name: "position" });
        }

        if self.uniforms.scene.is_some() {
            let scene = SceneUniforms::new(aspect, state.rotation);
            ctx.queue
                .write_buffer(&self.scene_ubo, 0, bytemuck::bytes_of(&scene));
        }

        self.ensure_bind_group(ctx.device, texture);

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tumbler cube pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        if let Some((_, bind_group)) = &self.bind_group {
            rpass.set_bind_group(0, bind_group, &[]);
        }

        let mut slot = 0;
        let buffers = [
            (self.attributes.position, &self.geometry.position),
            (self.attributes.normal, &self.geometry.normal),
            (self.attributes.tex_coord, &self.geometry.tex_coord),
        ];
        for (location, buffer) in buffers {
            if location.is_some() {
                rpass.set_vertex_buffer(slot, buffer.slice(..));
                slot += 1;
            }
        }

        rpass.set_index_buffer(self.geometry.index.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..INDEX_COUNT as u32, 0, 0..1);

        Ok(())
    }

    /// Rebuilds the bind group when the texture's backing store changed.
    fn ensure_bind_group(&mut self, device: &wgpu::Device, texture: &CubeTexture) {
        if matches!(&self.bind_group, Some((generation, _)) if *generation == texture.generation())
        {
            return;
        }

        let mut entries = Vec::new();
        if let Some((_, binding)) = self.uniforms.scene {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: self.scene_ubo.as_entire_binding(),
            });
        }
        if let Some((_, binding)) = self.uniforms.texture {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(texture.view()),
            });
        }
        if let Some((_, binding)) = self.uniforms.sampler {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Sampler(texture.sampler()),
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tumbler cube bind group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        self.bind_group = Some((texture.generation(), bind_group));
    }
}

/// Layout entries are emitted only for bindings the program declares, so a
/// shader variant without e.g. a sampler still binds cleanly.
fn create_bind_group_layout(
    device: &wgpu::Device,
    uniforms: &UniformBindings,
) -> wgpu::BindGroupLayout {
    let mut entries = Vec::new();

    if let Some((group, binding)) = uniforms.scene {
        debug_assert_eq!(group, 0, "cube program uses a single bind group");
        entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: std::num::NonZeroU64::new(
                    std::mem::size_of::<SceneUniforms>() as u64
                ),
            },
            count: None,
        });
    }
    if let Some((_, binding)) = uniforms.texture {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
    }
    if let Some((_, binding)) = uniforms.sampler {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tumbler cube bind group layout"),
        entries: &entries,
    })
}
