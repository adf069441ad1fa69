//! Offscreen rendering tests.
//!
//! These render into a headless 64x64 target and read the pixels back.
//! They skip (with a note on stderr) when the host has no usable GPU
//! adapter, e.g. on bare CI runners.

use std::sync::mpsc;

use tumbler_engine::error::{RenderError, StageKind};
use tumbler_engine::render::{
    AnimationState, CubeRenderer, DEPTH_FORMAT, RenderCtx, RenderTarget, Viewport,
};
use tumbler_engine::shader;
use tumbler_engine::texture::{CubeTexture, DecodedImage};

const SIZE: u32 = 64;
const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn gpu() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok()?;

    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("tumbler offscreen test device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::downlevel_defaults(),
        experimental_features: wgpu::ExperimentalFeatures::disabled(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::Off,
    }))
    .ok()
}

macro_rules! require_gpu {
    () => {
        match gpu() {
            Some(pair) => pair,
            None => {
                eprintln!("no GPU adapter available; skipping");
                return;
            }
        }
    };
}

struct Target {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

fn make_target(device: &wgpu::Device) -> Target {
    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test color target"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test depth target"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
    Target {
        color,
        color_view,
        depth_view,
    }
}

fn read_rgba(device: &wgpu::Device, queue: &wgpu::Queue, texture: &wgpu::Texture) -> Vec<u8> {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("test readback buffer"),
        size: (4 * SIZE * SIZE) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * SIZE),
                rows_per_image: Some(SIZE),
            },
        },
        wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .expect("device poll failed");
    rx.recv()
        .expect("map callback dropped")
        .expect("readback buffer map failed");

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();
    data
}

fn pixel(data: &[u8], x: u32, y: u32) -> [u8; 4] {
    let i = ((y * SIZE + x) * 4) as usize;
    [data[i], data[i + 1], data[i + 2], data[i + 3]]
}

fn render_cube(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    renderer: &mut CubeRenderer,
    target: &Target,
    viewport: Viewport,
    state: &AnimationState,
    texture: &CubeTexture,
) -> Result<(), RenderError> {
    let ctx = RenderCtx {
        device,
        queue,
        color_format: COLOR_FORMAT,
        viewport,
    };
    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    let result = {
        let mut rt = RenderTarget {
            encoder: &mut encoder,
            color_view: &target.color_view,
            depth_view: &target.depth_view,
        };
        renderer.render(&ctx, &mut rt, state, texture)
    };
    queue.submit(std::iter::once(encoder.finish()));
    result
}

#[test]
fn decoded_red_texture_renders_red_cube_face() {
    let (device, queue) = require_gpu!();
    let target = make_target(&device);

    let red = DecodedImage {
        width: 2,
        height: 2,
        rgba: [255u8, 0, 0, 255].repeat(4),
    };
    let texture = CubeTexture::from_image(&device, &queue, &red);

    let mut renderer = CubeRenderer::new(&device, COLOR_FORMAT).expect("cube program links");
    render_cube(
        &device,
        &queue,
        &mut renderer,
        &target,
        Viewport::new(SIZE, SIZE),
        &AnimationState::new(),
        &texture,
    )
    .expect("frame renders");

    // At rest the front face fills the screen center. Its normal faces the
    // camera, so lighting is ambient 0.3 plus a diffuse term of ~0.54; the
    // sampled red channel lands near 214/255 with green and blue at zero.
    let data = read_rgba(&device, &queue, &target.color);
    let center = pixel(&data, SIZE / 2, SIZE / 2);
    assert!(center[0] > 190 && center[0] < 240, "red channel: {center:?}");
    assert!(center[1] < 10 && center[2] < 10, "tint: {center:?}");
    assert_eq!(center[3], 255);

    // Corners stay at the clear color: the cube does not reach them.
    assert_eq!(pixel(&data, 1, 1), [0, 0, 0, 255]);
}

#[test]
fn placeholder_texture_renders_gray_before_decode() {
    let (device, queue) = require_gpu!();
    let target = make_target(&device);

    let texture = CubeTexture::placeholder(&device, &queue);
    let mut renderer = CubeRenderer::new(&device, COLOR_FORMAT).expect("cube program links");
    render_cube(
        &device,
        &queue,
        &mut renderer,
        &target,
        Viewport::new(SIZE, SIZE),
        &AnimationState::new(),
        &texture,
    )
    .expect("frame renders");

    let data = read_rgba(&device, &queue, &target.color);
    let center = pixel(&data, SIZE / 2, SIZE / 2);
    // Mid-gray placeholder through sRGB decode and lighting: a dim neutral
    // gray, definitely neither the black clear color nor saturated.
    assert!(center[0] > 15 && center[0] < 90, "gray level: {center:?}");
    assert_eq!(center[0], center[1]);
    assert_eq!(center[1], center[2]);
}

#[test]
fn zero_height_viewport_leaves_previous_frame_intact() {
    let (device, queue) = require_gpu!();
    let target = make_target(&device);

    // Paint the target green first.
    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("test green clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &target.color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: 0.0,
                    g: 1.0,
                    b: 0.0,
                    a: 1.0,
                }),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    queue.submit(std::iter::once(encoder.finish()));

    let texture = CubeTexture::placeholder(&device, &queue);
    let mut renderer = CubeRenderer::new(&device, COLOR_FORMAT).expect("cube program links");

    // Height 0 must not divide and must not clear: the frame is skipped.
    render_cube(
        &device,
        &queue,
        &mut renderer,
        &target,
        Viewport::new(SIZE, 0),
        &AnimationState::new(),
        &texture,
    )
    .expect("degenerate frame is a silent no-op");

    let data = read_rgba(&device, &queue, &target.color);
    assert_eq!(pixel(&data, SIZE / 2, SIZE / 2), [0, 255, 0, 255]);
    assert_eq!(pixel(&data, 1, 1), [0, 255, 0, 255]);
}

#[test]
fn failed_decode_keeps_placeholder_and_settles() {
    let (device, queue) = require_gpu!();

    let mut texture = CubeTexture::load(
        &device,
        &queue,
        std::path::PathBuf::from("/nonexistent/tumbler-test.png"),
    );
    assert_eq!(texture.generation(), 0);

    // Poll until the decode thread reports failure.
    for _ in 0..200 {
        texture.poll(&device, &queue);
        if !texture.is_pending() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    assert!(!texture.is_pending(), "decode result never arrived");
    assert_eq!(texture.generation(), 0, "placeholder must stay bound");
    assert_eq!(texture.size(), (1, 1));
}

const MINIMAL_VS: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
    return vec4<f32>(in.position, 1.0);
}
"#;

const MINIMAL_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

#[test]
fn minimal_program_draws_one_triangle() {
    use wgpu::util::DeviceExt;

    let (device, queue) = require_gpu!();
    let target = make_target(&device);

    let vertex = shader::compile(&device, StageKind::Vertex, MINIMAL_VS).expect("vertex compiles");
    let fragment =
        shader::compile(&device, StageKind::Fragment, MINIMAL_FS).expect("fragment compiles");

    let (attrs, uniforms) = shader::resolve_locations(MINIMAL_VS, MINIMAL_FS);
    assert_eq!(attrs.position, Some(0));
    assert_eq!(attrs.normal, None);
    assert_eq!(uniforms.scene, None);

    let layout = wgpu::VertexBufferLayout {
        array_stride: 12,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: attrs.position.unwrap(),
        }],
    };
    let pipeline = shader::link(
        &device,
        vertex,
        fragment,
        &shader::ProgramDesc {
            label: "test triangle program",
            color_format: COLOR_FORMAT,
            depth_format: None,
            vertex_buffers: &[layout],
            bind_group_layouts: &[],
        },
    )
    .expect("program links");

    let positions: [[f32; 3]; 3] = [[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]];
    let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: None,
        contents: bytemuck::cast_slice(&positions),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: None,
        contents: bytemuck::cast_slice(&[0u16, 1, 2, 0]),
        usage: wgpu::BufferUsages::INDEX,
    });

    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test triangle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(&pipeline);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..3, 0, 0..1);
    }
    queue.submit(std::iter::once(encoder.finish()));

    let data = read_rgba(&device, &queue, &target.color);
    // The triangle covers the screen center; the top corners stay black.
    assert_eq!(pixel(&data, SIZE / 2, SIZE / 2), [255, 255, 255, 255]);
    assert_eq!(pixel(&data, 1, 1), [0, 0, 0, 255]);
}

#[test]
fn malformed_fragment_source_reports_compile_failure() {
    let (device, _queue) = require_gpu!();

    let result = shader::compile(&device, StageKind::Fragment, "this is not wgsl {");
    match result {
        Err(RenderError::CompileFailed { stage, log }) => {
            assert_eq!(stage, StageKind::Fragment);
            assert!(!log.is_empty(), "diagnostic log must not be empty");
        }
        other => panic!("expected CompileFailed, got {other:?}"),
    }
}
