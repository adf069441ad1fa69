//! Shader compilation, linking, and location resolution.
//!
//! WGSL stages are validated individually under wgpu error scopes so a bad
//! stage reports `CompileFailed` with the backend's diagnostic text instead
//! of panicking. "Linking" is render-pipeline creation from both stages;
//! stage-interface mismatches surface there as `LinkFailed`.

use crate::error::{RenderError, StageKind};

/// Compiles one WGSL stage into a shader module.
///
/// The module is only returned if validation passed; on failure the scope's
/// captured diagnostic becomes the `CompileFailed` log and no module handle
/// escapes.
pub fn compile(
    device: &wgpu::Device,
    stage: StageKind,
    source: &str,
) -> Result<wgpu::ShaderModule, RenderError> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            StageKind::Vertex => "tumbler vertex stage",
            StageKind::Fragment => "tumbler fragment stage",
        }),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    match pollster::block_on(scope.pop()) {
        None => Ok(module),
        Some(err) => Err(RenderError::CompileFailed {
            stage,
            log: err.to_string(),
        }),
    }
}

/// Fixed-function state a program is linked against.
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub color_format: wgpu::TextureFormat,
    /// Depth attachment format; `None` links a depth-less program.
    pub depth_format: Option<wgpu::TextureFormat>,
    pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
}

/// Links two compiled stages into a render pipeline.
///
/// Takes the stages by value: a failed link consumes them, so neither a
/// stage nor a partial program can leak past the failure path.
pub fn link(
    device: &wgpu::Device,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    desc: &ProgramDesc<'_>,
) -> Result<wgpu::RenderPipeline, RenderError> {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: desc.bind_group_layouts,
        immediate_size: 0,
    });

    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),

        vertex: wgpu::VertexState {
            module: &vertex,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: desc.vertex_buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &fragment,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        // Nearer fragments win; equal depth keeps the later write.
        depth_stencil: desc.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),

        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    match pollster::block_on(scope.pop()) {
        None => Ok(pipeline),
        Some(err) => Err(RenderError::LinkFailed {
            log: err.to_string(),
        }),
    }
}

/// Vertex-attribute locations resolved from a program's vertex stage.
///
/// `None` means the stage does not declare that attribute, which is
/// distinct from "resolved to location 0". Immutable after resolution.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct AttributeLocations {
    pub position: Option<u32>,
    pub normal: Option<u32>,
    pub tex_coord: Option<u32>,
}

/// Uniform resources resolved from both stages as `(group, binding)` pairs.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct UniformBindings {
    /// Matrix block (`scene` in WGSL).
    pub scene: Option<(u32, u32)>,
    /// Sampled color texture (`cube_texture`).
    pub texture: Option<(u32, u32)>,
    /// Texture sampler (`cube_sampler`).
    pub sampler: Option<(u32, u32)>,
}

/// Resolves attribute and uniform tables for a program, once after linking.
///
/// Vertex inputs are read from the stage's `VertexInput` struct declaration;
/// uniform resources from `@group(..) @binding(..) var` declarations in
/// either stage. Absent names are not errors. The scan is pure text
/// processing over the same sources the stages were compiled from, so
/// resolving twice yields identical tables.
pub fn resolve_locations(
    vertex_src: &str,
    fragment_src: &str,
) -> (AttributeLocations, UniformBindings) {
    let mut attributes = AttributeLocations::default();
    for (name, location) in scan_vertex_inputs(vertex_src) {
        match name {
            "position" => attributes.position.get_or_insert(location),
            "normal" => attributes.normal.get_or_insert(location),
            "tex_coord" => attributes.tex_coord.get_or_insert(location),
            _ => continue,
        };
    }

    let mut uniforms = UniformBindings::default();
    for src in [vertex_src, fragment_src] {
        for (name, group, binding) in scan_bindings(src) {
            match name {
                "scene" => uniforms.scene.get_or_insert((group, binding)),
                "cube_texture" => uniforms.texture.get_or_insert((group, binding)),
                "cube_sampler" => uniforms.sampler.get_or_insert((group, binding)),
                _ => continue,
            };
        }
    }

    (attributes, uniforms)
}

/// Yields `(field_name, location)` pairs from the `VertexInput` struct body.
fn scan_vertex_inputs(source: &str) -> Vec<(&str, u32)> {
    let Some(body) = struct_body(source, "VertexInput") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for field in body.split(',') {
        let Some(rest) = find_after(field, "@location(") else {
            continue;
        };
        let Some((location, rest)) = parse_u32(rest) else {
            continue;
        };
        let rest = rest.trim_start_matches(')');
        if let Some(name) = ident_before_colon(rest) {
            out.push((name, location));
        }
    }
    out
}

/// Yields `(var_name, group, binding)` triples for module-scope resource
/// declarations of the form `@group(G) @binding(B) var<..> name: ..;`.
fn scan_bindings(source: &str) -> Vec<(&str, u32, u32)> {
    let mut out = Vec::new();
    let mut rest = source;
    while let Some(after_group) = find_after(rest, "@group(") {
        rest = after_group;
        let Some((group, after)) = parse_u32(rest) else {
            continue;
        };
        let Some(after) = find_after(after, "@binding(") else {
            continue;
        };
        let Some((binding, after)) = parse_u32(after) else {
            continue;
        };
        let Some(after) = find_after(after, "var") else {
            continue;
        };
        // Skip an optional address-space qualifier such as `<uniform>`.
        let after = after.trim_start();
        let after = match after.strip_prefix('<') {
            Some(q) => match q.split_once('>') {
                Some((_, tail)) => tail,
                None => continue,
            },
            None => after,
        };
        if let Some(name) = ident_before_colon(after) {
            out.push((name, group, binding));
        }
    }
    out
}

/// Returns the text between the braces of `struct <name> { .. }`.
fn struct_body<'a>(source: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = source;
    loop {
        let after = find_after(rest, "struct")?;
        let trimmed = after.trim_start();
        if trimmed.starts_with(name)
            && trimmed[name.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric() && c != '_')
        {
            let open = trimmed.find('{')?;
            let close = trimmed[open..].find('}')? + open;
            return Some(&trimmed[open + 1..close]);
        }
        rest = after;
    }
}

fn find_after<'a>(haystack: &'a str, needle: &str) -> Option<&'a str> {
    haystack
        .find(needle)
        .map(|i| &haystack[i + needle.len()..])
}

fn parse_u32(s: &str) -> Option<(u32, &str)> {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit())?;
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

fn ident_before_colon(s: &str) -> Option<&str> {
    let name = s.split(':').next()?.trim();
    (!name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'))
        .then_some(name)
}
