//! Shader programs and typed uniform binding.
//!
//! A [`Shader`] is a render pipeline built from a WGSL vertex module and a WGSL
//! fragment module, plus the CPU-side state needed to feed it:
//!
//! - **Uniforms** live in one uniform buffer at bind group 0, binding 0. The
//!   [`UniformLayout`] names every field and places it with WGSL uniform
//!   alignment rules, so values can be written by name.
//! - **Textures** live at bind group 1. Texture unit `n` occupies bindings
//!   `2n` (texture) and `2n + 1` (sampler).
//!
//! # Binding protocol
//!
//! Uniforms can only be written through the [`ShaderScope`] returned by
//! [`Shader::bind`]. Each scope claims a fresh slot of the uniform buffer and
//! starts from the values left by the previous scope, the way a GL program
//! keeps its uniforms between uses. Dropping the scope commits the slot.
//! Because each draw records its own slot offset, many objects can share one
//! shader within a frame without overwriting each other's matrices.
//!
//! ```ignore
//! let offset = {
//!     let mut scope = shader.bind();
//!     scope.set_mat4(MODEL_UNIFORM, model);
//!     scope.set_directional_light(LIGHT_UNIFORM, &light);
//!     scope.offset()
//! };
//! ```
//!
//! Writing a name the layout does not declare, or with the wrong type, logs a
//! warning once per name and is otherwise ignored.

use std::collections::{HashMap, HashSet};

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::assets::{Assets, TextureId};
use crate::error::{RenderError, ShaderStage};
use crate::gpu::{DEPTH_FORMAT, GpuContext};
use crate::mesh::Vertex3d;
use crate::scene::{AmbientLight, DirectionalLight};

/// Transforms [`Vertex3d`]s with the standard uniforms.
pub const LIT_VERTEX_SOURCE: &str = include_str!("shaders/lit_vertex.wgsl");
/// Textured Blinn-Phong with one directional light and an ambient term.
pub const LIT_FRAGMENT_SOURCE: &str = include_str!("shaders/lit_fragment.wgsl");
/// Unlit texture lookup, for sky domes.
pub const SKY_FRAGMENT_SOURCE: &str = include_str!("shaders/sky_fragment.wgsl");

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

pub const MODEL_UNIFORM: &str = "u_model";
pub const NORMAL_MATRIX_UNIFORM: &str = "u_normal_matrix";
pub const VIEW_UNIFORM: &str = "u_view";
pub const PROJECTION_UNIFORM: &str = "u_projection";
pub const CAMERA_POSITION_UNIFORM: &str = "u_camera_position";
pub const LIGHT_UNIFORM: &str = "u_light";
pub const AMBIENT_UNIFORM: &str = "u_ambient";
pub const TEXTURE_UNIFORM: &str = "u_texture";

/// Uniform slots reserved when a shader is created.
const INITIAL_SLOTS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Vec3,
    Vec4,
    /// Stored as three 16-byte columns.
    Mat3,
    Mat4,
}

impl UniformKind {
    pub const fn size(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat3 => 48,
            UniformKind::Mat4 => 64,
        }
    }

    pub const fn align(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            _ => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct UniformField {
    offset: usize,
    kind: UniformKind,
}

fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Named fields of a shader's uniform struct, in declaration order.
///
/// Fields must be declared in the same order as the WGSL struct. Nested light
/// structs are flattened to `name.direction`, `name.color`.
#[derive(Clone, Debug, Default)]
pub struct UniformLayout {
    fields: HashMap<String, UniformField>,
    cursor: usize,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout shared by the bundled shaders:
    ///
    /// ```wgsl
    /// struct Uniforms {
    ///     model: mat4x4<f32>,
    ///     view: mat4x4<f32>,
    ///     projection: mat4x4<f32>,
    ///     normal_matrix: mat3x3<f32>,
    ///     camera_position: vec3<f32>,
    ///     light: DirectionalLight,
    ///     ambient: AmbientLight,
    /// }
    /// ```
    pub fn standard() -> Self {
        Self::new()
            .mat4(MODEL_UNIFORM)
            .mat4(VIEW_UNIFORM)
            .mat4(PROJECTION_UNIFORM)
            .mat3(NORMAL_MATRIX_UNIFORM)
            .vec3(CAMERA_POSITION_UNIFORM)
            .directional_light(LIGHT_UNIFORM)
            .ambient_light(AMBIENT_UNIFORM)
    }

    pub fn field(mut self, name: impl Into<String>, kind: UniformKind) -> Self {
        let offset = align_to(self.cursor, kind.align());
        self.fields.insert(name.into(), UniformField { offset, kind });
        self.cursor = offset + kind.size();
        self
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.field(name, UniformKind::Float)
    }

    pub fn int(self, name: impl Into<String>) -> Self {
        self.field(name, UniformKind::Int)
    }

    pub fn vec3(self, name: impl Into<String>) -> Self {
        self.field(name, UniformKind::Vec3)
    }

    pub fn vec4(self, name: impl Into<String>) -> Self {
        self.field(name, UniformKind::Vec4)
    }

    pub fn mat3(self, name: impl Into<String>) -> Self {
        self.field(name, UniformKind::Mat3)
    }

    pub fn mat4(self, name: impl Into<String>) -> Self {
        self.field(name, UniformKind::Mat4)
    }

    /// `struct { direction: vec3<f32>, color: vec3<f32> }`
    pub fn directional_light(self, name: &str) -> Self {
        self.begin_struct()
            .vec3(format!("{name}.direction"))
            .vec3(format!("{name}.color"))
            .end_struct()
    }

    /// `struct { color: vec3<f32> }`
    pub fn ambient_light(self, name: &str) -> Self {
        self.begin_struct().vec3(format!("{name}.color")).end_struct()
    }

    fn begin_struct(mut self) -> Self {
        self.cursor = align_to(self.cursor, 16);
        self
    }

    fn end_struct(self) -> Self {
        self.begin_struct()
    }

    /// Byte size of the whole struct, rounded up to 16.
    pub fn size(&self) -> usize {
        align_to(self.cursor, 16).max(16)
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.fields.get(name).map(|f| f.offset)
    }

    pub fn kind_of(&self, name: &str) -> Option<UniformKind> {
        self.fields.get(name).map(|f| f.kind)
    }
}

/// CPU staging for one shader's uniform buffer.
///
/// `current` holds the values being written. Each bind claims the next
/// `stride`-aligned slot in `staging`; the slot is filled from `current` when
/// the bind ends. [`reset`](Self::reset) rewinds to slot 0 at frame start
/// without clearing `current`.
#[derive(Debug)]
pub(crate) struct UniformBlock {
    label: String,
    layout: UniformLayout,
    stride: usize,
    current: Vec<u8>,
    staging: Vec<u8>,
    slots: usize,
    warned: HashSet<String>,
}

impl UniformBlock {
    pub fn new(label: impl Into<String>, layout: UniformLayout, alignment: u32) -> Self {
        let size = layout.size();
        Self {
            label: label.into(),
            stride: align_to(size, alignment.max(1) as usize),
            current: vec![0; size],
            staging: Vec::new(),
            slots: 0,
            warned: HashSet::new(),
            layout,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn reset(&mut self) {
        self.slots = 0;
    }

    /// Committed slots, ready to copy into the uniform buffer.
    pub fn bytes(&self) -> &[u8] {
        &self.staging[..self.slots * self.stride]
    }

    fn claim(&mut self) -> usize {
        let offset = self.slots * self.stride;
        self.slots += 1;
        let needed = self.slots * self.stride;
        if self.staging.len() < needed {
            self.staging.resize(needed, 0);
        }
        offset
    }

    fn commit(&mut self, offset: usize) {
        let len = self.current.len();
        self.staging[offset..offset + len].copy_from_slice(&self.current);
    }

    fn write(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) {
        match self.layout.fields.get(name).copied() {
            Some(field) if field.kind == kind => {
                self.current[field.offset..field.offset + bytes.len()].copy_from_slice(bytes);
            }
            Some(field) => {
                self.warn_once(name, &format!("is a {:?}, not a {kind:?}", field.kind));
            }
            None => self.warn_once(name, "is not declared"),
        }
    }

    fn warn_once(&mut self, name: &str, problem: &str) {
        if self.warned.insert(name.to_string()) {
            log::warn!(
                "uniform `{name}` {problem} in shader `{}`; ignoring writes",
                self.label
            );
        }
    }
}

/// Sampler names per texture unit and the texture currently bound to each.
#[derive(Debug, Default)]
pub(crate) struct TextureUnits {
    names: Vec<String>,
    bound: Vec<Option<TextureId>>,
}

impl TextureUnits {
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.to_vec(),
            bound: vec![None; names.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Bound textures in unit order, or `None` while any unit is empty.
    pub fn bound(&self) -> Option<Vec<TextureId>> {
        self.bound.iter().copied().collect()
    }
}

/// The CPU side of a shader: uniform staging plus texture units. Needs no
/// device, so a frame can be staged before anything touches the GPU.
#[derive(Debug)]
pub(crate) struct ShaderState {
    pub uniforms: UniformBlock,
    pub units: TextureUnits,
}

impl ShaderState {
    pub fn new(
        label: impl Into<String>,
        layout: UniformLayout,
        textures: &[String],
        alignment: u32,
    ) -> Self {
        Self {
            uniforms: UniformBlock::new(label, layout, alignment),
            units: TextureUnits::new(textures),
        }
    }

    pub fn bind(&mut self) -> ShaderScope<'_> {
        ShaderScope::open(&mut self.uniforms, &mut self.units)
    }
}

impl AsMut<ShaderState> for ShaderState {
    fn as_mut(&mut self) -> &mut ShaderState {
        self
    }
}

/// An active bind of a shader. All uniform and texture setters live here.
pub struct ShaderScope<'a> {
    block: &'a mut UniformBlock,
    units: &'a mut TextureUnits,
    offset: usize,
}

impl<'a> ShaderScope<'a> {
    pub(crate) fn open(block: &'a mut UniformBlock, units: &'a mut TextureUnits) -> Self {
        let offset = block.claim();
        Self {
            block,
            units,
            offset,
        }
    }

    /// Dynamic offset of this bind's slot in the uniform buffer.
    pub fn offset(&self) -> u32 {
        self.offset as u32
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.block
            .write(name, UniformKind::Float, bytemuck::bytes_of(&value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.block
            .write(name, UniformKind::Int, bytemuck::bytes_of(&value));
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.block
            .write(name, UniformKind::Vec3, bytemuck::cast_slice(&value.to_array()));
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.block
            .write(name, UniformKind::Vec4, bytemuck::cast_slice(&value.to_array()));
    }

    pub fn set_mat3(&mut self, name: &str, value: Mat3) {
        let [x, y, z] = [value.x_axis, value.y_axis, value.z_axis];
        #[rustfmt::skip]
        let padded = [
            x.x, x.y, x.z, 0.0,
            y.x, y.y, y.z, 0.0,
            z.x, z.y, z.z, 0.0,
        ];
        self.block
            .write(name, UniformKind::Mat3, bytemuck::cast_slice(&padded));
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.block
            .write(name, UniformKind::Mat4, bytemuck::cast_slice(&value.to_cols_array()));
    }

    /// Binds `texture` to `unit`. `name` must be the sampler declared for that
    /// unit.
    pub fn set_texture(&mut self, name: &str, texture: TextureId, unit: usize) {
        match self.units.names.get(unit) {
            Some(declared) if declared == name => self.units.bound[unit] = Some(texture),
            _ => self
                .block
                .warn_once(name, &format!("is not the sampler for texture unit {unit}")),
        }
    }

    pub fn set_directional_light(&mut self, name: &str, light: &DirectionalLight) {
        self.set_vec3(&format!("{name}.direction"), light.direction);
        self.set_vec3(&format!("{name}.color"), light.color);
    }

    pub fn set_ambient_light(&mut self, name: &str, light: &AmbientLight) {
        self.set_vec3(&format!("{name}.color"), light.color);
    }
}

impl Drop for ShaderScope<'_> {
    fn drop(&mut self) {
        self.block.commit(self.offset);
    }
}

/// Pipeline construction options.
///
/// ```ignore
/// let sky = Shader::new(gpu, ShaderDescriptor::new("sky", LIT_VS, SKY_FS).depth_write(false))?;
/// ```
pub struct ShaderDescriptor<'a> {
    label: &'a str,
    vertex: &'a str,
    fragment: &'a str,
    uniforms: UniformLayout,
    textures: Vec<String>,
    blend: Option<wgpu::BlendState>,
    cull_mode: Option<wgpu::Face>,
    depth_write: bool,
}

impl<'a> ShaderDescriptor<'a> {
    /// Defaults: [`UniformLayout::standard`], one texture unit named
    /// [`TEXTURE_UNIFORM`], alpha blending, back-face culling, depth writes on.
    pub fn new(label: &'a str, vertex: &'a str, fragment: &'a str) -> Self {
        Self {
            label,
            vertex,
            fragment,
            uniforms: UniformLayout::standard(),
            textures: vec![TEXTURE_UNIFORM.to_string()],
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            cull_mode: Some(wgpu::Face::Back),
            depth_write: true,
        }
    }

    /// The bundled lit material.
    pub fn lit(label: &'a str) -> Self {
        Self::new(label, LIT_VERTEX_SOURCE, LIT_FRAGMENT_SOURCE)
    }

    /// The bundled unlit sky material. Draw it first: it does not write depth.
    pub fn sky(label: &'a str) -> Self {
        Self::new(label, LIT_VERTEX_SOURCE, SKY_FRAGMENT_SOURCE)
            .blend(Some(wgpu::BlendState::REPLACE))
            .depth_write(false)
    }

    pub fn uniforms(mut self, layout: UniformLayout) -> Self {
        self.uniforms = layout;
        self
    }

    /// Sampler names for texture units `0..names.len()`.
    pub fn textures(mut self, names: &[&str]) -> Self {
        self.textures = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn blend(mut self, blend: Option<wgpu::BlendState>) -> Self {
        self.blend = blend;
        self
    }

    pub fn cull_mode(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn depth_write(mut self, enabled: bool) -> Self {
        self.depth_write = enabled;
        self
    }
}

pub struct Shader {
    label: String,
    pipeline: wgpu::RenderPipeline,
    state: ShaderState,
    uniform_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    texture_groups: HashMap<Vec<TextureId>, wgpu::BindGroup>,
}

impl Shader {
    /// Compiles both stages and links them into a pipeline targeting the
    /// surface format with [`DEPTH_FORMAT`] depth testing.
    pub fn new(gpu: &GpuContext, desc: ShaderDescriptor<'_>) -> Result<Self, RenderError> {
        let label = desc.label;
        let vertex = compile(gpu, label, ShaderStage::Vertex, desc.vertex)?;
        let fragment = compile(gpu, label, ShaderStage::Fragment, desc.fragment)?;
        let device = &gpu.device;

        let uniform_size = desc.uniforms.size() as u64;
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Uniform Layout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(uniform_size),
                },
                count: None,
            }],
        });

        let texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..desc.textures.len() as u32)
            .flat_map(|unit| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: unit * 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: unit * 2 + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Texture Layout")),
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let (pipeline, error) = gpu.scoped(wgpu::ErrorFilter::Validation, |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: desc.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: desc.cull_mode,
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: desc.depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(error) = error {
            return Err(RenderError::Link {
                label: label.to_string(),
                log: error.to_string(),
            });
        }

        let state = ShaderState::new(
            label,
            desc.uniforms,
            &desc.textures,
            gpu.uniform_alignment(),
        );
        let (uniform_buffer, uniform_bind_group) = create_uniform_buffer(
            gpu,
            &uniform_layout,
            uniform_size,
            (state.uniforms.stride() * INITIAL_SLOTS) as u64,
        );

        log::debug!(
            "built shader `{label}` ({uniform_size} uniform bytes, {} texture units)",
            desc.textures.len()
        );

        Ok(Self {
            label: label.to_string(),
            pipeline,
            state,
            uniform_layout,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            texture_groups: HashMap::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &UniformLayout {
        self.state.uniforms.layout()
    }

    pub fn texture_units(&self) -> usize {
        self.state.units.len()
    }

    /// Starts a bind. Uniform writes go through the returned scope.
    pub fn bind(&mut self) -> ShaderScope<'_> {
        self.state.bind()
    }

    /// Creates the bind group for `key` on first use. Returns `false` if any
    /// of its textures is not ready.
    pub(crate) fn ensure_texture_group(
        &mut self,
        gpu: &GpuContext,
        assets: &Assets,
        key: &[TextureId],
    ) -> bool {
        if self.texture_groups.contains_key(key) {
            return true;
        }
        let Some(textures) = key
            .iter()
            .map(|&id| assets.texture(id))
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };

        let entries: Vec<wgpu::BindGroupEntry> = textures
            .iter()
            .enumerate()
            .flat_map(|(unit, texture)| {
                [
                    wgpu::BindGroupEntry {
                        binding: unit as u32 * 2,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: unit as u32 * 2 + 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ]
            })
            .collect();
        let group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Texture Bind Group", self.label)),
            layout: &self.texture_layout,
            entries: &entries,
        });
        log::debug!("shader `{}`: texture bind group for {key:?}", self.label);
        self.texture_groups.insert(key.to_vec(), group);
        true
    }

    /// Copies this frame's uniform slots to the GPU, growing the buffer first
    /// if the frame used more slots than it holds.
    pub(crate) fn flush(&mut self, gpu: &GpuContext) {
        let bytes = self.state.uniforms.bytes();
        if bytes.is_empty() {
            return;
        }

        let needed = bytes.len() as u64;
        if needed > self.uniform_buffer.size() {
            let capacity = needed.next_power_of_two();
            log::debug!(
                "shader `{}`: growing uniform buffer to {capacity} bytes",
                self.label
            );
            let binding_size = self.state.uniforms.layout().size() as u64;
            (self.uniform_buffer, self.uniform_bind_group) =
                create_uniform_buffer(gpu, &self.uniform_layout, binding_size, capacity);
        }
        gpu.queue.write_buffer(&self.uniform_buffer, 0, bytes);
    }

    /// Sets the pipeline and the uniform slot at `offset`. Returns the texture
    /// bind group for `textures` if
    /// [`ensure_texture_group`](Self::ensure_texture_group) created one.
    pub(crate) fn apply(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        offset: u32,
        textures: &[TextureId],
    ) -> Option<&wgpu::BindGroup> {
        let group = self.texture_groups.get(textures)?;
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
        Some(group)
    }

    pub(crate) fn release(&mut self) {
        self.texture_groups.clear();
        self.uniform_buffer.destroy();
    }
}

impl AsMut<ShaderState> for Shader {
    fn as_mut(&mut self) -> &mut ShaderState {
        &mut self.state
    }
}

fn create_uniform_buffer(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    binding_size: u64,
    capacity: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Shader Uniforms"),
        size: capacity.max(binding_size),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Shader Uniform Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(binding_size),
            }),
        }],
    });
    (buffer, bind_group)
}

fn compile(
    gpu: &GpuContext,
    label: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, RenderError> {
    let (module, error) = gpu.scoped(wgpu::ErrorFilter::Validation, |device| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} ({stage})")),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    });
    match error {
        Some(error) => Err(RenderError::Compile {
            label: label.to_string(),
            stage,
            listing: numbered_listing(source),
            log: error.to_string(),
        }),
        None => Ok(module),
    }
}

/// Source with right-aligned line numbers, for compile diagnostics.
pub fn numbered_listing(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:>4} | {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn standard_layout_matches_wgsl_offsets() {
        let layout = UniformLayout::standard();
        assert_eq!(layout.offset_of(MODEL_UNIFORM), Some(0));
        assert_eq!(layout.offset_of(VIEW_UNIFORM), Some(64));
        assert_eq!(layout.offset_of(PROJECTION_UNIFORM), Some(128));
        assert_eq!(layout.offset_of(NORMAL_MATRIX_UNIFORM), Some(192));
        assert_eq!(layout.offset_of(CAMERA_POSITION_UNIFORM), Some(240));
        assert_eq!(layout.offset_of("u_light.direction"), Some(256));
        assert_eq!(layout.offset_of("u_light.color"), Some(272));
        assert_eq!(layout.offset_of("u_ambient.color"), Some(288));
        assert_eq!(layout.size(), 304);
        assert_eq!(layout.kind_of(NORMAL_MATRIX_UNIFORM), Some(UniformKind::Mat3));
    }

    #[test]
    fn scalars_pack_after_vec3() {
        let layout = UniformLayout::new().vec3("a").float("b").int("c").vec4("d");
        assert_eq!(layout.offset_of("b"), Some(12));
        assert_eq!(layout.offset_of("c"), Some(16));
        assert_eq!(layout.offset_of("d"), Some(32));
        assert_eq!(layout.size(), 48);
        assert_eq!(UniformLayout::new().size(), 16);
        assert_eq!(UniformLayout::new().float("t").size(), 16);
    }

    #[test]
    fn each_bind_gets_its_own_slot() {
        let mut block = UniformBlock::new("test", UniformLayout::standard(), 256);
        let mut units = TextureUnits::default();
        assert_eq!(block.stride(), 512);

        let first = {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_mat4(MODEL_UNIFORM, Mat4::from_translation(Vec3::X));
            scope.offset()
        };
        let second = {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_mat4(MODEL_UNIFORM, Mat4::from_translation(Vec3::Y));
            scope.offset()
        };

        assert_eq!((first, second), (0, 512));
        assert_eq!(block.bytes().len(), 1024);

        let slot = |offset: usize| floats(&block.bytes()[offset..offset + 64]);
        assert_eq!(slot(0)[12..15], [1.0, 0.0, 0.0]);
        assert_eq!(slot(512)[12..15], [0.0, 1.0, 0.0]);

        block.reset();
        assert!(block.bytes().is_empty());
    }

    #[test]
    fn values_persist_between_binds() {
        let mut block = UniformBlock::new("test", UniformLayout::standard(), 16);
        let mut units = TextureUnits::default();

        {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_vec3(CAMERA_POSITION_UNIFORM, Vec3::new(1.0, 2.0, 3.0));
        }
        drop(ShaderScope::open(&mut block, &mut units));

        let stride = block.stride();
        let second = floats(&block.bytes()[stride + 240..stride + 252]);
        assert_eq!(second, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn mat3_columns_are_padded() {
        let mut block = UniformBlock::new("test", UniformLayout::new().mat3("m"), 16);
        let mut units = TextureUnits::default();
        {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_mat3("m", Mat3::from_cols_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]));
        }
        assert_eq!(
            floats(block.bytes()),
            vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]
        );
    }

    #[test]
    fn unknown_and_mistyped_names_are_ignored() {
        let mut block = UniformBlock::new("test", UniformLayout::new().float("t"), 16);
        let mut units = TextureUnits::default();
        {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_float("missing", 4.0);
            scope.set_float("missing", 5.0);
            scope.set_vec3("t", Vec3::ONE);
            scope.set_int("t", 9);
        }
        assert_eq!(block.warned.len(), 2);
        assert_eq!(floats(block.bytes()), vec![0.0; 4]);

        {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_float("t", 0.5);
        }
        assert_eq!(floats(&block.bytes()[16..20]), vec![0.5]);
    }

    #[test]
    fn lights_write_their_fields() {
        let mut block = UniformBlock::new("test", UniformLayout::standard(), 16);
        let mut units = TextureUnits::default();
        let light = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.5, 0.25));
        {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_directional_light(LIGHT_UNIFORM, &light);
            scope.set_ambient_light(AMBIENT_UNIFORM, &AmbientLight::new(Vec3::splat(0.1)));
        }
        let all = floats(block.bytes());
        assert_eq!(all[64..67], [0.0, -1.0, 0.0]);
        assert_eq!(all[68..71], [1.0, 0.5, 0.25]);
        assert_eq!(all[72..75], [0.1, 0.1, 0.1]);
    }

    #[test]
    fn textures_bind_by_declared_unit() {
        let mut block = UniformBlock::new("test", UniformLayout::standard(), 16);
        let mut units = TextureUnits::new(&["u_texture".to_string(), "u_detail".to_string()]);
        assert_eq!(units.bound(), None);
        {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_texture("u_texture", TextureId(4), 0);
            scope.set_texture("u_texture", TextureId(5), 1);
        }
        assert_eq!(units.bound(), None);
        {
            let mut scope = ShaderScope::open(&mut block, &mut units);
            scope.set_texture("u_detail", TextureId(2), 1);
        }
        assert_eq!(units.bound(), Some(vec![TextureId(4), TextureId(2)]));
    }

    #[test]
    fn listing_numbers_lines() {
        let listing = numbered_listing("fn main() {\n}\n");
        assert_eq!(listing, "   1 | fn main() {\n   2 | }");
    }
}
