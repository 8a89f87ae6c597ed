use glam::{Mat4, Vec3};

use crate::assets::{Assets, MeshId, Residency, TextureId};
use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::shader::{
    AMBIENT_UNIFORM, CAMERA_POSITION_UNIFORM, LIGHT_UNIFORM, PROJECTION_UNIFORM, Shader,
    ShaderState, TEXTURE_UNIFORM, VIEW_UNIFORM,
};

use super::{AmbientLight, DirectionalLight, SceneObject};

/// Index of an object in its [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) usize);

/// Index of a shader owned by a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(pub(crate) usize);

/// One recorded draw: which shader slot and textures to use for which mesh.
#[derive(Debug)]
struct DrawCommand {
    shader: ShaderId,
    mesh: MeshId,
    offset: u32,
    textures: Vec<TextureId>,
}

#[derive(Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    shaders: Vec<Shader>,
    light: DirectionalLight,
    ambient: AmbientLight,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an object to the draw list.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn add_shader(&mut self, shader: Shader) -> ShaderId {
        log::info!("added shader `{}`", shader.label());
        self.shaders.push(shader);
        ShaderId(self.shaders.len() - 1)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn shader(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id.0)
    }

    pub fn shader_mut(&mut self, id: ShaderId) -> Option<&mut Shader> {
        self.shaders.get_mut(id.0)
    }

    pub fn light(&self) -> &DirectionalLight {
        &self.light
    }

    pub fn light_mut(&mut self) -> &mut DirectionalLight {
        &mut self.light
    }

    pub fn set_light(&mut self, light: DirectionalLight) {
        self.light = light;
    }

    pub fn ambient(&self) -> &AmbientLight {
        &self.ambient
    }

    pub fn set_ambient(&mut self, ambient: AmbientLight) {
        self.ambient = ambient;
    }

    /// Draws every object in insertion order.
    ///
    /// Objects whose mesh or texture is still loading (or failed to load) are
    /// skipped. Uniforms are staged per object and uploaded before any draw is
    /// recorded.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &Camera,
        assets: &Assets,
    ) {
        let commands = self.prepare(gpu, camera, assets);
        self.record(pass, assets, &commands);
    }

    fn prepare(&mut self, gpu: &GpuContext, camera: &Camera, assets: &Assets) -> Vec<DrawCommand> {
        let frame = FrameUniforms::new(camera, &self.light, &self.ambient);
        let mut commands = stage(&self.objects, &mut self.shaders, &frame, assets);

        commands.retain(|command| {
            self.shaders
                .get_mut(command.shader.0)
                .is_some_and(|shader| shader.ensure_texture_group(gpu, assets, &command.textures))
        });
        for shader in &mut self.shaders {
            shader.flush(gpu);
        }
        commands
    }

    fn record(&self, pass: &mut wgpu::RenderPass<'_>, assets: &Assets, commands: &[DrawCommand]) {
        for command in commands {
            let (Some(shader), Some(mesh)) = (self.shader(command.shader), assets.mesh(command.mesh))
            else {
                continue;
            };
            if let Some(textures) = shader.apply(pass, command.offset, &command.textures) {
                mesh.draw(pass, textures);
            }
        }
    }

    /// Frees every shader's GPU buffers.
    pub fn release(&mut self) {
        for shader in &mut self.shaders {
            shader.release();
        }
        log::info!("released {} shaders", self.shaders.len());
    }
}

/// Per-frame values every object's scope receives.
struct FrameUniforms {
    view: Mat4,
    projection: Mat4,
    camera_position: Vec3,
    light: DirectionalLight,
    ambient: AmbientLight,
}

impl FrameUniforms {
    fn new(camera: &Camera, light: &DirectionalLight, ambient: &AmbientLight) -> Self {
        Self {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            camera_position: camera.position(),
            light: *light,
            ambient: *ambient,
        }
    }

    /// Writes the camera, the object and the lights in one scope of `state`
    /// and returns that scope's slot offset.
    fn bind_object(&self, state: &mut ShaderState, object: &SceneObject, texture: TextureId) -> u32 {
        let textured = state.units.len() > 0;
        let mut scope = state.bind();
        scope.set_mat4(VIEW_UNIFORM, self.view);
        scope.set_mat4(PROJECTION_UNIFORM, self.projection);
        scope.set_vec3(CAMERA_POSITION_UNIFORM, self.camera_position);
        object.write_uniforms(&mut scope);
        scope.set_directional_light(LIGHT_UNIFORM, &self.light);
        scope.set_ambient_light(AMBIENT_UNIFORM, &self.ambient);
        if textured {
            scope.set_texture(TEXTURE_UNIFORM, texture, 0);
        }
        scope.offset()
    }
}

/// Stages uniforms for every drawable object and returns its draw commands.
/// Nothing here touches the GPU.
fn stage<S: AsMut<ShaderState>>(
    objects: &[SceneObject],
    shaders: &mut [S],
    frame: &FrameUniforms,
    assets: &impl Residency,
) -> Vec<DrawCommand> {
    for shader in shaders.iter_mut() {
        let state: &mut ShaderState = shader.as_mut();
        state.uniforms.reset();
    }

    let mut commands = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        let Some(texture) = assets.mesh_texture(object.mesh()) else {
            log::trace!("object {index}: mesh not ready, skipped");
            continue;
        };
        let Some(state) = shaders
            .get_mut(object.shader().0)
            .map(AsMut::<ShaderState>::as_mut)
        else {
            log::trace!("object {index}: unknown shader {:?}", object.shader());
            continue;
        };

        let offset = frame.bind_object(state, object, texture);
        let textures = match state.units.bound() {
            Some(textures) if textures.iter().all(|&t| assets.texture_ready(t)) => textures,
            _ => {
                log::trace!("object {index}: texture not ready, skipped");
                continue;
            }
        };

        commands.push(DrawCommand {
            shader: object.shader(),
            mesh: object.mesh(),
            offset,
            textures,
        });
    }
    commands
}
