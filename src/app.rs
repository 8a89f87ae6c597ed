use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::assets::{Assets, MeshId, TextureId};
use crate::camera::Camera;
use crate::color::Color;
use crate::error::{AppError, RenderError};
use crate::geometry::{RawGeometry, SphereNormals};
use crate::gpu::GpuContext;
use crate::input::{Input, KeyBindings, KeyState};
use crate::mesh::{Mesh, Transform};
use crate::render::ForwardPass;
use crate::scene::{ObjectId, Scene, SceneObject, ShaderId};
use crate::shader::{Shader, ShaderDescriptor};
use crate::texture::{Texture, TextureOptions};

/// Starting pose of the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CameraPreset {
    /// See [`Camera::perspective`].
    #[default]
    Perspective,
    /// See [`Camera::isometric`].
    Isometric,
}

impl CameraPreset {
    fn camera(self, width: f32, height: f32) -> Camera {
        match self {
            CameraPreset::Perspective => Camera::perspective(width, height),
            CameraPreset::Isometric => Camera::isometric(width, height),
        }
    }
}

/// Configuration for the app window.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: Color,
    pub camera: CameraPreset,
    pub key_bindings: KeyBindings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Glint".to_string(),
            width: 800,
            height: 600,
            clear_color: Color::rgb(0.05, 0.05, 0.08),
            camera: CameraPreset::default(),
            key_bindings: KeyBindings::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn camera(mut self, preset: CameraPreset) -> Self {
        self.camera = preset;
        self
    }

    pub fn key_bindings(mut self, bindings: KeyBindings) -> Self {
        self.key_bindings = bindings;
        self
    }
}

/// Context provided during app setup.
///
/// Everything built here lives for the rest of the run. The fields stay public
/// for anything the helpers do not cover.
pub struct SetupContext<'a> {
    pub gpu: &'a GpuContext,
    pub assets: &'a mut Assets,
    pub scene: &'a mut Scene,
    pub camera: &'a mut Camera,
}

impl SetupContext<'_> {
    /// Compiles a shader and hands it to the scene.
    pub fn shader(&mut self, desc: ShaderDescriptor<'_>) -> Result<ShaderId, RenderError> {
        let shader = Shader::new(self.gpu, desc)?;
        Ok(self.scene.add_shader(shader))
    }

    pub fn lit_shader(&mut self) -> Result<ShaderId, RenderError> {
        self.shader(ShaderDescriptor::lit("Lit Shader"))
    }

    pub fn sky_shader(&mut self) -> Result<ShaderId, RenderError> {
        self.shader(ShaderDescriptor::sky("Sky Shader"))
    }

    // Textures

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.assets.add_texture(texture)
    }

    pub fn checkerboard(
        &mut self,
        size: u32,
        cells: u32,
        a: Color,
        b: Color,
        options: TextureOptions,
    ) -> Result<TextureId, RenderError> {
        let texture = Texture::checkerboard(self.gpu, size, cells, a, b, options)?;
        Ok(self.add_texture(texture))
    }

    pub fn gradient(
        &mut self,
        height: u32,
        top: Color,
        bottom: Color,
    ) -> Result<TextureId, RenderError> {
        let texture = Texture::gradient(self.gpu, height, top, bottom)?;
        Ok(self.add_texture(texture))
    }

    pub fn solid(&mut self, color: Color) -> Result<TextureId, RenderError> {
        let texture = Texture::solid(self.gpu, color)?;
        Ok(self.add_texture(texture))
    }

    /// Loads in the background. Objects using it are skipped until it is ready.
    pub fn load_texture(&mut self, path: impl AsRef<Path>, options: TextureOptions) -> TextureId {
        self.assets.load_texture(path, options)
    }

    // Meshes

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.assets.add_mesh(mesh)
    }

    pub fn mesh(
        &mut self,
        geometry: &RawGeometry,
        texture: TextureId,
    ) -> Result<MeshId, RenderError> {
        let mesh = Mesh::create(self.gpu, geometry, texture)?;
        Ok(self.add_mesh(mesh))
    }

    pub fn mesh_plane(
        &mut self,
        width: f32,
        height: f32,
        texture: TextureId,
    ) -> Result<MeshId, RenderError> {
        self.mesh(&RawGeometry::plane(width, height), texture)
    }

    pub fn mesh_cube(
        &mut self,
        width: f32,
        height: f32,
        depth: f32,
        texture: TextureId,
    ) -> Result<MeshId, RenderError> {
        self.mesh(&RawGeometry::cube(width, height, depth), texture)
    }

    pub fn mesh_sphere(
        &mut self,
        radius: f32,
        slices: u32,
        stacks: u32,
        normals: SphereNormals,
        texture: TextureId,
    ) -> Result<MeshId, RenderError> {
        self.mesh(&RawGeometry::sphere(radius, slices, stacks, normals), texture)
    }

    /// Loads in the background. Objects using it are skipped until it is ready.
    pub fn load_obj(&mut self, path: impl AsRef<Path>, texture: TextureId) -> MeshId {
        self.assets.load_obj(path, texture)
    }

    pub fn load_obj_with(
        &mut self,
        path: impl AsRef<Path>,
        texture: TextureId,
        prepare: impl FnOnce(&mut RawGeometry) + Send + 'static,
    ) -> MeshId {
        self.assets.load_obj_with(path, texture, prepare)
    }

    // Objects

    pub fn add_object(&mut self, mesh: MeshId, shader: ShaderId, transform: Transform) -> ObjectId {
        self.scene
            .add(SceneObject::new(mesh, shader).with_transform(transform))
    }
}

/// Context provided each frame, before the scene is drawn.
pub struct Frame<'a> {
    pub gpu: &'a GpuContext,
    pub scene: &'a mut Scene,
    pub camera: &'a mut Camera,
    pub input: &'a Input,
    pub assets: &'a mut Assets,
    /// Total elapsed time in seconds.
    pub time: f32,
    /// Delta time since last frame in seconds.
    pub dt: f32,
}

impl Frame<'_> {
    pub fn fps(&self) -> f32 {
        if self.dt > 0.0 { 1.0 / self.dt } else { 0.0 }
    }

    pub fn width(&self) -> u32 {
        self.gpu.width()
    }

    pub fn height(&self) -> u32 {
        self.gpu.height()
    }
}

/// Run an app with setup and frame closures.
///
/// # Example
/// ```no_run
/// use glint::{SphereNormals, TextureOptions, Transform, Color, Vec3};
///
/// glint::run(|ctx| {
///     let lit = ctx.lit_shader()?;
///     let tex = ctx.checkerboard(64, 8, Color::WHITE, Color::BLACK, TextureOptions::new())?;
///     let ball = ctx.mesh_sphere(1.0, 32, 16, SphereNormals::Outward, tex)?;
///     let id = ctx.add_object(ball, lit, Transform::from_position(Vec3::new(0.0, 0.0, -3.0)));
///
///     Ok(move |frame: &mut glint::Frame| {
///         if let Some(object) = frame.scene.object_mut(id) {
///             object.rotate_object(Vec3::new(0.0, 30.0 * frame.dt, 0.0));
///         }
///     })
/// })
/// .unwrap();
/// ```
pub fn run<S, F>(setup: S) -> Result<(), AppError>
where
    S: FnOnce(&mut SetupContext) -> Result<F, RenderError> + 'static,
    F: FnMut(&mut Frame) + 'static,
{
    run_with_config(AppConfig::default(), setup)
}

/// Run an app with custom configuration.
///
/// Returns once the window is closed, or with the error that stopped startup.
pub fn run_with_config<S, F>(config: AppConfig, setup: S) -> Result<(), AppError>
where
    S: FnOnce(&mut SetupContext) -> Result<F, RenderError> + 'static,
    F: FnMut(&mut Frame) + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = GlintApp {
        state: AppState::Pending {
            config,
            setup: Box::new(move |ctx: &mut SetupContext<'_>| {
                setup(ctx).map(|f| Box::new(f) as FrameFn)
            }),
        },
        error: None,
    };

    event_loop.run_app(&mut app)?;

    match app.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

type FrameFn = Box<dyn FnMut(&mut Frame)>;
type SetupFn = Box<dyn FnOnce(&mut SetupContext) -> Result<FrameFn, RenderError>>;

struct GlintApp {
    state: AppState,
    error: Option<AppError>,
}

enum AppState {
    Pending { config: AppConfig, setup: SetupFn },
    Running(Box<Running>),
    Exited,
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    assets: Assets,
    scene: Scene,
    camera: Camera,
    input: Input,
    forward: ForwardPass,
    key_bindings: KeyBindings,
    frame_fn: FrameFn,
    start_time: Instant,
    last_frame: Instant,
}

impl Running {
    fn start(
        event_loop: &ActiveEventLoop,
        config: AppConfig,
        setup: SetupFn,
    ) -> Result<Self, AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContext::new(window.clone())?;
        let mut assets = Assets::new();
        let mut scene = Scene::new();
        let mut camera = config.camera.camera(gpu.width() as f32, gpu.height() as f32);

        let frame_fn = setup(&mut SetupContext {
            gpu: &gpu,
            assets: &mut assets,
            scene: &mut scene,
            camera: &mut camera,
        })?;
        log::info!(
            "scene ready: {} objects, {} assets loading",
            scene.len(),
            assets.pending()
        );

        let forward = ForwardPass::new(&gpu, config.clear_color);
        window.request_redraw();

        Ok(Self {
            window,
            gpu,
            assets,
            scene,
            camera,
            input: Input::new(),
            forward,
            key_bindings: config.key_bindings,
            frame_fn,
            start_time: Instant::now(),
            last_frame: Instant::now(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.camera
            .update_projection_matrix_aspect(width as f32, height as f32);
    }

    /// One tick: settle loads, move the camera, run the user closure, draw.
    fn redraw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let time = self.start_time.elapsed().as_secs_f32();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.assets.poll(&self.gpu);

        self.camera
            .process_keyboard(&KeyState::from_input(&self.input, &self.key_bindings));
        let drag = self.input.drag_delta();
        if drag != Vec2::ZERO {
            self.camera.process_mouse_movement(drag.x, -drag.y);
        }
        if self.input.key_pressed(self.key_bindings.log_camera) {
            let p = self.camera.position();
            log::info!(
                "camera at ({:.3}, {:.3}, {:.3}), yaw {:.1}, pitch {:.1}",
                p.x,
                p.y,
                p.z,
                self.camera.yaw(),
                self.camera.pitch()
            );
        }

        let mut frame = Frame {
            gpu: &self.gpu,
            scene: &mut self.scene,
            camera: &mut self.camera,
            input: &self.input,
            assets: &mut self.assets,
            time,
            dt,
        };
        (self.frame_fn)(&mut frame);

        let result = self
            .forward
            .render(&self.gpu, &mut self.scene, &self.camera, &self.assets);
        self.input.begin_frame();
        result
    }

    fn release(&mut self) {
        self.scene.release();
        self.assets.release();
        self.forward.release();
        log::info!("released GPU resources");
    }
}

impl ApplicationHandler for GlintApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending { config, setup } = std::mem::replace(&mut self.state, AppState::Exited)
        else {
            return;
        };

        match Running::start(event_loop, config, setup) {
            Ok(running) => self.state = AppState::Running(Box::new(running)),
            Err(error) => {
                log::error!("startup failed: {error}");
                self.error = Some(error);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(app) = &mut self.state else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                match app.redraw() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        app.gpu.reconfigure();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("surface out of memory, exiting");
                        event_loop.exit();
                        return;
                    }
                    Err(e) => log::warn!("frame skipped: {e}"),
                }
                app.window.request_redraw();
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let AppState::Running(app) = &mut self.state {
            app.release();
        }
        self.state = AppState::Exited;
    }
}
