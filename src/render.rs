//! The single forward-shading pass that draws a [`Scene`] to the window.
//!
//! Each frame acquires the surface texture, clears colour and depth, lets the
//! scene record its draws and presents. The depth buffer follows the surface
//! size and is recreated lazily when they differ.

use crate::assets::Assets;
use crate::camera::Camera;
use crate::color::Color;
use crate::gpu::{DEPTH_FORMAT, GpuContext};
use crate::scene::Scene;

pub struct ForwardPass {
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    clear_color: wgpu::Color,
}

impl ForwardPass {
    pub fn new(gpu: &GpuContext, clear_color: Color) -> Self {
        let (depth_texture, depth_view) = Self::create_depth_texture(gpu);
        Self {
            depth_texture,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
            clear_color: clear_color.into(),
        }
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color.into();
    }

    fn create_depth_texture(gpu: &GpuContext) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Recreates the depth buffer if the surface was resized.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_texture.destroy();
            let (texture, view) = Self::create_depth_texture(gpu);
            self.depth_texture = texture;
            self.depth_view = view;
            self.depth_size = (gpu.width(), gpu.height());
            log::debug!("depth buffer resized to {}x{}", gpu.width(), gpu.height());
        }
    }

    /// Draws one frame. Surface errors are returned so the caller can decide
    /// whether to reconfigure, skip or exit.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        camera: &Camera,
        assets: &Assets,
    ) -> Result<(), wgpu::SurfaceError> {
        self.ensure_depth_size(gpu);

        let output = gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Forward Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Forward Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            scene.draw(gpu, &mut pass, camera, assets);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn release(&self) {
        self.depth_texture.destroy();
    }
}
