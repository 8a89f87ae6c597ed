use env_logger::Env;
use glint::{
    AppConfig, Color, FilterMode, Frame, ObjectId, SphereNormals, TextureOptions, Transform, Vec3,
};

const PYRAMID_OBJ: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/pyramid.obj");
const PYRAMID_TEXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/checker.ppm");

const GRID: i32 = 3;
const GRID_SPACING: f32 = 2.0;
const ORBIT_RADIUS: f32 = 3.5;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let horizon = Color::from_hex("#1c2233")?;
    let zenith = Color::from_hex("#5d8fd1")?;
    let floor_light = Color::from_hsl(210.0, 15.0, 70.0, 1.0);
    let floor_dark = Color::from_hsl(210.0, 20.0, 35.0, 1.0);

    let config = AppConfig::new()
        .title("Glint")
        .size(1280, 720)
        .clear_color(horizon);

    glint::run_with_config(config, move |ctx| {
        let lit = ctx.lit_shader()?;
        let sky = ctx.sky_shader()?;

        let sky_texture = ctx.gradient(128, horizon, zenith)?;
        let floor_texture = ctx.checkerboard(
            512,
            16,
            floor_light,
            floor_dark,
            TextureOptions::new().filter(FilterMode::Nearest),
        )?;
        let cube_texture = ctx.checkerboard(
            64,
            4,
            Color::from_hsl(20.0, 80.0, 60.0, 1.0),
            Color::WHITE,
            TextureOptions::new().filter(FilterMode::Nearest),
        )?;
        let ball_texture = ctx.solid(Color::from_hsl(140.0, 60.0, 55.0, 1.0))?;
        let pyramid_texture = ctx.load_texture(
            PYRAMID_TEXTURE,
            TextureOptions::new().filter(FilterMode::Nearest),
        );

        let dome = ctx.mesh_sphere(50.0, 32, 16, SphereNormals::Inward, sky_texture)?;
        let floor = ctx.mesh_plane(20.0, 20.0, floor_texture)?;
        let cube = ctx.mesh_cube(1.0, 1.0, 1.0, cube_texture)?;
        let ball = ctx.mesh_sphere(0.5, 32, 16, SphereNormals::Outward, ball_texture)?;
        let pyramid = ctx.load_obj_with(PYRAMID_OBJ, pyramid_texture, |geometry| {
            geometry.recenter();
            geometry.normalize();
        });

        // The dome is drawn first and never writes depth.
        let dome = ctx.add_object(dome, sky, Transform::new());
        ctx.add_object(
            floor,
            lit,
            Transform::new()
                .position(Vec3::new(-10.0, -1.0, 10.0))
                .rotation(Vec3::new(-90.0, 0.0, 0.0)),
        );

        let mut cubes: Vec<ObjectId> = Vec::new();
        for row in 0..GRID {
            for col in 0..GRID {
                let position = Vec3::new(
                    (col - GRID / 2) as f32 * GRID_SPACING,
                    0.0,
                    -5.0 - row as f32 * GRID_SPACING,
                );
                cubes.push(ctx.add_object(cube, lit, Transform::from_position(position)));
            }
        }

        let ball = ctx.add_object(ball, lit, Transform::new());
        ctx.add_object(
            pyramid,
            lit,
            Transform::from_position(Vec3::new(0.0, 0.0, -1.0)).uniform_scale(0.75),
        );

        let grid_center = Vec3::new(0.0, 0.0, -5.0 - (GRID - 1) as f32 * GRID_SPACING / 2.0);

        Ok(move |frame: &mut Frame| {
            let camera_position = frame.camera.position();
            if let Some(dome) = frame.scene.object_mut(dome) {
                dome.set_position(camera_position);
            }

            for (i, &id) in cubes.iter().enumerate() {
                if let Some(cube) = frame.scene.object_mut(id) {
                    let speed = 20.0 + i as f32 * 10.0;
                    cube.rotate_object(Vec3::new(0.5, 1.0, 0.0) * speed * frame.dt);
                }
            }

            if let Some(ball) = frame.scene.object_mut(ball) {
                let angle = frame.time * 0.8;
                let offset = Vec3::new(angle.cos(), 0.6, angle.sin()) * ORBIT_RADIUS;
                ball.set_position(grid_center + offset);
            }

            let sweep = frame.time * 0.25;
            frame.scene.light_mut().direction = Vec3::new(sweep.cos(), -1.0, sweep.sin());
        })
    })?;

    Ok(())
}
