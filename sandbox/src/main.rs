//! Sandbox entry point: a window, a demo scene, and the frame loop
//!
//! This binary is the application shell around the engine core: it owns
//! the OS window and event pump, drives `Scene::update` and
//! `Renderer::render_scene` once per frame, and blits the viewport
//! texture to the window surface.

use engine::prelude::*;
use glam::{Mat4, Quat, Vec3};
use std::sync::Arc;
use tracing::info;
use winit::{
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    window::WindowAttributes,
};

fn main() {
    engine::init_logging();
    info!("Starting sandbox");

    let event_loop = EventLoop::builder()
        .build()
        .expect("Failed to create event loop");
    let window_attributes = WindowAttributes::default()
        .with_title("Engine Sandbox")
        .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));

    #[allow(deprecated)] // Using create_window on EventLoop for simplicity
    let window = Arc::new(
        event_loop
            .create_window(window_attributes)
            .expect("Failed to create window"),
    );

    // GPU context and surface
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .expect("Failed to create surface");
    let context = Arc::new(
        pollster::block_on(RenderContext::new(instance, Some(&surface)))
            .expect("Failed to create render context"),
    );

    let size = window.inner_size();
    let mut config = context.surface_configuration(&surface, size.width, size.height);
    surface.configure(&context.device, &config);

    let mut renderer = Renderer::new(context.clone(), size.width, size.height);
    let mut assets = AssetManager::new();

    // Skybox faces are optional; without them the clear color shows
    let asset_config = AssetConfig::default();
    let skybox_dir = asset_config.asset_root.join(&asset_config.skybox_dir);
    let faces = engine::graphics::skybox::conventional_face_paths(&skybox_dir, "png");
    if faces.iter().all(|path| path.exists()) {
        if let Err(err) = renderer.set_skybox_faces(faces) {
            tracing::warn!(error = %err, "Skybox failed to load");
        }
    } else {
        renderer.enable_skybox(false);
    }

    let mut scene = Scene::new("Sandbox");
    let spinner = create_demo_scene(&mut scene, &mut assets);

    let mut last_time = std::time::Instant::now();
    let start_time = last_time;
    let window_for_loop = window.clone();

    #[allow(deprecated)] // Using the simpler closure-based API for now
    let _ = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                info!("Window close requested");
                elwt.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    config.width = new_size.width;
                    config.height = new_size.height;
                    surface.configure(&context.device, &config);
                    renderer.set_render_resolution(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = std::time::Instant::now();
                let delta_time = (now - last_time).as_secs_f32();
                last_time = now;

                // Spin the parent cube so the hierarchy and shadows move
                let angle = (now - start_time).as_secs_f32() * 0.6;
                scene.set_local_rotation(spinner, Quat::from_rotation_y(angle));

                scene.update(delta_time);
                renderer.render_scene(&mut scene);

                match surface.get_current_texture() {
                    Ok(frame) => {
                        let view = frame
                            .texture
                            .create_view(&wgpu::TextureViewDescriptor::default());
                        renderer.blit_to(&view, config.format);
                        frame.present();
                    }
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        surface.configure(&context.device, &config);
                    }
                    Err(err) => {
                        tracing::warn!(error = ?err, "Failed to acquire surface frame");
                    }
                }

                window_for_loop.request_redraw();
            }
            _ => {}
        },
        Event::AboutToWait => {
            window_for_loop.request_redraw();
        }
        _ => {}
    });
}

/// Build the demo scene; returns the entity the frame loop spins
fn create_demo_scene(scene: &mut Scene, assets: &mut AssetManager) -> Entity {
    // Camera looking down at the origin
    let camera = scene.create_entity("Main Camera");
    let eye = Vec3::new(0.0, 5.0, 12.0);
    let rotation = Quat::from_mat4(&Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y).inverse());
    scene.set_local_position(camera, eye);
    scene.set_local_rotation(camera, rotation);
    let _ = scene
        .registry_mut()
        .insert_one(camera, Camera::perspective(60.0, 16.0 / 9.0, 0.1, 1000.0));

    // Ground plane
    let ground_model = Arc::new(Model::from_mesh(
        MeshData::plane(24.0, 24.0),
        Material::gray(0.35),
    ));
    assets.insert("builtin://ground", &ground_model);
    let ground = scene.create_entity("Ground Plane");
    scene.set_local_position(ground, Vec3::new(0.0, -1.0, 0.0));
    let _ = scene
        .registry_mut()
        .insert_one(ground, ModelComponent::new(ground_model));

    // Parent cube with an orbiting child, to exercise the hierarchy
    let cube_model = Arc::new(Model::from_mesh(
        MeshData::cube(1.5),
        Material::from_rgb(0.8, 0.3, 0.25),
    ));
    assets.insert("builtin://cube", &cube_model);

    let parent = scene.create_entity("Spinner");
    scene.set_local_position(parent, Vec3::new(0.0, 0.5, 0.0));
    let _ = scene
        .registry_mut()
        .insert_one(parent, ModelComponent::new(cube_model.clone()));

    let child = scene.create_entity_with_parent("Orbiter", parent);
    scene.set_local_position(child, Vec3::new(3.0, 0.8, 0.0));
    scene.set_local_scale(child, Vec3::splat(0.5));
    let _ = scene
        .registry_mut()
        .insert_one(child, ModelComponent::new(cube_model));

    // A sphere off to the side
    let sphere_model = Arc::new(Model::from_mesh(
        MeshData::sphere(0.9, 32, 16),
        Material::from_rgb(0.25, 0.4, 0.8),
    ));
    assets.insert("builtin://sphere", &sphere_model);
    let sphere = scene.create_entity("Sphere");
    scene.set_local_position(sphere, Vec3::new(-3.5, 0.0, 1.0));
    let _ = scene
        .registry_mut()
        .insert_one(sphere, ModelComponent::new(sphere_model));

    // Optional: load a model file passed on the command line
    if let Some(path) = std::env::args().nth(1) {
        scene.load_model(assets, &path, Vec3::new(3.0, -1.0, 2.0), Vec3::ONE);
    }

    info!(
        "Demo scene created with {} root entities",
        scene.root_entities().len()
    );
    parent
}
