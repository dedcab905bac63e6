use bytemuck::{Pod, Zeroable};
use log::{error, info, warn};
use rendev::config::GfxConfig;
use rendev::gfx::{
    BlendState, ClearCommand, ClearMask, Color, Compare, Cull, DrawCommand, Gfx, IndexFormat,
    MeshId, ShaderData, ShaderId, TextureFilter, TextureFormat, TextureId, TextureSampler,
    TextureWrap, UniformType, VertexElement, VertexFormat, VertexType,
};
use std::error::Error;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

const VERTEX_SHADER: &str = r#"#version 330 core
layout(location = 0) in vec2 a_pos;
layout(location = 1) in vec2 a_uv;
out vec2 v_uv;
void main() {
    v_uv = a_uv;
    gl_Position = vec4(a_pos, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 330 core
in vec2 v_uv;
uniform sampler2D u_texture;
uniform vec4 u_tint;
out vec4 o_color;
void main() {
    o_color = texture(u_texture, v_uv) * u_tint;
}
"#;

const CHECKER_SIZE: i32 = 8;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD: [Vertex; 4] = [
    Vertex { pos: [-0.5, -0.5], uv: [0.0, 1.0] },
    Vertex { pos: [0.5, -0.5], uv: [1.0, 1.0] },
    Vertex { pos: [0.5, 0.5], uv: [1.0, 0.0] },
    Vertex { pos: [-0.5, 0.5], uv: [0.0, 0.0] },
];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// GPU objects the demo draws every frame.
struct Scene {
    shader: ShaderId,
    mesh: MeshId,
    texture: TextureId,
    tint: Option<usize>,
}

fn checkerboard() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((CHECKER_SIZE * CHECKER_SIZE * 4) as usize);
    for y in 0..CHECKER_SIZE {
        for x in 0..CHECKER_SIZE {
            let v = if (x + y) % 2 == 0 { 0xff } else { 0x40 };
            pixels.extend_from_slice(&[v, v, v, 0xff]);
        }
    }
    pixels
}

impl Scene {
    fn build(gfx: &mut Gfx) -> Result<Self, Box<dyn Error>> {
        let texture = gfx
            .texture_create(CHECKER_SIZE, CHECKER_SIZE, TextureFormat::R8G8B8A8)
            .ok_or("failed to create texture")?;
        gfx.texture_set_data(texture, &checkerboard());

        let shader = gfx
            .shader_create(&ShaderData {
                vertex: VERTEX_SHADER,
                fragment: FRAGMENT_SHADER,
            })
            .ok_or("failed to create shader")?;

        let uniforms = gfx.shader_get_uniforms(shader);
        let find = |name: &str, ty: UniformType| {
            uniforms
                .iter()
                .find(|u| u.name == name && u.ty == ty)
                .map(|u| u.index)
        };
        match find("u_texture", UniformType::Texture2D) {
            Some(index) => {
                gfx.shader_set_texture(shader, index, &[Some(texture)]);
                gfx.shader_set_sampler(
                    shader,
                    index,
                    &[TextureSampler::new(TextureFilter::Nearest, TextureWrap::Repeat)],
                );
            }
            None => warn!("Shader has no u_texture uniform."),
        }
        let tint = find("u_tint", UniformType::Float4);

        let mesh = gfx.mesh_create().ok_or("failed to create mesh")?;
        gfx.mesh_set_vertex_format(
            mesh,
            &VertexFormat::packed(&[
                VertexElement {
                    index: 0,
                    ty: VertexType::Float2,
                    normalized: false,
                },
                VertexElement {
                    index: 1,
                    ty: VertexType::Float2,
                    normalized: false,
                },
            ]),
        );
        gfx.mesh_set_index_format(mesh, IndexFormat::Sixteen);
        gfx.mesh_set_vertex_data(mesh, bytemuck::cast_slice(&QUAD), 0);
        gfx.mesh_set_index_data(mesh, bytemuck::cast_slice(&QUAD_INDICES), 0);

        Ok(Self {
            shader,
            mesh,
            texture,
            tint,
        })
    }

    fn draw(&self, gfx: &mut Gfx, seconds: f32) {
        gfx.clear(&ClearCommand {
            target: None,
            color: Color::from_rgba(0x1a1a_2eff),
            depth: 1.0,
            stencil: 0,
            mask: ClearMask::COLOR | ClearMask::DEPTH | ClearMask::STENCIL,
        });

        if let Some(index) = self.tint {
            let pulse = 0.75 + 0.25 * seconds.sin();
            gfx.shader_set_uniform(self.shader, index, &[pulse, pulse, 1.0, 1.0]);
        }
        gfx.draw(&DrawCommand {
            target: None,
            mesh: self.mesh,
            shader: self.shader,
            viewport: None,
            scissor: None,
            index_start: 0,
            index_count: QUAD_INDICES.len(),
            instance_count: 0,
            compare: Compare::None,
            depth_mask: false,
            cull: Cull::None,
            blend: BlendState::ALPHA,
        });
    }

    fn destroy(self, gfx: &mut Gfx) {
        gfx.shader_destroy(self.shader);
        gfx.mesh_destroy(self.mesh);
        gfx.texture_destroy(self.texture);
    }
}

pub struct App {
    config: GfxConfig,
    window: Option<Window>,
    gfx: Option<Gfx>,
    scene: Option<Scene>,
    start_time: Instant,
}

impl App {
    fn new(config: GfxConfig) -> Self {
        Self {
            config,
            window: None,
            gfx: None,
            scene: None,
            start_time: Instant::now(),
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let mut gfx = Gfx::new(self.config.renderer, &self.config)?;
        if let Some(hints) = gfx.prepare() {
            info!("Context hints: {hints:?}");
        }

        let window_attributes = Window::default_attributes()
            .with_title(format!("rendev - {}", gfx.renderer()))
            .with_resizable(true)
            .with_transparent(false)
            .with_inner_size(PhysicalSize::new(960, 540));
        let window = event_loop.create_window(window_attributes)?;

        gfx.start(&window)?;
        self.scene = Some(Scene::build(&mut gfx)?);
        self.gfx = Some(gfx);
        self.window = Some(window);
        info!("Starting event loop...");
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(mut gfx) = self.gfx.take() {
            if let Some(scene) = self.scene.take() {
                scene.destroy(&mut gfx);
            }
            gfx.shutdown();
        }
        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none()
            && let Err(e) = self.init_graphics(event_loop)
        {
            error!("Failed to initialize graphics: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window_id != window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested. Shutting down.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width > 0
                    && new_size.height > 0
                    && let Some(gfx) = &mut self.gfx
                {
                    gfx.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let seconds = self.start_time.elapsed().as_secs_f32();
                if let (Some(gfx), Some(scene)) = (&mut self.gfx, &self.scene) {
                    gfx.frame_begin();
                    scene.draw(gfx, seconds);
                    gfx.frame_end();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}

pub fn run(config: GfxConfig) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
