//! Common utilities for device integration tests.
//!
//! Every test runs against the recording [`DummyBackend`] through a
//! [`HeadlessWindow`], so the native calls issued by the device can be
//! counted and inspected.

#![allow(dead_code)]

use ember_core::IntVector2;
use ember_graphics::backend::dummy::DummyBackend;
use ember_graphics::{
    DisplayMode, ElementSemantic, ElementType, Graphics, HeadlessWindow, ImageFormat,
    ResourceUsage, ShaderStage, ShaderVariationId, TextureId, TextureType, VertexBufferId,
    VertexElement,
};

/// The device type used by the tests.
pub type TestGraphics = Graphics<DummyBackend, HeadlessWindow>;

/// Vertex shader consuming a position and a color.
pub const COLOR_VS: &str = "\
#version 150
in vec3 position;
in vec4 color;
uniform PerFrameVS0
{
    mat4 viewProj;
};
void main() {}
";

/// Pixel shader sampling one texture.
pub const TEXTURED_PS: &str = "\
#version 150
uniform sampler2D diffuseTex0;
uniform MaterialPS1
{
    vec4 diffuseColor;
};
void main() {}
";

/// Vertex shader with a per-instance world matrix row.
pub const INSTANCED_VS: &str = "\
in vec3 position;
in vec4 texCoord4;
void main() {}
";

/// Plain pixel shader.
pub const PLAIN_PS: &str = "void main() {}\n";

/// Install the test logger once. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a device with an open 640x480 backbuffer.
pub fn open_device() -> TestGraphics {
    init_logging();
    let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
    graphics
        .set_mode(&DisplayMode::new(640, 480).with_resizable(true))
        .expect("headless mode set");
    graphics.take_events();
    graphics
}

/// Define a shader and return its variation for `defines`.
pub fn variation(
    graphics: &mut TestGraphics,
    stage: ShaderStage,
    name: &str,
    source: &str,
    defines: &str,
) -> ShaderVariationId {
    let shader = graphics.create_shader();
    graphics
        .define_shader(shader, stage, name, source)
        .expect("shader defined");
    graphics
        .create_variation(shader, defines)
        .expect("variation created")
}

/// Bind a vertex and pixel shader pair built from the given sources.
pub fn bind_shaders(graphics: &mut TestGraphics, vs_source: &str, ps_source: &str) {
    let vs = variation(graphics, ShaderStage::Vertex, "Test", vs_source, "");
    let ps = variation(graphics, ShaderStage::Pixel, "Test", ps_source, "");
    graphics.set_shaders(Some(vs), Some(ps));
}

/// Elements of a position + color vertex, 28 bytes per vertex.
pub fn color_vertex_elements() -> Vec<VertexElement> {
    vec![
        VertexElement::new(ElementType::Vector3, ElementSemantic::Position),
        VertexElement::new(ElementType::Vector4, ElementSemantic::Color),
    ]
}

/// Create a triangle vertex buffer with the position + color layout.
pub fn triangle_buffer(graphics: &mut TestGraphics, shadow: bool) -> VertexBufferId {
    let vertices: [f32; 21] = [
        0.0, 0.5, 0.0, 1.0, 0.0, 0.0, 1.0, //
        -0.5, -0.5, 0.0, 0.0, 1.0, 0.0, 1.0, //
        0.5, -0.5, 0.0, 0.0, 0.0, 1.0, 1.0,
    ];
    let buffer = graphics.create_vertex_buffer();
    graphics
        .define_vertex_buffer(
            buffer,
            ResourceUsage::Default,
            3,
            &color_vertex_elements(),
            shadow,
            Some(bytemuck::cast_slice(&vertices)),
        )
        .expect("vertex buffer defined");
    buffer
}

/// Create a render target texture.
pub fn render_target(
    graphics: &mut TestGraphics,
    width: i32,
    height: i32,
    format: ImageFormat,
) -> TextureId {
    let texture = graphics.create_texture();
    graphics
        .define_texture(
            texture,
            TextureType::Tex2D,
            ResourceUsage::RenderTarget,
            IntVector2::new(width, height),
            format,
            1,
            &[],
        )
        .expect("render target defined");
    texture
}
