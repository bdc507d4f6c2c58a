//! Cobble demo viewer.
//!
//! Clears the screen with a slowly cycling color each frame. Deliberately
//! the smallest possible application: it exists to exercise the full
//! device-selection → swapchain → frame-loop → rebuild → shutdown path.
//!
//! ```bash
//! cargo run -p cobble-viewer
//! ```
//!
//! Set `RUST_LOG` to control log output (e.g. `RUST_LOG=debug`).

use ash::vk;
use cobble_app::{run_app, AppConfig, AppContext, CobbleApp, FrameContext};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

struct ClearViewer {
    elapsed: f32,
}

impl ClearViewer {
    fn clear_color(&self) -> [f32; 4] {
        let t = self.elapsed * 0.5;
        [
            0.5 + 0.5 * t.sin(),
            0.5 + 0.5 * (t + 2.0).sin(),
            0.5 + 0.5 * (t + 4.0).sin(),
            1.0,
        ]
    }
}

impl CobbleApp for ClearViewer {
    fn init(_ctx: &mut AppContext) -> anyhow::Result<Self> {
        Ok(Self { elapsed: 0.0 })
    }

    fn update(&mut self, _ctx: &AppContext, dt: f32) {
        self.elapsed += dt;
    }

    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()> {
        let clear_value = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color(),
            },
        };

        let clear_values = [clear_value];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(ctx.render_pass)
            .framebuffer(frame.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: frame.extent,
            })
            .clear_values(&clear_values);

        unsafe {
            let device = ctx.gpu.device();
            device.cmd_begin_render_pass(
                frame.command_buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
            device.cmd_end_render_pass(frame.command_buffer);
        }

        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    run_app::<ClearViewer>(AppConfig::new("Cobble Viewer").with_size(WIDTH, HEIGHT))
}
