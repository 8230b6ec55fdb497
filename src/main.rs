// =============================================================================
// DAWN'S BALLAD - Vulkan bootstrap
// =============================================================================
//
// A window, a swapchain, and a triangle. The application owns a single
// RenderManager that holds the whole Vulkan object graph; the event loop
// feeds it resize notifications and redraw requests.

mod backend;
mod config;
mod frame;
mod lifecycle;
mod renderer;

use anyhow::{Context, Result};
use config::Config;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use renderer::RenderManager;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowAttributes},
};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = Config::load();
    log::info!("Starting {}", config.window.title);
    log::info!(
        "Window: {}x{}, present mode: {}",
        config.window.width,
        config.window.height,
        config.graphics.present_mode
    );

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop failed")?;
    Ok(())
}

/// Application state. The renderer is declared before the window so it is
/// dropped first; the surface must not outlive the window it targets.
struct App {
    config: Config,
    renderer: Option<RenderManager>,
    window: Option<Arc<Window>>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
        }
    }

    fn init_renderer(&mut self, window: &Window) -> Result<()> {
        let display_handle = window
            .display_handle()
            .context("Failed to get display handle")?
            .as_raw();
        let window_handle = window
            .window_handle()
            .context("Failed to get window handle")?
            .as_raw();
        let size = window.inner_size();

        let renderer = RenderManager::new(
            &self.config,
            display_handle,
            window_handle,
            size.width,
            size.height,
        )?;
        self.renderer = Some(renderer);
        Ok(())
    }

    fn toggle_fullscreen(&self) {
        if let Some(window) = &self.window {
            if window.fullscreen().is_some() {
                window.set_fullscreen(None);
            } else {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e:?}");
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.init_renderer(&window) {
            log::error!("Failed to initialize renderer: {e:#}");
            event_loop.exit();
            return;
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                if let Some(renderer) = &self.renderer {
                    if let Err(e) = renderer.wait_idle() {
                        log::error!("Failed to drain GPU work: {e:#}");
                    }
                }
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
                if let Some(renderer) = &mut self.renderer {
                    renderer.note_resized();
                }
            }

            WindowEvent::RedrawRequested => {
                let size = match &self.window {
                    Some(window) => window.inner_size(),
                    None => return,
                };
                if let Some(renderer) = &mut self.renderer {
                    if let Err(e) = renderer.draw_frame(size.width, size.height) {
                        log::error!("Render error: {e:#}");
                        event_loop.exit();
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        match key {
                            KeyCode::Escape => {
                                log::info!("ESC pressed, exiting...");
                                event_loop.exit();
                            }
                            KeyCode::F11 => {
                                self.toggle_fullscreen();
                            }
                            _ => {}
                        }
                    }
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
}
