//! Window and event loop.
//!
//! [`App`] is the winit [`ApplicationHandler`] hosting a [`Game`]. It creates
//! the window on the first `resumed`, translates window and device events
//! into the game's messages and ticks the game on every redraw.
//!
//! # Event mapping
//!
//! | winit event                    | game message                   |
//! |--------------------------------|--------------------------------|
//! | `Resized`                      | `on_window_size_changed(w, h)` |
//! | `Moved`                        | `on_window_moved`              |
//! | `ScaleFactorChanged`           | `on_display_change`            |
//! | `Focused(true / false)`        | `on_activated / on_deactivated`|
//! | `suspended` / `resumed` again  | `on_suspending / on_resuming`  |
//! | `RedrawRequested`              | `tick`                         |

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::{game::Game, settings::Settings};

pub struct App {
    settings: Settings,
    window: Option<Arc<Window>>,
    game: Option<Game>,
    /// First error that forced the loop to stop, handed back by [`run_with`].
    error: Option<anyhow::Error>,
}

impl App {
    fn new(settings: Settings) -> Self {
        Self {
            settings,
            window: None,
            game: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error.get_or_insert(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(game) = &mut self.game {
            game.on_resuming();
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            return;
        }

        let (width, height) = Game::default_size();
        let window_attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_inner_size(PhysicalSize::new(width, height));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        // The platform may not honour the requested size.
        let size = window.inner_size();
        match Game::initialize(
            window.clone(),
            size.width,
            size.height,
            self.settings.clone(),
        ) {
            Ok(game) => {
                self.game = Some(game);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => self.fail(event_loop, e.context("App initialization failed")),
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(game) = &mut self.game {
            game.on_suspending();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(game) = &mut self.game {
            game.handle_device_event(&event);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let game = match &mut self.game {
            Some(game) => game,
            None => return,
        };

        game.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => game.on_window_size_changed(size.width, size.height),
            WindowEvent::Moved(_) => game.on_window_moved(),
            WindowEvent::ScaleFactorChanged { .. } => game.on_display_change(),
            WindowEvent::Focused(true) => game.on_activated(),
            WindowEvent::Focused(false) => game.on_deactivated(),
            WindowEvent::RedrawRequested => {
                game.tick();
                if game.exit_requested() {
                    event_loop.exit();
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Run the demo with [`Settings::default`].
pub fn run() -> anyhow::Result<()> {
    run_with(Settings::default())
}

pub fn run_with(settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(settings);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
