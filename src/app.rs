use crate::assets::{self, GameAssets};
use crate::core::gfx::{self, Presenter};
use crate::screens::{Screen as CurrentScreen, ScreenAction, countdown, evaluation, gameplay, intro};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window},
};

use log::{error, info, warn};
use std::{error::Error, path::Path, sync::Arc, time::Instant};

/// High-level screen flow and per-screen state, kept apart from the
/// window/presenter shell.
struct AppState {
    current_screen: CurrentScreen,
    countdown_state: countdown::State,
    gameplay_state: Option<gameplay::State>,
    evaluation_state: Option<evaluation::State>,
    reaction_key: KeyCode,
}

pub struct App {
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    assets: GameAssets,
    state: AppState,
}

impl App {
    fn new(assets: GameAssets, reaction_key: KeyCode) -> Self {
        Self {
            window: None,
            presenter: None,
            assets,
            state: AppState {
                current_screen: CurrentScreen::Intro,
                countdown_state: countdown::init(Instant::now()),
                gameplay_state: None,
                evaluation_state: None,
                reaction_key,
            },
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let config = crate::config::get();
        let mut attributes = Window::default_attributes()
            .with_title("quickdraw")
            .with_inner_size(LogicalSize::new(config.display_width, config.display_height));
        if !config.windowed {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        self.presenter = Some(gfx::init(window.clone())?);
        self.window = Some(window);
        Ok(())
    }

    fn handle_action(&mut self, action: ScreenAction, event_loop: &ActiveEventLoop) {
        match action {
            ScreenAction::None => {}
            ScreenAction::Navigate(target) => self.navigate(target, event_loop),
            ScreenAction::Finish(result) => {
                self.state.evaluation_state = Some(evaluation::init(&result, &self.assets));
                self.state.gameplay_state = None;
                self.state.current_screen = CurrentScreen::Evaluation;
            }
            ScreenAction::Exit => {
                info!("Exit requested. Shutting down.");
                event_loop.exit();
            }
        }
    }

    fn navigate(&mut self, target: CurrentScreen, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        match target {
            CurrentScreen::Intro => {
                self.state.gameplay_state = None;
                self.state.evaluation_state = None;
            }
            CurrentScreen::Countdown => {
                // Fresh round: all session state is rebuilt from scratch.
                self.state.countdown_state = countdown::init(now);
                self.state.gameplay_state = None;
                self.state.evaluation_state = None;
            }
            CurrentScreen::Gameplay => {
                match gameplay::init(&self.assets, self.state.reaction_key, now) {
                    Ok(gameplay_state) => self.state.gameplay_state = Some(gameplay_state),
                    Err(e) => {
                        // Asset validation happens at startup; failing here
                        // means the pack changed under us. Nothing to show.
                        error!("Could not start a session: {e}");
                        event_loop.exit();
                        return;
                    }
                }
            }
            CurrentScreen::Evaluation => {
                warn!("Navigate(Evaluation) without a finish event; ignoring.");
                return;
            }
        }
        self.state.current_screen = target;
    }

    fn handle_key_event(&mut self, event_loop: &ActiveEventLoop, key_event: KeyEvent) {
        // Escape always quits, except on the result screen where it is
        // handled (identically) by the screen itself.
        if self.state.current_screen != CurrentScreen::Evaluation
            && key_event.state == ElementState::Pressed
            && key_event.physical_key == PhysicalKey::Code(KeyCode::Escape)
        {
            self.handle_action(ScreenAction::Exit, event_loop);
            return;
        }

        let action = match self.state.current_screen {
            CurrentScreen::Intro => intro::handle_key(&key_event),
            CurrentScreen::Countdown => ScreenAction::None,
            CurrentScreen::Gameplay => match self.state.gameplay_state.as_mut() {
                Some(gameplay_state) => {
                    gameplay::handle_key(gameplay_state, &key_event, Instant::now())
                }
                None => ScreenAction::None,
            },
            CurrentScreen::Evaluation => match self.state.evaluation_state.as_mut() {
                Some(evaluation_state) => evaluation::handle_key(evaluation_state, &key_event),
                None => ScreenAction::None,
            },
        };
        self.handle_action(action, event_loop);
    }

    fn handle_pointer_pressed(&mut self, event_loop: &ActiveEventLoop) {
        match self.state.current_screen {
            CurrentScreen::Intro => {
                let action = intro::handle_pointer();
                self.handle_action(action, event_loop);
            }
            CurrentScreen::Gameplay => {
                if let Some(gameplay_state) = self.state.gameplay_state.as_mut() {
                    let action = gameplay::handle_pointer(gameplay_state, Instant::now());
                    self.handle_action(action, event_loop);
                }
            }
            CurrentScreen::Countdown | CurrentScreen::Evaluation => {}
        }
    }

    /// One scheduler tick: advance the current screen, then draw it.
    fn tick_and_draw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let action = match self.state.current_screen {
            CurrentScreen::Intro => ScreenAction::None,
            CurrentScreen::Countdown => countdown::update(&mut self.state.countdown_state, now),
            CurrentScreen::Gameplay => match self.state.gameplay_state.as_mut() {
                Some(gameplay_state) => gameplay::update(gameplay_state, now),
                None => ScreenAction::Navigate(CurrentScreen::Countdown),
            },
            CurrentScreen::Evaluation => ScreenAction::None,
        };
        self.handle_action(action, event_loop);

        let frame = match self.state.current_screen {
            CurrentScreen::Intro => intro::draw(&self.assets),
            CurrentScreen::Countdown => countdown::draw(&self.state.countdown_state, &self.assets),
            CurrentScreen::Gameplay => match self.state.gameplay_state.as_ref() {
                Some(gameplay_state) => gameplay::draw(gameplay_state, &self.assets),
                None => return,
            },
            CurrentScreen::Evaluation => match self.state.evaluation_state.as_ref() {
                Some(evaluation_state) => evaluation::draw(evaluation_state),
                None => return,
            },
        }
        .clone();

        if let Some(presenter) = self.presenter.as_mut()
            && let Err(e) = presenter.present(&frame)
        {
            error!("Present failed: {e}");
        }
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

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
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
                if let Some(presenter) = self.presenter.as_mut() {
                    presenter.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => {
                self.handle_key_event(event_loop, key_event);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left | MouseButton::Right | MouseButton::Middle,
                ..
            } => {
                self.handle_pointer_pressed(event_loop);
            }
            WindowEvent::RedrawRequested => {
                self.tick_and_draw(event_loop);
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

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = crate::config::get();
    let assets = assets::load(Path::new(&config.assets_dir))?;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(assets, config.reaction_key);
    event_loop.run_app(&mut app)?;
    Ok(())
}
