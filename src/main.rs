mod actions;
mod app;
mod config;
mod reminder;
mod sound;
mod tray;
mod vars;
mod windows;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder};

use app::{EventSink, PetApp, UserEvent};
use config::Config;
use pet_core::Expression;
use reminder::Reminder;
use windows::PetWindow;

const TARGET_FPS: f32 = 30.0;

fn main() {
    // Initialize logging
    env_logger::init();

    let config = Config::load_or_default("pet.toml");

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let proxy = Mutex::new(event_loop.create_proxy());
    let events: EventSink = Arc::new(move |event| {
        if proxy.lock().send_event(event).is_err() {
            log::debug!("Event loop closed, dropping event");
        }
    });

    // --- 1. APP STATE ---
    let mut app = PetApp::new(config.clone(), events.clone());

    // --- 2. WINDOW ---
    let mut window = match PetWindow::new(&event_loop, &config, app.expressions()) {
        Ok(window) => window,
        Err(e) => {
            log::error!("Failed to create pet window: {}", e);
            std::process::exit(1);
        }
    };

    // --- 3. TRAY ---
    let tray = match tray::setup_tray(app.expressions().image(Expression::Close), &config.window.title) {
        Ok(tray) => Some(tray),
        Err(e) => {
            log::warn!("Tray icon unavailable: {}", e);
            None
        }
    };

    // --- 4. SAVE REMINDER ---
    let mut reminder = config.reminder.enabled.then(|| {
        let events = events.clone();
        Reminder::start(config.reminder.interval(), move || events(UserEvent::Reminder))
    });

    let frame_time = Duration::from_secs_f32(1.0 / TARGET_FPS);
    let mut last_frame = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + frame_time);

        match event {
            Event::UserEvent(event) => app.handle_user_event(event),

            Event::WindowEvent {
                window_id,
                event: WindowEvent::CloseRequested,
                ..
            } if window_id == window.window_id() => {
                *control_flow = ControlFlow::Exit;
            }

            Event::WindowEvent { window_id, event, .. } if window_id == window.window_id() => {
                window.on_event(&event);
            }

            Event::MainEventsCleared => {
                let now = Instant::now();
                let delta = now.duration_since(last_frame).as_secs_f32();
                last_frame = now;

                app.update(delta);

                if let Some(tray) = tray.as_ref() {
                    while let Some(command) = tray::poll_menu_event(&tray.menu_ids) {
                        app.handle_tray(command);
                    }
                }

                if app.should_quit() {
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                window.request_redraw();
            }

            Event::RedrawRequested(window_id) if window_id == window.window_id() => {
                for action in window.render(&mut app) {
                    app.apply(action);
                }
            }

            Event::LoopDestroyed => {
                if let Some(reminder) = reminder.as_mut() {
                    reminder.stop();
                }
                log::info!("Bye");
            }

            _ => (),
        }
    });
}
