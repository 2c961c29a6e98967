//! Pet window using egui with tao/wgpu integration
//!
//! One borderless, always-on-top window holds the avatar, the dialog box and
//! the small egui windows for the function menu, prompts and the full text.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use egui::text::{LayoutJob, TextFormat};
use egui::{FontData, FontDefinitions, FontFamily, FontId, TextureHandle};
use egui_wgpu::ScreenDescriptor;
use tao::dpi::{LogicalPosition, LogicalSize};
use tao::event::WindowEvent;
use tao::event_loop::EventLoop;
use tao::window::{Window, WindowBuilder, WindowId};
use thiserror::Error;
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};

use pet_core::{DialogSpan, Expression, ExpressionSet};
use pet_services::Credentials;

use crate::actions::{MenuChoice, Prompt, PromptAnswer};
use crate::app::{PetApp, UiAction, UserEvent, REMINDER_TAG};
use crate::config::Config;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Failed to create window: {0}")]
    Os(#[from] tao::error::OsError),
    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("Failed to find a suitable adapter")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("Surface reports no texture formats")]
    NoSurfaceFormat,
}

/// Visual theme for the pet window
pub struct PetTheme {
    pub bg_color: egui::Color32,
    pub rounding: f32,
    pub dialog_bg: egui::Color32,
    pub text_color: egui::Color32,
    pub reminder_color: egui::Color32,
    pub text_size: f32,
    pub dialog_height: f32,
    pub button_width: f32,
}

fn ui_design(config: &Config) -> PetTheme {
    let alpha = (config.window.opacity.clamp(0.0, 1.0) * 255.0) as u8;
    PetTheme {
        bg_color: egui::Color32::from_rgba_unmultiplied(250, 246, 236, alpha),
        rounding: 10.0,
        dialog_bg: egui::Color32::from_rgb(255, 255, 255),
        text_color: egui::Color32::from_rgb(40, 40, 48),
        reminder_color: egui::Color32::from_rgb(200, 60, 40),
        text_size: 14.0,
        dialog_height: 150.0,
        button_width: 110.0,
    }
}

/// Prompt input fields, reset whenever a new prompt opens
#[derive(Default)]
struct PromptInput {
    prompt: Option<Prompt>,
    text: String,
    appid: String,
    key: String,
    focus_pending: bool,
}

/// Everything the UI closure reads, copied out of the app before the frame
struct FrameData {
    avatar: Option<(egui::TextureId, egui::Vec2)>,
    spans: Vec<DialogSpan>,
    scroll_to_end: bool,
    expand_visible: bool,
    full_text: String,
    prompt: Option<Prompt>,
    menu_open: bool,
}

pub struct PetWindow {
    window: Arc<Window>,
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    egui_ctx: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    start_time: Instant,
    textures: HashMap<Expression, TextureHandle>,
    theme: PetTheme,
    input: PromptInput,
    full_text_open: bool,
}

impl PetWindow {
    pub fn new(
        event_loop: &EventLoop<UserEvent>,
        config: &Config,
        expressions: &ExpressionSet,
    ) -> Result<Self, WindowError> {
        let window_config = &config.window;
        let window = WindowBuilder::new()
            .with_inner_size(LogicalSize::new(window_config.size[0], window_config.size[1]))
            .with_position(LogicalPosition::new(
                window_config.position[0],
                window_config.position[1],
            ))
            .with_title(&window_config.title)
            .with_transparent(true)
            .with_decorations(false)
            .with_always_on_top(window_config.always_on_top)
            .build(event_loop)?;
        let window = Arc::new(window);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(WindowError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Pet Window Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        // egui writes gamma-space colors
        let format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(WindowError::NoSurfaceFormat)?;

        // Transparent corners need a compositing alpha mode
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|mode| surface_caps.alpha_modes.contains(mode))
        .or_else(|| surface_caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::light());
        if let Some(path) = &config.dialog.font {
            load_font(&egui_ctx, path);
        }

        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1);

        let textures = expressions
            .available()
            .into_iter()
            .map(|expression| {
                let image = expressions.image(expression);
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    [image.width() as usize, image.height() as usize],
                    image.as_raw(),
                );
                let texture = egui_ctx.load_texture(
                    expression.as_str(),
                    color_image,
                    egui::TextureOptions::LINEAR,
                );
                (expression, texture)
            })
            .collect();

        log::info!(
            "Pet window created: {}x{} ({:?}, {:?})",
            surface_config.width,
            surface_config.height,
            format,
            alpha_mode
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config: surface_config,
            egui_ctx,
            egui_renderer,
            start_time: Instant::now(),
            textures,
            theme: ui_design(config),
            input: PromptInput::default(),
            full_text_open: false,
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    fn reconfigure(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Feed a window event into egui
    pub fn on_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.reconfigure(size.width, size.height),
            WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                self.reconfigure(new_inner_size.width, new_inner_size.height)
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == tao::event::ElementState::Pressed;

                use tao::keyboard::KeyCode;
                let egui_key = match event.physical_key {
                    KeyCode::Escape => Some(egui::Key::Escape),
                    KeyCode::Tab => Some(egui::Key::Tab),
                    KeyCode::Backspace => Some(egui::Key::Backspace),
                    KeyCode::Enter | KeyCode::NumpadEnter => Some(egui::Key::Enter),
                    KeyCode::Space => Some(egui::Key::Space),
                    KeyCode::Delete => Some(egui::Key::Delete),
                    KeyCode::ArrowLeft => Some(egui::Key::ArrowLeft),
                    KeyCode::ArrowRight => Some(egui::Key::ArrowRight),
                    KeyCode::ArrowUp => Some(egui::Key::ArrowUp),
                    KeyCode::ArrowDown => Some(egui::Key::ArrowDown),
                    KeyCode::Home => Some(egui::Key::Home),
                    KeyCode::End => Some(egui::Key::End),
                    KeyCode::KeyA => Some(egui::Key::A),
                    KeyCode::KeyC => Some(egui::Key::C),
                    KeyCode::KeyV => Some(egui::Key::V),
                    KeyCode::KeyX => Some(egui::Key::X),
                    _ => None,
                };

                self.egui_ctx.input_mut(|i| {
                    if let Some(key) = egui_key {
                        i.events.push(egui::Event::Key {
                            key,
                            physical_key: None,
                            pressed,
                            repeat: event.repeat,
                            modifiers: i.modifiers,
                        });
                    }
                    if pressed {
                        if let Some(text) = event.text {
                            if !text.chars().all(|c| c.is_control()) {
                                i.events.push(egui::Event::Text(text.to_string()));
                            }
                        }
                    }
                });
            }
            WindowEvent::ReceivedImeText(text) => {
                self.egui_ctx.input_mut(|i| i.events.push(egui::Event::Text(text.clone())));
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.egui_ctx.input_mut(|i| {
                    i.modifiers.alt = modifiers.alt_key();
                    i.modifiers.ctrl = modifiers.control_key();
                    i.modifiers.shift = modifiers.shift_key();
                    i.modifiers.mac_cmd = modifiers.super_key();
                    i.modifiers.command = if cfg!(target_os = "macos") {
                        modifiers.super_key()
                    } else {
                        modifiers.control_key()
                    };
                });
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale_factor = self.window.scale_factor() as f32;
                let pos = egui::pos2(
                    position.x as f32 / scale_factor,
                    position.y as f32 / scale_factor,
                );
                self.egui_ctx.input_mut(|i| i.events.push(egui::Event::PointerMoved(pos)));
            }
            WindowEvent::CursorLeft { .. } => {
                self.egui_ctx.input_mut(|i| i.events.push(egui::Event::PointerGone));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == tao::event::ElementState::Pressed;
                let egui_button = match button {
                    tao::event::MouseButton::Left => egui::PointerButton::Primary,
                    tao::event::MouseButton::Right => egui::PointerButton::Secondary,
                    tao::event::MouseButton::Middle => egui::PointerButton::Middle,
                    _ => return,
                };
                self.push_pointer_button(egui_button, pressed);
            }
            WindowEvent::Focused(focused) => {
                self.egui_ctx.input_mut(|i| i.focused = *focused);
            }
            _ => {}
        }
    }

    fn push_pointer_button(&self, button: egui::PointerButton, pressed: bool) {
        self.egui_ctx.input_mut(|i| {
            i.events.push(egui::Event::PointerButton {
                pos: i.pointer.latest_pos().unwrap_or_default(),
                button,
                pressed,
                modifiers: i.modifiers,
            });
        });
    }

    fn frame_data(&mut self, app: &mut PetApp) -> FrameData {
        let avatar = self
            .textures
            .get(&app.current_expression())
            .map(|texture| (texture.id(), texture.size_vec2()));

        let prompt = app.active_prompt().cloned();
        if prompt != self.input.prompt {
            self.input = PromptInput {
                focus_pending: prompt.is_some(),
                prompt: prompt.clone(),
                ..Default::default()
            };
        }

        FrameData {
            avatar,
            spans: app.dialog().spans().to_vec(),
            scroll_to_end: app.take_scroll_request(),
            expand_visible: app.state().expand_visible(),
            full_text: app.state().full_text(),
            prompt,
            menu_open: app.menu_open(),
        }
    }

    /// Draw one frame and return what the user did in it
    pub fn render(&mut self, app: &mut PetApp) -> Vec<UiAction> {
        let data = self.frame_data(app);
        let mut actions = Vec::new();

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost) => {
                self.surface.configure(&self.device, &self.config);
                return actions;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Pet window: Out of memory");
                actions.push(UiAction::Quit);
                return actions;
            }
            Err(e) => {
                log::error!("Pet window surface error: {:?}", e);
                return actions;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // screen_rect is in logical pixels
        let scale_factor = self.window.scale_factor() as f32;
        self.egui_ctx.set_pixels_per_point(scale_factor);
        let raw_input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(
                    self.config.width as f32 / scale_factor,
                    self.config.height as f32 / scale_factor,
                ),
            )),
            time: Some(self.start_time.elapsed().as_secs_f64()),
            predicted_dt: 1.0 / 30.0,
            ..Default::default()
        };

        let theme = &self.theme;
        let input = &mut self.input;
        let mut full_text_open = self.full_text_open;
        let mut drag = false;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::CentralPanel::default()
                .frame(
                    egui::Frame::none()
                        .fill(theme.bg_color)
                        .rounding(theme.rounding)
                        .inner_margin(egui::Margin::same(8.0)),
                )
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if let Some((texture_id, size)) = data.avatar {
                            let response = ui.add(
                                egui::Image::new((texture_id, size))
                                    .sense(egui::Sense::click_and_drag()),
                            );
                            if response.drag_started() {
                                drag = true;
                            }
                        }

                        ui.vertical(|ui| {
                            let button_size = egui::vec2(theme.button_width, 0.0);
                            if ui.add(egui::Button::new("Menu").min_size(button_size)).clicked() {
                                actions.push(UiAction::ToggleMenu);
                            }
                            if data.expand_visible
                                && ui
                                    .add(egui::Button::new("View full text").min_size(button_size))
                                    .clicked()
                            {
                                full_text_open = true;
                            }
                            if ui.add(egui::Button::new("Close").min_size(button_size)).clicked() {
                                actions.push(UiAction::Quit);
                            }
                        });
                    });

                    ui.add_space(6.0);
                    egui::Frame::none()
                        .fill(theme.dialog_bg)
                        .rounding(6.0)
                        .inner_margin(egui::Margin::same(6.0))
                        .show(ui, |ui| {
                            egui::ScrollArea::vertical()
                                .auto_shrink([false, false])
                                .max_height(theme.dialog_height)
                                .stick_to_bottom(true)
                                .show(ui, |ui| {
                                    let job = dialog_job(&data.spans, theme, ui.available_width());
                                    let response =
                                        ui.add(egui::Label::new(job).sense(egui::Sense::click()));
                                    if response.clicked() {
                                        actions.push(UiAction::Skip);
                                    }
                                    if data.scroll_to_end {
                                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                                    }
                                });
                        });
                });

            if data.menu_open {
                egui::Window::new("Function Menu")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        for choice in MenuChoice::ALL {
                            if ui.button(choice.label()).clicked() {
                                actions.push(UiAction::Choose(choice));
                            }
                        }
                        ui.separator();
                        if ui.button("Close").clicked() {
                            actions.push(UiAction::CloseMenu);
                        }
                    });
            }

            if let Some(prompt) = &data.prompt {
                if let Some(answer) = prompt_window(ctx, prompt, input) {
                    actions.push(UiAction::Answer(answer));
                }
            }

            if full_text_open {
                egui::Window::new("Full text")
                    .open(&mut full_text_open)
                    .collapsible(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        egui::ScrollArea::vertical().max_height(200.0).show(ui, |ui| {
                            ui.label(egui::RichText::new(&data.full_text).size(theme.text_size));
                        });
                    });
            }
        });

        self.full_text_open = full_text_open;

        if drag {
            if let Err(e) = self.window.drag_window() {
                log::warn!("Failed to drag window: {}", e);
            }
            // The OS eats the release while dragging
            self.push_pointer_button(egui::PointerButton::Primary, false);
        }

        let clipped_primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }

        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: scale_factor,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pet Encoder"),
            });

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pet Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        actions
    }
}

/// Dialog spans as one layout, reminder text in its own color
fn dialog_job(spans: &[DialogSpan], theme: &PetTheme, width: f32) -> LayoutJob {
    let mut job = LayoutJob::default();
    for span in spans {
        let color = match span.tag.as_deref() {
            Some(REMINDER_TAG) => theme.reminder_color,
            _ => theme.text_color,
        };
        job.append(
            &span.text,
            0.0,
            TextFormat {
                color,
                font_id: FontId::proportional(theme.text_size),
                ..Default::default()
            },
        );
    }
    job.wrap.max_width = width;
    job
}

/// Show the prompt dialog; returns the answer once the user submits or cancels.
fn prompt_window(ctx: &egui::Context, prompt: &Prompt, input: &mut PromptInput) -> Option<PromptAnswer> {
    let mut answer = None;

    egui::Window::new(prompt.title())
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(prompt.label());

            let submitted = if *prompt == Prompt::Credentials {
                ui.horizontal(|ui| {
                    ui.label("APPID:");
                    let response = ui.text_edit_singleline(&mut input.appid);
                    if std::mem::take(&mut input.focus_pending) {
                        response.request_focus();
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Key:");
                    let response = ui.add(egui::TextEdit::singleline(&mut input.key).password(true));
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter))
                })
                .inner
            } else {
                let response = ui.text_edit_singleline(&mut input.text);
                if std::mem::take(&mut input.focus_pending) {
                    response.request_focus();
                }
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter))
            };

            ui.horizontal(|ui| {
                let ok = ui.button("OK").clicked();
                let cancel = ui.button("Cancel").clicked()
                    || ui.input(|i| i.key_pressed(egui::Key::Escape));

                if ok || submitted {
                    answer = Some(if *prompt == Prompt::Credentials {
                        PromptAnswer::Credentials(Credentials::new(&input.appid, &input.key))
                    } else {
                        PromptAnswer::Text(input.text.clone())
                    });
                } else if cancel {
                    answer = Some(PromptAnswer::Cancelled);
                }
            });
        });

    answer
}

/// Add `path` as a fallback font for every family.
fn load_font(ctx: &egui::Context, path: &str) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Failed to load font {}: {}", path, e);
            return;
        }
    };

    let mut defs = FontDefinitions::default();
    defs.font_data
        .insert("dialog".to_owned(), FontData::from_owned(bytes));
    for family in [FontFamily::Proportional, FontFamily::Monospace] {
        defs.families
            .entry(family)
            .or_default()
            .push("dialog".to_owned());
    }
    ctx.set_fonts(defs);
    log::info!("Loaded dialog font {}", path);
}
