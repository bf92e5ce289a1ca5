//! Application shell — window layout, menu, status bar, keyboard handling,
//! and the save-then-load swap when the selected image changes.

use std::sync::mpsc;

use eframe::egui;

use crate::canvas::{Canvas, CanvasState};
use crate::components::dialogs::AboutDialog;
use crate::components::file_list::{FileListAction, FileListPanel};
use crate::components::tools::ToolsPanel;
use crate::io::{self, FileHandler, IoResult};
use crate::project::Project;
use crate::settings::AppSettings;
use crate::{log_err, log_info, log_warn};

pub struct MaskTagApp {
    project: Option<Project>,
    /// Image + mask currently on the canvas.
    state: Option<CanvasState>,

    canvas: Canvas,
    tools: ToolsPanel,
    file_handler: FileHandler,
    settings: AppSettings,
    about: AboutDialog,

    /// Persistent status bar message.
    status: String,

    // Background load pipeline
    io_sender: mpsc::Sender<IoResult>,
    io_receiver: mpsc::Receiver<IoResult>,
    /// Request id of the most recent load; stale results are dropped.
    load_token: u64,
    /// When > 0, a decode is in flight; the status bar shows a spinner.
    pending_loads: usize,
}

impl MaskTagApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();

        let mut tools = ToolsPanel::default();
        tools.properties.pressure_gain = settings.pressure_gain;
        tools.properties.fallback_pressure = settings.fallback_pressure;
        tools.overlay_alpha = settings.overlay_alpha;
        tools.mask_only = settings.mask_only;

        let file_handler = FileHandler::new(settings.last_project_directory.clone());
        let (io_sender, io_receiver) = mpsc::channel();

        Self {
            project: None,
            state: None,
            canvas: Canvas::new(),
            tools,
            file_handler,
            settings,
            about: AboutDialog::default(),
            status: "Initialized".to_string(),
            io_sender,
            io_receiver,
            load_token: 0,
            pending_loads: 0,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    // ---- project lifecycle ------------------------------------------------

    fn open_project_dialog(&mut self) {
        if let Some(path) = self.file_handler.pick_project_dir() {
            self.open_project(path);
        }
    }

    fn open_project(&mut self, path: std::path::PathBuf) {
        self.close_project();

        match Project::open(path.clone()) {
            Ok(project) => {
                log_info!("opened project {:?} ({} items)", path, project.len());
                self.set_status(format!("Opened {} ({} images)", path.display(), project.len()));
                self.settings.last_project_directory = Some(path);
                self.sync_settings();
                self.settings.save();

                let first = project.selected().map(|s| s.to_string());
                self.project = Some(project);
                if let Some(rel) = first {
                    self.request_load(&rel);
                } else {
                    self.set_status("Project contains no images");
                }
            }
            Err(e) => {
                log_err!("failed to open project {:?}: {}", path, e);
                self.set_status(format!("Failed to open project: {}", e));
            }
        }
    }

    fn close_project(&mut self) {
        self.save_current_mask();
        if let Some(project) = &self.project
            && let Err(e) = project.save_manifest()
        {
            log_warn!("failed to save manifest: {}", e);
        }
        if self.project.is_some() {
            self.set_status("Project closed");
        }
        self.project = None;
        self.state = None;
        self.canvas.reset_view();
    }

    /// Write the current mask back to its sidecar if it changed.
    /// Returns false only when a write was attempted and failed.
    fn save_current_mask(&mut self) -> bool {
        let Some(state) = &mut self.state else {
            return true;
        };
        if !state.mask.is_changed() {
            return true;
        }
        match io::save_mask(&state.mask, &state.mask_path) {
            Ok(()) => {
                state.mask.mark_saved();
                log_info!("saved mask {:?}", state.mask_path);
                true
            }
            Err(e) => {
                log_err!("failed to save mask {:?}: {}", state.mask_path, e);
                self.status = format!("Failed to save mask: {}", e);
                false
            }
        }
    }

    /// Save the current mask, then start loading another item.
    fn switch_to(&mut self, rel: &str) {
        self.save_current_mask();
        let Some(project) = &mut self.project else { return };
        if !project.select(rel) {
            return;
        }
        let rel = rel.to_string();
        self.request_load(&rel);
    }

    fn request_load(&mut self, rel: &str) {
        let Some(project) = &self.project else { return };
        self.load_token += 1;
        self.pending_loads += 1;
        io::spawn_load(
            self.io_sender.clone(),
            project.root().to_path_buf(),
            rel.to_string(),
            self.load_token,
        );
    }

    fn go_previous(&mut self) {
        if let Some(rel) = self.project.as_ref().and_then(|p| p.previous()) {
            self.switch_to(&rel);
        }
    }

    fn go_next(&mut self) {
        if let Some(rel) = self.project.as_ref().and_then(|p| p.next()) {
            self.switch_to(&rel);
        }
    }

    // ---- background load results -------------------------------------------

    fn drain_io_results(&mut self) {
        while let Ok(result) = self.io_receiver.try_recv() {
            self.pending_loads = self.pending_loads.saturating_sub(1);
            match result {
                IoResult::Loaded(item) => {
                    if item.token != self.load_token {
                        continue; // superseded by a later selection
                    }
                    let Some(project) = &self.project else { continue };
                    if !project.contains(&item.rel) {
                        continue;
                    }
                    let mask_path = project.mask_path(&item.rel);
                    let from_file = item.mask_from_file;
                    let rel = item.rel.clone();
                    self.state = Some(CanvasState::from_loaded(*item, mask_path));
                    self.canvas.reset_view();
                    if from_file {
                        self.set_status(format!("Loaded {} with existing mask", rel));
                    } else {
                        self.set_status(format!("Loaded {}", rel));
                    }
                }
                IoResult::Failed { rel, error, token } => {
                    if token != self.load_token {
                        continue;
                    }
                    log_err!("failed to load {}: {}", rel, error);
                    self.state = None;
                    self.set_status(format!("Failed to load {}: {}", rel, error));
                }
            }
        }
    }

    // ---- input ---------------------------------------------------------------

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (space, toggle, prev, next, gain_down, gain_up) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::X),
                i.key_pressed(egui::Key::ArrowLeft) || i.key_pressed(egui::Key::PageUp),
                i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::PageDown),
                i.key_pressed(egui::Key::Minus),
                i.key_pressed(egui::Key::PlusEquals),
            )
        });
        if space {
            self.tools.mask_only = !self.tools.mask_only;
        }
        if toggle {
            self.tools.toggle_mode();
        }
        if prev {
            self.go_previous();
        }
        if next {
            self.go_next();
        }
        if gain_down {
            self.tools.properties.nudge_gain(-1.0);
        }
        if gain_up {
            self.tools.properties.nudge_gain(1.0);
        }
    }

    // ---- persistence ----------------------------------------------------------

    /// Mirror live tool values into the settings struct.
    fn sync_settings(&mut self) {
        self.settings.pressure_gain = self.tools.properties.pressure_gain;
        self.settings.fallback_pressure = self.tools.properties.fallback_pressure;
        self.settings.overlay_alpha = self.tools.overlay_alpha;
        self.settings.mask_only = self.tools.mask_only;
    }

    fn persist_all(&mut self) {
        self.save_current_mask();
        if let Some(project) = &self.project
            && let Err(e) = project.save_manifest()
        {
            log_warn!("failed to save manifest: {}", e);
        }
        self.sync_settings();
        self.settings.save();
    }

    // ---- UI -------------------------------------------------------------------

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("Project", |ui| {
                    if ui.button("Open…").clicked() {
                        self.open_project_dialog();
                        ui.close_menu();
                    }
                    if ui
                        .add_enabled(self.project.is_some(), egui::Button::new("Close"))
                        .clicked()
                    {
                        self.close_project();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ui.close_menu();
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Mask", |ui| {
                    let has_doc = self.state.is_some();
                    if ui
                        .add_enabled(has_doc, egui::Button::new("Save"))
                        .clicked()
                    {
                        if self.save_current_mask() && self.state.is_some() {
                            self.set_status("Mask saved");
                        }
                        ui.close_menu();
                    }
                    if ui
                        .add_enabled(has_doc, egui::Button::new("Export As…"))
                        .clicked()
                    {
                        self.export_mask_as();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui
                        .add_enabled(has_doc, egui::Button::new("Clear"))
                        .clicked()
                    {
                        if let Some(state) = &mut self.state {
                            state.mask.clear();
                        }
                        ui.close_menu();
                    }
                    if ui
                        .add_enabled(has_doc, egui::Button::new("Invert"))
                        .clicked()
                    {
                        if let Some(state) = &mut self.state {
                            state.mask.invert();
                        }
                        ui.close_menu();
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui
                        .checkbox(&mut self.tools.mask_only, "Mask only")
                        .clicked()
                    {
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Zoom In").clicked() {
                        self.canvas.zoom_in();
                        ui.close_menu();
                    }
                    if ui.button("Zoom Out").clicked() {
                        self.canvas.zoom_out();
                        ui.close_menu();
                    }
                    if ui.button("Reset View").clicked() {
                        self.canvas.reset_view();
                        ui.close_menu();
                    }
                });

                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        self.about.open = true;
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn export_mask_as(&mut self) {
        let Some(state) = &self.state else { return };
        let suggested = std::path::Path::new(&state.rel)
            .file_stem()
            .map(|s| format!("{}.png", s.to_string_lossy()))
            .unwrap_or_else(|| "mask.png".to_string());
        let Some(path) = self.file_handler.pick_mask_export_path(&suggested) else {
            return;
        };
        let Some(state) = &self.state else { return };
        match io::save_mask(&state.mask, &path) {
            Ok(()) => {
                log_info!("exported mask to {:?}", path);
                self.set_status(format!("Exported mask to {}", path.display()));
            }
            Err(e) => {
                log_err!("failed to export mask to {:?}: {}", path, e);
                self.set_status(format!("Failed to export mask: {}", e));
            }
        }
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.pending_loads > 0 {
                    ui.spinner();
                }
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(state) = &self.state {
                        let (w, h) = state.dimensions();
                        ui.label(format!(
                            "{}  |  {}x{}  |  {:.1}% tagged  |  zoom {:.0}%  |  {}",
                            state.rel,
                            w,
                            h,
                            state.mask.coverage() * 100.0,
                            self.canvas.zoom * 100.0,
                            self.tools.mode.label(),
                        ));
                    }
                });
            });
        });
    }

    fn show_file_list(&mut self, ctx: &egui::Context) {
        let Some(project) = &self.project else { return };
        let action = egui::SidePanel::left("file_list")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| FileListPanel::show(ui, project))
            .inner;

        match action {
            Some(FileListAction::Select(rel)) => self.switch_to(&rel),
            Some(FileListAction::ToggleActive(rel)) => {
                if let Some(project) = &mut self.project {
                    project.toggle_active(&rel);
                    if let Err(e) = project.save_manifest() {
                        log_warn!("failed to save manifest: {}", e);
                        self.status = format!("Failed to save items.json: {}", e);
                    }
                }
            }
            None => {}
        }
    }
}

impl eframe::App for MaskTagApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.persist_all();
        }

        self.drain_io_results();
        self.handle_keyboard(ctx);

        self.show_menu_bar(ctx);

        if self.project.is_some() {
            egui::TopBottomPanel::top("tool_strip").show(ctx, |ui| {
                self.tools.show_strip(ui);
            });
        }

        self.show_status_bar(ctx);
        self.show_file_list(ctx);

        let feedback = egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                self.canvas.show(ui, self.state.as_mut(), &mut self.tools)
            })
            .inner;

        if feedback.next_image {
            self.go_next();
        }

        self.about.show(ctx);
    }
}
