//! Paint tool state — add/erase mode, the pressure→radius curve, and the
//! ephemeral stroke being captured this frame.

use egui::Color32;

use crate::mask::{TAGGED, UNTAGGED};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PaintMode {
    #[default]
    Add,
    Erase,
}

impl PaintMode {
    pub fn label(&self) -> &'static str {
        match self {
            PaintMode::Add => "Add",
            PaintMode::Erase => "Erase",
        }
    }

    /// Mask value written by strokes in this mode.
    pub fn value(&self) -> u8 {
        match self {
            PaintMode::Add => TAGGED,
            PaintMode::Erase => UNTAGGED,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            PaintMode::Add => PaintMode::Erase,
            PaintMode::Erase => PaintMode::Add,
        }
    }

    /// Brush ring color for the canvas cursor overlay.
    pub fn cursor_color(&self) -> Color32 {
        match self {
            PaintMode::Add => Color32::from_rgb(128, 128, 255),
            PaintMode::Erase => Color32::from_rgb(255, 128, 128),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolProperties {
    /// Pressure multiplier; the stroke width is `(pressure * gain)²` mask
    /// pixels, so the default gain of 10 gives a 100 px wide stroke at full
    /// pen pressure.
    pub pressure_gain: f32,
    /// Pressure substituted for devices that report none (plain mouse).
    pub fallback_pressure: f32,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            pressure_gain: 10.0,
            fallback_pressure: 0.5,
        }
    }
}

impl ToolProperties {
    pub const MIN_GAIN: f32 = 2.0;
    pub const MAX_GAIN: f32 = 30.0;

    /// Stroke radius in mask pixels for a pen pressure in [0, 1].
    pub fn radius_for(&self, pressure: f32) -> f32 {
        let width = (pressure.clamp(0.0, 1.0) * self.pressure_gain).powi(2);
        (width / 2.0).max(0.5)
    }

    pub fn nudge_gain(&mut self, delta: f32) {
        self.pressure_gain = (self.pressure_gain + delta).clamp(Self::MIN_GAIN, Self::MAX_GAIN);
    }
}

/// One rasterization unit of a stroke: a round-capped segment between two
/// consecutive pointer positions, in mask pixel coordinates.
#[derive(Clone, Copy, Debug)]
pub struct StrokeSegment {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub radius: f32,
    pub value: u8,
}

/// Transient capture state of the stroke in progress. Segments are drained
/// into the mask every frame; nothing survives the pointer lifting.
#[derive(Default)]
pub struct StrokeState {
    pub active: bool,
    pub last_pos: Option<(f32, f32)>,
    /// Most recent pen pressure reported while the stroke is down.
    pub pressure: Option<f32>,
    pub segments: Vec<StrokeSegment>,
}

impl StrokeState {
    pub fn begin(&mut self, pos: (f32, f32)) {
        self.active = true;
        self.last_pos = Some(pos);
    }

    pub fn move_to(&mut self, pos: (f32, f32), radius: f32, value: u8) {
        if let Some(last) = self.last_pos {
            self.segments.push(StrokeSegment {
                from: last,
                to: pos,
                radius,
                value,
            });
        }
        self.last_pos = Some(pos);
    }

    pub fn end(&mut self) {
        self.active = false;
        self.last_pos = None;
        self.pressure = None;
    }

    pub fn drain(&mut self) -> Vec<StrokeSegment> {
        std::mem::take(&mut self.segments)
    }
}

pub struct ToolsPanel {
    pub mode: PaintMode,
    pub properties: ToolProperties,
    /// Show the mask against black instead of over the image.
    pub mask_only: bool,
    /// Strength of the magenta overlay in composite view.
    pub overlay_alpha: u8,
    pub stroke: StrokeState,
}

impl Default for ToolsPanel {
    fn default() -> Self {
        Self {
            mode: PaintMode::Add,
            properties: ToolProperties::default(),
            mask_only: false,
            overlay_alpha: 160,
            stroke: StrokeState::default(),
        }
    }
}

impl ToolsPanel {
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    /// Effective brush radius right now (live pressure or the fallback).
    pub fn current_radius(&self) -> f32 {
        let pressure = self
            .stroke
            .pressure
            .unwrap_or(self.properties.fallback_pressure);
        self.properties.radius_for(pressure)
    }

    /// Horizontal strip with the mode selector and brush parameters.
    pub fn show_strip(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Mode:");
            for mode in [PaintMode::Add, PaintMode::Erase] {
                if ui
                    .selectable_label(self.mode == mode, mode.label())
                    .on_hover_text("Toggle with X or the pen barrel button")
                    .clicked()
                {
                    self.mode = mode;
                }
            }
            ui.separator();

            ui.label("Pen gain:");
            ui.add(
                egui::Slider::new(
                    &mut self.properties.pressure_gain,
                    ToolProperties::MIN_GAIN..=ToolProperties::MAX_GAIN,
                )
                .fixed_decimals(0),
            )
            .on_hover_text("Stroke width is (pressure x gain)^2 pixels");

            ui.label("Mouse pressure:");
            ui.add(
                egui::Slider::new(&mut self.properties.fallback_pressure, 0.05..=1.0)
                    .fixed_decimals(2),
            );
            ui.separator();

            ui.label("Overlay:");
            ui.add(egui::Slider::new(&mut self.overlay_alpha, 32..=255));
            ui.checkbox(&mut self.mask_only, "Mask only")
                .on_hover_text("Space");
        });
    }
}
