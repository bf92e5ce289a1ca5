//! Canvas — displays the current image with its mask composited on top and
//! turns pointer/pen input into mask strokes.
//!
//! The composite is uploaded as a single egui texture and re-uploaded only
//! when the image, the mask revision, or the view mode changed. Geometry is
//! aspect-preserving letterbox fit, then zoom (scroll) and pan (middle drag)
//! on top.

use eframe::egui;
use egui::{Color32, Pos2, Rect, Stroke, TextureFilter, TextureHandle, TextureOptions, Vec2};
use image::RgbaImage;
use rayon::prelude::*;
use std::path::PathBuf;

use crate::components::tools::ToolsPanel;
use crate::io::LoadedItem;
use crate::mask::MaskBuffer;

/// The document currently on the canvas: one image and its mask.
pub struct CanvasState {
    pub rel: String,
    pub image: RgbaImage,
    pub mask: MaskBuffer,
    pub mask_path: PathBuf,
    /// True when the mask was loaded from an existing sidecar file.
    pub mask_from_file: bool,
}

impl CanvasState {
    pub fn from_loaded(item: LoadedItem, mask_path: PathBuf) -> Self {
        Self {
            rel: item.rel,
            image: item.image,
            mask: item.mask,
            mask_path,
            mask_from_file: item.mask_from_file,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Per-frame requests raised by canvas input (pen side buttons).
#[derive(Default)]
pub struct CanvasFeedback {
    pub next_image: bool,
}

/// Texture cache key: (item, mask revision, mask-only, overlay alpha,
/// nearest filter).
type TexKey = (String, u64, bool, u8, bool);

pub struct Canvas {
    pub zoom: f32,
    pan_offset: Vec2,
    texture: Option<TextureHandle>,
    tex_key: Option<TexKey>,
    pub last_canvas_rect: Option<Rect>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            texture: None,
            tex_key: None,
            last_canvas_rect: None,
        }
    }

    /// Reset zoom and pan; called when the displayed item changes.
    pub fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan_offset = Vec2::ZERO;
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.25).clamp(0.1, 16.0);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.25).clamp(0.1, 16.0);
    }

    /// Zoom by `factor` keeping the screen point `anchor` fixed.
    fn zoom_around(&mut self, factor: f32, anchor: Pos2, widget: Rect) {
        let new_zoom = (self.zoom * factor).clamp(0.1, 16.0);
        let applied = new_zoom / self.zoom;
        let center = widget.center() + self.pan_offset;
        let new_center = anchor + (center - anchor) * applied;
        self.pan_offset = new_center - widget.center();
        self.zoom = new_zoom;
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        state: Option<&mut CanvasState>,
        tools: &mut ToolsPanel,
    ) -> CanvasFeedback {
        let mut feedback = CanvasFeedback::default();

        let available = ui.available_size();
        let sense = egui::Sense::click_and_drag().union(egui::Sense::hover());
        let (response, painter) = ui.allocate_painter(available, sense);
        let canvas_rect = response.rect;
        self.last_canvas_rect = Some(canvas_rect);
        let painter = painter.with_clip_rect(canvas_rect);

        let Some(state) = state else {
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Open a project directory to start tagging",
                egui::FontId::proportional(16.0),
                Color32::from_gray(120),
            );
            return feedback;
        };

        // ---- view manipulation -----------------------------------------
        if response.dragged() && ui.input(|i| i.pointer.middle_down()) {
            self.pan_offset += response.drag_delta();
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.scroll_delta.y);
            if scroll.abs() > 0.0
                && let Some(hover) = response.hover_pos()
            {
                self.zoom_around((scroll * 0.0015).exp(), hover, canvas_rect);
            }
        }

        let (img_w, img_h) = state.dimensions();
        let display = self.display_rect(canvas_rect, img_w, img_h);

        // ---- raw events: pen pressure and side buttons ------------------
        let events = ui.input(|i| i.events.clone());
        for event in &events {
            match event {
                egui::Event::Touch { phase, force, .. } => match phase {
                    egui::TouchPhase::Start | egui::TouchPhase::Move => {
                        if *force > 0.0 {
                            tools.stroke.pressure = Some(*force);
                        }
                    }
                    egui::TouchPhase::End | egui::TouchPhase::Cancel => {}
                },
                egui::Event::PointerButton {
                    button, pressed, ..
                } if *pressed => match button {
                    // Pen barrel button: flip add/erase, matching the
                    // keyboard X binding.
                    egui::PointerButton::Extra1 => tools.toggle_mode(),
                    // Second pad button: advance to the next image.
                    egui::PointerButton::Extra2 => feedback.next_image = true,
                    _ => {}
                },
                _ => {}
            }
        }

        // ---- stroke capture ---------------------------------------------
        let value = tools.mode.value();
        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                tools
                    .stroke
                    .begin(Self::screen_to_mask(pos, display, img_w, img_h));
            }
        } else if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                let radius = tools.current_radius();
                let mask_pos = Self::screen_to_mask(pos, display, img_w, img_h);
                if tools.stroke.active {
                    tools.stroke.move_to(mask_pos, radius, value);
                } else {
                    tools.stroke.begin(mask_pos);
                }
            }
        }
        if response.drag_released() {
            tools.stroke.end();
        }
        // A click with no drag still paints a single dot.
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let (mx, my) = Self::screen_to_mask(pos, display, img_w, img_h);
                state.mask.stamp(mx, my, tools.current_radius(), value);
            }
        }

        // Rasterize this frame's stroke segments. Out-of-canvas portions
        // clip inside the mask buffer.
        for seg in tools.stroke.drain() {
            state
                .mask
                .stroke_segment(seg.from, seg.to, seg.radius, seg.value);
        }

        // ---- composite texture ------------------------------------------
        let nearest = self.zoom >= 2.0;
        let key: TexKey = (
            state.rel.clone(),
            state.mask.revision(),
            tools.mask_only,
            tools.overlay_alpha,
            nearest,
        );
        if self.tex_key.as_ref() != Some(&key) {
            let composite = compose_overlay(
                &state.image,
                state.mask.as_gray(),
                tools.mask_only,
                tools.overlay_alpha,
            );
            let options = if nearest {
                TextureOptions {
                    magnification: TextureFilter::Nearest,
                    minification: TextureFilter::Linear,
                    ..Default::default()
                }
            } else {
                TextureOptions {
                    magnification: TextureFilter::Linear,
                    minification: TextureFilter::Linear,
                    ..Default::default()
                }
            };
            match &mut self.texture {
                Some(tex) => tex.set(composite, options),
                None => {
                    self.texture = Some(ui.ctx().load_texture("canvas", composite, options));
                }
            }
            self.tex_key = Some(key);
        }

        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                display,
                Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        // ---- brush cursor ring ------------------------------------------
        if let Some(hover) = response.hover_pos() {
            let scale = display.width() / img_w.max(1) as f32;
            let ring = (tools.current_radius() * scale).max(2.0);
            painter.circle_stroke(hover, ring, Stroke::new(1.5, tools.mode.cursor_color()));
        }

        feedback
    }

    /// Letterboxed fit of the image inside `widget`, scaled by the current
    /// zoom and shifted by the pan offset.
    fn display_rect(&self, widget: Rect, img_w: u32, img_h: u32) -> Rect {
        let aspect = img_w as f32 / img_h.max(1) as f32;
        let widget_ratio = widget.width() / widget.height().max(1.0);
        let (w, h) = if aspect >= widget_ratio {
            (widget.width(), widget.width() / aspect)
        } else {
            (widget.height() * aspect, widget.height())
        };
        Rect::from_center_size(
            widget.center() + self.pan_offset,
            Vec2::new(w * self.zoom, h * self.zoom),
        )
    }

    /// Screen position → mask pixel coordinates (unclamped; rasterization
    /// clips at the buffer edges).
    fn screen_to_mask(pos: Pos2, display: Rect, img_w: u32, img_h: u32) -> (f32, f32) {
        (
            (pos.x - display.min.x) / display.width().max(1.0) * img_w as f32,
            (pos.y - display.min.y) / display.height().max(1.0) * img_h as f32,
        )
    }
}

/// Composite the mask over the image as an additive magenta overlay, or —
/// in mask-only view — as magenta on black.
pub fn compose_overlay(
    image: &RgbaImage,
    mask: &image::GrayImage,
    mask_only: bool,
    alpha: u8,
) -> egui::ColorImage {
    let (w, h) = image.dimensions();
    let img_raw = image.as_raw();
    let mask_raw = mask.as_raw();
    let mut out = vec![0u8; img_raw.len()];

    out.par_chunks_exact_mut(4)
        .enumerate()
        .for_each(|(i, px)| {
            let tagged = mask_raw[i] != 0;
            if mask_only {
                if tagged {
                    px.copy_from_slice(&[alpha, 0, alpha, 255]);
                } else {
                    px.copy_from_slice(&[0, 0, 0, 255]);
                }
            } else {
                let s = &img_raw[i * 4..i * 4 + 4];
                if tagged {
                    px[0] = s[0].saturating_add(alpha);
                    px[1] = s[1];
                    px[2] = s[2].saturating_add(alpha);
                    px[3] = 255;
                } else {
                    px[0] = s[0];
                    px[1] = s[1];
                    px[2] = s[2];
                    px[3] = 255;
                }
            }
        });

    egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], &out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{MaskBuffer, TAGGED};
    use image::Rgba;

    #[test]
    fn overlay_tints_only_tagged_pixels() {
        let mut image = RgbaImage::new(4, 1);
        for px in image.pixels_mut() {
            *px = Rgba([10, 20, 30, 255]);
        }
        let mut mask = MaskBuffer::blank(4, 1);
        mask.stamp(2.5, 0.5, 0.5, TAGGED);

        let composite = compose_overlay(&image, mask.as_gray(), false, 100);
        // Untagged pixel: source color untouched.
        assert_eq!(composite.pixels[0], Color32::from_rgba_unmultiplied(10, 20, 30, 255));
        // Tagged pixel: red and blue boosted, green untouched.
        assert_eq!(
            composite.pixels[2],
            Color32::from_rgba_unmultiplied(110, 20, 130, 255)
        );
    }

    #[test]
    fn overlay_addition_saturates() {
        let mut image = RgbaImage::new(1, 1);
        image.put_pixel(0, 0, Rgba([250, 0, 250, 255]));
        let mut mask = MaskBuffer::blank(1, 1);
        mask.fill(TAGGED);
        let composite = compose_overlay(&image, mask.as_gray(), false, 100);
        assert_eq!(
            composite.pixels[0],
            Color32::from_rgba_unmultiplied(255, 0, 255, 255)
        );
    }

    #[test]
    fn mask_only_view_hides_the_image() {
        let mut image = RgbaImage::new(2, 1);
        for px in image.pixels_mut() {
            *px = Rgba([200, 200, 200, 255]);
        }
        let mut mask = MaskBuffer::blank(2, 1);
        mask.stamp(0.5, 0.5, 0.5, TAGGED);
        let composite = compose_overlay(&image, mask.as_gray(), true, 160);
        assert_eq!(
            composite.pixels[0],
            Color32::from_rgba_unmultiplied(160, 0, 160, 255)
        );
        assert_eq!(composite.pixels[1], Color32::from_rgba_unmultiplied(0, 0, 0, 255));
    }
}
