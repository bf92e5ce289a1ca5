//! Modal-ish windows: the About box.

pub struct AboutDialog {
    pub open: bool,
}

impl Default for AboutDialog {
    fn default() -> Self {
        Self { open: false }
    }
}

impl AboutDialog {
    pub fn show(&mut self, ctx: &egui::Context) {
        if !self.open {
            return;
        }
        let mut open = self.open;
        egui::Window::new("About MaskTag")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("MaskTag loads images, lets you hand-paint per-pixel tag masks with a drawing tablet, and exports the result.");
                ui.add_space(6.0);
                ui.label("Masks are saved as PNG-encoded .mask files next to their images.");
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.label("Version:");
                    ui.monospace(env!("CARGO_PKG_VERSION"));
                });
            });
        self.open = open;
    }
}
