//! Left-hand image list. Single click selects an item, double click toggles
//! its active flag. Active entries render green, inactive red.

use egui::{Color32, RichText};

use crate::project::Project;

pub enum FileListAction {
    Select(String),
    ToggleActive(String),
}

pub struct FileListPanel;

impl FileListPanel {
    pub fn show(ui: &mut egui::Ui, project: &Project) -> Option<FileListAction> {
        let mut action = None;

        ui.heading("Images");
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for rel in project.filenames() {
                    let selected = project.selected() == Some(rel.as_str());
                    let color = if project.is_active(rel) {
                        Color32::from_rgb(0, 128, 0)
                    } else {
                        Color32::from_rgb(128, 0, 0)
                    };
                    let response =
                        ui.selectable_label(selected, RichText::new(rel.as_str()).color(color));
                    // Double-click wins over the select that the first click
                    // of the pair would otherwise trigger.
                    if response.double_clicked() {
                        action = Some(FileListAction::ToggleActive(rel.clone()));
                    } else if response.clicked() && !selected {
                        action = Some(FileListAction::Select(rel.clone()));
                    }
                }
            });

        action
    }
}
