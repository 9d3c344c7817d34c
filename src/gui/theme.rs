use crate::visualizer::Hsl;
use eframe::egui;

pub const PLATINUM_BG: egui::Color32 = egui::Color32::from_rgb(212, 208, 200);
pub const PLATINUM_DARK: egui::Color32 = egui::Color32::from_rgb(128, 128, 128);
pub const CANVAS_BG: egui::Color32 = egui::Color32::from_rgb(16, 16, 16);

pub fn setup_global_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    //
    // Set global background fill colors.
    //
    style.visuals.panel_fill = PLATINUM_BG;
    style.visuals.window_fill = PLATINUM_BG;

    //
    // Square widgets, sliders included.
    //
    style.visuals.widgets.noninteractive.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.active.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.inactive.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.hovered.rounding = egui::Rounding::ZERO;
    style.spacing.slider_width = 220.0;

    ctx.set_style(style);
}

/// Top bar: app name on the left; preset, audio state and FFT algorithm on the right.
pub fn draw_menu_bar(ui: &mut egui::Ui, preset: &str, audio_state: &str, algorithm_name: &str) {
    egui::TopBottomPanel::top("menubar").show_inside(ui, |ui| {
        ui.visuals_mut().widgets.noninteractive.bg_fill = PLATINUM_BG;
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("eqscope").strong());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    egui::RichText::new(format!("{} | audio {} | {}", preset, audio_state, algorithm_name))
                        .italics()
                        .size(10.0),
                );
            });
        });
    });
}

/// Draws a window styled with the "Platinum" retro frame.
pub fn draw_platinum_window<R>(ui: &mut egui::Ui, title: &str, content: impl FnOnce(&mut egui::Ui) -> R) -> R {
    let frame = egui::Frame::none()
        .fill(PLATINUM_BG)
        .stroke(egui::Stroke::new(1.0, egui::Color32::BLACK))
        .inner_margin(2.0);

    frame
        .show(ui, |ui| {
            let (rect, _response) =
                ui.allocate_exact_size(egui::vec2(ui.available_width(), 18.0), egui::Sense::hover());

            ui.painter()
                .rect_filled(rect, 0.0, egui::Color32::from_rgb(200, 200, 200));
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                title,
                egui::FontId::proportional(14.0),
                egui::Color32::BLACK,
            );

            ui.add_space(4.0);
            egui::Frame::group(ui.style())
                .stroke(egui::Stroke::new(1.0, PLATINUM_DARK)) // Inner bevel border.
                .inner_margin(6.0)
                .show(ui, content)
                .inner
        })
        .inner
}

pub fn hsl_color(color: Hsl) -> egui::Color32 {
    let (r, g, b) = color.to_rgb();
    egui::Color32::from_rgb(r, g, b)
}
