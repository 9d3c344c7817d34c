pub mod layout;
pub mod theme;

use crate::controls::{ControlId, ValueParse};
use crate::session::Session;
use crate::visualizer::{self, Canvas, Hsl, RenderLoop};
use eframe::egui;
use layout::CanvasSurface;

/// Adapts an egui painter to the visualizer's pixel-space canvas.
struct PainterCanvas<'a> {
    painter: &'a egui::Painter,
    rect: egui::Rect,
    surface: CanvasSurface,
    pixels_per_point: f32,
}

impl Canvas for PainterCanvas<'_> {
    fn width(&self) -> f32 {
        self.surface.width() as f32
    }

    fn height(&self) -> f32 {
        self.surface.height() as f32
    }

    fn clear(&mut self) {
        self.painter.rect_filled(self.rect, 0.0, theme::CANVAS_BG);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Hsl) {
        let ppp = self.pixels_per_point;
        let rect = egui::Rect::from_min_size(
            self.rect.min + egui::vec2(x / ppp, y / ppp),
            egui::vec2(w / ppp, h / ppp),
        );
        self.painter.rect_filled(rect, 0.0, theme::hsl_color(color));
    }
}

pub struct EqualizerApp {
    session: Session,
    render_loop: RenderLoop,

    //
    // Visualizer canvas state.
    //
    surface: CanvasSurface,
    spectrum: Vec<u8>,
}

impl EqualizerApp {
    pub fn new(_cc: &eframe::CreationContext, session: Session, render_loop: RenderLoop) -> Self {
        let bins = session.graph().analyser().frequency_bin_count();
        Self {
            session,
            render_loop,
            surface: CanvasSurface::new(),
            spectrum: vec![0; bins],
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        for id in ControlId::ALL {
            let control = self.session.controls().control(id);
            let spec = *control.spec();
            let mut value = control.value();

            let mut slider = egui::Slider::new(&mut value, spec.min..=spec.max)
                .step_by(spec.step)
                .text(id.element_id());
            if spec.parse == ValueParse::Integer {
                slider = slider.integer().suffix(" dB");
            }

            //
            // Every change notification retargets the bound parameter.
            //
            if ui.add(slider).changed() {
                self.session.controls_mut().control_mut(id).input(value);
            }
        }

        ui.separator();
        ui.label(egui::RichText::new(self.session.status().to_string()).size(11.0));
    }

    fn draw_visualizer(&mut self, ui: &mut egui::Ui) {
        let size = egui::vec2(ui.available_width(), ui.available_height().max(120.0));
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());

        let pixels_per_point = ui.ctx().pixels_per_point();
        self.surface.resize(rect.width(), rect.height(), pixels_per_point);

        //
        // Pull this frame's spectrum snapshot.
        //
        let graph = self.session.graph_mut();
        let silent = graph.input_is_silent();
        let analyser = graph.analyser_mut();
        self.spectrum.resize(analyser.frequency_bin_count(), 0);
        analyser.get_byte_frequency_data(&mut self.spectrum);

        let config = self.session.config();
        let mut canvas = PainterCanvas {
            painter: ui.painter(),
            rect,
            surface: self.surface,
            pixels_per_point,
        };
        visualizer::draw_frame(&mut canvas, &self.spectrum, &config.bars, &config.hue);

        if silent {
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "NO SIGNAL\nCheck microphone permissions",
                egui::FontId::proportional(20.0),
                egui::Color32::RED,
            );
        }
    }
}

impl eframe::App for EqualizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.render_loop.stop();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        //
        // A stopped loop neither draws nor schedules another frame.
        //
        if !self.render_loop.tick() {
            return;
        }
        ctx.request_repaint();

        egui::CentralPanel::default().show(ctx, |ui| {
            let state = self.session.context().state().to_string();
            let algorithm = self.session.graph().analyser().algorithm_name();
            theme::draw_menu_bar(ui, self.session.config().name, &state, &algorithm);
            ui.add_space(4.0);

            theme::draw_platinum_window(ui, "Equalizer", |ui| self.draw_controls(ui));
            ui.add_space(4.0);
            theme::draw_platinum_window(ui, "Spectrum", |ui| self.draw_visualizer(ui));
        });
    }
}

impl Drop for EqualizerApp {
    fn drop(&mut self) {
        self.render_loop.stop();
        self.session.shutdown();
    }
}
