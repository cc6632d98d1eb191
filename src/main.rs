use std::thread;
use std::time::Duration;

use dark_light::Mode;
use eframe::egui;
use gorbie_flamegraph::prelude::*;
use gorbie_flamegraph::themes::colorhash::hash64;

const FRAME_BUDGET_MS: f32 = 16.6;

/// One entry of a frame-time budget, measured in milliseconds.
struct Budget {
    name: &'static str,
    millis: f32,
}

impl FlameItem for Budget {
    fn label(&self) -> &str {
        self.name
    }

    fn weight_fraction(&self) -> f32 {
        self.millis / FRAME_BUDGET_MS
    }

    fn identity(&self) -> u64 {
        hash64(self.name.as_bytes())
    }
}

fn budget(name: &'static str, millis: f32) -> Budget {
    Budget { name, millis }
}

/// A canned frame profile. Returns the graph and the node that streamed
/// samples get appended under.
fn sample_profile() -> (FlameGraph, NodeId) {
    let mut graph = FlameGraph::new();
    let root = graph.root();

    let update = graph.append_child(root, budget("update", 7.2));
    let input = graph.append_child(update, budget("input", 0.8));
    let physics = graph.append_sibling(input, budget("physics", 4.1));
    graph.append_child(physics, budget("broadphase", 1.3));
    graph.append_child(physics, budget("narrowphase", 2.2));
    graph.append_child(physics, budget("integrate", 0.5));
    graph.append_child(update, budget("scripts", 1.9));

    let render = graph.append_child(root, budget("render", 6.4));
    let culling = graph.append_child(render, budget("culling", 0.9));
    graph.append_sibling(culling, budget("shadows", 1.7));
    let draw = graph.append_child(render, budget("draw", 3.1));
    graph.append_child(draw, budget("opaque", 2.0));
    graph.append_child(draw, budget("transparent", 0.8));

    let io = graph.append_child(root, budget("io", 2.5));

    (graph, io)
}

/// Simulates a profiler that keeps reporting samples while the UI is up.
fn stream_samples(graph: SharedFlameGraph, parent: NodeId, ctx: egui::Context) {
    thread::spawn(move || {
        for chunk in 0..8 {
            thread::sleep(Duration::from_millis(400));
            let sample = Frame::new(format!("read chunk {chunk}"), 0.25 / FRAME_BUDGET_MS);
            graph.write().append_child(parent, sample);
            log::debug!("streamed sample {chunk}");
            ctx.request_repaint();
        }
    });
}

struct FlameGraphDemo {
    graph: SharedFlameGraph,
}

impl FlameGraphDemo {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let theme = match dark_light::detect() {
            Ok(Mode::Light) => egui::ThemePreference::Light,
            Ok(Mode::Dark) => egui::ThemePreference::Dark,
            Ok(Mode::Unspecified) | Err(_) => egui::ThemePreference::Dark,
        };
        cc.egui_ctx.set_theme(theme);

        let (graph, io) = sample_profile();
        let graph = graph.into_shared();
        stream_samples(graph.clone(), io, cc.egui_ctx.clone());
        Self { graph }
    }
}

impl eframe::App for FlameGraphDemo {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let mut graph = self.graph.write();

            ui.horizontal(|ui| {
                if ui.button("Reset zoom").clicked() {
                    graph.reset_focus();
                }
                if ui.button("Zoom out").clicked() {
                    graph.focus_parent();
                }
                ui.label(format!("Focus: {}", graph.focus_node().label()));
            });

            flame_graph(ui, &mut graph);

            if !graph.violations().is_empty() {
                ui.collapsing("Malformed frames", |ui| {
                    for (id, violation) in graph.violations() {
                        ui.label(format!("{}: {violation}", graph.node(*id).label()));
                    }
                });
            }
        });
    }
}

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Flame graph")
            .with_inner_size([960.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "gorbie-flamegraph",
        options,
        Box::new(|cc| Ok(Box::new(FlameGraphDemo::new(cc)))),
    )
}
