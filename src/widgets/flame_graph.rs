use eframe::egui::{
    self, pos2, vec2, Color32, Rect, Response, Sense, Stroke, TextStyle, Ui, Widget,
};

use crate::graph::FlameGraph;
use crate::themes::colorhash::{flame_color, text_color_on};
use crate::themes::{blend, GorbieFlameGraphStyle};
use crate::tree::NodeId;

/// Map a bar's normalized span into the span of the zoomed frame, clipped
/// to the visible `[0, 1]` range.
fn visible_span(start: f32, end: f32, base_start: f32, base_end: f32) -> (f32, f32) {
    let base_width = base_end - base_start;
    let scale = if base_width > f32::EPSILON {
        1.0 / base_width
    } else {
        1.0
    };
    let start = ((start - base_start) * scale).max(0.0);
    let end = ((end - base_start) * scale).min(1.0);
    (start, end)
}

/// Interactive flame graph.
///
/// The root sits on the bottom row and every level of the tree stacks one row
/// higher. Clicking a bar zooms into it, the secondary button zooms back out to
/// the root. Bars narrower than [`FlameGraphView::min_bar_width`] are skipped.
#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct FlameGraphView<'a> {
    graph: &'a mut FlameGraph,
    desired_width: Option<f32>,
    depth: usize,
    min_bar_width: f32,
    gorbie_style: Option<GorbieFlameGraphStyle>,
}

impl<'a> FlameGraphView<'a> {
    pub fn new(graph: &'a mut FlameGraph) -> Self {
        Self {
            graph,
            desired_width: None,
            depth: 0,
            min_bar_width: 8.0,
            gorbie_style: None,
        }
    }

    /// The desired width of the graph. Will use all horizontal space if not set.
    pub fn desired_width(mut self, desired_width: f32) -> Self {
        self.desired_width = Some(desired_width);
        self
    }

    /// Number of rows to reserve. `0` (the default) fits the deepest frame.
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Bars narrower than this many points are not drawn.
    pub fn min_bar_width(mut self, min_bar_width: f32) -> Self {
        self.min_bar_width = min_bar_width.max(0.0);
        self
    }
}

impl Widget for FlameGraphView<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let FlameGraphView {
            graph,
            desired_width,
            depth,
            min_bar_width,
            gorbie_style,
        } = self;

        let _span = tracing::debug_span!("flamegraph_paint").entered();
        graph.rebuild_if_dirty();

        let gstyle =
            gorbie_style.unwrap_or_else(|| GorbieFlameGraphStyle::from(ui.style().as_ref()));

        let font_id = TextStyle::Small.resolve(ui.style());
        let text_height = ui.fonts_mut(|fonts| fonts.row_height(&font_id));
        let row_height = text_height + ui.spacing().button_padding.y * 2.0;
        let rows = if depth == 0 {
            graph.max_depth() + 1
        } else {
            depth
        };

        let desired_width = desired_width.unwrap_or_else(|| ui.available_width().max(128.0));
        let (outer_rect, response) =
            ui.allocate_exact_size(vec2(desired_width, rows as f32 * row_height), Sense::hover());
        if !ui.is_rect_visible(outer_rect) {
            return response;
        }

        let painter = ui.painter().with_clip_rect(outer_rect);
        let focus = graph.focus_node();
        let (base_start, base_end) = (focus.start(), focus.end());
        let min_fraction = min_bar_width / outer_rect.width().max(1.0);

        let mut clicked: Option<NodeId> = None;
        let mut zoom_out = false;

        graph.traverse(|node, focused| {
            if node.depth() >= rows {
                return;
            }

            let (start, end) = visible_span(node.start(), node.end(), base_start, base_end);
            if end - start < min_fraction {
                return;
            }

            let bottom = outer_rect.bottom() - row_height * node.depth() as f32;
            let bar = Rect::from_min_max(
                pos2(outer_rect.left() + outer_rect.width() * start, bottom - row_height),
                pos2(outer_rect.left() + outer_rect.width() * end, bottom),
            )
            .shrink(gstyle.bar_gap);
            if !bar.is_positive() {
                return;
            }

            // Identities repeat whenever a label shows up under several stacks.
            let id = response.id.with(("flame_bar", node.id(), node.identity()));
            let bar_response = ui
                .interact(bar, id, Sense::click())
                .on_hover_text(format!(
                    "{}\n{:.1}%",
                    node.label(),
                    node.weight_fraction() * 100.0
                ));

            let base = flame_color(node.depth() + node.index());
            let fill = if bar_response.hovered() {
                base
            } else if focused {
                Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), gstyle.focused_alpha)
            } else {
                blend(base, gstyle.backdrop, gstyle.breadcrumb_fade)
            };
            painter.rect_filled(bar, 0.0, fill);
            if bar_response.hovered() {
                painter.rect_stroke(
                    bar,
                    0.0,
                    Stroke::new(1.0, gstyle.outline),
                    egui::StrokeKind::Inside,
                );
            }

            let text_color = text_color_on(fill);
            let galley =
                painter.layout_no_wrap(node.label().to_owned(), font_id.clone(), text_color);
            if galley.size().x < bar.width() {
                painter.galley(bar.center() - galley.size() / 2.0, galley, text_color);
            }

            if bar_response.clicked() {
                clicked = Some(node.id());
            }
            if bar_response.secondary_clicked() {
                zoom_out = true;
            }
        });

        if let Some(id) = clicked {
            graph.set_focus(id);
            ui.ctx().request_repaint();
        } else if zoom_out {
            graph.reset_focus();
            ui.ctx().request_repaint();
        }

        response
    }
}

impl crate::themes::Styled for FlameGraphView<'_> {
    type Style = GorbieFlameGraphStyle;

    fn styled(mut self, style: Self::Style) -> Self {
        self.gorbie_style = Some(style);
        self
    }
}

/// Show `graph` with default settings, using all available width.
pub fn flame_graph(ui: &mut Ui, graph: &mut FlameGraph) -> Response {
    ui.add(FlameGraphView::new(graph))
}
