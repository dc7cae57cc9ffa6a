//! Interactive HTML views of enrichment results: a horizontal bar chart and
//! a dot chart of the scored pathways, plus a force-directed rendering of the
//! shared-compound network. All plots are self-contained plotly documents.

use camino::{Utf8Path, Utf8PathBuf};
use petgraph::visit::EdgeRef;
use plotly::color::{NamedColor, Rgba};
use plotly::common::{
    Anchor, ColorBar, ColorScale, ColorScalePalette, Font, HoverInfo, Line, Marker, Mode,
    Orientation, Side, ThicknessMode, Title,
};
use plotly::layout::{Annotation, Axis, DragMode, ItemClick, Legend, Margin, RangeMode};
use plotly::{Bar, Layout, Plot, Scatter, Trace};
use textwrap::wrap;

use crate::enrich::EnrichmentRow;
use crate::error::MetseaError;
use crate::relate::SimilarityGraph;
use crate::store::Store;

const TOP_PATHWAYS: usize = 20;
const ANNOTATED_PATHWAYS: usize = 10;
const LABEL_WRAP_WIDTH: usize = 30;

const MIN_MARKER_SIZE: f64 = 10.0;
const MAX_MARKER_SIZE: f64 = 25.0;
const MIN_NODE_SIZE: f64 = 15.0;
const MAX_NODE_SIZE: f64 = 35.0;
const MIN_EDGE_WIDTH: f64 = 2.0;
const MAX_EDGE_WIDTH: f64 = 8.0;

const LAYOUT_ITERATIONS: usize = 400;
const LAYOUT_COOLOFF: f64 = 0.975;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Top pathways by adjusted p-value as horizontal bars, bar length being the
/// enrichment ratio and bar color the -log10 adjusted p-value.
pub fn bar_plot(rows: &[EnrichmentRow], plots_dir: &Utf8Path) -> Result<Utf8PathBuf, MetseaError> {
    let mut top: Vec<&EnrichmentRow> = rows.iter().take(TOP_PATHWAYS).collect();
    top.sort_by(|a, b| a.enrichment_ratio.total_cmp(&b.enrichment_ratio));

    let capacity = top.len();
    let mut labels: Vec<String> = Vec::with_capacity(capacity);
    let mut ratios: Vec<f64> = Vec::with_capacity(capacity);
    let mut colors: Vec<f64> = Vec::with_capacity(capacity);
    let mut hovers: Vec<String> = Vec::with_capacity(capacity);
    for row in top {
        labels.push(wrap_label(&row.description, LABEL_WRAP_WIDTH));
        ratios.push(row.enrichment_ratio);
        colors.push(minus_log10(row.adjusted_p_value));
        hovers.push(row_hover(row));
    }

    let marker = Marker::new()
        .color_array(colors)
        .color_scale(ColorScale::Palette(ColorScalePalette::Cividis))
        .color_bar(scale_color_bar("-log10(adj. p-value)"))
        .show_scale(true);

    let trace = Bar::new(ratios, labels)
        .orientation(Orientation::Horizontal)
        .marker(marker)
        .hover_text_array(hovers)
        .hover_info(HoverInfo::Text)
        .show_legend(false);

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(
        Layout::new()
            .width(460)
            .height(920)
            .margin(Margin::new().left(50).right(0).top(30).bottom(0))
            .x_axis(
                Axis::new()
                    .title(Title::with_text("Enrichment ratio").font(Font::new().size(14)))
                    .tick_font(Font::new().size(12))
                    .show_line(true)
                    .line_color(NamedColor::Black)
                    .show_grid(true)
                    .grid_color(Rgba::new(0, 0, 0, 0.05))
                    .show_tick_labels(true)
                    .auto_margin(true),
            )
            .y_axis(
                Axis::new()
                    .tick_font(Font::new().size(14))
                    .show_line(true)
                    .line_color(NamedColor::Black)
                    .show_grid(true)
                    .grid_color(Rgba::new(0, 0, 0, 0.05))
                    .show_tick_labels(true)
                    .auto_margin(true),
            )
            .drag_mode(DragMode::False)
            .bar_gap(0.4),
    );

    let path = plots_dir.join("enrichment_bar.html");
    write_plot(&plot, &path)?;
    Ok(path)
}

/// Every scored pathway as one marker: enrichment ratio against -log10
/// adjusted p-value, marker area scaled by overlap count. The ten most
/// significant pathways are labeled with their IDs.
pub fn dot_plot(rows: &[EnrichmentRow], plots_dir: &Utf8Path) -> Result<Utf8PathBuf, MetseaError> {
    let ratios: Vec<f64> = rows.iter().map(|row| row.enrichment_ratio).collect();
    let significances: Vec<f64> = rows
        .iter()
        .map(|row| minus_log10(row.adjusted_p_value))
        .collect();
    let hovers: Vec<String> = rows.iter().map(row_hover).collect();
    let overlaps: Vec<f64> = rows.iter().map(|row| row.overlap_count as f64).collect();

    let marker_sizes = scale_sizes(&overlaps, MIN_MARKER_SIZE, MAX_MARKER_SIZE);
    let smallest = marker_sizes
        .iter()
        .copied()
        .min()
        .unwrap_or(MIN_MARKER_SIZE as usize);
    let largest = marker_sizes
        .iter()
        .copied()
        .max()
        .unwrap_or(MAX_MARKER_SIZE as usize);
    let middle = (smallest + largest) / 2;

    let dummy_x = vec![None::<f64>];
    let dummy_y = vec![None::<f64>];
    let legend_small = size_legend_trace(dummy_x.clone(), dummy_y.clone(), smallest);
    let legend_medium = size_legend_trace(dummy_x.clone(), dummy_y.clone(), middle);
    let legend_large = size_legend_trace(dummy_x, dummy_y, largest);

    let colors = significances.clone();
    let trace = Scatter::new(ratios, significances)
        .mode(Mode::Markers)
        .marker(
            Marker::new()
                .color_array(colors)
                .color_scale(ColorScale::Palette(ColorScalePalette::Cividis))
                .color_bar(scale_color_bar("-log10(adj. p-value)"))
                .size_array(marker_sizes)
                .show_scale(true)
                .opacity(0.9),
        )
        .hover_text_array(hovers)
        .hover_info(HoverInfo::Text)
        .show_legend(false);

    // Rows arrive sorted by adjusted p-value, so the head is the annotation set.
    let offsets = [(-30, 20), (30, 10), (-30, -20), (30, -10)];
    let mut annotations: Vec<Annotation> = Vec::new();
    for (i, row) in rows.iter().take(ANNOTATED_PATHWAYS).enumerate() {
        let (ax, ay) = offsets[i % offsets.len()];
        annotations.push(
            Annotation::new()
                .x(row.enrichment_ratio)
                .y(minus_log10(row.adjusted_p_value))
                .text(row.pathway_id.to_string())
                .show_arrow(true)
                .font(Font::new().size(10).color(NamedColor::Black))
                .arrow_head(2)
                .arrow_size(1.0)
                .arrow_width(1.1)
                .arrow_color(NamedColor::DimGray)
                .ax(ax)
                .ay(ay)
                .opacity(0.9),
        );
    }

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.add_trace(legend_small);
    plot.add_trace(legend_medium);
    plot.add_trace(legend_large);
    plot.set_layout(
        Layout::new()
            .width(940)
            .height(460)
            .margin(Margin::new().left(50).right(0).top(30).bottom(0))
            .x_axis(
                Axis::new()
                    .title(Title::with_text("Enrichment ratio").font(Font::new().size(14)))
                    .tick_font(Font::new().size(12))
                    .show_line(true)
                    .line_color(NamedColor::Black)
                    .show_grid(true)
                    .grid_color(Rgba::new(0, 0, 0, 0.05))
                    .show_tick_labels(true)
                    .auto_margin(true)
                    .range_mode(RangeMode::ToZero),
            )
            .y_axis(
                Axis::new()
                    .title(Title::with_text("-log10(adj. p-value)").font(Font::new().size(14)))
                    .tick_font(Font::new().size(12))
                    .show_line(true)
                    .line_color(NamedColor::Black)
                    .show_grid(true)
                    .grid_color(Rgba::new(0, 0, 0, 0.05))
                    .show_tick_labels(true)
                    .auto_margin(true)
                    .range_mode(RangeMode::ToZero),
            )
            .legend(
                Legend::new()
                    .x(1.0)
                    .y(1.0)
                    .trace_group_gap(10)
                    .title(Title::with_text("Overlap size").font(Font::new().size(12)))
                    .item_click(ItemClick::False)
                    .item_double_click(ItemClick::False),
            )
            .annotations(annotations),
    );

    let path = plots_dir.join("enrichment_dot.html");
    write_plot(&plot, &path)?;
    Ok(path)
}

/// The shared-compound network laid out with Fruchterman-Reingold: node area
/// follows the pathway size proxy, node color the total compounds shared with
/// neighbours, edge width the per-pair shared count.
pub fn network_plot(
    graph: &SimilarityGraph,
    plots_dir: &Utf8Path,
) -> Result<Utf8PathBuf, MetseaError> {
    let positions = force_layout(graph);

    let mut shared_totals = vec![0usize; graph.node_count()];
    for edge in graph.edge_references() {
        shared_totals[edge.source().index()] += *edge.weight();
        shared_totals[edge.target().index()] += *edge.weight();
    }

    let weights: Vec<f64> = graph
        .edge_references()
        .map(|edge| *edge.weight() as f64)
        .collect();
    let min_weight = weights.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max_weight = weights.iter().copied().reduce(f64::max).unwrap_or(0.0);

    let mut plot = Plot::new();
    for edge in graph.edge_references() {
        let (start_x, start_y) = positions[edge.source().index()];
        let (end_x, end_y) = positions[edge.target().index()];
        let width = if max_weight <= min_weight {
            MIN_EDGE_WIDTH + (MAX_EDGE_WIDTH - MIN_EDGE_WIDTH) / 2.0
        } else {
            let normalized = (*edge.weight() as f64 - min_weight) / (max_weight - min_weight);
            MIN_EDGE_WIDTH + normalized * (MAX_EDGE_WIDTH - MIN_EDGE_WIDTH)
        };
        let segment = Scatter::new(vec![start_x, end_x], vec![start_y, end_y])
            .mode(Mode::Lines)
            .line(Line::new().width(width).color(Rgba::new(200, 200, 200, 0.5)))
            .show_legend(false);
        plot.add_trace(segment);
    }

    let offsets = [(30, -30), (-30, 15), (30, 30), (-30, -15)];
    let node_count = graph.node_count();
    let mut xs: Vec<f64> = Vec::with_capacity(node_count);
    let mut ys: Vec<f64> = Vec::with_capacity(node_count);
    let mut hovers: Vec<String> = Vec::with_capacity(node_count);
    let mut colors: Vec<f64> = Vec::with_capacity(node_count);
    let mut size_stats: Vec<f64> = Vec::with_capacity(node_count);
    let mut annotations: Vec<Annotation> = Vec::with_capacity(node_count);
    for (i, index) in graph.node_indices().enumerate() {
        let node = &graph[index];
        let (x, y) = positions[index.index()];
        let shared = shared_totals[index.index()];
        xs.push(x);
        ys.push(y);
        hovers.push(format!(
            "<b>{}</b><br><b>ID:</b> {}<br><b>Shared with neighbours:</b> {}",
            wrap_label(&node.name, LABEL_WRAP_WIDTH),
            node.id,
            shared
        ));
        colors.push(shared as f64);
        size_stats.push(node.size);

        let (ax, ay) = offsets[i % offsets.len()];
        annotations.push(
            Annotation::new()
                .x(x)
                .y(y)
                .text(node.id.to_string())
                .show_arrow(true)
                .font(Font::new().size(10).color(NamedColor::Black))
                .ax(ax)
                .ay(ay)
                .opacity(0.9),
        );
    }

    let node_sizes = scale_sizes(&size_stats, MIN_NODE_SIZE, MAX_NODE_SIZE);
    let node_trace = Scatter::new(xs, ys)
        .mode(Mode::Markers)
        .marker(
            Marker::new()
                .color_array(colors)
                .color_scale(ColorScale::Palette(ColorScalePalette::Viridis))
                .color_bar(scale_color_bar("Shared compounds"))
                .size_array(node_sizes)
                .show_scale(true)
                .opacity(1.0),
        )
        .hover_text_array(hovers)
        .hover_info(HoverInfo::Text)
        .show_legend(false);
    plot.add_trace(node_trace);

    plot.set_layout(
        Layout::new()
            .width(940)
            .height(460)
            .margin(Margin::new().left(50).right(0).top(30).bottom(0))
            .x_axis(
                Axis::new()
                    .show_line(false)
                    .zero_line(false)
                    .show_grid(true)
                    .show_tick_labels(false)
                    .auto_margin(true),
            )
            .y_axis(
                Axis::new()
                    .show_line(false)
                    .zero_line(false)
                    .show_grid(true)
                    .show_tick_labels(false)
                    .auto_margin(true),
            )
            .annotations(annotations),
    );

    let path = plots_dir.join("pathway_network.html");
    write_plot(&plot, &path)?;
    Ok(path)
}

/// Classic Fruchterman-Reingold over the node indices, seeded on a
/// phyllotaxis spiral so the layout is reproducible run to run. Positions
/// come back rescaled into the unit square with aspect preserved.
fn force_layout(graph: &SimilarityGraph) -> Vec<(f64, f64)> {
    let n = graph.node_count();
    let mut positions: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let radius = ((i + 1) as f64).sqrt();
            let angle = i as f64 * GOLDEN_ANGLE;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    if n < 2 {
        return fit_to_frame(positions);
    }

    let frame = 2.0 * (n as f64).sqrt() + 1.0;
    let k = frame / (n as f64).sqrt();
    let mut temperature = frame / 10.0;

    for _ in 0..LAYOUT_ITERATIONS {
        let mut displacement = vec![(0.0f64, 0.0f64); n];
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = positions[i].0 - positions[j].0;
                let dy = positions[i].1 - positions[j].1;
                let distance = (dx * dx + dy * dy).sqrt().max(1e-9);
                let repulsion = k * k / distance;
                displacement[i].0 += dx / distance * repulsion;
                displacement[i].1 += dy / distance * repulsion;
                displacement[j].0 -= dx / distance * repulsion;
                displacement[j].1 -= dy / distance * repulsion;
            }
        }
        for edge in graph.edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            let dx = positions[a].0 - positions[b].0;
            let dy = positions[a].1 - positions[b].1;
            let distance = (dx * dx + dy * dy).sqrt().max(1e-9);
            let attraction = distance * distance / k;
            displacement[a].0 -= dx / distance * attraction;
            displacement[a].1 -= dy / distance * attraction;
            displacement[b].0 += dx / distance * attraction;
            displacement[b].1 += dy / distance * attraction;
        }
        for (position, &(dx, dy)) in positions.iter_mut().zip(displacement.iter()) {
            let length = (dx * dx + dy * dy).sqrt().max(1e-9);
            let step = length.min(temperature);
            position.0 += dx / length * step;
            position.1 += dy / length * step;
        }
        temperature *= LAYOUT_COOLOFF;
    }

    fit_to_frame(positions)
}

fn fit_to_frame(mut positions: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;
    for &(x, y) in &positions {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    let width = (max_x - min_x).max(1e-9);
    let height = (max_y - min_y).max(1e-9);
    let scale = (1.0 / width).min(1.0 / height);
    for position in &mut positions {
        position.0 = (position.0 - min_x) * scale + (1.0 - width * scale) / 2.0;
        position.1 = (position.1 - min_y) * scale + (1.0 - height * scale) / 2.0;
    }
    positions
}

fn wrap_label(text: &str, width: usize) -> String {
    wrap(text, width).join("<br>")
}

fn minus_log10(p: f64) -> f64 {
    if p > 0.0 { -p.log10() } else { 0.0 }
}

fn row_hover(row: &EnrichmentRow) -> String {
    format!(
        "<b>{}</b><br><b>ID:</b> {}<br><b>Enrichment ratio:</b> {:.3}<br><b>Adjusted p:</b> {:.3e}<br><b>Overlap:</b> {}",
        row.description, row.pathway_id, row.enrichment_ratio, row.adjusted_p_value, row.meta_ratio
    )
}

fn scale_sizes(values: &[f64], min_size: f64, max_size: f64) -> Vec<usize> {
    let min_value = values.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max_value = values.iter().copied().reduce(f64::max).unwrap_or(0.0);
    values
        .iter()
        .map(|&value| {
            let scaled = if max_value == min_value {
                min_size + (max_size - min_size) / 2.0
            } else {
                let normalized = (value - min_value) / (max_value - min_value);
                min_size + normalized * (max_size - min_size)
            };
            scaled.round() as usize
        })
        .collect()
}

fn scale_color_bar(title: &str) -> ColorBar {
    ColorBar::new()
        .title(Title::from(title).side(Side::Right).font(Font::new().size(12)))
        .tick_font(Font::new().size(10))
        .len_mode(ThicknessMode::Pixels)
        .len(200)
        .thickness(15)
        .x(1.0)
        .y(0.9)
        .y_anchor(Anchor::Middle)
}

fn size_legend_trace(
    dummy_x: Vec<Option<f64>>,
    dummy_y: Vec<Option<f64>>,
    size: usize,
) -> Box<dyn Trace> {
    Scatter::new(dummy_x, dummy_y)
        .mode(Mode::Markers)
        .marker(Marker::new().size(size).color(NamedColor::Black))
        .name(format!("{size}"))
        .text_font(Font::new().size(8))
        .legend_group("sizes")
        .show_legend(true)
}

fn write_plot(plot: &Plot, path: &Utf8Path) -> Result<(), MetseaError> {
    Store::write_file_atomic(path, plot.to_html().as_bytes())
}
