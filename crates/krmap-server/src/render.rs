//! Shapes a set of correction maps into the fixed 2×2 heatmap figure the
//! console page renders. Pure data shaping; plotting itself happens client
//! side.

use krmap_data::maps::{CorrectionMaps, Grid};
use serde::Serialize;

/// Shared anchor for the two primary-value panels. The uncertainty panels
/// keep independent auto-ranged scales.
const PRIMARY_COLORSCALE: &str = "Viridis";

const COL_LEFT: [f64; 2] = [0.0, 0.425];
const COL_RIGHT: [f64; 2] = [0.575, 1.0];
const ROW_TOP: [f64; 2] = [0.575, 1.0];
const ROW_BOTTOM: [f64; 2] = [0.0, 0.425];

#[derive(Serialize)]
pub(crate) struct Figure {
    data: Vec<HeatmapTrace>,
    layout: Layout,
}

#[derive(Serialize)]
struct HeatmapTrace {
    #[serde(rename = "type")]
    trace_type: &'static str,
    name: &'static str,
    z: Grid,
    xaxis: &'static str,
    yaxis: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    colorscale: Option<&'static str>,
    colorbar: ColorBar,
}

#[derive(Serialize)]
struct ColorBar {
    x: f64,
    y: f64,
    len: f64,
}

#[derive(Serialize)]
struct Layout {
    width: u32,
    height: u32,
    plot_bgcolor: &'static str,
    annotations: Vec<Annotation>,
    xaxis: Axis,
    xaxis2: Axis,
    xaxis3: Axis,
    xaxis4: Axis,
    yaxis: Axis,
    yaxis2: Axis,
    yaxis3: Axis,
    yaxis4: Axis,
}

#[derive(Serialize)]
struct Axis {
    domain: [f64; 2],
    anchor: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'static str>,
}

#[derive(Serialize)]
struct Annotation {
    text: &'static str,
    x: f64,
    y: f64,
    xref: &'static str,
    yref: &'static str,
    xanchor: &'static str,
    yanchor: &'static str,
    showarrow: bool,
}

fn panel_title(text: &'static str, col: [f64; 2], row: [f64; 2]) -> Annotation {
    Annotation {
        text,
        x: (col[0] + col[1]) / 2.0,
        y: row[1],
        xref: "paper",
        yref: "paper",
        xanchor: "center",
        yanchor: "bottom",
        showarrow: false,
    }
}

pub(crate) fn map_figure(maps: &CorrectionMaps) -> Figure {
    let data = vec![
        HeatmapTrace {
            trace_type: "heatmap",
            name: "E0",
            z: maps.e0.clone(),
            xaxis: "x",
            yaxis: "y",
            colorscale: Some(PRIMARY_COLORSCALE),
            colorbar: ColorBar {
                x: 0.42,
                y: 0.775,
                len: 0.48,
            },
        },
        HeatmapTrace {
            trace_type: "heatmap",
            name: "E0 uncertainty",
            z: maps.e0u.clone(),
            xaxis: "x2",
            yaxis: "y2",
            colorscale: None,
            colorbar: ColorBar {
                x: 1.0,
                y: 0.775,
                len: 0.47,
            },
        },
        HeatmapTrace {
            trace_type: "heatmap",
            name: "Lifetime",
            z: maps.lt.clone(),
            xaxis: "x3",
            yaxis: "y3",
            colorscale: Some(PRIMARY_COLORSCALE),
            colorbar: ColorBar {
                x: 0.42,
                y: 0.22,
                len: 0.48,
            },
        },
        HeatmapTrace {
            trace_type: "heatmap",
            name: "Lifetime uncertainty",
            z: maps.ltu.clone(),
            xaxis: "x4",
            yaxis: "y4",
            colorscale: None,
            colorbar: ColorBar {
                x: 1.0,
                y: 0.22,
                len: 0.48,
            },
        },
    ];

    // Axis titles only on the outer row and column.
    let layout = Layout {
        width: 800,
        height: 700,
        plot_bgcolor: "rgb(255,255,255)",
        annotations: vec![
            panel_title("E0", COL_LEFT, ROW_TOP),
            panel_title("E0 uncertainty", COL_RIGHT, ROW_TOP),
            panel_title("Lifetime", COL_LEFT, ROW_BOTTOM),
            panel_title("Lifetime uncertainty", COL_RIGHT, ROW_BOTTOM),
        ],
        xaxis: Axis {
            domain: COL_LEFT,
            anchor: "y",
            title: None,
        },
        xaxis2: Axis {
            domain: COL_RIGHT,
            anchor: "y2",
            title: None,
        },
        xaxis3: Axis {
            domain: COL_LEFT,
            anchor: "y3",
            title: Some("x [bin number]"),
        },
        xaxis4: Axis {
            domain: COL_RIGHT,
            anchor: "y4",
            title: Some("x [bin number]"),
        },
        yaxis: Axis {
            domain: ROW_TOP,
            anchor: "x",
            title: Some("y [bin number]"),
        },
        yaxis2: Axis {
            domain: ROW_TOP,
            anchor: "x2",
            title: None,
        },
        yaxis3: Axis {
            domain: ROW_BOTTOM,
            anchor: "x3",
            title: Some("y [bin number]"),
        },
        yaxis4: Axis {
            domain: ROW_BOTTOM,
            anchor: "x4",
            title: None,
        },
    };

    Figure { data, layout }
}
