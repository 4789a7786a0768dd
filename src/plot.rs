use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

use crate::error::PipelineError;

const SIZE: (u32, u32) = (800, 480);

/// Draws accuracy against k as an SVG chart.
pub fn plot_sweep<P: AsRef<Path>>(points: &[(usize, f64)], path: P) -> Result<(), PipelineError> {
    let path = path.as_ref();

    draw(SVGBackend::new(path, SIZE).into_drawing_area(), points)?;

    tracing::info!(path = %path.display(), "wrote sweep plot");
    Ok(())
}

/// Renders the chart into an in-memory SVG document.
pub fn render_sweep_svg(points: &[(usize, f64)]) -> Result<String, PipelineError> {
    let mut svg = String::new();

    draw(
        SVGBackend::with_string(&mut svg, SIZE).into_drawing_area(),
        points,
    )?;

    Ok(svg)
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    points: &[(usize, f64)],
) -> Result<(), PipelineError> {
    let max_k = points.iter().map(|&(k, _)| k).max().unwrap_or(1);

    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("k-NN accuracy by k", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d(0..max_k + 1, 0.0..1.0)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("k")
        .y_desc("accuracy")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(plot_error)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&(k, accuracy)| Circle::new((k, accuracy), 4, BLUE.filled())),
        )
        .map_err(plot_error)?;

    root.present().map_err(plot_error)
}

fn plot_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> PipelineError {
    PipelineError::Plot(err.to_string())
}
