use plotters::prelude::*;
use std::f64::consts::PI;
use std::path::Path;

use crate::errors::AppError;

/// Chart image edge length, in pixels.
pub const CHART_SIZE_PX: u32 = 800;

const GRID_LEVELS: usize = 5;
const MARGIN_PX: f64 = 40.0;

const GRID_COLOR: RGBColor = RGBColor(190, 196, 204);
const SERIES_COLOR: RGBColor = RGBColor(31, 78, 121);

/// Angle of axis `index` out of `count`, starting straight up and going clockwise.
pub fn axis_angle(index: usize, count: usize) -> f64 {
    -PI / 2.0 + 2.0 * PI * index as f64 / count as f64
}

fn vertex(center: f64, radius: f64, angle: f64) -> (i32, i32) {
    (
        (center + radius * angle.cos()).round() as i32,
        (center + radius * angle.sin()).round() as i32,
    )
}

fn draw_err<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> AppError {
    AppError::RenderError(format!("Failed to draw radar chart: {}", e))
}

/// Draws a radar chart of percentage values (0..=100) to a PNG file.
///
/// Axis labels are left to the caller so the image needs no font support.
pub fn render_radar_chart(points: &[(String, f64)], path: &Path) -> Result<(), AppError> {
    if points.len() < 3 {
        return Err(AppError::RenderError(format!(
            "radar chart needs at least 3 axes, got {}",
            points.len()
        )));
    }

    let size = f64::from(CHART_SIZE_PX);
    let center = size / 2.0;
    let radius = center - MARGIN_PX;
    let count = points.len();

    let root = BitMapBackend::new(path, (CHART_SIZE_PX, CHART_SIZE_PX)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    for level in 1..=GRID_LEVELS {
        let r = radius * level as f64 / GRID_LEVELS as f64;
        let mut ring: Vec<(i32, i32)> = (0..count)
            .map(|i| vertex(center, r, axis_angle(i, count)))
            .collect();
        ring.push(ring[0]);
        root.draw(&PathElement::new(ring, GRID_COLOR.stroke_width(2)))
            .map_err(draw_err)?;
    }

    let origin = vertex(center, 0.0, 0.0);
    for i in 0..count {
        let tip = vertex(center, radius, axis_angle(i, count));
        root.draw(&PathElement::new(vec![origin, tip], GRID_COLOR.stroke_width(2)))
            .map_err(draw_err)?;
    }

    let series: Vec<(i32, i32)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, value))| {
            let r = radius * value.clamp(0.0, 100.0) / 100.0;
            vertex(center, r, axis_angle(i, count))
        })
        .collect();

    root.draw(&Polygon::new(series.clone(), SERIES_COLOR.mix(0.3).filled()))
        .map_err(draw_err)?;

    let mut outline = series.clone();
    outline.push(series[0]);
    root.draw(&PathElement::new(outline, SERIES_COLOR.stroke_width(4)))
        .map_err(draw_err)?;

    for point in series {
        root.draw(&Circle::new(point, 8, SERIES_COLOR.filled()))
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    tracing::debug!("Radar chart written to {}", path.display());
    Ok(())
}
