//! SVG rendering of the three effect plots via plotters.
//!
//! One file per plot in the `--plot-dir` directory. The SVG backend writes
//! text as plain `<text>` elements, so no system font stack is needed.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::domain::ProbGrid;
use crate::error::AppError;
use crate::plot::EffectPlots;

const PLOT_SIZE: (u32, u32) = (800, 500);

/// Write `p_bike_distance.svg`, `p_bike_traffic.svg` and `p_bike_crime.svg`
/// into `dir`, creating it if needed. Returns the written paths.
pub fn write_effect_plots_svg(
    dir: &Path,
    plots: &EffectPlots,
    bins: &[(f64, f64)],
) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;

    let base = dir.join("p_bike_distance.svg");
    draw_plot(
        &base,
        "P(bike) vs trip distance (covariates at means)",
        &[("fitted", &plots.base, BLUE)],
        bins,
    )?;

    let traffic = dir.join("p_bike_traffic.svg");
    draw_plot(
        &traffic,
        "P(bike) by traffic-safety perception",
        &[
            ("feels safe", &plots.traffic.0, BLUE),
            ("feels unsafe", &plots.traffic.1, RED),
        ],
        &[],
    )?;

    let crime = dir.join("p_bike_crime.svg");
    draw_plot(
        &crime,
        "P(bike) by crime-safety perception",
        &[
            ("feels safe", &plots.crime.0, BLUE),
            ("feels unsafe", &plots.crime.1, RED),
        ],
        &[],
    )?;

    Ok(vec![base, traffic, crime])
}

fn draw_plot(
    path: &Path,
    caption: &str,
    series: &[(&str, &ProbGrid, RGBColor)],
    bins: &[(f64, f64)],
) -> Result<(), AppError> {
    let fail = |e: String| AppError::new(4, format!("Failed to render '{}': {e}", path.display()));

    let Some((_, first, _)) = series.first() else {
        return Err(fail("no series to draw".to_string()));
    };
    let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
    for &x in &first.distance_mi {
        x0 = x0.min(x);
        x1 = x1.max(x);
    }
    if !(x0.is_finite() && x1.is_finite()) || x1 <= x0 {
        return Err(fail("degenerate distance range".to_string()));
    }

    let mut y_max = 0.01_f64;
    for (_, grid, _) in series {
        for &y in &grid.p_bike {
            y_max = y_max.max(y);
        }
    }
    for &(_, y) in bins {
        y_max = y_max.max(y);
    }
    y_max = (y_max * 1.1).min(1.0);

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| fail(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d(x0..x1, 0.0..y_max)
        .map_err(|e| fail(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Trip distance (mi)")
        .y_desc("P(bike)")
        .draw()
        .map_err(|e| fail(e.to_string()))?;

    for (label, grid, color) in series {
        let color = *color;
        chart
            .draw_series(LineSeries::new(
                grid.distance_mi
                    .iter()
                    .zip(&grid.p_bike)
                    .map(|(&x, &y)| (x, y)),
                &color,
            ))
            .map_err(|e| fail(e.to_string()))?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color));
    }

    if !bins.is_empty() {
        chart
            .draw_series(
                bins.iter()
                    .map(|&(x, y)| Circle::new((x, y.min(y_max)), 3, BLACK.filled())),
            )
            .map_err(|e| fail(e.to_string()))?
            .label("binned data")
            .legend(|(x, y)| Circle::new((x + 9, y), 3, BLACK.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| fail(e.to_string()))?;

    root.present().map_err(|e| fail(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(slope: f64) -> ProbGrid {
        let distance_mi: Vec<f64> = (0..20).map(|i| 0.5 + i as f64 * 0.5).collect();
        let p_bike = distance_mi
            .iter()
            .map(|d| (0.4 - slope * d).clamp(0.01, 0.99))
            .collect();
        ProbGrid { distance_mi, p_bike }
    }

    #[test]
    fn writes_three_svg_files() {
        let dir = std::env::temp_dir().join(format!("mode_odds_svg_{}", std::process::id()));
        let plots = EffectPlots {
            base: grid(0.02),
            traffic: (grid(0.015), grid(0.03)),
            crime: (grid(0.018), grid(0.025)),
        };

        let paths = write_effect_plots_svg(&dir, &plots, &[(1.0, 0.3), (5.0, 0.1)]).unwrap();
        assert_eq!(paths.len(), 3);
        for p in &paths {
            let content = std::fs::read_to_string(p).unwrap();
            assert!(content.contains("<svg"));
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
