//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - fitted curve(s): one glyph per series (`-`, `s`, `u`)
//! - binned empirical bike shares: `o`

use crate::domain::ProbGrid;
use crate::plot::EffectPlots;

/// One curve to draw: glyph, legend label, samples.
pub struct Series<'a> {
    pub glyph: char,
    pub label: &'a str,
    pub grid: &'a ProbGrid,
}

/// Render the three report plots stacked vertically.
pub fn render_effect_plots_ascii(
    plots: &EffectPlots,
    bins: &[(f64, f64)],
    width: usize,
    height: usize,
) -> String {
    let mut out = String::new();

    out.push_str(&render_plot(
        "P(bike) vs distance (covariates at means)",
        &[Series {
            glyph: '-',
            label: "fitted",
            grid: &plots.base,
        }],
        bins,
        width,
        height,
    ));
    out.push('\n');

    out.push_str(&render_plot(
        "P(bike) vs distance, by traffic-safety perception",
        &[
            Series {
                glyph: 's',
                label: "feels safe",
                grid: &plots.traffic.0,
            },
            Series {
                glyph: 'u',
                label: "feels unsafe",
                grid: &plots.traffic.1,
            },
        ],
        &[],
        width,
        height,
    ));
    out.push('\n');

    out.push_str(&render_plot(
        "P(bike) vs distance, by crime-safety perception",
        &[
            Series {
                glyph: 's',
                label: "feels safe",
                grid: &plots.crime.0,
            },
            Series {
                glyph: 'u',
                label: "feels unsafe",
                grid: &plots.crime.1,
            },
        ],
        &[],
        width,
        height,
    ));

    out
}

/// Render one plot: header, legend, grid, x-axis labels.
pub fn render_plot(
    title: &str,
    series: &[Series<'_>],
    points: &[(f64, f64)],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max)) = x_range(series, points) else {
        return format!("{title}: nothing to plot\n");
    };
    let (y_min, y_max) = pad_range(0.0, y_range(series, points).max(0.01), 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for s in series {
        draw_curve(&mut grid, s.grid, x_min, x_max, y_min, y_max);
    }
    // Re-walk each series so its own glyph wins at its sample columns, then
    // overlay the empirical points last.
    for s in series {
        for (&x, &y) in s.grid.distance_mi.iter().zip(&s.grid.p_bike) {
            let col = map_x(x, x_min, x_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][col] = s.glyph;
        }
    }
    for &(x, y) in points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y.clamp(y_min, y_max), y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{title}\n  distance=[{x_min:.2}, {x_max:.2}] mi | P=[{y_min:.3}, {y_max:.3}]\n"
    ));
    let legend: Vec<String> = series
        .iter()
        .map(|s| format!("{}={}", s.glyph, s.label))
        .chain(if points.is_empty() {
            None
        } else {
            Some("o=binned data".to_string())
        })
        .collect();
    out.push_str(&format!("  [{}]\n", legend.join(", ")));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn x_range(series: &[Series<'_>], points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for s in series {
        for &x in &s.grid.distance_mi {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
        }
    }
    for &(x, _) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(series: &[Series<'_>], points: &[(f64, f64)]) -> f64 {
    let mut max_y = 0.0_f64;
    for s in series {
        for &y in &s.grid.p_bike {
            max_y = max_y.max(y);
        }
    }
    for &(_, y) in points {
        max_y = max_y.max(y);
    }
    max_y
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &ProbGrid,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
) {
    if curve.distance_mi.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev: Option<(usize, usize)> = None;
    for (&x, &y) in curve.distance_mi.iter().zip(&curve.p_bike) {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);

        // Fill vertical gaps between consecutive samples so steep segments
        // stay connected.
        if let Some((prev_col, prev_row)) = prev {
            if col == prev_col || col == prev_col + 1 {
                let (lo, hi) = if prev_row < row { (prev_row, row) } else { (row, prev_row) };
                for r in lo..=hi {
                    if grid[r][col] == ' ' {
                        grid[r][col] = '.';
                    }
                }
            }
        }

        grid[row][col] = '-';
        prev = Some((col, row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(values: &[f64]) -> ProbGrid {
        ProbGrid {
            distance_mi: (0..values.len()).map(|i| i as f64).collect(),
            p_bike: values.to_vec(),
        }
    }

    #[test]
    fn render_is_deterministic_and_bounded() {
        let g = grid(&[0.5, 0.4, 0.3, 0.2, 0.1]);
        let series = [Series {
            glyph: '-',
            label: "fitted",
            grid: &g,
        }];
        let a = render_plot("test", &series, &[(1.0, 0.45)], 40, 10);
        let b = render_plot("test", &series, &[(1.0, 0.45)], 40, 10);
        assert_eq!(a, b);
        assert!(a.contains("o=binned data"));
        assert!(a.lines().all(|l| l.chars().count() <= 60));
    }

    #[test]
    fn degenerate_input_does_not_panic() {
        let g = grid(&[0.5]);
        let series = [Series {
            glyph: '-',
            label: "fitted",
            grid: &g,
        }];
        let out = render_plot("empty", &series, &[], 40, 10);
        assert!(out.contains("nothing to plot"));
    }

    #[test]
    fn axis_mapping_is_monotone() {
        assert_eq!(map_x(0.0, 0.0, 10.0, 100), 0);
        assert_eq!(map_x(10.0, 0.0, 10.0, 100), 99);
        assert!(map_y(0.9, 0.0, 1.0, 20) < map_y(0.1, 0.0, 1.0, 20));
    }
}
