use std::path::Path;

use anyhow::{anyhow, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::color::tint;
use crate::stats::{GammaFit, Summary};

// ---------------------------------------------------------------------------
// Density histogram
// ---------------------------------------------------------------------------

/// Equal-width bins normalised so the bars integrate to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityHistogram {
    pub start: f64,
    pub width: f64,
    pub densities: Vec<f64>,
}

impl DensityHistogram {
    /// `bins` bins spanning `[min, max]` of `values`. A degenerate range is
    /// widened to `[v - 0.5, v + 0.5]`.
    pub fn new(values: &[f64], bins: usize) -> Option<Self> {
        if values.is_empty() || bins == 0 {
            return None;
        }
        let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !lo.is_finite() || !hi.is_finite() {
            return None;
        }
        if hi - lo < f64::EPSILON {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;

        let mut counts = vec![0usize; bins];
        for &v in values {
            // the last bin is closed on the right
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        let norm = values.len() as f64 * width;
        Some(DensityHistogram {
            start: lo,
            width,
            densities: counts.into_iter().map(|c| c as f64 / norm).collect(),
        })
    }

    pub fn end(&self) -> f64 {
        self.start + self.width * self.densities.len() as f64
    }

    /// `(left, right, density)` per bin.
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.densities.iter().enumerate().map(move |(i, &d)| {
            let left = self.start + i as f64 * self.width;
            (left, left + self.width, d)
        })
    }

    pub fn max_density(&self) -> f64 {
        self.densities.iter().copied().fold(0.0, f64::max)
    }
}

/// Annotation text shown next to each cohort's histogram.
pub fn annotation_lines(s: &Summary) -> [String; 4] {
    [
        format!("n={}", s.n),
        format!("μ={:.4}", s.mean),
        format!("median={:.4}", s.median),
        format!("σ={:.4}", s.std),
    ]
}

// ---------------------------------------------------------------------------
// Figure
// ---------------------------------------------------------------------------

/// One cohort drawn on the comparison figure.
pub struct Series<'a> {
    pub label: &'a str,
    pub values: &'a [f64],
    pub color: RGBColor,
}

struct Layer<'a> {
    series: &'a Series<'a>,
    hist: DensityHistogram,
    fit: Option<GammaFit>,
    summary: Summary,
}

const SIZE: (u32, u32) = (1600, 1200);
const CURVE_POINTS: usize = 400;

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("drawing histogram: {e}")
}

/// Overlay density histograms with fitted gamma curves and summary boxes.
/// Empty series are skipped.
pub fn render_comparison(path: &Path, title: &str, series: &[Series<'_>], bins: usize) -> Result<()> {
    let layers: Vec<Layer<'_>> = series
        .iter()
        .filter_map(|s| {
            Some(Layer {
                series: s,
                hist: DensityHistogram::new(s.values, bins)?,
                fit: GammaFit::fit(s.values),
                summary: Summary::of(s.values)?,
            })
        })
        .collect();
    if layers.is_empty() {
        return Err(anyhow!("no values to plot in {}", path.display()));
    }

    let x_min = layers.iter().map(|l| l.hist.start).fold(f64::INFINITY, f64::min).min(0.0);
    let x_max = layers.iter().map(|l| l.hist.end()).fold(f64::NEG_INFINITY, f64::max);
    let curves: Vec<Option<Vec<(f64, f64)>>> = layers
        .iter()
        .map(|l| {
            l.fit.map(|fit| {
                (0..=CURVE_POINTS)
                    .map(|i| {
                        let x = x_min + (x_max - x_min) * i as f64 / CURVE_POINTS as f64;
                        (x, fit.pdf(x))
                    })
                    .filter(|(_, y)| y.is_finite())
                    .collect()
            })
        })
        .collect();
    let y_max = layers
        .iter()
        .map(|l| l.hist.max_density())
        .chain(curves.iter().flatten().flatten().map(|&(_, y)| y))
        .fold(0.0, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc("Frame displacement (mm)")
        .y_desc("Probability density")
        .draw()
        .map_err(draw_err)?;

    for (layer, curve) in layers.iter().zip(&curves) {
        let color = layer.series.color;
        chart
            .draw_series(layer.hist.bars().map(|(x0, x1, d)| {
                Rectangle::new([(x0, 0.0), (x1, d)], color.mix(0.45).filled())
            }))
            .map_err(draw_err)?
            .label(layer.series.label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 8), (x + 24, y + 8)], color.mix(0.45).filled()));

        if let Some(points) = curve {
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(3)))
                .map_err(draw_err)?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(("sans-serif", 24))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_err)?;

    // Summary boxes, right-aligned inside the plot area, stacked downwards.
    let (px, py) = chart.plotting_area().get_pixel_range();
    let right = px.end - 20;
    let line_height = 30;
    let box_height = line_height * 4 + 20;
    let style = TextStyle::from(("sans-serif", 24).into_font()).pos(Pos::new(HPos::Right, VPos::Top));
    for (i, layer) in layers.iter().enumerate() {
        let top = py.start + (py.end - py.start) * (3 + 3 * i as i32) / 10;
        root.draw(&Rectangle::new(
            [(right - 260, top), (right, top + box_height)],
            tint(layer.series.color, 0.3).mix(0.6).filled(),
        ))
        .map_err(draw_err)?;
        for (j, text) in annotation_lines(&layer.summary).iter().enumerate() {
            root.draw(&Text::new(
                text.clone(),
                (right - 12, top + 10 + line_height * j as i32),
                style.clone(),
            ))
            .map_err(draw_err)?;
        }
    }

    root.present().map_err(draw_err)?;
    log::info!("wrote histogram {}", path.display());
    Ok(())
}
