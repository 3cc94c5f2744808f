//! Descriptive statistics over motion vectors: summaries, z-score outlier
//! detection and the gamma fit overlaid on the histograms.

use serde::Serialize;

/// |z| above which a subject is an outlier; two-sided tail mass of 0.5%
/// (the top and bottom 0.25% of a normal distribution).
pub const Z_CUTOFF: f64 = 2.80703;

// ---------------------------------------------------------------------------
// Moments
// ---------------------------------------------------------------------------

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population (ddof = 0) standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) * 0.5)
    } else {
        Some(v[mid])
    }
}

/// Count / mean / median / σ of one cohort, as annotated on the histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Option<Self> {
        Some(Summary {
            n: values.len(),
            mean: mean(values)?,
            median: median(values)?,
            std: std_dev(values)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Outliers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// `mean ± Z_CUTOFF·σ` of `values`; `None` for empty input.
pub fn outlier_bounds(values: &[f64]) -> Option<OutlierBounds> {
    let mu = mean(values)?;
    let std = std_dev(values)?;
    Some(bounds_around(mu, std))
}

fn bounds_around(mu: f64, std: f64) -> OutlierBounds {
    let cut = std * Z_CUTOFF;
    OutlierBounds {
        lower: mu - cut,
        upper: mu + cut,
    }
}

/// Values lying strictly outside [`outlier_bounds`], in input order.
///
/// Returns values rather than positions: callers remove every row carrying
/// one of these values.
pub fn find_anomalies(values: &[f64]) -> Vec<f64> {
    let (Some(mu), Some(std)) = (mean(values), std_dev(values)) else {
        return Vec::new();
    };
    // σ = 0: every value equals the mean
    if std == 0.0 {
        return Vec::new();
    }
    let bounds = bounds_around(mu, std);
    values
        .iter()
        .copied()
        .filter(|&v| !bounds.contains(v))
        .collect()
}

// ---------------------------------------------------------------------------
// Gamma fit
// ---------------------------------------------------------------------------

/// Gamma distribution with location fixed at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GammaFit {
    pub shape: f64,
    pub scale: f64,
}

impl GammaFit {
    /// Approximate maximum-likelihood fit over the strictly positive samples.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let positive: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        if positive.len() < 2 {
            return None;
        }
        let mu = mean(&positive)?;
        let mean_ln = positive.iter().map(|v| v.ln()).sum::<f64>() / positive.len() as f64;
        let s = mu.ln() - mean_ln;
        if s <= 0.0 || !s.is_finite() {
            return None;
        }
        let shape = (3.0 - s + ((s - 3.0).powi(2) + 24.0 * s).sqrt()) / (12.0 * s);
        Some(GammaFit {
            shape,
            scale: mu / shape,
        })
    }

    pub fn pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        let k = self.shape;
        let ln_pdf = (k - 1.0) * x.ln() - x / self.scale - ln_gamma(k) - k * self.scale.ln();
        ln_pdf.exp()
    }
}

/// ln Γ(x) for x > 0 (Lanczos, g = 7, n = 9).
fn ln_gamma(x: f64) -> f64 {
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // reflection
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + 7.5;
    let series = COEF[1..]
        .iter()
        .enumerate()
        .fold(COEF[0], |acc, (i, c)| acc + c / (x + i as f64 + 1.0));
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn population_std() {
        // ddof = 0: σ² = 1.25
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(std_dev(&v).unwrap(), 1.25f64.sqrt(), 1e-12));
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn anomalies_empty_and_constant() {
        assert!(find_anomalies(&[]).is_empty());
        assert!(find_anomalies(&[0.2; 40]).is_empty());
    }

    #[test]
    fn flags_outlier_when_bounds_round_to_the_mean() {
        // σ ≈ 0.5 is far below the spacing of doubles near 1e17 (16), so both
        // bounds round onto the mean even though σ is non-zero.
        let base = 1e17;
        let mut v = vec![base; 1000];
        v.push(base + 16.0);
        let bounds = outlier_bounds(&v).unwrap();
        assert_eq!(bounds.lower, bounds.upper);
        assert!(std_dev(&v).unwrap() > 0.0);
        assert_eq!(find_anomalies(&v), vec![base + 16.0]);
    }

    #[test]
    fn flags_single_extreme_value() {
        let mut v: Vec<f64> = (0..200).map(|i| 0.1 + (i % 10) as f64 * 0.01).collect();
        v.push(5.0);
        assert_eq!(find_anomalies(&v), vec![5.0]);
    }

    #[test]
    fn anomalies_keep_duplicates_in_input_order() {
        let mut v = vec![0.1; 500];
        v.insert(3, 9.0);
        v.push(9.0);
        assert_eq!(find_anomalies(&v), vec![9.0, 9.0]);
    }

    #[test]
    fn ln_gamma_known_values() {
        assert!(approx(ln_gamma(1.0), 0.0, 1e-10));
        assert!(approx(ln_gamma(5.0), 24f64.ln(), 1e-10));
        assert!(approx(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-10));
    }

    #[test]
    fn gamma_fit_recovers_exponential() {
        // Quantiles of Exp(scale = 2): shape ≈ 1, scale ≈ 2
        let n = 2000;
        let v: Vec<f64> = (1..n)
            .map(|i| -2.0 * (1.0 - i as f64 / n as f64).ln())
            .collect();
        let fit = GammaFit::fit(&v).unwrap();
        assert!(approx(fit.shape, 1.0, 0.1), "shape={}", fit.shape);
        assert!(approx(fit.scale, 2.0, 0.25), "scale={}", fit.scale);
        assert!(approx(fit.pdf(1.0), (-0.5f64).exp() / 2.0, 0.05));
    }

    #[test]
    fn gamma_fit_needs_spread() {
        assert!(GammaFit::fit(&[0.3]).is_none());
        assert!(GammaFit::fit(&[0.3, 0.3, 0.3]).is_none());
        assert!(GammaFit::fit(&[-1.0, 0.0]).is_none());
    }
}
