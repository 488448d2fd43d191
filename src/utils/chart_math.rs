//! Chart Geometry Utilities
//!
//! Pure coordinate math behind the six chart views: radar vertices, the
//! outer-product heatmap matrix, pie wedges, mid-step paths and the
//! viridis colour scale.

use std::f64::consts::TAU;

/// Angles evenly spaced over a full turn, endpoint excluded
pub fn radar_angles(n: usize) -> Vec<f64> {
    (0..n).map(|i| TAU * i as f64 / n as f64).collect()
}

/// Closed radar polygon in unit-circle coordinates
///
/// Values are scaled by `r_max`; negative values collapse onto the centre.
/// The first vertex is repeated at the end.
pub fn radar_polygon(values: &[f64], r_max: f64) -> Vec<(f64, f64)> {
    if values.is_empty() || r_max <= 0.0 {
        return Vec::new();
    }

    let mut points: Vec<(f64, f64)> = radar_angles(values.len())
        .into_iter()
        .zip(values)
        .map(|(angle, &v)| {
            let r = v.max(0.0) / r_max;
            (r * angle.cos(), r * angle.sin())
        })
        .collect();
    points.push(points[0]);
    points
}

/// Outermost radar ring: the largest value rounded up, at least 1
pub fn radar_extent(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(1.0_f64, f64::max)
        .ceil()
}

/// `m[i][j] = values[i] * values[j]`
pub fn outer_product(values: &[f64]) -> Vec<Vec<f64>> {
    values
        .iter()
        .map(|&a| values.iter().map(|&b| a * b).collect())
        .collect()
}

/// Minimum and maximum of a matrix
pub fn matrix_bounds(matrix: &[Vec<f64>]) -> Option<(f64, f64)> {
    matrix.iter().flatten().copied().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// One pie slice, angles in radians counter-clockwise from east
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieWedge {
    pub start: f64,
    pub end: f64,
    pub fraction: f64,
}

impl PieWedge {
    pub fn mid_angle(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Wedges proportional to the values, starting at angle 0
///
/// Negative values count as zero. Returns nothing when the total is zero.
pub fn pie_wedges(values: &[f64]) -> Vec<PieWedge> {
    let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
    if total <= 0.0 || !total.is_finite() {
        return Vec::new();
    }

    let mut start = 0.0;
    values
        .iter()
        .map(|v| {
            let fraction = v.max(0.0) / total;
            let end = start + fraction * TAU;
            let wedge = PieWedge { start, end, fraction };
            start = end;
            wedge
        })
        .collect()
}

/// Points along a circular arc, both ends included
pub fn arc_points(center: (f64, f64), radius: f64, start: f64, end: f64) -> Vec<(f64, f64)> {
    let steps = (((end - start).abs() / TAU) * 96.0).ceil().max(2.0) as usize;
    (0..=steps)
        .map(|i| {
            let angle = start + (end - start) * i as f64 / steps as f64;
            (center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
        })
        .collect()
}

/// Step path where each change happens halfway between positions
pub fn step_mid_path(values: &[f64]) -> Vec<(f64, f64)> {
    let mut path = Vec::with_capacity(values.len() * 2);
    for (i, &v) in values.iter().enumerate() {
        let x = i as f64;
        if i == 0 {
            path.push((x, v));
        } else {
            let mid = x - 0.5;
            path.push((mid, values[i - 1]));
            path.push((mid, v));
        }
        if i + 1 == values.len() {
            path.push((x, v));
        }
    }
    path
}

/// Round a raw tick interval to 1, 2 or 5 times a power of ten
pub fn nice_step(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let norm = raw / magnitude;
    let unit = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    unit * magnitude
}

/// About five evenly spaced tick values inside `[lo, hi]`
pub fn nice_ticks(lo: f64, hi: f64) -> Vec<f64> {
    if !(hi > lo) {
        return vec![lo];
    }
    let step = nice_step((hi - lo) / 5.0);
    let first = (lo / step).ceil() * step;
    (0..)
        .map(|k| first + k as f64 * step)
        .take_while(|&t| t <= hi + step * 1e-9)
        .collect()
}

const VIRIDIS_STOPS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Viridis colour for `t` in `[0, 1]`
pub fn viridis(t: f64) -> (u8, u8, u8) {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS_STOPS.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(VIRIDIS_STOPS.len() - 2);
    let frac = scaled - idx as f64;

    let (a, b) = (VIRIDIS_STOPS[idx], VIRIDIS_STOPS[idx + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Position of `value` within `[lo, hi]`, 0.5 for a flat range
pub fn normalize(value: f64, lo: f64, hi: f64) -> f64 {
    if hi - lo <= f64::EPSILON {
        0.5
    } else {
        (value - lo) / (hi - lo)
    }
}
