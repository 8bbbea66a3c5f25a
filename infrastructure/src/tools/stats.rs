//! Deterministic numeric routines behind the analysis tools

/// Descriptive statistics of a numeric column (population standard deviation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

pub fn describe(values: &[f64]) -> Option<Describe> {
    if values.is_empty() {
        return None;
    }
    let mean = mean(values);
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    Some(Describe {
        count: values.len(),
        mean,
        std: std_dev(values, mean),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median,
    })
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Pearson correlation; `None` for fewer than two pairs or a constant series
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Spearman rank correlation (average ranks for ties)
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() {
        return None;
    }
    pearson(&ranks(xs), &ranks(ys))
}

fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // ranks are 1-based; ties share the average of their positions
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &index in &order[start..=end] {
            ranks[index] = rank;
        }
        start = end + 1;
    }
    ranks
}

/// Least-squares slope of `values` against their position
pub fn trend_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let mx = mean(&xs);
    let my = mean(values);
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let sxy: f64 = xs.iter().zip(values).map(|(x, y)| (x - mx) * (y - my)).sum();
    Some(sxy / sxx)
}

/// Indices of values more than `threshold` standard deviations from the mean
pub fn z_score_outliers(values: &[f64], threshold: f64) -> Vec<usize> {
    let mean = mean(values);
    let std = std_dev(values, mean);
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| (*v - mean).abs() > threshold * std)
        .map(|(i, _)| i)
        .collect()
}

/// Result of [`kmeans`]
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster of each input point
    pub labels: Vec<usize>,
    pub centers: Vec<[f64; 2]>,
    pub iterations: usize,
}

const KMEANS_MAX_ITERATIONS: usize = 100;

/// Lloyd's k-means on 2-D points with farthest-point seeding.
///
/// The first seed is the point farthest from the centroid; each further seed
/// is the point farthest from its nearest chosen seed. Ties resolve to the
/// lowest index, so results are deterministic. Requires `1 <= k <= points.len()`.
pub fn kmeans(points: &[[f64; 2]], k: usize) -> Option<Clustering> {
    if k == 0 || points.len() < k {
        return None;
    }

    let centroid = [
        mean(&points.iter().map(|p| p[0]).collect::<Vec<_>>()),
        mean(&points.iter().map(|p| p[1]).collect::<Vec<_>>()),
    ];
    let mut centers = vec![points[farthest_from(points, |p| distance2(p, &centroid))]];
    while centers.len() < k {
        let next = farthest_from(points, |p| {
            centers
                .iter()
                .map(|c| distance2(p, c))
                .fold(f64::INFINITY, f64::min)
        });
        centers.push(points[next]);
    }

    let mut labels = vec![usize::MAX; points.len()];
    let mut iterations = 0;
    while iterations < KMEANS_MAX_ITERATIONS {
        iterations += 1;
        let mut changed = false;
        for (i, point) in points.iter().enumerate() {
            let label = nearest(point, &centers);
            if labels[i] != label {
                labels[i] = label;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        for (c, center) in centers.iter_mut().enumerate() {
            let members: Vec<&[f64; 2]> = points
                .iter()
                .zip(&labels)
                .filter(|(_, label)| **label == c)
                .map(|(p, _)| p)
                .collect();
            // an empty cluster keeps its previous center
            if !members.is_empty() {
                let n = members.len() as f64;
                *center = [
                    members.iter().map(|p| p[0]).sum::<f64>() / n,
                    members.iter().map(|p| p[1]).sum::<f64>() / n,
                ];
            }
        }
    }

    Some(Clustering {
        labels,
        centers,
        iterations,
    })
}

fn distance2(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

fn nearest(point: &[f64; 2], centers: &[[f64; 2]]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, center) in centers.iter().enumerate() {
        let d = distance2(point, center);
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

fn farthest_from(points: &[[f64; 2]], score: impl Fn(&[f64; 2]) -> f64) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, point) in points.iter().enumerate() {
        let s = score(point);
        if s > best_score {
            best = i;
            best_score = s;
        }
    }
    best
}
