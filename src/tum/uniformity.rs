//! Table uniformity calculations (`tau_0`, `tau_1`), generalized from a
//! parsed [`crate::splitter`] table to a plain field-count vector so the
//! dialect detector can score candidate delimiters without building a full
//! table first.

/// `tau_0` (consistency): `1 / (1 + 2*sigma)` where sigma is the standard
/// deviation of field counts. 1.0 means every row has the same width.
pub fn calculate_tau_0(field_counts: &[usize]) -> f64 {
    if field_counts.is_empty() {
        return 0.0;
    }
    let sigma = standard_deviation(field_counts);
    1.0 / 2.0f64.mul_add(sigma, 1.0)
}

/// `tau_1` (dispersion): a weighted combination of range, transition, and
/// modal-dominance scores. 1.0 means low dispersion.
pub fn calculate_tau_1(field_counts: &[usize]) -> f64 {
    if field_counts.is_empty() {
        return 0.0;
    }
    let n = field_counts.len();
    if n == 1 {
        return 1.0;
    }

    let min_fc = *field_counts.iter().min().unwrap();
    let max_fc = *field_counts.iter().max().unwrap();
    let range = max_fc - min_fc;
    let range_score = if max_fc == 0 {
        0.0
    } else {
        1.0 - (range as f64 / max_fc as f64).min(1.0)
    };

    let mut transitions = 0;
    for i in 1..n {
        if field_counts[i] != field_counts[i - 1] {
            transitions += 1;
        }
    }
    let transition_score = 1.0 - (transitions as f64 / (n - 1) as f64);

    let mode_count = modal_frequency(field_counts);
    let mode_score = mode_count as f64 / n as f64;

    mode_score.mul_add(0.4, range_score * 0.3 + transition_score * 0.3)
}

fn modal_frequency(field_counts: &[usize]) -> usize {
    use foldhash::{HashMap, HashMapExt};
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &fc in field_counts {
        *counts.entry(fc).or_insert(0) += 1;
    }
    counts.values().copied().max().unwrap_or(0)
}

fn standard_deviation(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean: f64 = values.iter().sum::<usize>() as f64 / n;
    let variance: f64 = values
        .iter()
        .map(|&v| {
            let diff = v as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}

/// True when every row has the same field count.
pub fn is_uniform(field_counts: &[usize]) -> bool {
    match field_counts.first() {
        None => true,
        Some(&first) => field_counts.iter().all(|&fc| fc == first),
    }
}
