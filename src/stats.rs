//! Log-space hypergeometric tail probabilities and the multiple-testing
//! correction family used by the enrichment engine.

use std::f64::consts::PI;

use crate::domain::AdjustMethod;
use crate::error::MetseaError;

/// Natural log of the gamma function via the Lanczos approximation (g=7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 8] = [
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection formula: Γ(x) = π / (sin(πx) · Γ(1-x))
        let log_pi_over_sin = (PI / (PI * x).sin()).ln();
        log_pi_over_sin - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut ag = 0.99999999999980993_f64;
        for (i, &c) in COEFFS.iter().enumerate() {
            ag += c / (x + i as f64 + 1.0);
        }
        let t = x + 7.5; // g + 0.5
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + ag.ln()
    }
}

/// Log of binomial coefficient C(n, k) = ln(n!) - ln(k!) - ln((n-k)!).
pub fn ln_choose(n: usize, k: usize) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// Hypergeometric right-tail probability P(X ≥ k).
///
/// X counts successes among `draws` draws without replacement from a
/// population of `population` items of which `successes` are successes.
pub fn hypergeometric_tail(k: usize, draws: usize, successes: usize, population: usize) -> f64 {
    if k == 0 {
        return 1.0;
    }
    let max_i = draws.min(successes);
    if k > max_i {
        return 0.0;
    }
    if draws > population {
        // Drawing more than the population captures every success.
        return 1.0;
    }

    // Sum the PMF from k to min(draws, successes) in log-space for stability.
    let mut sum = 0.0_f64;
    let log_denom = ln_choose(population, draws);
    for i in k..=max_i {
        if population - successes < draws - i {
            continue;
        }
        let log_p = ln_choose(successes, i) + ln_choose(population - successes, draws - i)
            - log_denom;
        sum += log_p.exp();
    }
    sum.min(1.0)
}

/// Apply a multiple-testing correction to `p_values`.
///
/// Returns the adjusted p-values in the same order as the input. Input
/// values outside [0, 1] are rejected.
pub fn adjust(p_values: &[f64], method: AdjustMethod) -> Result<Vec<f64>, MetseaError> {
    validate_p_values(p_values)?;
    if p_values.is_empty() {
        return Ok(Vec::new());
    }
    Ok(match method {
        AdjustMethod::Bonferroni => bonferroni(p_values),
        AdjustMethod::Holm => holm(p_values),
        AdjustMethod::Hochberg => hochberg(p_values),
        AdjustMethod::Hommel => hommel(p_values),
        AdjustMethod::Bh => benjamini_hochberg(p_values),
        AdjustMethod::By => benjamini_yekutieli(p_values),
    })
}

fn validate_p_values(p_values: &[f64]) -> Result<(), MetseaError> {
    for &p in p_values {
        if !(0.0..=1.0).contains(&p) {
            return Err(MetseaError::InvalidPValue(p));
        }
    }
    Ok(())
}

fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..p_values.len()).collect();
    indices.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    indices
}

fn bonferroni(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len() as f64;
    p_values.iter().map(|&p| (p * n).min(1.0)).collect()
}

/// Holm step-down: running max of (n - rank) · p over ascending p.
fn holm(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let indices = ascending_order(p_values);
    let mut adjusted = vec![0.0; n];
    let mut prev = 0.0_f64;
    for (i, &idx) in indices.iter().enumerate() {
        let adj = ((n - i) as f64 * p_values[idx]).max(prev).min(1.0);
        adjusted[idx] = adj;
        prev = adj;
    }
    adjusted
}

/// Hochberg step-up: running min of (n - rank) · p from the largest p down.
fn hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let indices = ascending_order(p_values);
    let mut adjusted = vec![0.0; n];
    let mut prev = f64::INFINITY;
    for i in (0..n).rev() {
        let idx = indices[i];
        let adj = ((n - i) as f64 * p_values[idx]).min(1.0).min(prev);
        adjusted[idx] = adj;
        prev = adj;
    }
    adjusted
}

/// Hommel's simultaneous procedure, following the q-vector refinement of
/// the reference implementation. For two p-values it coincides with
/// Hochberg, so that case is delegated.
fn hommel(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    if n == 1 {
        return p_values.to_vec();
    }
    if n == 2 {
        return hochberg(p_values);
    }

    let indices = ascending_order(p_values);
    let sorted: Vec<f64> = indices.iter().map(|&idx| p_values[idx]).collect();
    let n_f = n as f64;

    let init = (0..n)
        .map(|i| n_f * sorted[i] / (i as f64 + 1.0))
        .fold(f64::INFINITY, f64::min);
    let mut q = vec![init; n];
    let mut pa = vec![init; n];

    for m in (2..n).rev() {
        let m_f = m as f64;
        let mut q1 = f64::INFINITY;
        for j in 0..(m - 1) {
            let val = m_f * sorted[n - m + 1 + j] / (j as f64 + 2.0);
            if val < q1 {
                q1 = val;
            }
        }
        for i in 0..(n - m + 1) {
            q[i] = (m_f * sorted[i]).min(q1);
        }
        for i in (n - m + 1)..n {
            q[i] = q[n - m];
        }
        for i in 0..n {
            if q[i] > pa[i] {
                pa[i] = q[i];
            }
        }
    }

    let mut adjusted = vec![0.0; n];
    for (i, &idx) in indices.iter().enumerate() {
        adjusted[idx] = pa[i].max(sorted[i]);
    }
    adjusted
}

/// Benjamini-Hochberg: running min of p · n / rank from the largest p down.
fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let indices = ascending_order(p_values);
    let n_f = n as f64;
    let mut adjusted = vec![0.0; n];
    let mut prev = f64::INFINITY;
    for i in (0..n).rev() {
        let rank = (i + 1) as f64;
        let idx = indices[i];
        let adj = (p_values[idx] * n_f / rank).min(1.0).min(prev);
        adjusted[idx] = adj;
        prev = adj;
    }
    adjusted
}

/// Benjamini-Yekutieli: BH inflated by the harmonic sum c(n) = Σ 1/i.
fn benjamini_yekutieli(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let indices = ascending_order(p_values);
    let n_f = n as f64;
    let c: f64 = (1..=n).map(|i| 1.0 / i as f64).sum();
    let mut adjusted = vec![0.0; n];
    let mut prev = f64::INFINITY;
    for i in (0..n).rev() {
        let rank = (i + 1) as f64;
        let idx = indices[i];
        let adj = (p_values[idx] * c * n_f / rank).min(1.0).min(prev);
        adjusted[idx] = adj;
        prev = adj;
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::MetseaError;

    const TOL: f64 = 1e-10;

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < TOL);
        assert!((ln_gamma(1.0)).abs() < TOL);
        assert!((ln_gamma(0.5) - PI.sqrt().ln()).abs() < TOL);
    }

    #[test]
    fn ln_choose_known_values() {
        assert!((ln_choose(10, 3) - 120.0_f64.ln()).abs() < TOL);
        assert!((ln_choose(4, 0)).abs() < TOL);
        assert_eq!(ln_choose(3, 5), f64::NEG_INFINITY);
    }

    #[test]
    fn tail_closed_form() {
        // Population 10, 4 successes, 3 draws, at least 2 hits:
        // [C(4,2)C(6,1) + C(4,3)C(6,0)] / C(10,3) = 40/120
        let p = hypergeometric_tail(2, 3, 4, 10);
        assert!((p - 1.0 / 3.0).abs() < TOL);
    }

    #[test]
    fn tail_degenerate_cases() {
        assert_eq!(hypergeometric_tail(0, 3, 4, 10), 1.0);
        assert_eq!(hypergeometric_tail(5, 3, 4, 10), 0.0);
        // Drawing the whole population is certain to capture every success.
        assert!((hypergeometric_tail(4, 10, 4, 10) - 1.0).abs() < TOL);
        assert_eq!(hypergeometric_tail(2, 12, 4, 10), 1.0);
    }

    #[test]
    fn tail_single_draw() {
        // One draw from 10 with 4 successes: P(X >= 1) = 0.4.
        let p = hypergeometric_tail(1, 1, 4, 10);
        assert!((p - 0.4).abs() < TOL);
    }

    #[test]
    fn bonferroni_known() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let adj = adjust(&p, AdjustMethod::Bonferroni).unwrap();
        assert!((adj[0] - 0.04).abs() < TOL);
        assert!((adj[1] - 0.16).abs() < TOL);
        assert!((adj[2] - 0.12).abs() < TOL);
        assert!((adj[3] - 0.02).abs() < TOL);
    }

    #[test]
    fn bonferroni_clamps_to_one() {
        let adj = adjust(&[0.5, 0.8], AdjustMethod::Bonferroni).unwrap();
        assert!((adj[0] - 1.0).abs() < TOL);
        assert!((adj[1] - 1.0).abs() < TOL);
    }

    #[test]
    fn holm_reference_vector() {
        // p.adjust(c(0.01, 0.04, 0.03, 0.005), "holm")
        let p = [0.01, 0.04, 0.03, 0.005];
        let adj = adjust(&p, AdjustMethod::Holm).unwrap();
        let expected = [0.03, 0.06, 0.06, 0.02];
        for (a, e) in adj.iter().zip(expected.iter()) {
            assert!((a - e).abs() < TOL);
        }
    }

    #[test]
    fn hochberg_reference_vector() {
        // p.adjust(c(0.01, 0.04, 0.03, 0.005), "hochberg")
        let p = [0.01, 0.04, 0.03, 0.005];
        let adj = adjust(&p, AdjustMethod::Hochberg).unwrap();
        let expected = [0.03, 0.04, 0.04, 0.02];
        for (a, e) in adj.iter().zip(expected.iter()) {
            assert!((a - e).abs() < TOL);
        }
    }

    #[test]
    fn hommel_reference_vector() {
        // p.adjust(c(0.01, 0.02, 0.025, 0.05), "hommel"); an input where
        // Hommel is strictly sharper than Hochberg in the first position.
        let p = [0.01, 0.02, 0.025, 0.05];
        let adj = adjust(&p, AdjustMethod::Hommel).unwrap();
        let expected = [0.1 / 3.0, 0.04, 0.05, 0.05];
        for (a, e) in adj.iter().zip(expected.iter()) {
            assert!((a - e).abs() < TOL);
        }

        let hoch = adjust(&p, AdjustMethod::Hochberg).unwrap();
        for (hm, hc) in adj.iter().zip(hoch.iter()) {
            assert!(hm <= &(hc + TOL));
        }
    }

    #[test]
    fn hommel_tiny_inputs() {
        let adj = adjust(&[0.02], AdjustMethod::Hommel).unwrap();
        assert!((adj[0] - 0.02).abs() < TOL);

        let adj = adjust(&[0.02, 0.04], AdjustMethod::Hommel).unwrap();
        let hoch = adjust(&[0.02, 0.04], AdjustMethod::Hochberg).unwrap();
        for (a, e) in adj.iter().zip(hoch.iter()) {
            assert!((a - e).abs() < TOL);
        }
    }

    #[test]
    fn bh_known() {
        // Classic example: sorted 0.005, 0.01, 0.03, 0.04 with ranks 1-4
        // adjusts to 0.02, 0.02, 0.04, 0.04 after the right-to-left min.
        let p = [0.01, 0.04, 0.03, 0.005];
        let adj = adjust(&p, AdjustMethod::Bh).unwrap();
        let expected = [0.02, 0.04, 0.04, 0.02];
        for (a, e) in adj.iter().zip(expected.iter()) {
            assert!((a - e).abs() < TOL);
        }
    }

    #[test]
    fn by_inflates_bh_by_harmonic_sum() {
        // c(4) = 1 + 1/2 + 1/3 + 1/4 = 25/12
        let p = [0.01, 0.04, 0.03, 0.005];
        let adj = adjust(&p, AdjustMethod::By).unwrap();
        let expected = [1.0 / 24.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 24.0];
        for (a, e) in adj.iter().zip(expected.iter()) {
            assert!((a - e).abs() < TOL);
        }
    }

    #[test]
    fn adjusted_never_below_raw() {
        let p = [0.001, 0.2, 0.04, 0.9, 0.33];
        for method in [
            AdjustMethod::Bonferroni,
            AdjustMethod::Holm,
            AdjustMethod::Hochberg,
            AdjustMethod::Hommel,
            AdjustMethod::Bh,
            AdjustMethod::By,
        ] {
            let adj = adjust(&p, method).unwrap();
            for (raw, a) in p.iter().zip(adj.iter()) {
                assert!(a >= raw, "{method}: adjusted {a} below raw {raw}");
                assert!(*a <= 1.0);
            }
        }
    }

    #[test]
    fn empty_input_is_empty_output() {
        let adj = adjust(&[], AdjustMethod::Bh).unwrap();
        assert!(adj.is_empty());
    }

    #[test]
    fn out_of_range_p_rejected() {
        let err = adjust(&[0.02, 1.5], AdjustMethod::Bh).unwrap_err();
        assert_matches!(err, MetseaError::InvalidPValue(_));

        let err = adjust(&[-0.1], AdjustMethod::Bonferroni).unwrap_err();
        assert_matches!(err, MetseaError::InvalidPValue(_));
    }
}
