//! End-to-end driver tests.
//!
//! Small handcrafted problems with solutions worked out by hand, plus a
//! seeded batch of randomized trials through the self-test harness. The
//! matrix helper lays data out with the padded leading dimension the
//! drivers require.

use std::io;

use lcp_core::linalg::dense::pad;
use lcp_core::selftest;
use lcp_core::{solve_lcp, solve_lcp_basic, solve_lcp_with, LcpSettings, SolveStatus};

const TOL: f64 = 1e-10;

/// Pack a dense row-major `n x n` matrix into the padded layout.
fn packed(n: usize, rows: &[f64]) -> Vec<f64> {
    assert_eq!(rows.len(), n * n);
    let nskip = pad(n);
    let mut a = vec![0.0; n * nskip];
    for i in 0..n {
        a[i * nskip..i * nskip + n].copy_from_slice(&rows[i * n..(i + 1) * n]);
    }
    a
}

fn assert_near(got: f64, want: f64, what: &str) {
    assert!(
        (got - want).abs() < TOL,
        "{}: got {}, expected {}",
        what,
        got,
        want
    );
}

#[test]
fn test_single_contact_interior() {
    // 2x = 3 + w, x >= 0: the constraint is inactive, x = 1.5, w = 0
    let mut a = packed(1, &[2.0]);
    let mut x = vec![0.0];
    let mut b = vec![3.0];
    let mut w = vec![0.0];
    let mut lo = vec![0.0];
    let mut hi = vec![f64::INFINITY];
    let status = solve_lcp(1, &mut a, &mut x, &mut b, &mut w, 0, &mut lo, &mut hi, None);
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 1.5, "x[0]");
    assert_near(w[0], 0.0, "w[0]");
}

#[test]
fn test_single_contact_pinned_low() {
    // 2x = -3 + w, x >= 0: x pins to the lower bound with w = A*x - b = 3
    let mut a = packed(1, &[2.0]);
    let mut x = vec![0.0];
    let mut b = vec![-3.0];
    let mut w = vec![0.0];
    let mut lo = vec![0.0];
    let mut hi = vec![f64::INFINITY];
    let status = solve_lcp(1, &mut a, &mut x, &mut b, &mut w, 0, &mut lo, &mut hi, None);
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 0.0, "x[0]");
    assert_near(w[0], 3.0, "w[0]");
}

#[test]
fn test_decoupled_mixed_pair() {
    let mut a = packed(2, &[2.0, 0.0, 0.0, 2.0]);
    let mut x = vec![0.0; 2];
    let mut b = vec![1.0, -1.0];
    let mut w = vec![0.0; 2];
    let mut lo = vec![0.0; 2];
    let mut hi = vec![f64::INFINITY; 2];
    let status = solve_lcp(2, &mut a, &mut x, &mut b, &mut w, 0, &mut lo, &mut hi, None);
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 0.5, "x[0]");
    assert_near(x[1], 0.0, "x[1]");
    assert_near(w[0], 0.0, "w[0]");
    assert_near(w[1], 1.0, "w[1]");
}

#[test]
fn test_all_unbounded_is_a_linear_solve() {
    // nub = n: x = A^-1 b = [1/11, 7/11], w = 0
    let mut a = packed(2, &[4.0, 1.0, 1.0, 3.0]);
    let mut x = vec![0.0; 2];
    let mut b = vec![1.0, 2.0];
    let mut w = vec![0.0; 2];
    let mut lo = vec![f64::NEG_INFINITY; 2];
    let mut hi = vec![f64::INFINITY; 2];
    let status = solve_lcp(2, &mut a, &mut x, &mut b, &mut w, 2, &mut lo, &mut hi, None);
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 1.0 / 11.0, "x[0]");
    assert_near(x[1], 7.0 / 11.0, "x[1]");
    assert_near(w[0], 0.0, "w[0]");
    assert_near(w[1], 0.0, "w[1]");
}

#[test]
fn test_upper_bound_clamping() {
    // diagonal system where two indexes hit hi and one stays interior
    let mut a = packed(3, &[2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0]);
    let mut x = vec![0.0; 3];
    let mut b = vec![1.0, 1.0, 1.0];
    let mut w = vec![0.0; 3];
    let mut lo = vec![-1.0; 3];
    let mut hi = vec![0.25, 0.25, 1.0];
    let status = solve_lcp(3, &mut a, &mut x, &mut b, &mut w, 0, &mut lo, &mut hi, None);
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 0.25, "x[0]");
    assert_near(x[1], 0.25, "x[1]");
    assert_near(x[2], 0.5, "x[2]");
    assert_near(w[0], -0.5, "w[0]");
    assert_near(w[1], -0.5, "w[1]");
    assert_near(w[2], 0.0, "w[2]");
}

#[test]
fn test_clamped_index_forced_back_out() {
    // introducing index 1 drives x[0] back down to its lower bound, so a
    // factor removal runs mid-solve; the fixed point is x = [0, 2]
    let mut a = packed(2, &[2.0, 1.0, 1.0, 2.0]);
    let mut x = vec![0.0; 2];
    let mut b = vec![1.0, 4.0];
    let mut w = vec![0.0; 2];
    let mut lo = vec![0.0; 2];
    let mut hi = vec![f64::INFINITY; 2];
    let status = solve_lcp(2, &mut a, &mut x, &mut b, &mut w, 0, &mut lo, &mut hi, None);
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 0.0, "x[0]");
    assert_near(x[1], 2.0, "x[1]");
    assert_near(w[0], 1.0, "w[0]");
    assert_near(w[1], 0.0, "w[1]");
}

#[test]
fn test_friction_bounds_follow_normal_force() {
    // index 0 is a normal row, index 1 a friction row scaled by it: the
    // effective bound becomes |0.5 * x[0]| = 1 and the row pins there
    let mut a = packed(2, &[1.0, 0.0, 0.0, 1.0]);
    let mut x = vec![0.0; 2];
    let mut b = vec![2.0, 3.0];
    let mut w = vec![0.0; 2];
    let mut lo = vec![0.0, -0.5];
    let mut hi = vec![f64::INFINITY, 0.5];
    let findex = vec![-1, 0];
    let status = solve_lcp(
        2,
        &mut a,
        &mut x,
        &mut b,
        &mut w,
        0,
        &mut lo,
        &mut hi,
        Some(&findex),
    );
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 2.0, "x[0]");
    assert_near(x[1], 1.0, "x[1]");
    assert_near(w[0], 0.0, "w[0]");
    assert_near(w[1], -2.0, "w[1]");
}

#[test]
fn test_friction_with_zero_normal_force() {
    // the normal row pins at zero, so the friction row's bounds collapse
    // to lo = hi = 0 and it carries no force
    let mut a = packed(2, &[1.0, 0.0, 0.0, 1.0]);
    let mut x = vec![0.0; 2];
    let mut b = vec![-1.0, 3.0];
    let mut w = vec![0.0; 2];
    let mut lo = vec![0.0, -0.5];
    let mut hi = vec![f64::INFINITY, 0.5];
    let findex = vec![-1, 0];
    let status = solve_lcp(
        2,
        &mut a,
        &mut x,
        &mut b,
        &mut w,
        0,
        &mut lo,
        &mut hi,
        Some(&findex),
    );
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 0.0, "x[0]");
    assert_near(x[1], 0.0, "x[1]");
    assert_near(w[0], 1.0, "w[0]");
    assert_near(w[1], -3.0, "w[1]");
}

#[test]
fn test_basic_driver_matches_fast_driver() {
    let spec = [
        (vec![2.0], vec![3.0], vec![1.5], vec![0.0]),
        (vec![2.0], vec![-3.0], vec![0.0], vec![3.0]),
    ];
    for (a_rows, b0, want_x, want_w) in spec {
        let n = b0.len();
        let mut a = packed(n, &a_rows);
        let mut x = vec![0.0; n];
        let mut b = b0.clone();
        let mut w = vec![0.0; n];
        let mut lo = vec![0.0; n];
        let mut hi = vec![f64::INFINITY; n];
        let status = solve_lcp_basic(n, &mut a, &mut x, &mut b, &mut w, &mut lo, &mut hi);
        assert_eq!(status, SolveStatus::Solved);
        for k in 0..n {
            assert_near(x[k], want_x[k], "x");
            assert_near(w[k], want_w[k], "w");
        }
    }
}

#[test]
fn test_basic_driver_coupled_pair() {
    let mut a = packed(2, &[2.0, 1.0, 1.0, 2.0]);
    let mut x = vec![0.0; 2];
    let mut b = vec![1.0, 4.0];
    let mut w = vec![0.0; 2];
    let mut lo = vec![0.0; 2];
    let mut hi = vec![f64::INFINITY; 2];
    let status = solve_lcp_basic(2, &mut a, &mut x, &mut b, &mut w, &mut lo, &mut hi);
    assert_eq!(status, SolveStatus::Solved);
    assert_near(x[0], 0.0, "x[0]");
    assert_near(x[1], 2.0, "x[1]");
    assert_near(w[0], 1.0, "w[0]");
    assert_near(w[1], 0.0, "w[1]");
}

#[test]
fn test_breakdown_freezes_and_reports() {
    // an indefinite diagonal violates the SPD contract and forces the
    // step computation to s <= 0; the driver must zero the tail and
    // report instead of looping
    let mut a = packed(1, &[-1e-3]);
    let mut x = vec![9.0];
    let mut b = vec![1.0];
    let mut w = vec![9.0];
    let mut lo = vec![0.0];
    let mut hi = vec![f64::INFINITY];
    let status = solve_lcp(1, &mut a, &mut x, &mut b, &mut w, 0, &mut lo, &mut hi, None);
    assert_eq!(status, SolveStatus::NumericalBreakdown);
    assert_eq!(x[0], 0.0);
    assert_eq!(w[0], 0.0);
}

#[test]
fn test_debug_checks_pass_on_random_problem() {
    // a moderately sized random problem with the factorization and
    // permutation verification running after every transfer
    use lcp_core::linalg::dense::{clear_upper_triangle, multiply2};
    use lcp_core::selftest::make_random_matrix;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    let n = 20;
    let nskip = pad(n);
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut m = vec![0.0; n * nskip];
    let mut a = vec![0.0; n * nskip];
    make_random_matrix(&mut m, n, n, 1.0, &mut rng);
    multiply2(&mut a, &m, &m, n, n, n);
    clear_upper_triangle(&mut a, n);

    let mut x = vec![0.0; n];
    let mut b = vec![0.0; n];
    make_random_matrix(&mut b, n, 1, 1.0, &mut rng);
    let mut w = vec![0.0; n];
    let mut lo = vec![0.0; n];
    let mut hi = vec![0.0; n];
    for k in 0..n {
        lo[k] = -1.0 - 0.05 * k as f64;
        hi[k] = 0.1 + 0.05 * k as f64;
    }

    let settings = LcpSettings {
        debug_checks: true,
    };
    let status = solve_lcp_with(
        n, &mut a, &mut x, &mut b, &mut w, 0, &mut lo, &mut hi, None, &settings,
    );
    assert_eq!(status, SolveStatus::Solved);
}

#[test]
fn test_randomized_batch() {
    selftest::run_trials(50, 42, &mut io::sink()).unwrap();
}
