//! Driver for the basic non-negativity problem.
//!
//! Solves `A*x = b + w` with `x >= 0`, `w >= 0`, `x'w = 0`, the textbook
//! LCP. Structurally a stripped copy of the lo/hi driver: the push
//! direction is always positive, an index leaving C always returns to
//! `x = 0`, and there is no friction machinery. Kept as the reference
//! implementation for validating the fast driver and for callers whose
//! bounds really are trivial.

use crate::dantzig::state::Lcp;
use crate::linalg::dense::pad;
use crate::problem::{LcpSettings, SolveStatus};

/// Solve the basic LCP with default settings. See [`solve_lcp_basic_with`].
pub fn solve_lcp_basic(
    n: usize,
    a: &mut [f64],
    x: &mut [f64],
    b: &mut [f64],
    w: &mut [f64],
    lo: &mut [f64],
    hi: &mut [f64],
) -> SolveStatus {
    solve_lcp_basic_with(n, a, x, b, w, lo, hi, &LcpSettings::default())
}

/// Solve `A*x = b + w`, `x >= 0`, `w >= 0`, `x'w = 0`.
///
/// The bound arrays must hold `lo[i] = 0` and `hi[i] = +inf`; they are
/// taken mutably because the state object permutes them alongside the rest
/// of the problem.
pub fn solve_lcp_basic_with(
    n: usize,
    a: &mut [f64],
    x: &mut [f64],
    b: &mut [f64],
    w: &mut [f64],
    lo: &mut [f64],
    hi: &mut [f64],
    settings: &LcpSettings,
) -> SolveStatus {
    assert!(n > 0, "empty problem");
    let nskip = pad(n);
    assert!(a.len() >= n * nskip, "matrix buffer too small for n x pad(n)");
    assert!(x.len() >= n && b.len() >= n && w.len() >= n);
    assert!(lo.len() >= n && hi.len() >= n);
    debug_assert!(
        (0..n).all(|k| lo[k] == 0.0 && hi[k] == f64::INFINITY),
        "basic problem requires lo = 0 and hi = +inf"
    );

    let mut lcp = Lcp::new(
        n,
        0,
        &mut a[..n * nskip],
        &mut x[..n],
        &mut b[..n],
        &mut w[..n],
        &mut lo[..n],
        &mut hi[..n],
        None,
        settings.debug_checks,
    );
    let mut delta_x = vec![0.0; n];
    let mut delta_w = vec![0.0; n];

    for i in 0..n {
        if settings.debug_checks {
            lcp.check_permutations(i);
        }

        // N members sit at x = 0, so only the clamped block contributes
        let wi = lcp.row_dot_c(i, &lcp.x[..]) - lcp.b[i];
        lcp.w[i] = wi;
        if wi >= 0.0 {
            lcp.transfer_i_to_n(i);
            continue;
        }

        loop {
            // delta_x[C] = -A[C,C] \ A[C,i], with delta_x[i] = 1
            delta_x[..n].fill(0.0);
            lcp.solve1(&mut delta_x, i, 1, false);
            delta_x[i] = 1.0;

            // delta_w = A * delta_x on N and at i
            delta_w[..n].fill(0.0);
            lcp.mul_anc(&mut delta_w, &delta_x);
            lcp.add_ani(&mut delta_w, i, 1);
            delta_w[i] = lcp.row_dot_c(i, &delta_x) + lcp.a_ii(i);

            // smallest positive step: w[i] to zero, some w[N] to zero, or
            // some x[C] to zero
            let mut si = i;
            let mut si_in_n = false;
            let mut s = -lcp.w[i] / delta_w[i];
            for k in 0..lcp.num_n() {
                let idx = lcp.index_n(k);
                if delta_w[idx] < 0.0 {
                    let s2 = -lcp.w[idx] / delta_w[idx];
                    if s2 < s {
                        s = s2;
                        si = idx;
                        si_in_n = true;
                    }
                }
            }
            for k in 0..lcp.num_c() {
                let idx = lcp.index_c(k);
                if delta_x[idx] < 0.0 {
                    let s2 = -lcp.x[idx] / delta_x[idx];
                    if s2 < s {
                        s = s2;
                        si = idx;
                        si_in_n = false;
                    }
                }
            }

            if s <= 0.0 {
                log::warn!("LCP internal error, s <= 0 (s={:.4e})", s);
                lcp.x[i..n].fill(0.0);
                lcp.w[i..n].fill(0.0);
                lcp.unpermute();
                return SolveStatus::NumericalBreakdown;
            }

            lcp.step_x_c(s, &delta_x);
            lcp.x[i] += s;
            lcp.step_w_n(s, &delta_w);
            lcp.w[i] += s * delta_w[i];

            if si == i {
                lcp.w[i] = 0.0;
                lcp.transfer_i_to_c(i);
                break;
            }
            if si_in_n {
                lcp.w[si] = 0.0;
                lcp.transfer_i_from_n_to_c(si);
            } else {
                lcp.x[si] = 0.0;
                lcp.transfer_i_from_c_to_n(si);
            }
        }
    }

    lcp.unpermute();
    SolveStatus::Solved
}
