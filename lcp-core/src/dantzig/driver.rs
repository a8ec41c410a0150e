//! The production lo/hi driver.
//!
//! Indexes are introduced one at a time. For the driving index `i` the pair
//! `(x[i], w[i])` starts at `x = 0` and is pushed toward a valid segment
//! along a direction that keeps every clamped `w` at zero; whichever
//! boundary is hit first decides what happens, and hitting a boundary of an
//! already placed index switches that index between sets and the push
//! continues. Indexes above `i` stay at `x = 0` the whole time, so each
//! outer iteration works on an `(i+1) x (i+1)` subproblem.

use crate::dantzig::state::Lcp;
use crate::linalg::dense::{factor_ldlt, pad, solve_ldlt};
use crate::problem::{LcpSettings, SolveStatus};

/// Boundary that limits the current push.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Hit {
    /// `w[i]` reaches zero: `i` joins C and the push is done.
    WiZero,
    /// `x[i]` reaches `lo[i]`: `i` joins N pinned low, done.
    XiLo,
    /// `x[i]` reaches `hi[i]`: `i` joins N pinned high, done.
    XiHi,
    /// Some `w[k]`, `k` in N, reaches zero: `k` moves to C, keep pushing.
    WnZero,
    /// Some `x[k]`, `k` in C, reaches `lo[k]`: `k` moves to N, keep pushing.
    XcLo,
    /// Some `x[k]`, `k` in C, reaches `hi[k]`: `k` moves to N, keep pushing.
    XcHi,
}

/// Solve the boxed LCP with default settings. See [`solve_lcp_with`].
pub fn solve_lcp(
    n: usize,
    a: &mut [f64],
    x: &mut [f64],
    b: &mut [f64],
    w: &mut [f64],
    nub: usize,
    lo: &mut [f64],
    hi: &mut [f64],
    findex: Option<&[i32]>,
) -> SolveStatus {
    solve_lcp_with(n, a, x, b, w, nub, lo, hi, findex, &LcpSettings::default())
}

/// Solve `A*x = b + w` with every `(x[i], w[i])` on a valid segment.
///
/// `a` is `n x pad(n)` row-major, lower triangle meaningful; it is permuted
/// in place, as are `b`, `lo`, and `hi`. `x` and `w` are outputs in the
/// caller's index order. The first `nub` indexes must be unbounded. If
/// `findex` is present, row `i` with `findex[i] >= 0` gets its bounds
/// rescaled to `hi[i] * |x[findex[i]]|` once the referenced row is solved;
/// such rows must not appear below `nub`.
///
/// Preconditions are asserted, not reported: this is an inner kernel and
/// the constraint stepper feeds it well-formed data.
pub fn solve_lcp_with(
    n: usize,
    a: &mut [f64],
    x: &mut [f64],
    b: &mut [f64],
    w: &mut [f64],
    nub: usize,
    lo: &mut [f64],
    hi: &mut [f64],
    findex: Option<&[i32]>,
    settings: &LcpSettings,
) -> SolveStatus {
    assert!(n > 0, "empty problem");
    let nskip = pad(n);
    assert!(a.len() >= n * nskip, "matrix buffer too small for n x pad(n)");
    assert!(x.len() >= n && b.len() >= n && w.len() >= n);
    assert!(lo.len() >= n && hi.len() >= n);
    assert!(nub <= n, "nub out of range");
    if let Some(f) = findex {
        assert!(f.len() >= n);
        debug_assert!(f[..nub].iter().all(|&fi| fi < 0), "friction row below nub");
    }

    // With everything unbounded this is a plain linear solve. Reuse w as
    // the diagonal scratch, then zero it.
    if nub >= n {
        factor_ldlt(a, w, n, nskip);
        solve_ldlt(a, w, b, n, nskip);
        x[..n].copy_from_slice(&b[..n]);
        w[..n].fill(0.0);
        return SolveStatus::Solved;
    }

    debug_assert!(
        (0..n).all(|k| lo[k] <= 0.0 && hi[k] >= 0.0),
        "bounds must satisfy lo <= 0 <= hi"
    );

    let mut lcp = Lcp::new(
        n,
        nub,
        &mut a[..n * nskip],
        &mut x[..n],
        &mut b[..n],
        &mut w[..n],
        &mut lo[..n],
        &mut hi[..n],
        findex,
        settings.debug_checks,
    );
    let nub = lcp.nub;
    let mut delta_x = vec![0.0; n];
    let mut delta_w = vec![0.0; n];
    let mut hit_first_friction_index = false;

    for i in nub..n {
        if settings.debug_checks {
            lcp.check_permutations(i);
        }

        // On reaching the first friction row, finalize the bounds of every
        // remaining row from the x values solved so far. The findex entries
        // refer to the caller's order and x is permuted, so x is scattered
        // back through p first (into delta_w, which is free here). A zero
        // normal force collapses the row to lo = hi = 0.
        if !hit_first_friction_index {
            if let Some(f) = lcp.findex.as_ref() {
                if f[i] >= 0 {
                    for k in 0..n {
                        delta_w[lcp.p[k]] = lcp.x[k];
                    }
                    for k in i..n {
                        let fk = f[k];
                        if fk >= 0 {
                            let xf = delta_w[fk as usize];
                            if xf == 0.0 {
                                lcp.hi[k] = 0.0;
                                lcp.lo[k] = 0.0;
                            } else {
                                let h = (lcp.hi[k] * xf).abs();
                                lcp.hi[k] = h;
                                lcp.lo[k] = -h;
                            }
                        }
                    }
                    hit_first_friction_index = true;
                }
            }
        }

        // w has not been maintained above position i, compute it now
        let wi = lcp.row_dot_c(i, &lcp.x[..]) + lcp.row_dot_n(i, &lcp.x[..]) - lcp.b[i];
        lcp.w[i] = wi;

        // cheap placements first. A lo = hi = 0 row (friction with zero
        // normal force) always lands here and is never revisited: its C
        // segment has zero length, so flipping it between sets would churn
        // forever for nothing. Its recorded state may end up stale, which
        // is harmless.
        if lcp.lo[i] == 0.0 && wi >= 0.0 {
            lcp.state[i] = false;
            lcp.transfer_i_to_n(i);
        } else if lcp.hi[i] == 0.0 && wi <= 0.0 {
            lcp.state[i] = true;
            lcp.transfer_i_to_n(i);
        } else if wi == 0.0 {
            // degenerate but valid: lo < 0 < hi here, so the C segment has
            // positive length and we are standing on it. solve1 must still
            // run to prime the factor row for the append.
            lcp.solve1(&mut delta_x, i, 1, true);
            lcp.transfer_i_to_c(i);
        } else if !drive_index(&mut lcp, i, &mut delta_x, &mut delta_w) {
            lcp.unpermute();
            return SolveStatus::NumericalBreakdown;
        }
    }

    lcp.unpermute();
    SolveStatus::Solved
}

/// Push `(x[i], w[i])` onto a valid segment, switching other indexes
/// between sets as their boundaries get in the way. Returns false on
/// numerical breakdown, with the tail of `x` and `w` zeroed.
fn drive_index(lcp: &mut Lcp<'_>, i: usize, delta_x: &mut [f64], delta_w: &mut [f64]) -> bool {
    let n = lcp.n;
    let nub = lcp.nub;
    loop {
        // push x[i] up if w[i] is negative, down otherwise
        let (dir, dirf) = if lcp.w[i] <= 0.0 { (1, 1.0) } else { (-1, -1.0) };

        // delta_x[C] = -dir * A[C,C] \ A[C,i]; delta_x[i] itself is dirf
        // and is folded into the products below instead of being stored
        lcp.solve1(delta_x, i, dir, false);

        // delta_w on N and at i; nothing else is watched during the push
        lcp.mul_anc(delta_w, delta_x);
        lcp.add_ani(delta_w, i, dir);
        delta_w[i] = lcp.row_dot_c(i, delta_x) + lcp.a_ii(i) * dirf;

        // smallest positive step that hits a boundary; on equal steps the
        // earliest candidate class below wins because later ones must be
        // strictly smaller to take over
        let mut hit = Hit::WiZero;
        let mut si = 0usize;
        let mut s = -lcp.w[i] / delta_w[i];

        if dir > 0 {
            if lcp.hi[i] < f64::INFINITY {
                let s2 = (lcp.hi[i] - lcp.x[i]) / dirf;
                if s2 < s {
                    s = s2;
                    hit = Hit::XiHi;
                }
            }
        } else if lcp.lo[i] > f64::NEG_INFINITY {
            let s2 = (lcp.lo[i] - lcp.x[i]) / dirf;
            if s2 < s {
                s = s2;
                hit = Hit::XiLo;
            }
        }

        for k in 0..lcp.num_n() {
            let idx = lcp.index_n(k);
            let moving_off_segment = (!lcp.state[idx] && delta_w[idx] < 0.0)
                || (lcp.state[idx] && delta_w[idx] > 0.0);
            if moving_off_segment {
                // zero-width rows never change sets
                if lcp.lo[idx] == 0.0 && lcp.hi[idx] == 0.0 {
                    continue;
                }
                let s2 = -lcp.w[idx] / delta_w[idx];
                if s2 < s {
                    s = s2;
                    hit = Hit::WnZero;
                    si = idx;
                }
            }
        }

        // the unbounded prefix can never leave C, skip it
        for k in nub..lcp.num_c() {
            let idx = lcp.index_c(k);
            if delta_x[idx] < 0.0 && lcp.lo[idx] > f64::NEG_INFINITY {
                let s2 = (lcp.lo[idx] - lcp.x[idx]) / delta_x[idx];
                if s2 < s {
                    s = s2;
                    hit = Hit::XcLo;
                    si = idx;
                }
            }
            if delta_x[idx] > 0.0 && lcp.hi[idx] < f64::INFINITY {
                let s2 = (lcp.hi[idx] - lcp.x[idx]) / delta_x[idx];
                if s2 < s {
                    s = s2;
                    hit = Hit::XcHi;
                    si = idx;
                }
            }
        }

        // a non-positive step cannot make progress and would loop forever;
        // freeze what we have and bail out
        if s <= 0.0 {
            log::warn!("LCP internal error, s <= 0 (s={:.4e})", s);
            lcp.x[i..n].fill(0.0);
            lcp.w[i..n].fill(0.0);
            return false;
        }

        lcp.step_x_c(s, delta_x);
        lcp.x[i] += s * dirf;
        lcp.step_w_n(s, delta_w);
        lcp.w[i] += s * delta_w[i];

        match hit {
            Hit::WiZero => {
                lcp.w[i] = 0.0;
                lcp.transfer_i_to_c(i);
                return true;
            }
            Hit::XiLo => {
                lcp.x[i] = lcp.lo[i];
                lcp.state[i] = false;
                lcp.transfer_i_to_n(i);
                return true;
            }
            Hit::XiHi => {
                lcp.x[i] = lcp.hi[i];
                lcp.state[i] = true;
                lcp.transfer_i_to_n(i);
                return true;
            }
            Hit::WnZero => {
                lcp.w[si] = 0.0;
                lcp.transfer_i_from_n_to_c(si);
            }
            Hit::XcLo => {
                lcp.x[si] = lcp.lo[si];
                lcp.state[si] = false;
                lcp.transfer_i_from_c_to_n(si);
            }
            Hit::XcHi => {
                lcp.x[si] = lcp.hi[si];
                lcp.state[si] = true;
                lcp.transfer_i_from_c_to_n(si);
            }
        }
    }
}
