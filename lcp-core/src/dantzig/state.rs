//! Permuted problem state for the pivoting drivers.
//!
//! [`Lcp`] keeps the problem arrays physically reordered so that the
//! clamped set C occupies positions `[0, nC)`, the non-clamped set N
//! occupies `[nC, nC + nN)`, and the not-yet-visited tail follows. The
//! permutation back to the caller's order is recorded in `p`. A second map
//! `c` orders the rows of the `L*D*L'` factorization of `A[C,C]`: `c[k]`
//! is the position (in permuted space) factored at row `k`. Factoring a
//! permutation of `A[C,C]` instead of `A[C,C]` itself is what makes
//! removal cheap, because any clamped position can be retired by one swap
//! plus an O(nC^2) factor repair instead of a wholesale reshuffle.
//!
//! Two layout invariants are load bearing:
//!
//! - positions below `nub` are never swapped after construction, so the
//!   first `nub` entries of any row can be loaded without going through
//!   `c` (`c[k] == k` for `k < nub`),
//! - every parallel vector (`x, b, w, lo, hi, p, state, findex`) is
//!   swapped in lockstep with the rows/columns of `A`, so position `k`
//!   means the same index in all of them at all times.

use crate::linalg::dense::{dot, factor_ldlt, pad, solve_l1, solve_l1t, solve_ldlt, swap_rows_and_cols};
use crate::linalg::update::ldlt_remove;

pub(crate) struct Lcp<'a> {
    pub(crate) n: usize,
    pub(crate) nskip: usize,
    pub(crate) nub: usize,
    /// Problem matrix, permuted in place. Lower triangle only.
    pub(crate) a: &'a mut [f64],
    pub(crate) x: &'a mut [f64],
    pub(crate) b: &'a mut [f64],
    pub(crate) w: &'a mut [f64],
    pub(crate) lo: &'a mut [f64],
    pub(crate) hi: &'a mut [f64],
    /// Friction linkage, permuted copy of the caller's array. Negative
    /// entries mean no linkage.
    pub(crate) findex: Option<Vec<i32>>,
    /// For positions in N: false if pinned at lo, true if pinned at hi.
    pub(crate) state: Vec<bool>,
    /// `p[k]` is the caller's index now living at position `k`.
    pub(crate) p: Vec<usize>,
    /// Factor-row to position map, first `n_c` entries valid.
    pub(crate) c: Vec<usize>,
    /// `L*D*L'` of the clamped submatrix, leading dimension `nskip`.
    l: Vec<f64>,
    /// Diagonal reciprocals of the factorization.
    d: Vec<f64>,
    /// Last row loaded into the factorization frame: `Dell = L^-1 a'`.
    dell: Vec<f64>,
    /// `ell = D^-1 Dell`, the candidate factor row.
    ell: Vec<f64>,
    tmp: Vec<f64>,
    pub(crate) n_c: usize,
    pub(crate) n_n: usize,
    debug_checks: bool,
}

impl<'a> Lcp<'a> {
    /// Build the permuted state: hoist every unbounded variable into the
    /// leading block, factor it, and push friction rows to the tail.
    pub(crate) fn new(
        n: usize,
        nub: usize,
        a: &'a mut [f64],
        x: &'a mut [f64],
        b: &'a mut [f64],
        w: &'a mut [f64],
        lo: &'a mut [f64],
        hi: &'a mut [f64],
        findex: Option<&[i32]>,
        debug_checks: bool,
    ) -> Self {
        let nskip = pad(n);
        let mut lcp = Lcp {
            n,
            nskip,
            nub,
            a,
            x,
            b,
            w,
            lo,
            hi,
            findex: findex.map(|f| f[..n].to_vec()),
            state: vec![false; n],
            p: (0..n).collect(),
            c: vec![0; n],
            l: vec![0.0; n * nskip],
            d: vec![0.0; n],
            dell: vec![0.0; n],
            ell: vec![0.0; n],
            tmp: vec![0.0; n],
            n_c: 0,
            n_n: 0,
            debug_checks,
        };
        lcp.x[..n].fill(0.0);

        // Look for unbounded variables the caller did not count in nub and
        // hoist them into the leading block: a bigger initial factorization
        // is pure win. Friction rows never qualify, their bounds are not
        // final yet.
        for k in lcp.nub..n {
            if let Some(f) = lcp.findex.as_ref() {
                if f[k] >= 0 {
                    continue;
                }
            }
            if lcp.lo[k] == f64::NEG_INFINITY && lcp.hi[k] == f64::INFINITY {
                let dst = lcp.nub;
                lcp.swap_problem(dst, k);
                lcp.nub += 1;
            }
        }

        // Factor the unbounded block and solve it outright; all of it goes
        // into C with w = 0.
        let nub = lcp.nub;
        if nub > 0 {
            for k in 0..nub {
                let row = k * nskip;
                lcp.l[row..row + k + 1].copy_from_slice(&lcp.a[row..row + k + 1]);
            }
            factor_ldlt(&mut lcp.l, &mut lcp.d, nub, nskip);
            lcp.x[..nub].copy_from_slice(&lcp.b[..nub]);
            solve_ldlt(&lcp.l, &lcp.d, lcp.x, nub, nskip);
            lcp.w[..nub].fill(0.0);
            for k in 0..nub {
                lcp.c[k] = k;
            }
            lcp.n_c = nub;
        }

        // Collect the friction rows at the very end so the driving loop
        // reaches them only after every row they reference is solved.
        if lcp.findex.is_some() {
            let mut num_at_end = 0;
            for k in (lcp.nub..n).rev() {
                let fk = lcp.findex.as_ref().map_or(-1, |f| f[k]);
                if fk >= 0 {
                    lcp.swap_problem(k, n - 1 - num_at_end);
                    num_at_end += 1;
                }
            }
        }
        lcp
    }

    #[inline]
    pub(crate) fn num_c(&self) -> usize {
        self.n_c
    }

    #[inline]
    pub(crate) fn num_n(&self) -> usize {
        self.n_n
    }

    /// Position of the k-th clamped slot. C is the leading block.
    #[inline]
    pub(crate) fn index_c(&self, k: usize) -> usize {
        k
    }

    /// Position of the k-th non-clamped slot. N follows C contiguously.
    #[inline]
    pub(crate) fn index_n(&self, k: usize) -> usize {
        k + self.n_c
    }

    #[inline]
    pub(crate) fn a_ii(&self, i: usize) -> f64 {
        self.a[i * self.nskip + i]
    }

    /// `A[i, C] . q[C]`. The C block is contiguous, so this is one dot.
    #[inline]
    pub(crate) fn row_dot_c(&self, i: usize, q: &[f64]) -> f64 {
        let row = i * self.nskip;
        dot(&self.a[row..row + self.n_c], &q[..self.n_c])
    }

    /// `A[i, N] . q[N]` over the contiguous N block.
    #[inline]
    pub(crate) fn row_dot_n(&self, i: usize, q: &[f64]) -> f64 {
        let row = i * self.nskip;
        let (lo, hi) = (self.n_c, self.n_c + self.n_n);
        dot(&self.a[row + lo..row + hi], &q[lo..hi])
    }

    /// `out[N] = A[N, C] * q[C]`, a dense block matrix-vector product.
    pub(crate) fn mul_anc(&self, out: &mut [f64], q: &[f64]) {
        for k in 0..self.n_n {
            let row = (self.n_c + k) * self.nskip;
            out[self.n_c + k] = dot(&self.a[row..row + self.n_c], &q[..self.n_c]);
        }
    }

    /// `out[N] += sign * A[N, i]`, read from row `i` by symmetry.
    pub(crate) fn add_ani(&self, out: &mut [f64], i: usize, dir: i32) {
        let col = i * self.nskip + self.n_c;
        if dir > 0 {
            for k in 0..self.n_n {
                out[self.n_c + k] += self.a[col + k];
            }
        } else {
            for k in 0..self.n_n {
                out[self.n_c + k] -= self.a[col + k];
            }
        }
    }

    /// `x[C] += s * q[C]`.
    pub(crate) fn step_x_c(&mut self, s: f64, q: &[f64]) {
        for j in 0..self.n_c {
            self.x[j] += s * q[j];
        }
    }

    /// `w[N] += s * q[N]`.
    pub(crate) fn step_w_n(&mut self, s: f64, q: &[f64]) {
        for k in self.n_c..self.n_c + self.n_n {
            self.w[k] += s * q[k];
        }
    }

    /// Load row `i` into the factorization frame: gather `A[i, C]` through
    /// both permutations, forward-solve it, and scale by the diagonal.
    /// Leaves `dell`/`ell` primed for either a search direction or an
    /// append to the factorization.
    fn factor_row(&mut self, i: usize) {
        let row = i * self.nskip;
        // the first nub columns are never permuted, load them straight
        self.dell[..self.nub].copy_from_slice(&self.a[row..row + self.nub]);
        for j in self.nub..self.n_c {
            self.dell[j] = self.a[row + self.c[j]];
        }
        solve_l1(&self.l, &mut self.dell, self.n_c, self.nskip);
        for j in 0..self.n_c {
            self.ell[j] = self.dell[j] * self.d[j];
        }
    }

    /// Compute the clamped-block search direction for driving index `i`:
    /// `delta_x[C] = -dir * A[C,C]^-1 A[C,i]`, scattered into position
    /// space. With `only_transfer` the solve stops after priming
    /// `dell`/`ell`, which is all an immediately following
    /// [`Lcp::transfer_i_to_c`] needs.
    pub(crate) fn solve1(&mut self, delta_x: &mut [f64], i: usize, dir: i32, only_transfer: bool) {
        if self.n_c == 0 {
            return;
        }
        self.factor_row(i);
        if only_transfer {
            return;
        }
        self.tmp[..self.n_c].copy_from_slice(&self.ell[..self.n_c]);
        solve_l1t(&self.l, &mut self.tmp, self.n_c, self.nskip);
        if dir > 0 {
            for j in 0..self.n_c {
                delta_x[self.c[j]] = -self.tmp[j];
            }
        } else {
            for j in 0..self.n_c {
                delta_x[self.c[j]] = self.tmp[j];
            }
        }
    }

    /// Append the driving index `i` to C. Requires `dell`/`ell` to hold
    /// row `i`'s solve, left there by [`Lcp::solve1`] in this iteration.
    pub(crate) fn transfer_i_to_c(&mut self, i: usize) {
        if self.n_c > 0 {
            let row = self.n_c * self.nskip;
            self.l[row..row + self.n_c].copy_from_slice(&self.ell[..self.n_c]);
            let pivot = self.a_ii(i) - dot(&self.ell[..self.n_c], &self.dell[..self.n_c]);
            self.d[self.n_c] = 1.0 / pivot;
        } else {
            self.d[0] = 1.0 / self.a_ii(i);
        }
        let dst = self.n_c;
        self.swap_problem(dst, i);
        self.c[self.n_c] = self.n_c;
        self.n_c += 1;
        if self.debug_checks {
            self.check_factorization();
        }
    }

    /// Move index `i` (the current driving index) into N. No data motion:
    /// `i` already sits at position `nC + nN`.
    pub(crate) fn transfer_i_to_n(&mut self, i: usize) {
        debug_assert_eq!(i, self.n_c + self.n_n);
        self.n_n += 1;
    }

    /// Pull position `i` out of N and append it to C, refreshing the
    /// factor-row cache for row `i` first.
    pub(crate) fn transfer_i_from_n_to_c(&mut self, i: usize) {
        if self.n_c > 0 {
            self.factor_row(i);
            let row = self.n_c * self.nskip;
            self.l[row..row + self.n_c].copy_from_slice(&self.ell[..self.n_c]);
            let pivot = self.a_ii(i) - dot(&self.ell[..self.n_c], &self.dell[..self.n_c]);
            self.d[self.n_c] = 1.0 / pivot;
        } else {
            self.d[0] = 1.0 / self.a_ii(i);
        }
        let dst = self.n_c;
        self.swap_problem(dst, i);
        self.c[self.n_c] = self.n_c;
        self.n_n -= 1;
        self.n_c += 1;
        if self.debug_checks {
            self.check_factorization();
        }
    }

    /// Retire position `i` from C into N: repair the factorization, close
    /// the gap in the `c` map, and swap `i` with the last clamped slot.
    pub(crate) fn transfer_i_from_c_to_n(&mut self, i: usize) {
        let j = self.c[..self.n_c]
            .iter()
            .position(|&cj| cj == i)
            .expect("position not in the clamped set");
        ldlt_remove(
            self.a, &self.c, &mut self.l, &mut self.d, self.n, self.n_c, j, self.nskip,
        );
        // whichever factor slot owned position nC-1 takes over the retired
        // slot's position, then the map is compacted
        let last = self.n_c - 1;
        let mut found = false;
        for k in 0..self.n_c {
            if self.c[k] == last {
                self.c[k] = self.c[j];
                self.c.copy_within(j + 1..self.n_c, j);
                found = true;
                break;
            }
        }
        debug_assert!(found);
        self.swap_problem(i, last);
        self.n_c -= 1;
        self.n_n += 1;
        if self.debug_checks {
            self.check_factorization();
        }
    }

    /// Swap positions `i1 <= i2` across the matrix and every parallel
    /// vector, keeping the whole problem aligned.
    pub(crate) fn swap_problem(&mut self, i1: usize, i2: usize) {
        debug_assert!(i1 <= i2 && i2 < self.n);
        if i1 == i2 {
            return;
        }
        swap_rows_and_cols(self.a, self.n, i1, i2, self.nskip);
        self.x.swap(i1, i2);
        self.b.swap(i1, i2);
        self.w.swap(i1, i2);
        self.lo.swap(i1, i2);
        self.hi.swap(i1, i2);
        self.p.swap(i1, i2);
        self.state.swap(i1, i2);
        if let Some(f) = self.findex.as_mut() {
            f.swap(i1, i2);
        }
    }

    /// Scatter `x` and `w` back into the caller's index order.
    pub(crate) fn unpermute(&mut self) {
        let n = self.n;
        self.tmp[..n].copy_from_slice(&self.x[..n]);
        for j in 0..n {
            self.x[self.p[j]] = self.tmp[j];
        }
        self.tmp[..n].copy_from_slice(&self.w[..n]);
        for j in 0..n {
            self.w[self.p[j]] = self.tmp[j];
        }
    }

    /// Verify `L * D * L' == A[C,C]` to 1e-8. Debug aid, O(nC^3).
    pub(crate) fn check_factorization(&self) {
        let nc = self.n_c;
        if nc == 0 {
            return;
        }
        let nskip = self.nskip;
        let mut diff = 0.0f64;
        for i in 0..nc {
            for j in 0..=i {
                let (ci, cj) = (self.c[i], self.c[j]);
                let aij = if ci >= cj {
                    self.a[ci * nskip + cj]
                } else {
                    self.a[cj * nskip + ci]
                };
                let mut sum = 0.0;
                for k in 0..=j {
                    let lik = if k == i { 1.0 } else { self.l[i * nskip + k] };
                    let ljk = if k == j { 1.0 } else { self.l[j * nskip + k] };
                    sum += lik * ljk / self.d[k];
                }
                diff = diff.max((sum - aij).abs());
            }
        }
        assert!(
            diff <= 1e-8,
            "factorization drifted from A[C,C], max difference {:.6e}",
            diff
        );
    }

    /// Verify the permutation bookkeeping at the top of an outer iteration
    /// over `i`: the placed positions partition into C and N, `p` is a
    /// permutation, and the `c` map covers `0..nC` exactly once.
    pub(crate) fn check_permutations(&self, i: usize) {
        assert!(self.n_c + self.n_n == i && i <= self.n);
        let mut seen = vec![false; self.n];
        for &pk in &self.p {
            assert!(pk < self.n && !seen[pk], "p is not a permutation");
            seen[pk] = true;
        }
        let mut covered = vec![false; self.n_c];
        for &ck in &self.c[..self.n_c] {
            assert!(ck < self.n_c && !covered[ck], "clamped map is not a permutation");
            covered[ck] = true;
        }
    }
}
