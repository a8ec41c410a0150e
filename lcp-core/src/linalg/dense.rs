//! Dense BLAS-lite kernels.
//!
//! Matrices are row-major `f64` buffers with leading dimension `nskip`,
//! where `nskip = pad(n)` keeps every row 32-byte aligned for the dot
//! kernel. Factorizations store reciprocals of the diagonal: `d[i]` holds
//! `1/D[i][i]`, so applying `D^-1` is a multiply.

/// Round a dimension up to the padded leading dimension.
///
/// Rows are padded to a multiple of four doubles. Every buffer the solver
/// touches uses this stride, including the test harness.
#[inline]
pub fn pad(n: usize) -> usize {
    if n > 1 {
        ((n - 1) | 3) + 1
    } else {
        n
    }
}

/// Dot product of two equally long slices.
///
/// This is the inner loop of the whole solver: the row products of the
/// pivoting driver and both triangular solves funnel through it. Four
/// accumulators keep the loop free of a serial add dependency so the
/// compiler can vectorize it.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = [0.0f64; 4];
    let mut ca = a.chunks_exact(4);
    let mut cb = b.chunks_exact(4);
    for (pa, pb) in (&mut ca).zip(&mut cb) {
        acc[0] += pa[0] * pb[0];
        acc[1] += pa[1] * pb[1];
        acc[2] += pa[2] * pb[2];
        acc[3] += pa[3] * pb[3];
    }
    let mut sum = (acc[0] + acc[2]) + (acc[1] + acc[3]);
    for (pa, pb) in ca.remainder().iter().zip(cb.remainder()) {
        sum += pa * pb;
    }
    sum
}

/// In-place `L*D*L'` factorization of the lower triangle of `a`.
///
/// On return the strict lower triangle of `a` holds `L` (the unit diagonal
/// is implicit, the stored diagonal entries are garbage) and `d[i]` holds
/// `1/D[i][i]`. Row `i` is produced by forward-substituting the raw row
/// against the rows above it, which is the same recurrence the incremental
/// row append uses.
///
/// The caller guarantees positive definiteness; a non-positive pivot is a
/// contract violation, not a recoverable error.
pub fn factor_ldlt(a: &mut [f64], d: &mut [f64], n: usize, nskip: usize) {
    debug_assert!(nskip >= n);
    for i in 0..n {
        let (above, row) = a.split_at_mut(i * nskip);
        // z = L(0..i,0..i) \ A[i, 0..i)
        for j in 0..i {
            let mut z = row[j];
            let lrow = &above[j * nskip..j * nskip + j];
            for (k, ljk) in lrow.iter().enumerate() {
                z -= ljk * row[k];
            }
            row[j] = z;
        }
        // scale z into L[i,..] and accumulate the pivot
        let mut dee = row[i];
        for j in 0..i {
            let z = row[j];
            let lij = z * d[j];
            row[j] = lij;
            dee -= lij * z;
        }
        debug_assert!(dee > 0.0, "non-positive pivot {} at row {}", dee, i);
        d[i] = 1.0 / dee;
    }
}

/// Forward substitution against unit lower triangular `L`: `b <- L^-1 b`.
pub fn solve_l1(l: &[f64], b: &mut [f64], n: usize, nskip: usize) {
    debug_assert!(nskip >= n);
    for i in 1..n {
        let s = dot(&l[i * nskip..i * nskip + i], &b[..i]);
        b[i] -= s;
    }
}

/// Backward substitution against `L'`: `b <- L^-T b`.
///
/// Sweeps by column of `L'` (row of `L`) so the memory access stays
/// contiguous instead of striding down a column.
pub fn solve_l1t(l: &[f64], b: &mut [f64], n: usize, nskip: usize) {
    debug_assert!(nskip >= n);
    for j in (1..n).rev() {
        let bj = b[j];
        let row = &l[j * nskip..j * nskip + j];
        for (i, lji) in row.iter().enumerate() {
            b[i] -= lji * bj;
        }
    }
}

/// Solve `(L*D*L') x = b` in place, overwriting `b` with `x`.
///
/// `d` holds diagonal reciprocals as produced by [`factor_ldlt`].
pub fn solve_ldlt(l: &[f64], d: &[f64], b: &mut [f64], n: usize, nskip: usize) {
    solve_l1(l, b, n, nskip);
    for i in 0..n {
        b[i] *= d[i];
    }
    solve_l1t(l, b, n, nskip);
}

/// Symmetric swap of rows/columns `i1 < i2` in the lower triangle of `a`.
///
/// Equivalent to `P*A*P'` for the transposition of `i1` and `i2`, touching
/// only the lower triangle. The entry `(i2, i1)` maps to itself.
pub fn swap_rows_and_cols(a: &mut [f64], n: usize, i1: usize, i2: usize, nskip: usize) {
    debug_assert!(n > 0 && i1 < i2 && i2 < n && nskip >= n);
    // leading row segments [0, i1)
    if i1 > 0 {
        let (top, rest) = a.split_at_mut(i2 * nskip);
        top[i1 * nskip..i1 * nskip + i1].swap_with_slice(&mut rest[..i1]);
    }
    // strip between the pivots: A[i][i1] <-> A[i2][i]
    for i in i1 + 1..i2 {
        a.swap(i * nskip + i1, i2 * nskip + i);
    }
    // diagonal entries
    a.swap(i1 * nskip + i1, i2 * nskip + i2);
    // column segments below i2
    for i in i2 + 1..n {
        a.swap(i * nskip + i1, i * nskip + i2);
    }
}

/// `a = b * c` for `b` of shape `p x q` and `c` of shape `q x r`.
///
/// All operands use the padded leading dimension of their own column count.
pub fn multiply0(a: &mut [f64], b: &[f64], c: &[f64], p: usize, q: usize, r: usize) {
    let qskip = pad(q);
    let rskip = pad(r);
    for i in 0..p {
        for j in 0..r {
            let mut sum = 0.0;
            for k in 0..q {
                sum += b[i * qskip + k] * c[k * rskip + j];
            }
            a[i * rskip + j] = sum;
        }
    }
}

/// `a = b * c'` for `b` of shape `p x q` and `c` of shape `r x q`.
pub fn multiply2(a: &mut [f64], b: &[f64], c: &[f64], p: usize, q: usize, r: usize) {
    let qskip = pad(q);
    let rskip = pad(r);
    for i in 0..p {
        for j in 0..r {
            a[i * rskip + j] = dot(&b[i * qskip..i * qskip + q], &c[j * qskip..j * qskip + q]);
        }
    }
}

/// Zero the strict upper triangle of the `n x n` matrix `a`.
pub fn clear_upper_triangle(a: &mut [f64], n: usize) {
    let nskip = pad(n);
    for i in 0..n {
        for j in i + 1..n {
            a[i * nskip + j] = 0.0;
        }
    }
}

/// Maximum absolute elementwise difference between two `n x m` matrices.
pub fn max_difference(a: &[f64], b: &[f64], n: usize, m: usize) -> f64 {
    let mskip = pad(m);
    let mut max = 0.0f64;
    for i in 0..n {
        for j in 0..m {
            let diff = (a[i * mskip + j] - b[i * mskip + j]).abs();
            if diff > max {
                max = diff;
            }
        }
    }
    max
}
