//! Incremental modification of an `L*D*L'` factorization.
//!
//! The pivoting driver moves one index at a time in and out of the clamped
//! set. Appending a row to the factorization is cheap (one forward solve,
//! done by the solver state object). Removing one is the hard part: the
//! routines here repair the factor in O(n^2) by decoupling the departing
//! row with a symmetric rank-two modification and then snipping it out of
//! the buffer, instead of refactoring from scratch.
//!
//! As everywhere in `linalg`, `d` stores reciprocals of the diagonal.

use super::dense::dot;

/// Update the factorization of `A` to that of `A + a*e1' + e1*a'`, where
/// `e1` is the first unit vector.
///
/// The modification splits into a rank-one update and a rank-one downdate,
///
/// ```text
/// a*e1' + e1*a' = w1*w1' - w2*w2'
/// w1 = (a + e1) / sqrt(2)
/// w2 = (a - e1) / sqrt(2)
/// ```
///
/// and both are folded into `L` and `d` in a single pass over the columns.
/// Each column step is the classical rank-one recurrence: with `t` the
/// running scalar (starting at 1) and `p` the current entry of the work
/// vector, the new `t' = t + sigma * p^2 * d[j]`, the column scale is
/// `beta = sigma * p * d[j] / t'`, and `d[j]` shrinks by `t/t'`. The
/// downdate runs with `sigma = -1` against the column the update just
/// produced.
pub fn ldlt_add_tl(l: &mut [f64], d: &mut [f64], a: &[f64], n: usize, nskip: usize) {
    debug_assert!(nskip >= n);
    if n < 2 {
        return;
    }
    let root_half = 0.5f64.sqrt();
    let mut w1 = vec![0.0; n];
    let mut w2 = vec![0.0; n];
    for j in 1..n {
        w1[j] = a[j] * root_half;
        w2[j] = a[j] * root_half;
    }
    w1[0] = (a[0] + 1.0) * root_half;
    w2[0] = (a[0] - 1.0) * root_half;

    let mut t1 = 1.0;
    let mut t2 = 1.0;
    for j in 0..n {
        let p1 = w1[j];
        let tnew = t1 + p1 * p1 * d[j];
        let beta1 = p1 * d[j] / tnew;
        d[j] *= t1 / tnew;
        t1 = tnew;

        let p2 = w2[j];
        let tnew = t2 - p2 * p2 * d[j];
        let beta2 = -p2 * d[j] / tnew;
        d[j] *= t2 / tnew;
        t2 = tnew;

        for r in j + 1..n {
            let mut lrj = l[r * nskip + j];
            w1[r] -= p1 * lrj;
            lrj += beta1 * w1[r];
            w2[r] -= p2 * lrj;
            lrj += beta2 * w2[r];
            l[r * nskip + j] = lrj;
        }
    }
}

/// Remove position `r` from the factorization of `A[C,C]`.
///
/// `l`/`d` factor the `n2 x n2` matrix whose `(i, j)` entry is
/// `A[c[i], c[j]]`; `a` is the full `n1 x n1` problem matrix (lower
/// triangle meaningful) and `c` maps factor rows to positions in it. On
/// return `l`/`d` factor the same matrix with row and column `r` deleted
/// and compacted. The caller owns the `c` bookkeeping.
///
/// Removing the last row is free. Removing any other row decouples it by
/// applying [`ldlt_add_tl`] to the trailing block with the vector
/// `e1 - S[:,0]`, where `S` is the Schur complement the trailing block
/// factorizes, then snips the dead row out of the buffer.
pub fn ldlt_remove(
    a: &[f64],
    c: &[usize],
    l: &mut [f64],
    d: &mut [f64],
    n1: usize,
    n2: usize,
    r: usize,
    nskip: usize,
) {
    debug_assert!(n1 > 0 && n2 > 0 && r < n2 && n1 >= n2 && nskip >= n1);
    debug_assert!(c[..n2].iter().all(|&ci| ci < n1));

    let geta = |i: usize, j: usize| {
        if i >= j {
            a[i * nskip + j]
        } else {
            a[j * nskip + i]
        }
    };

    if r == n2 - 1 {
        // deleting the last row/column needs no factor repair
    } else if r == 0 {
        let mut v = vec![0.0; n2];
        for i in 0..n2 {
            v[i] = -geta(c[i], c[0]);
        }
        v[0] += 1.0;
        ldlt_add_tl(l, d, &v, n2, nskip);
    } else {
        // t = D * L[r, 0..r): the column-r contribution of the leading block
        let mut t = vec![0.0; r];
        for i in 0..r {
            t[i] = l[r * nskip + i] / d[i];
        }
        // v = e1 - S[:,0] for the Schur complement S factored by rows r..n2
        let mut v = vec![0.0; n2 - r];
        for i in 0..n2 - r {
            let row = (r + i) * nskip;
            v[i] = dot(&l[row..row + r], &t) - geta(c[r + i], c[r]);
        }
        v[0] += 1.0;
        ldlt_add_tl(&mut l[r * nskip + r..], &mut d[r..], &v, n2 - r, nskip);
    }

    // snip row/column r out of L and close the gap in d
    remove_row_col(l, n2, nskip, r);
    if r < n2 - 1 {
        d.copy_within(r + 1..n2, r);
    }
}

/// Delete row and column `r` from the `n x n` matrix `a` in place, shifting
/// the trailing rows up and the trailing columns left.
pub fn remove_row_col(a: &mut [f64], n: usize, nskip: usize, r: usize) {
    debug_assert!(n > 0 && r < n && nskip >= n);
    if r == n - 1 {
        return;
    }
    for i in 0..r {
        let row = i * nskip;
        a.copy_within(row + r + 1..row + n, row + r);
    }
    for i in r..n - 1 {
        let src = (i + 1) * nskip;
        let dst = i * nskip;
        a.copy_within(src..src + r, dst);
        a.copy_within(src + r + 1..src + n, dst + r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::dense::{factor_ldlt, multiply2, pad};
    use crate::selftest::make_random_matrix;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const TOL: f64 = 1e-9;

    fn random_spd(n: usize, seed: u64) -> Vec<f64> {
        let nskip = pad(n);
        let mut m = vec![0.0; n * nskip];
        let mut a = vec![0.0; n * nskip];
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        make_random_matrix(&mut m, n, n, 1.0, &mut rng);
        for i in 0..n {
            m[i * nskip + i] += n as f64;
        }
        multiply2(&mut a, &m, &m, n, n, n);
        a
    }

    fn assert_factors_match(la: &[f64], da: &[f64], lb: &[f64], db: &[f64], n: usize, nskip: usize) {
        for i in 0..n {
            assert!(
                (da[i] - db[i]).abs() < TOL * da[i].abs().max(1.0),
                "d mismatch at {}: {} vs {}",
                i,
                da[i],
                db[i]
            );
            for j in 0..i {
                assert!(
                    (la[i * nskip + j] - lb[i * nskip + j]).abs() < TOL,
                    "L mismatch at ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_add_tl_matches_fresh_factorization() {
        let n = 6;
        let nskip = pad(n);
        let a = random_spd(n, 21);

        // modification vector, small enough to keep the matrix definite
        let v: Vec<f64> = (0..n).map(|i| 0.2 * (i as f64 * 0.7 - 1.0).sin()).collect();

        let mut l = a.clone();
        let mut d = vec![0.0; n];
        factor_ldlt(&mut l, &mut d, n, nskip);
        ldlt_add_tl(&mut l, &mut d, &v, n, nskip);

        let mut modified = a.clone();
        modified[0] += 2.0 * v[0];
        for i in 1..n {
            modified[i * nskip] += v[i];
        }
        let mut lref = modified.clone();
        let mut dref = vec![0.0; n];
        factor_ldlt(&mut lref, &mut dref, n, nskip);

        assert_factors_match(&l, &d, &lref, &dref, n, nskip);
    }

    #[test]
    fn test_remove_matches_submatrix_factorization() {
        let n = 7;
        let nskip = pad(n);
        let a = random_spd(n, 33);
        let c: Vec<usize> = (0..n).collect();

        // exercise the first, middle, and last row paths
        for &r in &[0usize, 3, n - 1] {
            let mut l = a.clone();
            let mut d = vec![0.0; n];
            factor_ldlt(&mut l, &mut d, n, nskip);
            ldlt_remove(&a, &c, &mut l, &mut d, n, n, r, nskip);

            // reference: factor the principal submatrix without row/col r
            let m = n - 1;
            let mut sub = vec![0.0; m * nskip];
            for (si, i) in (0..n).filter(|&i| i != r).enumerate() {
                for (sj, j) in (0..n).filter(|&j| j != r).enumerate() {
                    if sj <= si {
                        let v = if i >= j {
                            a[i * nskip + j]
                        } else {
                            a[j * nskip + i]
                        };
                        sub[si * nskip + sj] = v;
                    }
                }
            }
            let mut dref = vec![0.0; m];
            factor_ldlt(&mut sub, &mut dref, m, nskip);
            assert_factors_match(&l, &d, &sub, &dref, m, nskip);
        }
    }

    #[test]
    fn test_remove_row_col_shifts() {
        let n = 4;
        let nskip = pad(n);
        let mut a = vec![0.0; n * nskip];
        for i in 0..n {
            for j in 0..n {
                a[i * nskip + j] = (10 * i + j) as f64;
            }
        }
        remove_row_col(&mut a, n, nskip, 1);
        let expect = [[0.0, 2.0, 3.0], [20.0, 22.0, 23.0], [30.0, 32.0, 33.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(a[i * nskip + j], expect[i][j]);
            }
        }
    }
}
