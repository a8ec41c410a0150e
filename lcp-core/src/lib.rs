//! Dense boxed linear complementarity solver.
//!
//! Given a symmetric positive semidefinite `n x n` matrix `A`, a vector `b`,
//! and per-index bounds `lo <= 0 <= hi`, the solver finds `x` and the
//! residual `w = A*x - b` such that every pair `(x[i], w[i])` lies on one of
//! three segments:
//!
//! - `x[i] = lo[i]` and `w[i] >= 0`
//! - `x[i] = hi[i]` and `w[i] <= 0`
//! - `lo[i] < x[i] < hi[i]` and `w[i] = 0`
//!
//! The first `nub` indexes are unbounded (`lo = -inf`, `hi = +inf`) and are
//! always solved exactly. An optional friction index array couples the
//! bounds of a row to the solved value of another row, which is how a
//! rigid-body constraint stepper expresses Coulomb friction cones.
//!
//! # Algorithm
//!
//! This is Dantzig's principal pivoting method. Indexes are introduced one at
//! a time; each new pair `(x[i], w[i])` is driven onto its valid segment
//! while all previously placed pairs are held on theirs, switching an index
//! between the clamped set C and the non-clamped set N whenever a segment
//! end is reached. The cost of the method is dominated by solves against
//! `A[C,C]`, so the solver maintains an `L*D*L'` factorization of that
//! submatrix and updates it incrementally on every set transition instead of
//! refactoring.
//!
//! Two permutations make the index bookkeeping cheap: the problem arrays are
//! physically reordered so that C occupies the leading positions and N the
//! positions right after (recorded in `p`), and a second map `C[]` orders the
//! factorization rows so that removing a clamped index needs only a swap and
//! an O(nC^2) factor repair. With both permutations in place the inner loops
//! reduce to straight dot products over contiguous slices.
//!
//! # Example
//!
//! ```
//! use lcp_core::{solve_lcp, SolveStatus};
//!
//! // one contact: 2*x = 3 + w with x >= 0
//! let mut a = vec![2.0];
//! let mut x = vec![0.0];
//! let mut b = vec![3.0];
//! let mut w = vec![0.0];
//! let mut lo = vec![0.0];
//! let mut hi = vec![f64::INFINITY];
//!
//! let status = solve_lcp(1, &mut a, &mut x, &mut b, &mut w, 0, &mut lo, &mut hi, None);
//! assert_eq!(status, SolveStatus::Solved);
//! assert!((x[0] - 1.5).abs() < 1e-12);
//! assert!(w[0].abs() < 1e-12);
//! ```
//!
//! # Storage contract
//!
//! `A` is row-major with leading dimension `nskip = pad(n)`. Only the lower
//! triangle is read; the upper triangle is scratch space and is never
//! referenced. The solver permutes `A`, `b`, `lo`, and `hi` in place, so
//! callers that need the original data must pass copies.

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // pivoting kernels carry the whole problem

pub mod dantzig;
pub mod linalg;
pub mod problem;
pub mod selftest;

pub use dantzig::{solve_lcp, solve_lcp_basic, solve_lcp_basic_with, solve_lcp_with};
pub use problem::{LcpSettings, SolveStatus};
