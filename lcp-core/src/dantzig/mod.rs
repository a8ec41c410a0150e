//! Dantzig principal-pivoting drivers.
//!
//! [`state::Lcp`] owns the permuted problem and the incremental
//! factorization; [`driver`] is the production lo/hi driver with friction
//! coupling; [`basic`] is the plain non-negativity driver kept for
//! validation and for callers with trivial bounds.

pub mod basic;
pub mod driver;
pub(crate) mod state;

pub use basic::{solve_lcp_basic, solve_lcp_basic_with};
pub use driver::{solve_lcp, solve_lcp_with};
