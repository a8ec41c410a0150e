//! Dense linear algebra for the pivoting solver.
//!
//! Everything here works on plain `f64` slices in row-major layout with a
//! padded leading dimension (`dense::pad`). There is no matrix type: the
//! solver owns one flat buffer per matrix and permutes it in place, and the
//! primitives below are written against that layout.

pub mod dense;
pub mod update;

pub use dense::{
    clear_upper_triangle, dot, factor_ldlt, max_difference, multiply0, multiply2, pad, solve_l1,
    solve_l1t, solve_ldlt, swap_rows_and_cols,
};
pub use update::{ldlt_add_tl, ldlt_remove, remove_row_col};
