//! Solver settings and outcome types.

/// Runtime options for the LCP drivers.
///
/// The defaults are what the constraint stepper wants in production. The
/// verification knob exists for tests and for debugging numerical trouble;
/// it makes every set transition O(nC^3) and is far too slow to leave on.
#[derive(Debug, Clone, Default)]
pub struct LcpSettings {
    /// Verify the factorization and the permutation bookkeeping after every
    /// index-set transition. Panics on the first inconsistency.
    pub debug_checks: bool,
}

/// Outcome of a driver call.
///
/// The drivers never panic on numerical trouble and never abort: on an
/// internal breakdown (a non-positive pivot step) they zero the unsolved
/// tail of `x` and `w`, restore the original index order, and report it
/// here. Callers must tolerate a partially solved system in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Every index was placed on a valid segment.
    Solved,
    /// The pivoting loop produced a step `s <= 0`. The solution is valid
    /// for the indexes placed before the failing one; the rest are zero.
    NumericalBreakdown,
}

impl SolveStatus {
    /// True if the solve ran to completion.
    pub fn is_solved(self) -> bool {
        matches!(self, SolveStatus::Solved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = LcpSettings::default();
        assert!(!settings.debug_checks);
    }

    #[test]
    fn test_status_predicates() {
        assert!(SolveStatus::Solved.is_solved());
        assert!(!SolveStatus::NumericalBreakdown.is_solved());
    }
}
