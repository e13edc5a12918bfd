//! Per-proof-attempt state (§5): the `Vars` registry plus the two
//! process-wide index counters, bundled so a fresh attempt starts from a
//! clean slate without interleaving with another attempt on the same
//! process.

use crate::core::formula::Vars;
use crate::core::poly_interpreter::reset_polvar_counter;
use crate::core::terms::reset_var_counter;

/// Owns the `Vars` registry for one proof attempt. The free-variable and
/// polynomial-variable index counters are process-wide atomics (there is
/// exactly one live proof attempt at a time per §5), so `ProofContext`
/// resets them on construction rather than owning them directly.
pub struct ProofContext {
    pub vars: Vars,
}

impl ProofContext {
    /// Starts a fresh attempt: a clean `Vars` registry (only the forced
    /// false/true atoms present) and both index counters reset to zero.
    pub fn new() -> Self {
        reset_var_counter();
        reset_polvar_counter();
        ProofContext { vars: Vars::new() }
    }
}

impl Default for ProofContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_starts_with_only_reserved_atoms() {
        let ctx = ProofContext::new();
        assert_eq!(ctx.vars.query_size(), 2);
    }
}
