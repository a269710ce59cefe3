//! Structure-aware proposal moves over expression trees.
//!
//! The one move MCMC needs here: pick a node uniformly at random, regrow a
//! subtree of the same type from the grammar, and splice it into a fresh
//! tree. The move is not symmetric — the regrown subtree changes the node
//! count and is drawn from the grammar's distribution — so the proposal
//! reports both directions' log-probabilities for the Metropolis-Hastings
//! correction.

use crate::expr::Expr;
use crate::grammar::{Grammar, SampleError};
use rand::Rng;

// Regeneration attempts before the move reports failure.
const ATTEMPTS: usize = 100;

/// A proposed tree together with the log-probabilities of proposing it and
/// of proposing the reverse move.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub expr: Expr,
    /// ln P(select the node in the old tree) + ln P(generate the new subtree).
    pub log_fwd: f64,
    /// ln P(select the node in the new tree) + ln P(generate the old subtree).
    pub log_bwd: f64,
}

/// Regrow a uniformly chosen subtree of `expr` from `grammar`. The original
/// tree is never mutated; a size-1 tree has only its root to regrow, which
/// makes the move a full redraw.
pub fn regenerate_subtree<R: Rng>(
    grammar: &Grammar,
    expr: &Expr,
    rng: &mut R,
) -> Result<Proposal, SampleError> {
    let size = expr.size();
    for _attempt in 0..ATTEMPTS {
        let index = rng.gen_range(0, size);
        let old = match expr.subexpr(index) {
            Some(node) => node,
            None => continue,
        };
        let ty = grammar.rule(old.rule()).lhs;
        let replacement = match grammar.generate(ty, rng) {
            Ok(subexpr) => subexpr,
            Err(_) => continue,
        };
        let lp_new = grammar.log_probability(&replacement);
        let lp_old = grammar.log_probability(old);
        let new_size = size - old.size() + replacement.size();
        let new_expr = match expr.replace(index, replacement) {
            Some(tree) => tree,
            None => continue,
        };
        return Ok(Proposal {
            expr: new_expr,
            log_fwd: -(size as f64).ln() + lp_new,
            log_bwd: -(new_size as f64).ln() + lp_old,
        });
    }
    Err(SampleError::OptionsExhausted)
}
