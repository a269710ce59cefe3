//! Hypotheses over binary-sequence programs.

use crate::expr::{Expr, Value};
use crate::grammar::{Grammar, SampleError};
use crate::hypotheses::{Bayesable, BayesScore, Hypothesis, MCMCable};
use crate::proposal::{self, Proposal};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::NEG_INFINITY;
use std::fmt;

// Draw attempts before a restart or proposal gives up and stands pat.
const DRAW_ATTEMPTS: usize = 100;

/// A single observation: evaluation inputs (none, in this language), the
/// observed output string, and the per-symbol probability `alpha` of correct
/// transmission under the noisy-channel model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDatum {
    pub input: Vec<Value>,
    pub output: String,
    pub alpha: f64,
}

impl SequenceDatum {
    /// Build a zero-input observation.
    ///
    /// # Panics
    ///
    /// Panics unless `alpha` lies strictly inside `(0, 1)`; a degenerate
    /// channel is a configuration error.
    pub fn new(output: &str, alpha: f64) -> Self {
        assert!(
            0.0 < alpha && alpha < 1.0,
            "noise parameter alpha must lie in (0, 1), got {}",
            alpha
        );
        SequenceDatum {
            input: Vec::new(),
            output: output.to_string(),
            alpha,
        }
    }
}

/// A program drawn from a grammar, scored against observed sequences.
///
/// The prior is the grammar's log-probability of the program; the likelihood
/// compares the program's output to each observation symbol-by-symbol over
/// exactly `datum.output.len()` positions, scoring `ln(alpha)` per match and
/// `ln(1 - alpha)` per mismatch. Outputs shorter than an observation are
/// structurally incompatible and score `-inf`, as do programs whose
/// evaluation fails.
#[derive(Debug, Clone)]
pub struct SequenceHypothesis<'a> {
    grammar: &'a Grammar,
    expr: Expr,
    score: BayesScore,
}

impl<'a> SequenceHypothesis<'a> {
    /// Wrap an expression; scores are computed lazily by the sampler.
    pub fn new(grammar: &'a Grammar, expr: Expr) -> Self {
        SequenceHypothesis {
            grammar,
            expr,
            score: BayesScore::default(),
        }
    }
    /// Draw a fresh hypothesis from the grammar's start type.
    pub fn from_grammar<R: Rng>(grammar: &'a Grammar, rng: &mut R) -> Result<Self, SampleError> {
        let mut last = SampleError::OptionsExhausted;
        for _attempt in 0..DRAW_ATTEMPTS {
            match grammar.generate(grammar.start(), rng) {
                Ok(expr) => return Ok(SequenceHypothesis::new(grammar, expr)),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
    /// The program's output on zero inputs, as the driver and tally consume it.
    pub fn interpret(&self) -> Result<Value, crate::expr::EvalError> {
        self.expr.eval(&[])
    }
}

impl<'a> fmt::Display for SequenceHypothesis<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

impl<'a> PartialEq for SequenceHypothesis<'a> {
    /// Structural: two hypotheses with identical trees are the same state.
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl<'a> Eq for SequenceHypothesis<'a> {}

impl<'a> Hypothesis for SequenceHypothesis<'a> {}

impl<'a> Bayesable for SequenceHypothesis<'a> {
    type Datum = SequenceDatum;
    fn bayes_score(&self) -> &BayesScore {
        &self.score
    }
    fn bayes_score_mut(&mut self) -> &mut BayesScore {
        &mut self.score
    }
    fn compute_prior(&mut self) -> f64 {
        self.grammar.log_probability(&self.expr)
    }
    fn compute_single_likelihood(&mut self, datum: &SequenceDatum) -> f64 {
        let output = match self.expr.eval(&datum.input) {
            Ok(Value::Seq(s)) => s,
            _ => return NEG_INFINITY,
        };
        let observed = datum.output.as_bytes();
        if output.len() < observed.len() {
            return NEG_INFINITY;
        }
        let mismatches = output
            .bytes()
            .zip(observed.iter().copied())
            .filter(|(a, b)| a != b)
            .count();
        let matches = observed.len() - mismatches;
        (1.0 - datum.alpha).ln() * (mismatches as f64) + datum.alpha.ln() * (matches as f64)
    }
}

impl<'a> MCMCable for SequenceHypothesis<'a> {
    fn restart<R: Rng>(&mut self, rng: &mut R) -> Self {
        match SequenceHypothesis::from_grammar(self.grammar, rng) {
            Ok(h) => h,
            // an ungenerative draw leaves the chain where it stands
            Err(_) => self.clone(),
        }
    }
    fn propose<R: Rng>(&mut self, rng: &mut R) -> (Self, f64) {
        match proposal::regenerate_subtree(self.grammar, &self.expr, rng) {
            Ok(Proposal {
                expr,
                log_fwd,
                log_bwd,
            }) => (
                SequenceHypothesis::new(self.grammar, expr),
                log_fwd - log_bwd,
            ),
            // a null move; symmetric, so fb is zero
            Err(_) => (self.clone(), 0.0),
        }
    }
    fn replicate(&mut self, other: &Self) {
        self.score = *other.bayes_score();
    }
}
