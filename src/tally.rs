//! Aggregation of posterior samples into visit counts and predictions.
//!
//! A Metropolis-Hastings chain approximates the posterior by how often it
//! visits each state, so the tally counts every emitted sample — a rejection
//! that re-emits the current state is another visit, not a duplicate. States
//! are identified structurally by their expression; each distinct program's
//! output and score are cached on first visit.

use crate::expr::{Expr, Value};
use crate::hypotheses::{Bayesable, BayesScore, SequenceHypothesis};
use crate::utilities::logsumexp;
use itertools::Itertools;
use std::collections::HashMap;

/// What the tally knows about one distinct program.
#[derive(Debug, Clone)]
pub struct TallyEntry {
    /// The number of recorded visits.
    pub count: usize,
    /// The program's output on zero inputs, when it evaluates to a sequence.
    pub output: Option<String>,
    /// The score cached from the first recorded visit.
    pub score: BayesScore,
}

/// Visit counts over the distinct programs a chain has emitted.
#[derive(Debug, Default)]
pub struct PosteriorTally {
    entries: HashMap<Expr, TallyEntry>,
    total: usize,
}

impl PosteriorTally {
    pub fn new() -> Self {
        PosteriorTally {
            entries: HashMap::new(),
            total: 0,
        }
    }
    /// Record one visit to `hypothesis`.
    pub fn record(&mut self, hypothesis: &SequenceHypothesis) {
        self.total += 1;
        if let Some(entry) = self.entries.get_mut(hypothesis.expr()) {
            entry.count += 1;
        } else {
            let output = match hypothesis.interpret() {
                Ok(Value::Seq(s)) => Some(s),
                _ => None,
            };
            self.entries.insert(
                hypothesis.expr().clone(),
                TallyEntry {
                    count: 1,
                    output,
                    score: *hypothesis.bayes_score(),
                },
            );
        }
    }
    /// The number of recorded visits.
    pub fn total(&self) -> usize {
        self.total
    }
    /// The number of distinct programs visited.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }
    /// The number of visits to a specific program.
    pub fn count(&self, expr: &Expr) -> usize {
        self.entries.get(expr).map_or(0, |e| e.count)
    }
    /// The `n` most-visited programs, most visited first.
    pub fn top(&self, n: usize) -> Vec<(&Expr, &TallyEntry)> {
        self.entries
            .iter()
            .sorted_by(|a, b| b.1.count.cmp(&a.1.count))
            .take(n)
            .collect_vec()
    }
    /// The log normalizing constant over the distinct visited programs'
    /// posterior scores. Subtracting it from a score gives that program's
    /// posterior weight relative to everything the chain has seen.
    pub fn log_z(&self) -> f64 {
        let scores = self
            .entries
            .values()
            .map(|entry| entry.score.posterior)
            .collect_vec();
        logsumexp(&scores)
    }
    /// The fraction of recorded visits whose program output extends past
    /// `position` and carries `symbol` there: the posterior-sample estimate
    /// of P(next symbol = `symbol` | observed prefix).
    pub fn p_next_symbol(&self, position: usize, symbol: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let hits: usize = self
            .entries
            .values()
            .filter(|entry| {
                entry
                    .output
                    .as_ref()
                    .map_or(false, |s| s.len() > position && s.as_bytes()[position] == symbol)
            })
            .map(|entry| entry.count)
            .sum();
        hits as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Op;
    use crate::grammar::{Grammar, GrammarBuilder, Ty};
    use crate::parser::parse_expr;

    fn binary_grammar() -> Grammar {
        let mut builder = GrammarBuilder::new(Ty::Seq)
            .rule(Ty::Seq, Op::Lit(Value::Seq("1".to_string())), &[], 6.0)
            .rule(Ty::Seq, Op::Lit(Value::Seq("0".to_string())), &[], 6.0)
            .rule(Ty::Seq, Op::Repeat, &[Ty::Seq, Ty::Count], 1.0)
            .rule(Ty::Seq, Op::Concat, &[Ty::Seq, Ty::Seq], 1.0)
            .rule(Ty::Seq, Op::BitFlip, &[Ty::Seq], 1.0)
            .rule(Ty::Seq, Op::Reverse, &[Ty::Seq], 1.0);
        for n in 0..10 {
            let weight = 10.0 / ((n + 1) as f64).powi(2);
            builder = builder.rule(Ty::Count, Op::Lit(Value::Count(n)), &[], weight);
        }
        builder.build().expect("valid grammar")
    }

    #[test]
    fn repeated_visits_accumulate_on_one_entry() {
        let grammar = binary_grammar();
        let nine_zeros =
            SequenceHypothesis::new(&grammar, parse_expr("repeat_(\"0\", 9)", &grammar).unwrap());
        let eight_ones =
            SequenceHypothesis::new(&grammar, parse_expr("repeat_(\"1\", 8)", &grammar).unwrap());
        let mut tally = PosteriorTally::new();
        for _ in 0..3 {
            tally.record(&nine_zeros);
        }
        tally.record(&eight_ones);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.distinct(), 2);
        assert_eq!(tally.count(nine_zeros.expr()), 3);
        assert_eq!(tally.count(eight_ones.expr()), 1);
        let (top_expr, top_entry) = tally.top(1)[0];
        assert_eq!(top_expr, nine_zeros.expr());
        assert_eq!(top_entry.output.as_deref(), Some("000000000"));
    }

    #[test]
    fn predictions_count_only_outputs_that_reach_the_position() {
        let grammar = binary_grammar();
        // 9 zeros: has a symbol at index 8; 8 ones: does not
        let nine_zeros =
            SequenceHypothesis::new(&grammar, parse_expr("repeat_(\"0\", 9)", &grammar).unwrap());
        let eight_ones =
            SequenceHypothesis::new(&grammar, parse_expr("repeat_(\"1\", 8)", &grammar).unwrap());
        let mut tally = PosteriorTally::new();
        for _ in 0..3 {
            tally.record(&nine_zeros);
        }
        tally.record(&eight_ones);
        assert!((tally.p_next_symbol(8, b'0') - 0.75).abs() < 1e-12);
        assert_eq!(tally.p_next_symbol(8, b'1'), 0.0);
        assert_eq!(tally.p_next_symbol(0, b'1'), 0.25);
    }

    #[test]
    fn log_z_normalizes_visited_posteriors() {
        let grammar = binary_grammar();
        let data = vec![crate::hypotheses::SequenceDatum::new("00000000", 0.9999)];
        let mut a =
            SequenceHypothesis::new(&grammar, parse_expr("repeat_(\"0\", 8)", &grammar).unwrap());
        let mut b =
            SequenceHypothesis::new(&grammar, parse_expr("repeat_(\"0\", 9)", &grammar).unwrap());
        let post_a = a.compute_posterior(&data, None);
        let post_b = b.compute_posterior(&data, None);
        let mut tally = PosteriorTally::new();
        tally.record(&a);
        tally.record(&b);
        let expected = (post_a.exp() + post_b.exp()).ln();
        assert!((tally.log_z() - expected).abs() < 1e-9);
        // weights relative to log_z sum to one
        let wa = (post_a - tally.log_z()).exp();
        let wb = (post_b - tally.log_z()).exp();
        assert!((wa + wb - 1.0).abs() < 1e-9);
    }

    #[test]
    fn an_empty_tally_predicts_nothing() {
        let tally = PosteriorTally::new();
        assert_eq!(tally.total(), 0);
        assert_eq!(tally.p_next_symbol(8, b'0'), 0.0);
        assert!(tally.top(3).is_empty());
    }

    #[test]
    fn programs_that_fail_to_evaluate_never_predict() {
        let grammar = binary_grammar();
        let blown = SequenceHypothesis::new(
            &grammar,
            parse_expr(
                "repeat_(repeat_(repeat_(repeat_(repeat_(\"1\", 9), 9), 9), 9), 9)",
                &grammar,
            )
            .unwrap(),
        );
        let mut tally = PosteriorTally::new();
        tally.record(&blown);
        assert_eq!(tally.distinct(), 1);
        assert_eq!(tally.p_next_symbol(0, b'1'), 0.0);
    }
}
