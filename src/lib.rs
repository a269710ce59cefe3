//! Bayesian induction of binary-sequence programs.
//!
//! A weighted, typed [grammar](grammar/index.html) defines a distribution
//! over small programs built from four sequence operators (`repeat_`,
//! `concat_`, `bflip_`, `rev_`) and digit terminals. A
//! [hypothesis](hypotheses/index.html) scores one such program against
//! observed binary strings: its prior is the grammar's log-probability of
//! the program, its likelihood a per-symbol noisy-channel comparison of the
//! program's output with each observation. A Metropolis-Hastings
//! [chain](inference/index.html) moves through program space by regrowing
//! random subtrees, and the visit counts of its samples
//! ([tally](tally/index.html)) estimate the posterior and the probability of
//! the symbol following an observed prefix.
//!
//! # Example
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use seqinduction::hypotheses::{SequenceDatum, SequenceHypothesis};
//! use seqinduction::inference::{Control, MCMCChain};
//! use seqinduction::parser::parse_grammar;
//! use seqinduction::tally::PosteriorTally;
//!
//! let grammar = parse_grammar(
//!     "Seq: \"1\" @ 6.0;
//!      Seq: \"0\" @ 6.0;
//!      Seq: repeat_(Seq, Count) @ 1.0;
//!      Seq: concat_(Seq, Seq) @ 1.0;
//!      Seq: bflip_(Seq) @ 1.0;
//!      Seq: rev_(Seq) @ 1.0;
//!      Count: 8 @ 1.0;
//!      Count: 9 @ 1.0;",
//! )
//! .expect("a valid grammar");
//!
//! let data = vec![SequenceDatum::new("11110000", 0.9999)];
//! let mut rng = StdRng::seed_from_u64(0);
//! let h0 = SequenceHypothesis::from_grammar(&grammar, &mut rng).expect("a start hypothesis");
//!
//! let mut chain = MCMCChain::new(h0, &data);
//! let mut tally = PosteriorTally::new();
//! chain.run(Control::new(1000, 0, 0, 0, 0, 0), |h| tally.record(h), &mut rng);
//!
//! assert_eq!(tally.total(), 1000);
//! let p_zero = tally.p_next_symbol(8, b'0');
//! assert!(0.0 <= p_zero && p_zero <= 1.0);
//! ```

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate maplit;
#[macro_use]
extern crate nom;

pub mod expr;
pub mod grammar;
pub mod hypotheses;
pub mod inference;
pub mod parser;
pub mod proposal;
pub mod tally;
pub mod utilities;

pub use crate::expr::{EvalError, Expr, Op, Value, MAX_SEQUENCE_LEN};
pub use crate::grammar::{Grammar, GrammarBuilder, GrammarError, Rule, RuleId, SampleError, Ty};
pub use crate::hypotheses::{
    Bayesable, BayesScore, Hypothesis, MCMCable, SequenceDatum, SequenceHypothesis, Temperable,
};
pub use crate::inference::{Control, MCMCChain};
pub use crate::parser::{parse_expr, parse_grammar, ParseError};
pub use crate::proposal::{regenerate_subtree, Proposal};
pub use crate::tally::PosteriorTally;
