//! Expression trees over binary sequences and their evaluator.
//!
//! A program is an ordered tree of typed nodes. Each node records the
//! [`RuleId`] of the grammar production that built it together with a copy of
//! that production's [`Op`], so trees can be evaluated and displayed without
//! consulting the grammar, while priors are still computed uniformly from the
//! stored rule references.
//!
//! Evaluation is a closed `match` over the operator tag. It is total over
//! well-formed trees: malformed applications on hand-built trees and outputs
//! past the [`MAX_SEQUENCE_LEN`] resource bound are reported as [`EvalError`]s
//! for the caller to absorb into scoring, never panics.

use crate::grammar::RuleId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The longest sequence evaluation will materialize. Nested `repeat_`
/// applications can otherwise request exponentially large outputs.
pub const MAX_SEQUENCE_LEN: usize = 1 << 13;

/// A concrete value: a binary sequence or a repeat count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// A string over the alphabet `{'0', '1'}`.
    Seq(String),
    /// A repetition count.
    Count(usize),
}

/// The closed operator alphabet of the language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    /// A terminal literal.
    Lit(Value),
    /// `repeat_(s, n)`: `s` repeated `n` times.
    Repeat,
    /// `concat_(a, b)`: `a` followed by `b`.
    Concat,
    /// `bflip_(s)`: complement every symbol of `s`.
    BitFlip,
    /// `rev_(s)`: `s` reversed.
    Reverse,
}

impl Op {
    /// The number of arguments the operator consumes.
    pub fn arity(&self) -> usize {
        match *self {
            Op::Lit(_) => 0,
            Op::BitFlip | Op::Reverse => 1,
            Op::Repeat | Op::Concat => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// The error type for evaluation.
pub enum EvalError {
    /// The tree applies an operator to arguments it has no semantics for.
    Malformed,
    /// Evaluation would materialize a sequence longer than [`MAX_SEQUENCE_LEN`].
    TooLong(usize),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EvalError::Malformed => write!(f, "operator applied to malformed arguments"),
            EvalError::TooLong(n) => write!(f, "output of {} symbols exceeds the evaluation bound", n),
        }
    }
}

impl std::error::Error for EvalError {}

/// A program: a grammar rule reference, its operator tag, and one child per
/// argument of the rule.
///
/// Trees exclusively own their subtrees and are immutable once built;
/// [`replace`] returns a fresh tree rather than mutating in place. Equality
/// and hashing are structural, which is what identifies repeated visits to
/// the same program during sampling.
///
/// [`replace`]: struct.Expr.html#method.replace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr {
    rule: RuleId,
    op: Op,
    args: Vec<Expr>,
}

impl Expr {
    pub fn new(rule: RuleId, op: Op, args: Vec<Expr>) -> Self {
        Expr { rule, op, args }
    }
    /// The grammar rule that produced this node.
    pub fn rule(&self) -> RuleId {
        self.rule
    }
    /// The node's operator tag.
    pub fn op(&self) -> &Op {
        &self.op
    }
    /// The node's children, one per argument type of its rule.
    pub fn args(&self) -> &[Expr] {
        &self.args
    }
    /// The number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.args.iter().map(Expr::size).sum::<usize>()
    }
    /// The number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        1 + self.args.iter().map(Expr::depth).max().unwrap_or(0)
    }
    /// Every subtree of the tree, root included, in preorder.
    pub fn subexprs(&self) -> Vec<&Expr> {
        let mut out = Vec::with_capacity(self.size());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.args.iter().rev());
        }
        out
    }
    /// The subtree rooted at preorder position `index`.
    pub fn subexpr(&self, index: usize) -> Option<&Expr> {
        self.subexprs().get(index).copied()
    }
    /// A new tree in which the subtree at preorder position `index` is
    /// `replacement`. `None` if `index` is out of bounds.
    pub fn replace(&self, index: usize, replacement: Expr) -> Option<Expr> {
        if index >= self.size() {
            return None;
        }
        let mut counter = 0;
        let mut slot = Some(replacement);
        Some(self.rebuild(index, &mut counter, &mut slot))
    }
    fn rebuild(&self, target: usize, counter: &mut usize, slot: &mut Option<Expr>) -> Expr {
        let here = *counter;
        *counter += 1;
        if here == target {
            if let Some(replacement) = slot.take() {
                return replacement;
            }
        }
        Expr {
            rule: self.rule,
            op: self.op.clone(),
            args: self
                .args
                .iter()
                .map(|a| a.rebuild(target, counter, slot))
                .collect(),
        }
    }

    /// Evaluate the tree bottom-up. `inputs` are threaded through the
    /// recursion unchanged; programs in this language consume none, so the
    /// result is determined by the tree alone.
    pub fn eval(&self, inputs: &[Value]) -> Result<Value, EvalError> {
        let vals = self
            .args
            .iter()
            .map(|a| a.eval(inputs))
            .collect::<Result<Vec<_>, _>>()?;
        match self.op {
            Op::Lit(ref v) => Ok(v.clone()),
            Op::Repeat => match vals.as_slice() {
                [Value::Seq(s), Value::Count(n)] => {
                    let len = s.len().saturating_mul(*n);
                    if len > MAX_SEQUENCE_LEN {
                        Err(EvalError::TooLong(len))
                    } else {
                        Ok(Value::Seq(s.repeat(*n)))
                    }
                }
                _ => Err(EvalError::Malformed),
            },
            Op::Concat => match vals.as_slice() {
                [Value::Seq(a), Value::Seq(b)] => {
                    let len = a.len() + b.len();
                    if len > MAX_SEQUENCE_LEN {
                        Err(EvalError::TooLong(len))
                    } else {
                        let mut out = String::with_capacity(len);
                        out.push_str(a);
                        out.push_str(b);
                        Ok(Value::Seq(out))
                    }
                }
                _ => Err(EvalError::Malformed),
            },
            Op::BitFlip => match vals.as_slice() {
                [Value::Seq(s)] => s
                    .chars()
                    .map(|c| match c {
                        '0' => Ok('1'),
                        '1' => Ok('0'),
                        _ => Err(EvalError::Malformed),
                    })
                    .collect::<Result<String, _>>()
                    .map(Value::Seq),
                _ => Err(EvalError::Malformed),
            },
            Op::Reverse => match vals.as_slice() {
                [Value::Seq(s)] => Ok(Value::Seq(s.chars().rev().collect())),
                _ => Err(EvalError::Malformed),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Seq(ref s) => write!(f, "\"{}\"", s),
            Value::Count(n) => write!(f, "{}", n),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Op::Lit(ref v) => write!(f, "{}", v),
            Op::Repeat => write!(f, "repeat_"),
            Op::Concat => write!(f, "concat_"),
            Op::BitFlip => write!(f, "bflip_"),
            Op::Reverse => write!(f, "rev_"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if !matches!(self.op, Op::Lit(_)) {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn eval_seq(grammar: &Grammar, src: &str) -> String {
        let expr = parse_expr(src, grammar).expect("parsed expr");
        match expr.eval(&[]).expect("evaluated expr") {
            Value::Seq(s) => s,
            Value::Count(_) => panic!("expected a sequence"),
        }
    }

    #[test]
    fn repeat_and_concat_compose_in_order() {
        let grammar = binary_grammar();
        let out = eval_seq(
            &grammar,
            "concat_(repeat_(\"1\", 3), repeat_(\"0\", 2))",
        );
        assert_eq!(out, "11100");
    }

    #[test]
    fn repeat_zero_times_is_empty() {
        let grammar = binary_grammar();
        assert_eq!(eval_seq(&grammar, "repeat_(\"1\", 0)"), "");
    }

    #[test]
    fn bflip_is_its_own_inverse() {
        let grammar = binary_grammar();
        let once = eval_seq(&grammar, "bflip_(concat_(\"1\", repeat_(\"0\", 3)))");
        assert_eq!(once, "0111");
        let twice = eval_seq(
            &grammar,
            "bflip_(bflip_(concat_(\"1\", repeat_(\"0\", 3))))",
        );
        assert_eq!(twice, "1000");
    }

    #[test]
    fn rev_is_its_own_inverse() {
        let grammar = binary_grammar();
        let once = eval_seq(&grammar, "rev_(concat_(\"1\", repeat_(\"0\", 3)))");
        assert_eq!(once, "0001");
        let twice = eval_seq(&grammar, "rev_(rev_(concat_(\"1\", repeat_(\"0\", 3))))");
        assert_eq!(twice, "1000");
    }

    #[test]
    fn oversized_outputs_are_reported_not_materialized() {
        let grammar = binary_grammar();
        let expr = parse_expr(
            "repeat_(repeat_(repeat_(repeat_(repeat_(\"1\", 9), 9), 9), 9), 9)",
            &grammar,
        )
        .expect("parsed expr");
        match expr.eval(&[]) {
            Err(EvalError::TooLong(n)) => assert!(n > MAX_SEQUENCE_LEN),
            other => panic!("expected TooLong, got {:?}", other),
        }
    }

    #[test]
    fn preorder_indexing_and_replacement() {
        let grammar = binary_grammar();
        let expr = parse_expr("concat_(\"1\", \"0\")", &grammar).expect("parsed expr");
        assert_eq!(expr.size(), 3);
        assert_eq!(expr.depth(), 2);
        assert_eq!(format!("{}", expr.subexpr(1).unwrap()), "\"1\"");
        assert_eq!(format!("{}", expr.subexpr(2).unwrap()), "\"0\"");
        assert!(expr.subexpr(3).is_none());

        let one = parse_expr("\"1\"", &grammar).expect("parsed expr");
        let swapped = expr.replace(2, one).expect("replaced");
        assert_eq!(format!("{}", swapped), "concat_(\"1\", \"1\")");
        // the original is untouched
        assert_eq!(format!("{}", expr), "concat_(\"1\", \"0\")");
        assert!(expr.replace(3, expr.clone()).is_none());
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        let grammar = binary_grammar();
        let src = "concat_(repeat_(bflip_(\"1\"), 4), rev_(\"0\"))";
        let expr = parse_expr(src, &grammar).expect("parsed expr");
        assert_eq!(format!("{}", expr), src);
        let reparsed = parse_expr(&format!("{}", expr), &grammar).expect("reparsed expr");
        assert_eq!(expr, reparsed);
    }
}
