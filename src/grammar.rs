//! A weighted, typed rule set defining a distribution over programs.
//!
//! Rules are accumulated in a [`GrammarBuilder`] and frozen into an immutable
//! [`Grammar`] by [`build`], which is the single configuration-validation
//! pass: non-positive weights and argument types with no productions are
//! rejected there, before any sampling can begin. Downstream components hold
//! read-only references to the finished grammar.
//!
//! Generation draws a rule among those sharing the requested type with
//! probability proportional to its weight, then recurses per argument type.
//! Termination is the grammar author's responsibility (weight terminals
//! highly relative to recursive rules); an optional depth guard restricts
//! deep nodes to zero-argument rules and fails the draw with
//! [`SampleError::DepthExceeded`] when no such rule exists.
//!
//! [`build`]: struct.GrammarBuilder.html#method.build

use crate::expr::{Expr, Op};
use itertools::Itertools;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashMap;
use std::fmt;

/// The closed non-terminal alphabet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// Binary sequences.
    Seq,
    /// Repetition counts.
    Count,
}

/// A reference to a rule within its grammar.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) usize);

/// One production: `lhs` can be rewritten as `op` applied to one generated
/// subtree per entry of `arg_types`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub lhs: Ty,
    pub op: Op,
    pub arg_types: Vec<Ty>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
/// The error type for grammar configuration.
pub enum GrammarError {
    /// A rule was registered with a weight that is zero, negative, or not finite.
    NonPositiveWeight { rule: String, weight: f64 },
    /// A rule's argument list contradicts its operator's arity.
    OperatorArity {
        rule: String,
        expected: usize,
        found: usize,
    },
    /// The start type or a referenced argument type has no productions.
    UnproducibleType(Ty),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GrammarError::NonPositiveWeight { ref rule, weight } => {
                write!(f, "rule {} has invalid weight {}", rule, weight)
            }
            GrammarError::OperatorArity {
                ref rule,
                expected,
                found,
            } => write!(
                f,
                "rule {} gives its operator {} argument types but it takes {}",
                rule, found, expected
            ),
            GrammarError::UnproducibleType(ty) => {
                write!(f, "no rules produce the required type {}", ty)
            }
        }
    }
}

impl std::error::Error for GrammarError {}

#[derive(Debug, Clone, PartialEq)]
/// The error type for generation.
pub enum SampleError {
    /// The depth guard fired at a type with no zero-argument escape.
    DepthExceeded(usize),
    /// No candidate rules remained to draw from.
    OptionsExhausted,
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SampleError::DepthExceeded(depth) => {
                write!(f, "no terminal escape at depth {}", depth)
            }
            SampleError::OptionsExhausted => write!(f, "failed to sample (options exhausted)"),
        }
    }
}

impl std::error::Error for SampleError {}

/// Accumulates rule definitions, then produces an immutable [`Grammar`].
#[derive(Debug)]
pub struct GrammarBuilder {
    start: Ty,
    max_depth: Option<usize>,
    rules: Vec<Rule>,
}

impl GrammarBuilder {
    pub fn new(start: Ty) -> Self {
        GrammarBuilder {
            start,
            max_depth: None,
            rules: Vec::new(),
        }
    }
    /// Restrict nodes at `depth` or deeper to zero-argument rules during
    /// generation.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
    /// Register a production for `lhs`. Validation happens in [`build`].
    ///
    /// [`build`]: struct.GrammarBuilder.html#method.build
    pub fn rule(mut self, lhs: Ty, op: Op, arg_types: &[Ty], weight: f64) -> Self {
        self.rules.push(Rule {
            lhs,
            op,
            arg_types: arg_types.to_vec(),
            weight,
        });
        self
    }
    /// Validate the accumulated rules and freeze them into a [`Grammar`].
    pub fn build(self) -> Result<Grammar, GrammarError> {
        for rule in &self.rules {
            if !rule.weight.is_finite() || rule.weight <= 0.0 {
                return Err(GrammarError::NonPositiveWeight {
                    rule: format!("{}: {}", rule.lhs, rule.op),
                    weight: rule.weight,
                });
            }
            if rule.arg_types.len() != rule.op.arity() {
                return Err(GrammarError::OperatorArity {
                    rule: format!("{}: {}", rule.lhs, rule.op),
                    expected: rule.op.arity(),
                    found: rule.arg_types.len(),
                });
            }
        }
        let required = std::iter::once(self.start)
            .chain(self.rules.iter().flat_map(|r| r.arg_types.iter().copied()))
            .unique();
        for ty in required {
            if !self.rules.iter().any(|r| r.lhs == ty) {
                return Err(GrammarError::UnproducibleType(ty));
            }
        }
        let mut totals = HashMap::new();
        for rule in &self.rules {
            *totals.entry(rule.lhs).or_insert(0.0) += rule.weight;
        }
        Ok(Grammar {
            start: self.start,
            max_depth: self.max_depth,
            rules: self.rules,
            totals,
        })
    }
}

/// An immutable weighted grammar over [`Expr`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    start: Ty,
    max_depth: Option<usize>,
    rules: Vec<Rule>,
    totals: HashMap<Ty, f64>,
}

impl Grammar {
    /// The designated start type.
    pub fn start(&self) -> Ty {
        self.start
    }
    /// Look up a rule by reference.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }
    /// All rules, paired with their references.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i), r))
    }
    /// The rules producing `ty`, in registration order.
    pub fn rules_for(&self, ty: Ty) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules().filter(move |(_, r)| r.lhs == ty)
    }
    /// The rule producing `ty` via `op`, if any. Used by the parsers.
    pub fn find_rule(&self, ty: Ty, op: &Op) -> Option<RuleId> {
        self.rules_for(ty).find(|(_, r)| r.op == *op).map(|(id, _)| id)
    }
    /// A rule's weight divided by the summed weight of its competitors.
    pub fn normalized_probability(&self, id: RuleId) -> f64 {
        let rule = &self.rules[id.0];
        rule.weight / self.totals[&rule.lhs]
    }
    /// The log-probability of generating exactly `expr`: the sum over every
    /// node of the log normalized probability of the rule used there.
    pub fn log_probability(&self, expr: &Expr) -> f64 {
        expr.subexprs()
            .iter()
            .map(|node| self.normalized_probability(node.rule()).ln())
            .sum()
    }
    /// Sample a full expression of type `ty`.
    pub fn generate<R: Rng>(&self, ty: Ty, rng: &mut R) -> Result<Expr, SampleError> {
        self.generate_at(ty, 0, rng)
    }
    fn generate_at<R: Rng>(&self, ty: Ty, depth: usize, rng: &mut R) -> Result<Expr, SampleError> {
        let forced = self.max_depth.map_or(false, |m| depth >= m);
        let options = self
            .rules_for(ty)
            .filter(|(_, r)| !forced || r.arg_types.is_empty())
            .collect_vec();
        if options.is_empty() {
            return Err(if forced {
                SampleError::DepthExceeded(depth)
            } else {
                SampleError::OptionsExhausted
            });
        }
        let weights = options.iter().map(|(_, r)| r.weight).collect_vec();
        // weights were validated positive in build()
        let dist = WeightedIndex::new(weights).unwrap();
        let (id, rule) = options[dist.sample(rng)];
        let args = rule
            .arg_types
            .iter()
            .map(|t| self.generate_at(*t, depth + 1, rng))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expr::new(id, rule.op.clone(), args))
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Ty::Seq => write!(f, "Seq"),
            Ty::Count => write!(f, "Count"),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.lhs, self.op)?;
        if !self.arg_types.is_empty() {
            write!(f, "(")?;
            for (i, ty) in self.arg_types.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", ty)?;
            }
            write!(f, ")")?;
        }
        write!(f, " @ {}", self.weight)
    }
}

impl fmt::Display for Grammar {
    /// Renders the declaration format accepted by `parse_grammar`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{};", rule)?;
        }
        Ok(())
    }
}
