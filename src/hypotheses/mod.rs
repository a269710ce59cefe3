//! Tools for defining hypotheses and hypothesis spaces.
//!
//! A hypothesis binds a candidate program to the components of its Bayesian
//! score: a prior from the generating grammar, a likelihood from observed
//! data, and their sum, the (unnormalized, log-domain) posterior. The traits
//! here separate what a sampler needs — scoring ([`Bayesable`]) and movement
//! ([`MCMCable`]) — from any particular program representation; the binary
//! sequence domain lives in [`sequence`].
//!
//! [`Bayesable`]: trait.Bayesable.html
//! [`MCMCable`]: trait.MCMCable.html
//! [`sequence`]: sequence/index.html

mod sequence;

pub use self::sequence::{SequenceDatum, SequenceHypothesis};
use crate::utilities::f64_eq;
use rand::prelude::*;
use std::{
    f64::{NAN, NEG_INFINITY},
    fmt::Display,
};

/// The data used to evaluate a given hypothesis.
pub type Datum<B> = <B as Bayesable>::Datum;

/// Access to a posterior rescaled by a temperature.
pub trait Temperable {
    fn at_temperature(&self, t: f64) -> f64;
}

/// `Hypothesis` types form a hypothesis space which can be searched.
///
/// Equality is the identity used to recognize repeated visits to the same
/// state, so implementations compare structure, not cached scores.
pub trait Hypothesis: Sized + Clone + Eq + Display {}

/// A container for the components of a Bayesian posterior probability.
///
/// Scores are log-domain and default to `NaN` until computed.
#[derive(Copy, Clone, Debug)]
pub struct BayesScore {
    pub prior: f64,
    pub likelihood: f64,
    pub posterior: f64,
}

/// `Bayesable` types support Bayesian inference (e.g. computing priors,
/// likelihoods, and posteriors).
pub trait Bayesable: Hypothesis {
    type Datum: Clone + Sized;
    fn bayes_score(&self) -> &BayesScore;
    fn bayes_score_mut(&mut self) -> &mut BayesScore;
    fn compute_prior(&mut self) -> f64;
    fn compute_single_likelihood(&mut self, datum: &Self::Datum) -> f64;
    /// Sum single-datum likelihoods, stopping early once the total is
    /// unsalvageable (`NaN`, `-inf`, or below `breakout`).
    fn compute_likelihood(&mut self, data: &[Self::Datum], breakout: Option<f64>) -> f64 {
        let breakout = breakout.unwrap_or(NEG_INFINITY);
        let mut likelihood = 0.0;
        for datum in data {
            likelihood += self.compute_single_likelihood(datum);
            if likelihood == NEG_INFINITY || likelihood.is_nan() {
                break;
            }
            if likelihood < breakout {
                likelihood = NEG_INFINITY;
                break;
            }
        }
        self.bayes_score_mut().likelihood = likelihood;
        likelihood
    }
    fn compute_posterior(&mut self, data: &[Self::Datum], breakout: Option<f64>) -> f64 {
        let prior = self.compute_prior();
        if prior == NEG_INFINITY {
            let score = self.bayes_score_mut();
            score.prior = prior;
            score.likelihood = NAN;
            score.posterior = NEG_INFINITY;
        } else {
            let likelihood = self.compute_likelihood(data, breakout);
            let score = self.bayes_score_mut();
            score.prior = prior;
            score.likelihood = likelihood;
            score.posterior = prior + likelihood;
        }
        self.bayes_score().posterior
    }
}

/// `MCMCable` hypothesis spaces can be searched using MCMC.
pub trait MCMCable: Bayesable {
    /// Draw a fresh hypothesis, independent of the current one.
    fn restart<R: Rng>(&mut self, rng: &mut R) -> Self;
    /// Propose a new hypothesis and return it along with `fb`, the log
    /// forward-minus-backward proposal probability used in the
    /// Metropolis-Hastings correction.
    fn propose<R: Rng>(&mut self, rng: &mut R) -> (Self, f64);
    /// Copy `other`'s cached score, used when a proposal is structurally
    /// identical to the current sample and need not be re-scored.
    fn replicate(&mut self, other: &Self);
}

impl<T: Bayesable> Temperable for T {
    fn at_temperature(&self, t: f64) -> f64 {
        let score = self.bayes_score();
        score.prior + score.likelihood / t
    }
}

impl PartialEq for BayesScore {
    fn eq(&self, other: &Self) -> bool {
        f64_eq(self.prior, other.prior)
            && f64_eq(self.likelihood, other.likelihood)
            && f64_eq(self.posterior, other.posterior)
    }
}

impl Eq for BayesScore {}

impl Default for BayesScore {
    fn default() -> Self {
        BayesScore {
            prior: NAN,
            likelihood: NAN,
            posterior: NAN,
        }
    }
}
