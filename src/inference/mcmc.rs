//! A Metropolis-Hastings chain over an [`MCMCable`] hypothesis space.
//!
//! The chain is a sequential, pull-based loop: each [`step`] proposes one
//! move, scores it against the chain's data, and accepts or rejects it.
//! [`run`] drives `step` under a [`Control`] bound and hands every
//! post-transition sample (rejections included — their repeats are what make
//! visit counts approximate the posterior) to a callback; [`samples`] exposes
//! the same stream as a lazy iterator that stops working the moment its
//! consumer drops it.
//!
//! [`MCMCable`]: ../hypotheses/trait.MCMCable.html
//! [`step`]: struct.MCMCChain.html#method.step
//! [`run`]: struct.MCMCChain.html#method.run
//! [`samples`]: struct.MCMCChain.html#method.samples
//! [`Control`]: struct.Control.html

use crate::hypotheses::{Datum, MCMCable, Temperable};
use crate::inference::Control;
use crate::utilities::{FHBool, FiniteHistory};
use rand::prelude::*;
use std::f64::NEG_INFINITY;

/// An MCMC chain.
pub struct MCMCChain<'a, H>
where
    H: MCMCable,
{
    current: H,
    data: &'a [Datum<H>],
    temperature: f64,
    maxval: f64,
    pub(crate) samples: usize,
    proposals: usize,
    acceptances: usize,
    steps_since_improvement: usize,
    history: FiniteHistory<FHBool>,
}

impl<'a, H: MCMCable> MCMCChain<'a, H> {
    /// Construct a chain at `h0`, scored against `data`.
    pub fn new(mut h0: H, data: &'a [Datum<H>]) -> Self {
        h0.compute_posterior(data, None);
        MCMCChain {
            current: h0,
            data,
            temperature: 1.0,
            maxval: NEG_INFINITY,
            samples: 1,
            proposals: 0,
            acceptances: 0,
            steps_since_improvement: 0,
            history: FiniteHistory::new(100),
        }
    }
    /// Change the data available to the chain, and optionally update the
    /// posterior of the current sample.
    pub fn set_data(&mut self, data: &'a [Datum<H>], recompute_posterior: bool) {
        if recompute_posterior {
            self.current.compute_posterior(data, None);
        }
        self.data = data;
    }
    /// Return a reference to the current sample.
    pub fn current(&self) -> &H {
        &self.current
    }
    /// Return a mutable reference to the current sample.
    pub fn current_mut(&mut self) -> &mut H {
        &mut self.current
    }
    /// Return the best posterior seen since the last restart.
    pub fn maxval(&self) -> f64 {
        self.maxval
    }
    /// The number of proposals made so far.
    pub fn proposals(&self) -> usize {
        self.proposals
    }
    /// The number of proposals accepted so far.
    pub fn acceptances(&self) -> usize {
        self.acceptances
    }
    /// The chain's recent acceptance ratio.
    pub fn acceptance_ratio(&self) -> f64 {
        self.history.mean()
    }
    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = temperature;
    }

    /// Take one Metropolis-Hastings transition and return the new current
    /// sample.
    ///
    /// The acceptance probability is `min(1, exp(ratio))` with
    /// `ratio = posterior(new) - posterior(current) - fb` (at the chain's
    /// temperature). A proposal scoring `NaN` or `-inf` is always rejected,
    /// so a chain whose every reachable state is `-inf` holds steady; a
    /// finite proposal always displaces a `-inf` current state.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> &H {
        if self.current.bayes_score().posterior > self.maxval {
            self.maxval = self.current.bayes_score().posterior;
            self.steps_since_improvement = 0;
        } else {
            self.steps_since_improvement += 1;
        }

        let (mut proposal, fb) = self.current.propose(rng);
        self.proposals += 1;

        // Many proposals are duplicates. If so, save time by not recomputing
        // the posterior.
        if proposal == self.current {
            proposal.replicate(&self.current);
        } else {
            proposal.compute_posterior(self.data, None);
        }

        let new_posterior = proposal.bayes_score().posterior;
        let current_posterior = self.current.bayes_score().posterior;
        let accept = if new_posterior.is_nan() || new_posterior == NEG_INFINITY {
            false
        } else if current_posterior.is_nan() || current_posterior == NEG_INFINITY {
            true
        } else {
            let ratio = proposal.at_temperature(self.temperature)
                - self.current.at_temperature(self.temperature)
                - fb;
            ratio >= 0.0 || rng.gen::<f64>() < ratio.exp()
        };

        if accept {
            self.current = proposal;
            self.acceptances += 1;
            self.history.add(FHBool(true));
        } else {
            self.history.add(FHBool(false));
        }

        self.samples += 1;
        &self.current
    }

    /// Run the chain for `ctl.steps` transitions (or until `ctl.runtime`
    /// elapses), handing each post-transition sample to `callback` subject to
    /// `ctl.burn` and `ctl.thin`.
    pub fn run<R: Rng, F: FnMut(&H)>(&mut self, mut ctl: Control, mut callback: F, rng: &mut R) {
        ctl.start();
        while ctl.running() {
            if ctl.restart > 0 && self.steps_since_improvement > ctl.restart {
                self.current = self.current.restart(rng);
                self.current.compute_posterior(self.data, None);
                self.steps_since_improvement = 0;
                self.maxval = self.current.bayes_score().posterior;
            }

            self.step(rng);

            if ctl.done_steps > ctl.burn && (ctl.thin == 0 || ctl.done_steps % ctl.thin == 0) {
                callback(&self.current);
            }

            if ctl.print > 0 && self.samples % ctl.print == 0 {
                println!("{}", self.current);
            }
        }
    }
    /// Run the chain without termination conditions.
    pub fn run_forever<R: Rng, F: FnMut(&H)>(&mut self, mut ctl: Control, callback: F, rng: &mut R) {
        ctl.steps = 0;
        ctl.runtime = 0;
        self.run(ctl, callback, rng)
    }
    /// A lazy stream of samples: each `next` takes one transition and clones
    /// the resulting current sample. Dropping the iterator stops all work.
    pub fn samples<'c, R: Rng>(&'c mut self, ctl: Control, rng: &'c mut R) -> Samples<'c, 'a, H, R> {
        Samples {
            chain: self,
            ctl,
            rng,
        }
    }
}

impl<'a, H> Temperable for MCMCChain<'a, H>
where
    H: MCMCable,
{
    /// Return the current posterior at temperature `t`.
    fn at_temperature(&self, t: f64) -> f64 {
        self.current.at_temperature(t)
    }
}

/// See [`MCMCChain::samples`].
///
/// [`MCMCChain::samples`]: struct.MCMCChain.html#method.samples
pub struct Samples<'c, 'a, H, R>
where
    H: MCMCable,
    R: Rng,
{
    chain: &'c mut MCMCChain<'a, H>,
    ctl: Control,
    rng: &'c mut R,
}

impl<'c, 'a, H: MCMCable, R: Rng> Iterator for Samples<'c, 'a, H, R> {
    type Item = H;
    fn next(&mut self) -> Option<H> {
        if self.ctl.running() {
            Some(self.chain.step(self.rng).clone())
        } else {
            None
        }
    }
}
