//! Suppresses re-alerting the same setup across consecutive evaluations.
//!
//! The guard is the only state the engine carries between calls. It starts
//! `Idle`, arms on the first accepted trade and is re-armed by every later
//! accepted trade. Blocked candidates and NO_TRADE never touch it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Action;
use crate::strategies::signals::SignalTags;

/// Snapshot of the last accepted signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateState {
    pub action: Action,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub tags: SignalTags,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum GuardState {
    #[default]
    Idle,
    Armed(DuplicateState),
}

/// Which similarity rule suppressed a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateRule {
    SameBar,
    SameSweepOrPoi,
    PriceBand,
    SameMomentum,
}

impl fmt::Display for DuplicateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateRule::SameBar => write!(f, "same_bar"),
            DuplicateRule::SameSweepOrPoi => write!(f, "same_sweep_or_poi"),
            DuplicateRule::PriceBand => write!(f, "price_band"),
            DuplicateRule::SameMomentum => write!(f, "same_momentum"),
        }
    }
}

/// What the guard compares for one candidate.
#[derive(Debug, Clone, Copy)]
pub struct GuardProbe<'a> {
    pub action: Action,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub tags: &'a SignalTags,
    /// Price band for this candidate's layer.
    pub band: f64,
}

#[derive(Debug, Default)]
pub struct DuplicateGuard {
    state: GuardState,
}

impl DuplicateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn last(&self) -> Option<&DuplicateState> {
        match &self.state {
            GuardState::Idle => None,
            GuardState::Armed(last) => Some(last),
        }
    }

    /// Returns the rule that blocked the probe, or `None` when it may go out.
    /// An accepted trade re-arms the guard with its snapshot.
    pub fn should_block(&mut self, probe: &GuardProbe<'_>) -> Option<DuplicateRule> {
        if !probe.action.is_directional() {
            return None;
        }
        if let Some(rule) = self.last().and_then(|last| similarity(last, probe)) {
            tracing::debug!("[GUARD] {} at {:.2} blocked by {}", probe.action, probe.price, rule);
            return Some(rule);
        }
        tracing::debug!("[GUARD] armed with {} at {:.2}", probe.action, probe.price);
        self.state = GuardState::Armed(DuplicateState {
            action: probe.action,
            price: probe.price,
            timestamp: probe.timestamp,
            tags: probe.tags.clone(),
        });
        None
    }
}

fn similarity(last: &DuplicateState, probe: &GuardProbe<'_>) -> Option<DuplicateRule> {
    if probe.timestamp == last.timestamp {
        return Some(DuplicateRule::SameBar);
    }
    // A new structure reading is a new setup, whatever the price.
    if probe.tags.structure != last.tags.structure {
        return None;
    }
    if probe.action != last.action {
        return None;
    }
    let same = |a: &Option<String>, b: &Option<String>| a.is_some() && a == b;
    if same(&probe.tags.sweep, &last.tags.sweep) || same(&probe.tags.poi, &last.tags.poi) {
        return Some(DuplicateRule::SameSweepOrPoi);
    }
    if (probe.price - last.price).abs() < probe.band {
        return Some(DuplicateRule::PriceBand);
    }
    if same(&probe.tags.momentum, &last.tags.momentum) {
        return Some(DuplicateRule::SameMomentum);
    }
    None
}
