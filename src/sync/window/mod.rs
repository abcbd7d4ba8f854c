//! Fetch-window policies.
//!
//! A policy turns the current time, the entity, its most recent persisted record
//! and whatever calendar or candidate data the policy needs into the
//! [`FetchWindow`] for the next fetch. Policies are pure: the entity loop
//! gathers their inputs and executes their verdicts.

mod explicit;
mod fixed_cycle;
mod generic;

pub use explicit::ExplicitTimestampPolicy;
pub use fixed_cycle::{AnchorResolution, FixedCyclePolicy, resolve_anchor};
pub use generic::GenericPolicy;

use crate::calendar::TradingCalendar;
use crate::model::{Entity, FetchWindow, Record};
use crate::sync::config::{PolicyKind, SyncConfig};
use crate::utils::Timestamp;

/// Everything a policy may look at for one cycle
#[derive(Debug, Clone, Copy)]
pub struct WindowInput<'a> {
	pub now: Timestamp,
	pub entity: &'a Entity,
	/// Most recent persisted record that is not provisional.
	pub anchor: Option<&'a Record>,
	pub calendar: Option<&'a TradingCalendar>,
	/// Candidate event timestamps, already filtered and sorted.
	pub candidates: Option<&'a [Timestamp]>,
}

impl<'a> WindowInput<'a> {
	pub fn new(now: Timestamp, entity: &'a Entity) -> Self {
		Self {
			now,
			entity,
			anchor: None,
			calendar: None,
			candidates: None,
		}
	}

	pub fn with_anchor(mut self, anchor: Option<&'a Record>) -> Self {
		self.anchor = anchor;
		self
	}

	pub fn with_calendar(mut self, calendar: Option<&'a TradingCalendar>) -> Self {
		self.calendar = calendar;
		self
	}

	pub fn with_candidates(mut self, candidates: Option<&'a [Timestamp]>) -> Self {
		self.candidates = candidates;
		self
	}

	/// Short-circuit shared by every policy: nothing to fetch before listing.
	fn pending_listing(&self) -> Option<FetchWindow> {
		if self.entity.is_listed_after(&self.now) {
			return Some(FetchWindow::empty(self.entity.listing_timestamp));
		}
		None
	}
}

/// Closed set of window policies
#[derive(Debug, Clone)]
pub enum WindowPolicy {
	Generic(GenericPolicy),
	FixedCycle(FixedCyclePolicy),
	ExplicitTimestamps(ExplicitTimestampPolicy),
}

impl WindowPolicy {
	pub fn from_config(config: &SyncConfig) -> Self {
		match config.policy {
			PolicyKind::Generic => WindowPolicy::Generic(GenericPolicy::from_config(config)),
			PolicyKind::FixedCycle => WindowPolicy::FixedCycle(FixedCyclePolicy::from_config(config)),
			PolicyKind::ExplicitTimestamps => {
				WindowPolicy::ExplicitTimestamps(ExplicitTimestampPolicy::from_config(config))
			}
		}
	}

	pub fn evaluate(&self, input: &WindowInput<'_>) -> FetchWindow {
		if let Some(window) = input.pending_listing() {
			return window;
		}

		match self {
			WindowPolicy::Generic(policy) => policy.evaluate(input),
			WindowPolicy::FixedCycle(policy) => policy.evaluate(input),
			WindowPolicy::ExplicitTimestamps(policy) => policy.evaluate(input),
		}
	}

	/// How many of the most recent records the loop reads before evaluating.
	pub fn anchor_depth(&self) -> usize {
		match self {
			WindowPolicy::FixedCycle(_) => 2,
			_ => 1,
		}
	}

	pub fn needs_calendar(&self) -> bool {
		matches!(self, WindowPolicy::FixedCycle(_))
	}

	pub fn name(&self) -> &'static str {
		match self {
			WindowPolicy::Generic(_) => "generic",
			WindowPolicy::FixedCycle(_) => "fixed-cycle",
			WindowPolicy::ExplicitTimestamps(_) => "explicit-timestamps",
		}
	}
}
