// Copyright 2025 chenjjiaa
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Day-order expiry.
//!
//! A dedicated thread sleeps until the next daily session close and then
//! cancels every active good-for-day order. The wait is a condvar timed
//! wait on the book mutex, so the lock is released while sleeping and the
//! shutdown notification interrupts the wait immediately. The deadline is
//! recomputed every iteration, which also absorbs system clock jumps.

use std::sync::Arc;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Timelike};
use tracing::info;

use super::book::Shared;

/// Local hour at which good-for-day orders stop resting.
const SESSION_CLOSE_HOUR: u32 = 16;

/// Extra sleep so a wake-up never lands just before the cutoff.
const WAKE_SLACK: Duration = Duration::from_millis(100);

pub(super) fn spawn(shared: Arc<Shared>) -> thread::JoinHandle<()> {
	thread::Builder::new()
		.name("day-order-expiry".to_string())
		.spawn(move || run(shared))
		.expect("Failed to spawn day-order expiry thread")
}

fn run(shared: Arc<Shared>) {
	loop {
		let now = Local::now();
		let deadline = next_session_close(now);
		let wait = (deadline - now).to_std().unwrap_or(Duration::ZERO) + WAKE_SLACK;

		// The flag is checked under the same mutex the wait releases, so
		// a shutdown signalled at any point either turns up here or wakes
		// the wait; it cannot fall between the two.
		let state = shared.state.lock().unwrap();
		if shared.shutdown.load(AtomicOrdering::Acquire) {
			return;
		}
		let (mut state, result) = shared
			.shutdown_signal
			.wait_timeout(state, wait)
			.unwrap();

		if shared.shutdown.load(AtomicOrdering::Acquire) {
			return;
		}
		if !result.timed_out() {
			// Spurious wake-up: recompute the deadline and wait again.
			continue;
		}

		let expired = state.expire_day_orders();
		if expired > 0 {
			info!(expired, "cancelled day orders at session close");
		}
	}
}

/// The next occurrence of the daily cutoff, strictly after `now`.
///
/// Around DST transitions the local cutoff can be ambiguous or missing;
/// an ambiguous time resolves to its earliest instant and a missing one
/// falls back to a full day from now.
fn next_session_close(now: DateTime<Local>) -> DateTime<Local> {
	let mut date = now.date_naive();
	if now.hour() >= SESSION_CLOSE_HOUR {
		date = date.succ_opt().unwrap_or(date);
	}
	date.and_hms_opt(SESSION_CLOSE_HOUR, 0, 0)
		.and_then(|cutoff| cutoff.and_local_timezone(Local).earliest())
		.unwrap_or_else(|| now + TimeDelta::days(1))
}
