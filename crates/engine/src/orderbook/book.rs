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

//! Core order book: price ladders, order index and the matching loop.
//!
//! All book state lives behind one mutex. Public operations lock it for
//! their full duration and complete synchronously on the caller's thread,
//! so operations execute in a single total order and price-time priority
//! is never violated by interleaving. The only background activity is the
//! day-order expiry thread, which shares the same mutex and condvar.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use slab::Slab;
use tracing::{debug, trace};

use super::expiry;
use super::level::{OrderNode, PriceLevel};
use crate::types::{
	LevelInfo, MAX_PRICE, MIN_PRICE, Order, OrderId, OrderType, OrderbookSnapshot, Price, Quantity,
	RejectReason, Side, Trade, TradeSide,
};

/// State shared between the public operations and the expiry thread.
pub(super) struct Shared {
	pub(super) state: Mutex<BookState>,
	pub(super) shutdown_signal: Condvar,
	pub(super) shutdown: AtomicBool,
}

/// The book proper. Everything here is guarded by [`Shared::state`].
///
/// Orders live in a slab arena; the slab key is the order's handle, held
/// by the id index and threaded into the order's price-level queue. The
/// handle stays valid across unrelated insertions and removals, which is
/// what makes cancellation O(1).
#[derive(Default)]
pub(super) struct BookState {
	arena: Slab<OrderNode>,
	/// Bid ladder. Natural ascending key order; the best bid is the last key.
	bids: BTreeMap<Price, PriceLevel>,
	/// Ask ladder. The best ask is the first key.
	asks: BTreeMap<Price, PriceLevel>,
	index: HashMap<OrderId, usize>,
	/// Active good-for-day order ids, so expiry never scans the ladders.
	day_orders: HashSet<OrderId>,
}

impl BookState {
	/// Admit and match one order. Returns the trades produced, or the
	/// reason the order was turned away with the book untouched.
	fn add(&mut self, mut order: Order) -> Result<Vec<Trade>, RejectReason> {
		if order.initial_quantity() == 0 {
			return Err(RejectReason::ZeroQuantity);
		}
		if order.order_type() != OrderType::Market
			&& !(MIN_PRICE..=MAX_PRICE).contains(&order.price())
		{
			return Err(RejectReason::PriceOutOfBounds(order.price()));
		}
		if self.index.contains_key(&order.id()) {
			return Err(RejectReason::DuplicateOrderId(order.id()));
		}

		// A market order is re-priced to the worst level resting on the
		// opposite side, which makes it cross every resting contra order,
		// and from there on behaves as good-till-cancel.
		if order.order_type() == OrderType::Market {
			let worst_contra = match order.side() {
				Side::Buy => self.asks.keys().next_back().copied(),
				Side::Sell => self.bids.keys().next().copied(),
			};
			match worst_contra {
				Some(price) => order.to_good_till_cancel(price),
				None => return Err(RejectReason::NoOppositeLiquidity),
			}
		}

		match order.order_type() {
			OrderType::FillAndKill
				if !self.can_match(order.side(), order.price()) =>
			{
				return Err(RejectReason::Uncrossable);
			}
			OrderType::FillOrKill
				if !self.can_fully_fill(order.side(), order.price(), order.initial_quantity()) =>
			{
				return Err(RejectReason::NotFullyFillable);
			}
			_ => {}
		}

		if order.order_type() == OrderType::GoodForDay {
			self.day_orders.insert(order.id());
		}

		let order_id = order.id();
		let side = order.side();
		let price = order.price();
		let idx = self.arena.insert(OrderNode::new(order));
		self.index.insert(order_id, idx);
		let ladder = match side {
			Side::Buy => &mut self.bids,
			Side::Sell => &mut self.asks,
		};
		ladder.entry(price).or_default().push_back(&mut self.arena, idx);
		trace!(order_id, ?side, price, "order admitted");

		Ok(self.match_orders())
	}

	/// Replace an order's side, price and quantity, keeping its id and
	/// original type, then re-run admission and matching for it.
	fn modify(
		&mut self,
		order_id: OrderId,
		side: Side,
		price: Price,
		quantity: Quantity,
	) -> Result<Vec<Trade>, RejectReason> {
		let Some(&idx) = self.index.get(&order_id) else {
			return Err(RejectReason::UnknownOrderId(order_id));
		};
		// A market order never rests, so the stored type is never Market.
		let order_type = self.arena[idx].order.order_type();

		self.remove_resting(order_id);
		self.add(Order::new(order_type, order_id, side, price, quantity))
	}

	/// Whether an order on `side` at `price` would cross the opposite best.
	fn can_match(&self, side: Side, price: Price) -> bool {
		match side {
			Side::Buy => self
				.asks
				.keys()
				.next()
				.is_some_and(|&best_ask| price >= best_ask),
			Side::Sell => self
				.bids
				.keys()
				.next_back()
				.is_some_and(|&best_bid| price <= best_bid),
		}
	}

	/// Whether `quantity` can be filled in full within the order's price
	/// limit. Walks the contra ladder from its best level, summing level
	/// aggregates until the requirement is covered or prices stop being
	/// acceptable.
	fn can_fully_fill(&self, side: Side, price: Price, quantity: Quantity) -> bool {
		if !self.can_match(side, price) {
			return false;
		}

		let mut needed = u64::from(quantity);
		match side {
			Side::Buy => {
				for (&level_price, level) in &self.asks {
					if level_price > price {
						break;
					}
					if needed <= level.total_quantity() {
						return true;
					}
					needed -= level.total_quantity();
				}
			}
			Side::Sell => {
				for (&level_price, level) in self.bids.iter().rev() {
					if level_price < price {
						break;
					}
					if needed <= level.total_quantity() {
						return true;
					}
					needed -= level.total_quantity();
				}
			}
		}
		false
	}

	/// Drain crossable top-of-book pairs until the book uncrosses.
	///
	/// Each iteration fills the head of the best bid level against the
	/// head of the best ask level for the minimum of their remainders, so
	/// at least one of the two leaves the book per iteration. Emitted
	/// trades carry each side's resting price.
	fn match_orders(&mut self) -> Vec<Trade> {
		let mut trades = Vec::new();

		loop {
			let Some(bid_price) = self.bids.keys().next_back().copied() else {
				break;
			};
			let Some(ask_price) = self.asks.keys().next().copied() else {
				break;
			};
			if bid_price < ask_price {
				break;
			}

			while let (Some(bid_idx), Some(ask_idx)) = (
				self.bids.get(&bid_price).and_then(|level| level.head()),
				self.asks.get(&ask_price).and_then(|level| level.head()),
			) {
				let bid_order = &self.arena[bid_idx].order;
				let ask_order = &self.arena[ask_idx].order;
				let quantity = bid_order
					.remaining_quantity()
					.min(ask_order.remaining_quantity());

				trades.push(Trade {
					bid: TradeSide {
						order_id: bid_order.id(),
						price: bid_order.price(),
						quantity,
					},
					ask: TradeSide {
						order_id: ask_order.id(),
						price: ask_order.price(),
						quantity,
					},
				});

				self.fill_resting(bid_idx, quantity);
				self.fill_resting(ask_idx, quantity);
			}
		}

		self.cancel_fill_and_kill_heads();

		trades
	}

	/// Apply a fill to a resting order and keep the level aggregates in
	/// step; a fully filled order is popped from its level and dropped
	/// from the index, and an emptied level leaves its ladder.
	fn fill_resting(&mut self, idx: usize, quantity: Quantity) {
		self.arena[idx].order.fill(quantity);

		let (order_id, side, price, filled) = {
			let order = &self.arena[idx].order;
			(order.id(), order.side(), order.price(), order.is_filled())
		};

		let ladder = match side {
			Side::Buy => &mut self.bids,
			Side::Sell => &mut self.asks,
		};
		let level = ladder
			.get_mut(&price)
			.expect("resting order points at a missing price level");
		level.reduce(quantity);

		if filled {
			level.unlink(&mut self.arena, idx);
			if level.is_empty() {
				ladder.remove(&price);
			}
			self.arena.remove(idx);
			self.index.remove(&order_id);
			self.day_orders.remove(&order_id);
		}
	}

	/// A fill-and-kill order that survives matching holds an unfilled
	/// remainder which must not rest. Admission guarantees such an order
	/// can only sit at the head of its ladder's best level, so inspecting
	/// the two heads suffices.
	fn cancel_fill_and_kill_heads(&mut self) {
		let heads = [
			self.bids.values().next_back().and_then(|level| level.head()),
			self.asks.values().next().and_then(|level| level.head()),
		];
		for idx in heads.into_iter().flatten() {
			if self.arena[idx].order.order_type() == OrderType::FillAndKill {
				let order_id = self.arena[idx].order.id();
				self.remove_resting(order_id);
			}
		}
	}

	/// Remove an order from the index, its price level and the day-order
	/// set in one step. No-op when the id is not active.
	pub(super) fn remove_resting(&mut self, order_id: OrderId) -> Option<Order> {
		let idx = self.index.remove(&order_id)?;
		let (side, price) = {
			let order = &self.arena[idx].order;
			(order.side(), order.price())
		};

		let ladder = match side {
			Side::Buy => &mut self.bids,
			Side::Sell => &mut self.asks,
		};
		let level = ladder
			.get_mut(&price)
			.expect("resting order points at a missing price level");
		level.unlink(&mut self.arena, idx);
		if level.is_empty() {
			ladder.remove(&price);
		}

		self.day_orders.remove(&order_id);
		Some(self.arena.remove(idx).order)
	}

	/// Cancel every active good-for-day order. Returns how many went.
	pub(super) fn expire_day_orders(&mut self) -> usize {
		let expired: Vec<OrderId> = self.day_orders.iter().copied().collect();
		let count = expired.len();
		for order_id in expired {
			self.remove_resting(order_id);
		}
		count
	}

	fn snapshot(&self) -> OrderbookSnapshot {
		OrderbookSnapshot {
			bids: self
				.bids
				.iter()
				.rev()
				.map(|(&price, level)| LevelInfo {
					price,
					quantity: level.total_quantity(),
				})
				.collect(),
			asks: self
				.asks
				.iter()
				.map(|(&price, level)| LevelInfo {
					price,
					quantity: level.total_quantity(),
				})
				.collect(),
		}
	}

	/// Walk every structure and check they agree: each indexed handle
	/// dereferences into its side's ladder at its stored price, level
	/// aggregates match their queues, no filled order rests, and the book
	/// is not crossed.
	#[cfg(any(test, debug_assertions))]
	pub(super) fn assert_consistent(&self) {
		let mut reachable = 0usize;
		for (ladder, side) in [(&self.bids, Side::Buy), (&self.asks, Side::Sell)] {
			for (&price, level) in ladder {
				assert!(!level.is_empty(), "empty level left in ladder at {price}");
				let mut count = 0usize;
				let mut quantity = 0u64;
				let mut cursor = level.head();
				while let Some(idx) = cursor {
					let node = &self.arena[idx];
					assert_eq!(node.order.side(), side);
					assert_eq!(node.order.price(), price);
					assert_ne!(
						node.order.remaining_quantity(),
						0,
						"filled order resting in book"
					);
					assert_eq!(self.index.get(&node.order.id()), Some(&idx));
					count += 1;
					quantity += u64::from(node.order.remaining_quantity());
					cursor = node.next();
					reachable += 1;
				}
				assert_eq!(count, level.order_count());
				assert_eq!(quantity, level.total_quantity());
			}
		}
		assert_eq!(reachable, self.index.len());

		if let (Some(&best_bid), Some(&best_ask)) =
			(self.bids.keys().next_back(), self.asks.keys().next())
		{
			assert!(
				best_bid < best_ask,
				"book left crossed: bid {best_bid} >= ask {best_ask}"
			);
		}

		for order_id in &self.day_orders {
			assert!(self.index.contains_key(order_id));
		}
	}
}

/// Thread-safe limit order book for a single instrument.
///
/// Owns the day-order expiry thread for its whole lifetime; dropping the
/// book signals shutdown and joins it.
pub struct Orderbook {
	shared: Arc<Shared>,
	expiry_thread: Option<JoinHandle<()>>,
}

impl Orderbook {
	pub fn new() -> Self {
		let shared = Arc::new(Shared {
			state: Mutex::new(BookState::default()),
			shutdown_signal: Condvar::new(),
			shutdown: AtomicBool::new(false),
		});
		let expiry_thread = expiry::spawn(Arc::clone(&shared));

		Self {
			shared,
			expiry_thread: Some(expiry_thread),
		}
	}

	/// Submit an order. Returns the trades it produced, possibly none.
	///
	/// An order that fails validation or its type's admission policy is
	/// rejected silently: the result is empty and the book is unchanged.
	/// Rejection is observable only through subsequent queries.
	pub fn add_order(&self, order: Order) -> Vec<Trade> {
		let order_id = order.id();
		let mut state = self.shared.state.lock().unwrap();
		let trades = match state.add(order) {
			Ok(trades) => trades,
			Err(reason) => {
				debug!(order_id, %reason, "order rejected");
				Vec::new()
			}
		};
		#[cfg(debug_assertions)]
		state.assert_consistent();
		trades
	}

	/// Cancel by id. Idempotent; cancelling an unknown id does nothing.
	pub fn cancel_order(&self, order_id: OrderId) {
		let mut state = self.shared.state.lock().unwrap();
		if state.remove_resting(order_id).is_some() {
			trace!(order_id, "order cancelled");
		}
		#[cfg(debug_assertions)]
		state.assert_consistent();
	}

	/// Cancel-and-re-add under one lock acquisition: the replacement
	/// keeps the id and the original order type and goes to the back of
	/// its new price level's queue. Empty result when the id is unknown.
	pub fn modify_order(
		&self,
		order_id: OrderId,
		side: Side,
		price: Price,
		quantity: Quantity,
	) -> Vec<Trade> {
		let mut state = self.shared.state.lock().unwrap();
		let trades = match state.modify(order_id, side, price, quantity) {
			Ok(trades) => trades,
			Err(reason) => {
				debug!(order_id, %reason, "modify rejected");
				Vec::new()
			}
		};
		#[cfg(debug_assertions)]
		state.assert_consistent();
		trades
	}

	/// Aggregated depth of both ladders at one serialized point in time.
	pub fn snapshot(&self) -> OrderbookSnapshot {
		self.shared.state.lock().unwrap().snapshot()
	}

	/// Number of resting orders.
	pub fn size(&self) -> usize {
		self.shared.state.lock().unwrap().index.len()
	}

	pub fn order_exists(&self, order_id: OrderId) -> bool {
		self.shared.state.lock().unwrap().index.contains_key(&order_id)
	}

	pub fn best_bid(&self) -> Option<Price> {
		self.shared.state.lock().unwrap().bids.keys().next_back().copied()
	}

	pub fn best_ask(&self) -> Option<Price> {
		self.shared.state.lock().unwrap().asks.keys().next().copied()
	}
}

impl Default for Orderbook {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Orderbook {
	fn drop(&mut self) {
		// Set the flag while holding the mutex the expiry thread waits
		// on, so the thread observes it either before entering its timed
		// wait or via the notification, never neither.
		{
			let _state = self.shared.state.lock().unwrap();
			self.shared.shutdown.store(true, AtomicOrdering::Release);
			self.shared.shutdown_signal.notify_all();
		}
		if let Some(handle) = self.expiry_thread.take() {
			let _ = handle.join();
		}
	}
}
