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

//! End-to-end order book scenarios through the public API
//!
//! These tests verify:
//! - Price-time priority across matching
//! - Order-type admission policies (market, FAK, FOK, GFD)
//! - Cancel and modify semantics
//! - Snapshot consistency

use std::sync::Arc;
use std::thread;

use crucible_engine::{LevelInfo, Order, OrderId, Orderbook, OrderType, Price, Quantity, Side};

fn gtc(id: OrderId, side: Side, price: Price, quantity: Quantity) -> Order {
	Order::new(OrderType::GoodTillCancel, id, side, price, quantity)
}

#[test]
fn test_empty_book() {
	let book = Orderbook::new();

	assert_eq!(book.size(), 0);
	let snapshot = book.snapshot();
	assert!(snapshot.bids.is_empty());
	assert!(snapshot.asks.is_empty());
	assert_eq!(book.best_bid(), None);
	assert_eq!(book.best_ask(), None);
}

#[test]
fn test_resting_order_is_visible() {
	let book = Orderbook::new();

	let trades = book.add_order(gtc(1, Side::Sell, 200, 500));
	assert!(trades.is_empty());
	assert_eq!(book.size(), 1);
	assert!(book.order_exists(1));
	assert_eq!(
		book.snapshot().asks,
		vec![LevelInfo {
			price: 200,
			quantity: 500
		}]
	);
}

#[test]
fn test_partial_fill_leaves_remainder_resting() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 100, 1000));
	let trades = book.add_order(gtc(2, Side::Sell, 100, 500));

	assert_eq!(trades.len(), 1);
	assert_eq!(trades[0].bid.order_id, 1);
	assert_eq!(trades[0].bid.price, 100);
	assert_eq!(trades[0].bid.quantity, 500);
	assert_eq!(trades[0].ask.order_id, 2);
	assert_eq!(trades[0].ask.price, 100);
	assert_eq!(trades[0].ask.quantity, 500);

	assert_eq!(book.size(), 1);
	let snapshot = book.snapshot();
	assert_eq!(
		snapshot.bids,
		vec![LevelInfo {
			price: 100,
			quantity: 500
		}]
	);
	assert!(snapshot.asks.is_empty());
}

#[test]
fn test_highest_bid_matches_first() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 100, 1000));
	book.add_order(gtc(2, Side::Buy, 110, 500));
	book.add_order(gtc(3, Side::Buy, 90, 800));

	let trades = book.add_order(gtc(4, Side::Sell, 100, 200));

	assert_eq!(trades.len(), 1);
	assert_eq!(trades[0].bid.order_id, 2);
	assert_eq!(trades[0].bid.price, 110);
	assert_eq!(trades[0].bid.quantity, 200);
	assert_eq!(trades[0].ask.order_id, 4);
}

#[test]
fn test_time_priority_within_level() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 100));
	book.add_order(gtc(2, Side::Sell, 200, 100));
	book.add_order(gtc(3, Side::Sell, 200, 100));

	let trades = book.add_order(gtc(4, Side::Buy, 200, 300));

	assert_eq!(trades.len(), 3);
	assert_eq!(
		trades.iter().map(|t| t.ask.order_id).collect::<Vec<_>>(),
		vec![1, 2, 3]
	);
	assert_eq!(book.size(), 0);
}

#[test]
fn test_sweep_reports_each_resting_price() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 300));
	book.add_order(gtc(2, Side::Sell, 210, 300));
	let trades = book.add_order(gtc(3, Side::Buy, 210, 600));

	assert_eq!(trades.len(), 2);
	assert_eq!(trades[0].ask.price, 200);
	assert_eq!(trades[1].ask.price, 210);
	assert!(trades.iter().all(|t| t.bid.price == 210));
	assert_eq!(book.size(), 0);
}

#[test]
fn test_fill_and_kill_remainder_does_not_rest() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 300));
	let trades = book.add_order(Order::new(OrderType::FillAndKill, 2, Side::Buy, 200, 500));

	assert_eq!(trades.len(), 1);
	assert_eq!(trades[0].ask.quantity, 300);
	assert_eq!(book.size(), 0);
	assert!(!book.order_exists(2));
}

#[test]
fn test_fill_and_kill_uncrossable_is_rejected() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 300));
	let trades = book.add_order(Order::new(OrderType::FillAndKill, 2, Side::Buy, 199, 500));

	assert!(trades.is_empty());
	assert_eq!(book.size(), 1);
	assert!(!book.order_exists(2));
}

#[test]
fn test_fill_or_kill_rejects_partial_availability() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 300));
	let trades = book.add_order(Order::new(OrderType::FillOrKill, 2, Side::Buy, 200, 500));

	assert!(trades.is_empty());
	assert_eq!(book.size(), 1);
	assert_eq!(
		book.snapshot().asks,
		vec![LevelInfo {
			price: 200,
			quantity: 300
		}]
	);
}

#[test]
fn test_fill_or_kill_boundary_one_unit() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 300));

	// One unit over the crossable quantity: rejected, book unchanged.
	let trades = book.add_order(Order::new(OrderType::FillOrKill, 2, Side::Buy, 200, 301));
	assert!(trades.is_empty());
	assert_eq!(book.size(), 1);

	// Exactly the crossable quantity: filled in full.
	let trades = book.add_order(Order::new(OrderType::FillOrKill, 3, Side::Buy, 200, 300));
	assert_eq!(trades.len(), 1);
	assert_eq!(trades[0].ask.quantity, 300);
	assert_eq!(book.size(), 0);
}

#[test]
fn test_fill_or_kill_spans_levels_within_limit() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 300));
	book.add_order(gtc(2, Side::Sell, 205, 300));

	let trades = book.add_order(Order::new(OrderType::FillOrKill, 3, Side::Buy, 205, 600));
	assert_eq!(trades.len(), 2);
	assert_eq!(book.size(), 0);
}

#[test]
fn test_market_order_sweeps_from_best_price() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 500));
	book.add_order(gtc(2, Side::Sell, 210, 300));

	let trades = book.add_order(Order::market(3, Side::Buy, 400));

	assert_eq!(trades.len(), 1);
	assert_eq!(trades[0].ask.order_id, 1);
	assert_eq!(trades[0].ask.price, 200);
	assert_eq!(trades[0].ask.quantity, 400);
	assert_eq!(book.size(), 2);
}

#[test]
fn test_market_order_against_empty_book_is_rejected() {
	let book = Orderbook::new();

	let trades = book.add_order(Order::market(1, Side::Buy, 400));
	assert!(trades.is_empty());
	assert_eq!(book.size(), 0);

	let trades = book.add_order(Order::market(2, Side::Sell, 400));
	assert!(trades.is_empty());
	assert_eq!(book.size(), 0);
}

#[test]
fn test_market_remainder_rests_at_promoted_price() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 300));
	let trades = book.add_order(Order::market(2, Side::Buy, 500));

	assert_eq!(trades.len(), 1);
	// The unfilled remainder rests as good-till-cancel at the worst ask
	// price it was promoted to.
	assert_eq!(book.size(), 1);
	assert_eq!(
		book.snapshot().bids,
		vec![LevelInfo {
			price: 200,
			quantity: 200
		}]
	);
}

#[test]
fn test_duplicate_id_is_silently_ignored() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 100, 500));
	let trades = book.add_order(gtc(1, Side::Sell, 200, 300));

	assert!(trades.is_empty());
	assert_eq!(book.size(), 1);
	assert!(book.snapshot().asks.is_empty());
}

#[test]
fn test_zero_quantity_is_rejected() {
	let book = Orderbook::new();

	let trades = book.add_order(gtc(1, Side::Buy, 100, 0));
	assert!(trades.is_empty());
	assert_eq!(book.size(), 0);
}

#[test]
fn test_cancel_is_idempotent() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 100, 500));
	book.cancel_order(1);
	assert_eq!(book.size(), 0);

	// Cancelling again, or cancelling an id that never existed, is a no-op.
	book.cancel_order(1);
	book.cancel_order(99);
	assert_eq!(book.size(), 0);
}

#[test]
fn test_cancel_removes_empty_level() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 100, 500));
	book.add_order(gtc(2, Side::Buy, 100, 300));
	book.cancel_order(1);

	assert_eq!(
		book.snapshot().bids,
		vec![LevelInfo {
			price: 100,
			quantity: 300
		}]
	);

	book.cancel_order(2);
	assert!(book.snapshot().bids.is_empty());
}

#[test]
fn test_modify_reprices_without_trades() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 100, 1000));
	let trades = book.modify_order(1, Side::Buy, 110, 500);

	assert!(trades.is_empty());
	assert_eq!(
		book.snapshot().bids,
		vec![LevelInfo {
			price: 110,
			quantity: 500
		}]
	);
}

#[test]
fn test_modify_can_trigger_matching() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 100, 500));
	book.add_order(gtc(2, Side::Sell, 200, 500));

	let trades = book.modify_order(1, Side::Buy, 200, 500);
	assert_eq!(trades.len(), 1);
	assert_eq!(trades[0].ask.order_id, 2);
	assert_eq!(book.size(), 0);
}

#[test]
fn test_modify_unknown_id_does_nothing() {
	let book = Orderbook::new();

	let trades = book.modify_order(42, Side::Buy, 100, 500);
	assert!(trades.is_empty());
	assert_eq!(book.size(), 0);
}

#[test]
fn test_modify_loses_time_priority() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Sell, 200, 100));
	book.add_order(gtc(2, Side::Sell, 200, 100));
	book.modify_order(1, Side::Sell, 200, 100);

	let trades = book.add_order(gtc(3, Side::Buy, 200, 100));
	assert_eq!(trades[0].ask.order_id, 2);
}

#[test]
fn test_modify_matches_cancel_then_add() {
	let modified = Orderbook::new();
	modified.add_order(gtc(1, Side::Buy, 100, 1000));
	modified.add_order(gtc(2, Side::Sell, 200, 400));
	modified.modify_order(1, Side::Sell, 195, 600);

	let recreated = Orderbook::new();
	recreated.add_order(gtc(1, Side::Buy, 100, 1000));
	recreated.add_order(gtc(2, Side::Sell, 200, 400));
	recreated.cancel_order(1);
	recreated.add_order(gtc(1, Side::Sell, 195, 600));

	assert_eq!(modified.snapshot(), recreated.snapshot());
	assert_eq!(modified.size(), recreated.size());
}

#[test]
fn test_snapshot_grows_under_non_crossing_adds() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 100, 100));
	let before = book.snapshot();

	book.add_order(gtc(2, Side::Buy, 100, 50));
	book.add_order(gtc(3, Side::Buy, 90, 75));
	book.add_order(gtc(4, Side::Sell, 200, 25));
	let after = book.snapshot();

	for level in &before.bids {
		let grown = after
			.bids
			.iter()
			.find(|l| l.price == level.price)
			.map(|l| l.quantity)
			.unwrap_or(0);
		assert!(grown >= level.quantity);
	}
	assert_eq!(after.bids[0].price, 100);
	assert_eq!(after.bids[0].quantity, 150);
	assert_eq!(after.bids[1].price, 90);
}

#[test]
fn test_snapshot_ladder_ordering() {
	let book = Orderbook::new();

	book.add_order(gtc(1, Side::Buy, 90, 10));
	book.add_order(gtc(2, Side::Buy, 110, 10));
	book.add_order(gtc(3, Side::Buy, 100, 10));
	book.add_order(gtc(4, Side::Sell, 210, 10));
	book.add_order(gtc(5, Side::Sell, 200, 10));
	book.add_order(gtc(6, Side::Sell, 220, 10));

	let snapshot = book.snapshot();
	assert_eq!(
		snapshot.bids.iter().map(|l| l.price).collect::<Vec<_>>(),
		vec![110, 100, 90]
	);
	assert_eq!(
		snapshot.asks.iter().map(|l| l.price).collect::<Vec<_>>(),
		vec![200, 210, 220]
	);
}

#[test]
fn test_concurrent_adds_all_rest() {
	let book = Arc::new(Orderbook::new());
	let threads: u64 = 4;
	let per_thread: u64 = 100;

	let handles: Vec<_> = (0..threads)
		.map(|t| {
			let book = Arc::clone(&book);
			thread::spawn(move || {
				for i in 0..per_thread {
					let id = t * per_thread + i + 1;
					// Bid-only traffic keeps matching out of the picture.
					book.add_order(gtc(id, Side::Buy, (id % 50) as i32, 10));
				}
			})
		})
		.collect();

	for handle in handles {
		handle.join().unwrap();
	}

	assert_eq!(book.size(), (threads * per_thread) as usize);
	let total: u64 = book.snapshot().bids.iter().map(|l| l.quantity).sum();
	assert_eq!(total, threads * per_thread * 10);
}

#[test]
fn test_concurrent_cancel_and_query() {
	let book = Arc::new(Orderbook::new());
	for id in 1..=200u64 {
		book.add_order(gtc(id, Side::Sell, 200 + (id % 10) as i32, 5));
	}

	let canceller = {
		let book = Arc::clone(&book);
		thread::spawn(move || {
			for id in 1..=200u64 {
				book.cancel_order(id);
			}
		})
	};
	let reader = {
		let book = Arc::clone(&book);
		thread::spawn(move || {
			for _ in 0..50 {
				let snapshot = book.snapshot();
				// Quantities in one snapshot always agree with a prefix of
				// the cancel sequence.
				let total: u64 = snapshot.asks.iter().map(|l| l.quantity).sum();
				assert!(total <= 1000);
			}
		})
	};

	canceller.join().unwrap();
	reader.join().unwrap();
	assert_eq!(book.size(), 0);
}
