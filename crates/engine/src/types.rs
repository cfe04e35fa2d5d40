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

use serde::{Deserialize, Serialize};

/// Price in venue increments. Signed so spread arithmetic never underflows.
pub type Price = i32;

/// Order quantity in whole units.
pub type Quantity = u32;

/// Order identifier, unique across one book's lifetime.
pub type OrderId = u64;

/// Inclusive price bounds accepted for non-market orders.
pub const MIN_PRICE: Price = 0;
pub const MAX_PRICE: Price = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	pub fn opposite(self) -> Side {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}
}

/// Time-in-force and execution policy of an order.
///
/// `Market` is transient: on admission the engine re-prices a market order
/// to the worst price resting on the opposite side and converts it to
/// `GoodTillCancel`, which guarantees it crosses everything resting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
	GoodTillCancel,
	GoodForDay,
	Market,
	FillAndKill,
	FillOrKill,
}

/// A single order: immutable identity plus mutable execution state.
///
/// `remaining_quantity` only ever decreases, through [`Order::fill`]. The
/// order type changes at most once, when a market order is re-priced on
/// admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	order_id: OrderId,
	order_type: OrderType,
	side: Side,
	price: Price,
	initial_quantity: Quantity,
	remaining_quantity: Quantity,
}

impl Order {
	pub fn new(
		order_type: OrderType,
		order_id: OrderId,
		side: Side,
		price: Price,
		quantity: Quantity,
	) -> Self {
		Self {
			order_id,
			order_type,
			side,
			price,
			initial_quantity: quantity,
			remaining_quantity: quantity,
		}
	}

	/// Create a market order. The price is a placeholder until the engine
	/// assigns one on admission.
	pub fn market(order_id: OrderId, side: Side, quantity: Quantity) -> Self {
		Self::new(OrderType::Market, order_id, side, 0, quantity)
	}

	pub fn id(&self) -> OrderId {
		self.order_id
	}

	pub fn side(&self) -> Side {
		self.side
	}

	pub fn order_type(&self) -> OrderType {
		self.order_type
	}

	pub fn price(&self) -> Price {
		self.price
	}

	pub fn initial_quantity(&self) -> Quantity {
		self.initial_quantity
	}

	pub fn remaining_quantity(&self) -> Quantity {
		self.remaining_quantity
	}

	pub fn filled_quantity(&self) -> Quantity {
		self.initial_quantity - self.remaining_quantity
	}

	pub fn is_filled(&self) -> bool {
		self.remaining_quantity == 0
	}

	/// Execute `quantity` units against this order.
	///
	/// # Panics
	///
	/// Panics if `quantity` exceeds the remaining quantity. Callers are
	/// expected to clamp fills to `remaining_quantity`; exceeding it is a
	/// bug, not an input error.
	pub(crate) fn fill(&mut self, quantity: Quantity) {
		assert!(
			quantity <= self.remaining_quantity,
			"order {} cannot be filled for more than its remaining quantity",
			self.order_id
		);
		self.remaining_quantity -= quantity;
	}

	/// Re-price a market order and convert it to `GoodTillCancel`.
	///
	/// # Panics
	///
	/// Panics if the order is not a market order; nothing else may be
	/// re-priced.
	pub(crate) fn to_good_till_cancel(&mut self, price: Price) {
		assert!(
			self.order_type == OrderType::Market,
			"order {} cannot have its price adjusted, only market orders can",
			self.order_id
		);
		self.price = price;
		self.order_type = OrderType::GoodTillCancel;
	}
}

/// One side of an executed trade: the resting order's id, the price at
/// which it was resting when the cross happened, and the filled quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSide {
	pub order_id: OrderId,
	pub price: Price,
	pub quantity: Quantity,
}

/// Record of a single match. The quantity is equal on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
	pub bid: TradeSide,
	pub ask: TradeSide,
}

/// Aggregated depth at one price: the sum of remaining quantities of all
/// orders resting there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
	pub price: Price,
	pub quantity: u64,
}

/// Point-in-time view of both ladders, bids descending and asks ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
	pub bids: Vec<LevelInfo>,
	pub asks: Vec<LevelInfo>,
}

/// Why an order was not admitted to the book.
///
/// Rejections are silent at the public API (an empty trade list, book
/// unchanged); this type exists for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
	#[error("order id {0} is already active")]
	DuplicateOrderId(OrderId),
	#[error("order id {0} is not active")]
	UnknownOrderId(OrderId),
	#[error("quantity must be positive")]
	ZeroQuantity,
	#[error("price {0} is outside venue bounds")]
	PriceOutOfBounds(Price),
	#[error("market order has no opposite liquidity")]
	NoOppositeLiquidity,
	#[error("fill-and-kill order cannot match at its limit")]
	Uncrossable,
	#[error("fill-or-kill order cannot be fully filled")]
	NotFullyFillable,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_fill_decrements_remaining() {
		let mut order = Order::new(OrderType::GoodTillCancel, 1, Side::Buy, 100, 10);
		order.fill(4);
		assert_eq!(order.remaining_quantity(), 6);
		assert_eq!(order.filled_quantity(), 4);
		assert!(!order.is_filled());

		order.fill(6);
		assert!(order.is_filled());
		assert_eq!(order.initial_quantity(), 10);
	}

	#[test]
	#[should_panic(expected = "more than its remaining quantity")]
	fn test_overfill_panics() {
		let mut order = Order::new(OrderType::GoodTillCancel, 1, Side::Buy, 100, 10);
		order.fill(11);
	}

	#[test]
	fn test_market_promotion() {
		let mut order = Order::market(7, Side::Sell, 5);
		order.to_good_till_cancel(42);
		assert_eq!(order.order_type(), OrderType::GoodTillCancel);
		assert_eq!(order.price(), 42);
		assert_eq!(order.remaining_quantity(), 5);
	}

	#[test]
	#[should_panic(expected = "only market orders")]
	fn test_promotion_of_limit_order_panics() {
		let mut order = Order::new(OrderType::GoodForDay, 7, Side::Sell, 10, 5);
		order.to_good_till_cancel(42);
	}

	#[test]
	fn test_side_opposite() {
		assert_eq!(Side::Buy.opposite(), Side::Sell);
		assert_eq!(Side::Sell.opposite(), Side::Buy);
	}
}
