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

//! Crucible Trading Engine
//!
//! This crate provides an in-memory central limit order book for a single
//! instrument: price-time priority matching over good-till-cancel,
//! good-for-day, market, fill-and-kill and fill-or-kill orders, with a
//! gRPC surface for order entry and depth queries.
//!
//! Architecture:
//! - Coarse-grained locking: one mutex serialises all book mutations and
//!   reads, so operations execute in a single total order
//! - Synchronous public operations: add, cancel, modify and snapshot
//!   complete on the caller's thread
//! - Stable order handles: orders live in a slab arena and each price
//!   level is a linked FIFO queue through it, giving O(1) cancellation
//! - One background thread cancels good-for-day orders at the daily
//!   session close

pub mod config;
pub mod logging;
pub mod orderbook;
pub mod server;
pub mod types;

pub use orderbook::Orderbook;
pub use types::{
	LevelInfo, MAX_PRICE, MIN_PRICE, Order, OrderId, OrderType, OrderbookSnapshot, Price, Quantity,
	RejectReason, Side, Trade, TradeSide,
};
