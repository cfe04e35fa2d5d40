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

//! gRPC server for the trading engine
//!
//! Maps the wire protocol onto the order book one-to-one. Order-level
//! rejections never surface as transport errors: the engine rejects
//! silently and the response status says ACCEPTED or REJECTED per the
//! operation's convention. Only malformed requests (unspecified enums)
//! produce a non-OK gRPC status.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::orderbook::Orderbook;
use crate::types::{Order, OrderType, Side, Trade};

// Include generated gRPC code
pub mod proto {
	tonic::include_proto!("crucible.trading");
}

use proto::trading_engine_server::{TradingEngine, TradingEngineServer};
use proto::{
	CancelOrderRequest, CancelOrderResponse, Level, ModifyOrderRequest, OrderRequest,
	OrderStatus as ProtoOrderStatus, OrderType as ProtoOrderType, OrderbookRequest,
	OrderbookResponse, Side as ProtoSide, Trade as ProtoTrade, TradeInfo, TradeResponse,
};

/// Trading engine service implementation
pub struct TradingEngineService {
	book: Arc<Orderbook>,
}

impl TradingEngineService {
	pub fn new(book: Arc<Orderbook>) -> Self {
		Self { book }
	}
}

fn parse_side(side: ProtoSide) -> Result<Side, Status> {
	match side {
		ProtoSide::Buy => Ok(Side::Buy),
		ProtoSide::Sell => Ok(Side::Sell),
		ProtoSide::Unspecified => Err(Status::invalid_argument("side must be specified")),
	}
}

fn parse_order_type(order_type: ProtoOrderType) -> Result<OrderType, Status> {
	match order_type {
		ProtoOrderType::GoodTillCancel => Ok(OrderType::GoodTillCancel),
		ProtoOrderType::GoodForDay => Ok(OrderType::GoodForDay),
		ProtoOrderType::Market => Ok(OrderType::Market),
		ProtoOrderType::FillAndKill => Ok(OrderType::FillAndKill),
		ProtoOrderType::FillOrKill => Ok(OrderType::FillOrKill),
		ProtoOrderType::Unspecified => {
			Err(Status::invalid_argument("order type must be specified"))
		}
	}
}

fn to_proto_trade(trade: &Trade) -> ProtoTrade {
	ProtoTrade {
		bid: Some(TradeInfo {
			order_id: trade.bid.order_id,
			price: trade.bid.price,
			quantity: trade.bid.quantity,
		}),
		ask: Some(TradeInfo {
			order_id: trade.ask.order_id,
			price: trade.ask.price,
			quantity: trade.ask.quantity,
		}),
	}
}

/// FILLED with the trade records when matching produced any, ACCEPTED
/// otherwise.
fn trade_response(trades: &[Trade]) -> TradeResponse {
	let status = if trades.is_empty() {
		ProtoOrderStatus::Accepted
	} else {
		ProtoOrderStatus::Filled
	};

	TradeResponse {
		status: status as i32,
		trades: trades.iter().map(to_proto_trade).collect(),
	}
}

#[tonic::async_trait]
impl TradingEngine for TradingEngineService {
	async fn add_order(
		&self,
		request: Request<OrderRequest>,
	) -> Result<Response<TradeResponse>, Status> {
		let req = request.into_inner();

		let side = parse_side(req.side())?;
		let order = match parse_order_type(req.order_type())? {
			// Market orders carry no meaningful price; the engine assigns
			// one on admission.
			OrderType::Market => Order::market(req.order_id, side, req.quantity),
			order_type => Order::new(order_type, req.order_id, side, req.price, req.quantity),
		};

		let trades = self.book.add_order(order);

		Ok(Response::new(trade_response(&trades)))
	}

	async fn cancel_order(
		&self,
		request: Request<CancelOrderRequest>,
	) -> Result<Response<CancelOrderResponse>, Status> {
		let req = request.into_inner();

		self.book.cancel_order(req.order_id);

		// Cancel is idempotent, so success is unconditional.
		Ok(Response::new(CancelOrderResponse {
			success: true,
			order_id: req.order_id,
		}))
	}

	async fn modify_order(
		&self,
		request: Request<ModifyOrderRequest>,
	) -> Result<Response<TradeResponse>, Status> {
		let req = request.into_inner();

		if !self.book.order_exists(req.order_id) {
			return Ok(Response::new(TradeResponse {
				status: ProtoOrderStatus::Rejected as i32,
				trades: Vec::new(),
			}));
		}

		let side = parse_side(req.side())?;
		let trades = self
			.book
			.modify_order(req.order_id, side, req.new_price, req.new_quantity);

		Ok(Response::new(trade_response(&trades)))
	}

	async fn get_orderbook(
		&self,
		_request: Request<OrderbookRequest>,
	) -> Result<Response<OrderbookResponse>, Status> {
		let snapshot = self.book.snapshot();

		let to_level = |info: &crate::types::LevelInfo| Level {
			price: info.price,
			quantity: info.quantity,
		};

		Ok(Response::new(OrderbookResponse {
			bids: snapshot.bids.iter().map(to_level).collect(),
			asks: snapshot.asks.iter().map(to_level).collect(),
		}))
	}
}

/// Create the trading engine gRPC server
pub fn create_server(book: Arc<Orderbook>) -> TradingEngineServer<TradingEngineService> {
	TradingEngineServer::new(TradingEngineService::new(book))
}
