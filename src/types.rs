//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types exchanged between callers and the matching engine:
// incoming orders, resting orders, trades, cancellations and the per-call match result.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Discrete sets of values (Side).                                  |
// | STRUCTS            | Orders, trades, cancellations and match results.                 |
// | SERIALIZATION      | Wire representation (camelCase, decimal strings, unix seconds).  |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque, caller-supplied order identifier. Unique within the live book.
pub type OrderId = String;

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A buy order; rests on the bid side of the book.
    Buy,
    /// A sell order; rests on the ask side of the book.
    Sell,
}

impl Side {
    /// Returns the opposite side, i.e. the side an aggressor matches against.
    #[inline]
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// A limit order submitted by a caller: executes at `price` or better,
/// any remainder rests on the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLimit {
    /// Caller-supplied identifier for the order.
    pub id: OrderId,
    /// Quantity to trade, in base units. Must be positive.
    pub units: Decimal,
    /// Limit price. Must be positive.
    pub price: Decimal,
    /// Side of the order (Buy or Sell).
    pub side: Side,
}

/// A market order submitted by a caller: executes immediately against the best
/// available prices; any unfilled remainder is cancelled, never rested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderMarket {
    /// Caller-supplied identifier for the order.
    pub id: OrderId,
    /// Quantity to trade, in base units. Must be positive.
    pub units: Decimal,
    /// Side of the order (Buy or Sell).
    pub side: Side,
}

/// An order resting on the book. `units` is the remaining (unfilled) quantity
/// and is replaced whole-value when the order is partially consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Caller-supplied identifier for the order.
    pub id: OrderId,
    /// Remaining quantity, in base units.
    pub units: Decimal,
    /// Resting price of the order.
    pub price: Decimal,
    /// Side of the order (Buy or Sell).
    pub side: Side,
}

impl Order {
    /// Quote-denominated volume of the remaining quantity (`units × price`).
    #[inline]
    pub fn volume(&self) -> Decimal {
        self.units * self.price
    }
}

/// One quantity taken from one resting order during a consumption pass,
/// always at the resting order's price.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    /// Identifier of the resting order the quantity was taken from.
    pub order_id: OrderId,
    /// Quantity taken, in base units.
    pub units: Decimal,
    /// The resting order's price (the maker price).
    pub price: Decimal,
}

/// A completed trade between an aggressing and a resting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Identifier of the buying order.
    pub buy_order_id: OrderId,
    /// Identifier of the selling order.
    pub sell_order_id: OrderId,
    /// Quantity traded, in base units.
    pub units: Decimal,
    /// Price at which the trade occurred (the maker's resting price).
    pub price: Decimal,
    /// True iff the resting (maker) order was the buyer, i.e. the aggressor sold.
    pub is_buyer_maker: bool,
    /// Timestamp captured once per matching call and shared by all its trades.
    /// Serialized as integer unix seconds.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub event_time: DateTime<Utc>,
}

/// The unfilled remainder of an order that could not execute, reported back
/// to the caller. An outcome record, not a mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancellation {
    /// Identifier of the order the remainder belongs to.
    pub order_id: OrderId,
    /// Unfilled quantity, in base units.
    pub units: Decimal,
}

/// The outcome of processing a single order: the trades produced by matching
/// and any cancellation surfaced for an unfillable remainder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Trades generated by the matching pass, in the order they were taken.
    pub trades: Vec<Trade>,
    /// Cancellations for quantity that could not execute (market orders only).
    pub cancellations: Vec<OrderCancellation>,
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
