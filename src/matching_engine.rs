//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the matching engine: the state machine that routes each incoming limit
// or market order to the right sequence of book primitives, builds trades from the fills and
// handles the unfilled remainder (rested for limits, cancelled for markets).
//
// | Component                | Description                                                |
// |--------------------------|-----------------------------------------------------------|
// | MatchingEngine           | Processes orders against the book and produces results    |
// | EngineError              | Error types surfaced at the API boundary                  |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                     | Description                                | Return Type       |
// |--------------------------|--------------------------------------------|-------------------|
// | process_limit_order      | Match or rest a limit order                | MatchResult       |
// | process_market_order     | Match a market order, cancel the rest      | MatchResult       |
// | cancel_order             | Remove a resting order                     | Result<Vec<..>>   |
// | best_bid_price / ask     | Best prices (zero when the side is empty)  | Decimal           |
// | order_book_*_snapshot    | Aggregated views of the book               | BookSnapshot      |
//--------------------------------------------------------------------------------------------------

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::book::Book;
use crate::side_book::BookError;
use crate::snapshot::BookSnapshot;
use crate::types::{
    MatchResult, Order, OrderCancellation, OrderId, OrderLimit, OrderMarket, Side, Trade,
};

/// Errors surfaced by the engine at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The `(side, price, id)` given to cancel did not match a live resting
    /// order. The book is unchanged.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
}

/// Type alias for Result with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// The matching engine for one instrument: continuous price-time priority over
/// a two-sided in-memory book.
///
/// # Matching
///
/// * Better prices match first (higher bids, lower asks); at one price,
///   earlier orders match first (FIFO).
/// * Fills always execute at the resting (maker) order's price.
/// * A limit order that cannot cross rests in full; a crossed limit order
///   rests its remainder. A market order's remainder is cancelled, never
///   rested.
///
/// # Concurrency
///
/// Every call runs to completion on the calling thread; there is no internal
/// queue. The book is guarded by one reader-writer lock per side, so callers
/// may submit from multiple threads and concurrent calls compose in the order
/// the side locks are won.
#[derive(Debug, Default)]
pub struct MatchingEngine {
    /// The two-sided book this engine matches against.
    book: Book,
}

impl MatchingEngine {
    /// Creates an engine with an empty book.
    pub fn new() -> Self {
        Self { book: Book::new() }
    }

    /// Processes a limit order: matches it against the opposite side as far as
    /// its price allows and rests any remainder on its own side.
    ///
    /// # Returns
    /// A `MatchResult` whose trades appear in the order they were taken
    /// (best price first, FIFO within a level) and share one event time.
    pub fn process_limit_order(&self, order: &OrderLimit) -> MatchResult {
        match order.side {
            Side::Buy => self.process_limit_buy(order),
            Side::Sell => self.process_limit_sell(order),
        }
    }

    /// Processes a market order: matches it against the opposite side at any
    /// price and cancels any remainder.
    pub fn process_market_order(&self, order: &OrderMarket) -> MatchResult {
        match order.side {
            Side::Buy => self.process_market_buy(order),
            Side::Sell => self.process_market_sell(order),
        }
    }

    /// Cancels the resting order located by the identity's `(side, price, id)`.
    ///
    /// # Returns
    /// * `Ok` - A single cancellation carrying the remaining units that were
    ///   removed from the book
    /// * `Err(EngineError::OrderNotFound)` - No such resting order; the book
    ///   is unchanged
    pub fn cancel_order(&self, order: &Order) -> EngineResult<Vec<OrderCancellation>> {
        let removed = self
            .book
            .cancel(order.side, order.price, &order.id)
            .map_err(|BookError::OrderNotFound(id)| EngineError::OrderNotFound(id))?;

        debug!(order_id = %removed.id, units = %removed.units, "order cancelled");
        Ok(vec![OrderCancellation {
            order_id: removed.id,
            units: removed.units,
        }])
    }

    /// Returns the highest resting bid price, or zero when there are no bids.
    #[inline]
    pub fn best_bid_price(&self) -> Decimal {
        self.book.best_bid_price().unwrap_or(Decimal::ZERO)
    }

    /// Returns the lowest resting ask price, or zero when there are no asks.
    #[inline]
    pub fn best_ask_price(&self) -> Decimal {
        self.book.best_ask_price().unwrap_or(Decimal::ZERO)
    }

    /// Captures every price level of both sides.
    pub fn order_book_full_snapshot(&self) -> BookSnapshot {
        self.book.full_snapshot()
    }

    /// Captures up to `depth` price levels per side.
    pub fn order_book_snapshot_with_depth(&self, depth: usize) -> BookSnapshot {
        self.book.snapshot_with_depth(depth)
    }

    /// Sum of resting bid units at prices >= `price`.
    pub fn total_bid_units_from_price(&self, price: Decimal) -> Decimal {
        self.book.total_bid_units_from_price(price)
    }

    /// Sum of resting ask units at prices <= `price`.
    pub fn total_ask_units_to_price(&self, price: Decimal) -> Decimal {
        self.book.total_ask_units_to_price(price)
    }

    /// Limit buy: consumes the ask side up to the limit price, then rests the
    /// remainder on the bid side.
    fn process_limit_buy(&self, order: &OrderLimit) -> MatchResult {
        let mut result = MatchResult::default();

        // Rest in full when the ask side is empty or its best price does not
        // satisfy the limit.
        let crosses = self
            .book
            .best_ask_price()
            .map_or(false, |best_ask| best_ask <= order.price);
        if !crosses {
            self.book.add_bid(Order {
                id: order.id.clone(),
                units: order.units,
                price: order.price,
                side: Side::Buy,
            });
            return result;
        }

        // One timestamp per matching call, shared by every trade it produces.
        let event_time = Utc::now();
        let mut remaining = order.units;

        for fill in self
            .book
            .consume_asks_by_units_and_price(order.units, order.price)
        {
            remaining -= fill.units;
            result.trades.push(Trade {
                buy_order_id: order.id.clone(),
                sell_order_id: fill.order_id,
                units: fill.units,
                price: fill.price,
                is_buyer_maker: false,
                event_time,
            });
        }
        debug!(order_id = %order.id, trades = result.trades.len(), "limit buy matched");

        // Rest any remainder on the bid side.
        if remaining > Decimal::ZERO {
            self.book.add_bid(Order {
                id: order.id.clone(),
                units: remaining,
                price: order.price,
                side: Side::Buy,
            });
        }
        result
    }

    /// Limit sell: mirror image of `process_limit_buy` against the bid side.
    fn process_limit_sell(&self, order: &OrderLimit) -> MatchResult {
        let mut result = MatchResult::default();

        let crosses = self
            .book
            .best_bid_price()
            .map_or(false, |best_bid| best_bid >= order.price);
        if !crosses {
            self.book.add_ask(Order {
                id: order.id.clone(),
                units: order.units,
                price: order.price,
                side: Side::Sell,
            });
            return result;
        }

        let event_time = Utc::now();
        let mut remaining = order.units;

        for fill in self
            .book
            .consume_bids_by_units_and_price(order.units, order.price)
        {
            remaining -= fill.units;
            result.trades.push(Trade {
                buy_order_id: fill.order_id,
                sell_order_id: order.id.clone(),
                units: fill.units,
                price: fill.price,
                is_buyer_maker: true,
                event_time,
            });
        }
        debug!(order_id = %order.id, trades = result.trades.len(), "limit sell matched");

        if remaining > Decimal::ZERO {
            self.book.add_ask(Order {
                id: order.id.clone(),
                units: remaining,
                price: order.price,
                side: Side::Sell,
            });
        }
        result
    }

    /// Market buy: consumes the ask side at any price; the remainder is
    /// cancelled.
    fn process_market_buy(&self, order: &OrderMarket) -> MatchResult {
        let mut result = MatchResult::default();

        if self.book.best_ask_price().is_none() {
            result.cancellations.push(OrderCancellation {
                order_id: order.id.clone(),
                units: order.units,
            });
            return result;
        }

        let event_time = Utc::now();
        let mut remaining = order.units;

        for fill in self.book.consume_asks_by_units(order.units) {
            remaining -= fill.units;
            result.trades.push(Trade {
                buy_order_id: order.id.clone(),
                sell_order_id: fill.order_id,
                units: fill.units,
                price: fill.price,
                is_buyer_maker: false,
                event_time,
            });
        }
        debug!(order_id = %order.id, trades = result.trades.len(), "market buy matched");

        if remaining > Decimal::ZERO {
            result.cancellations.push(OrderCancellation {
                order_id: order.id.clone(),
                units: remaining,
            });
        }
        result
    }

    /// Market sell: mirror image of `process_market_buy` against the bid side.
    fn process_market_sell(&self, order: &OrderMarket) -> MatchResult {
        let mut result = MatchResult::default();

        if self.book.best_bid_price().is_none() {
            result.cancellations.push(OrderCancellation {
                order_id: order.id.clone(),
                units: order.units,
            });
            return result;
        }

        let event_time = Utc::now();
        let mut remaining = order.units;

        for fill in self.book.consume_bids_by_units(order.units) {
            remaining -= fill.units;
            result.trades.push(Trade {
                buy_order_id: fill.order_id,
                sell_order_id: order.id.clone(),
                units: fill.units,
                price: fill.price,
                is_buyer_maker: true,
                event_time,
            });
        }
        debug!(order_id = %order.id, trades = result.trades.len(), "market sell matched");

        if remaining > Decimal::ZERO {
            result.cancellations.push(OrderCancellation {
                order_id: order.id.clone(),
                units: remaining,
            });
        }
        result
    }
}
