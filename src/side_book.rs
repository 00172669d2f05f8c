//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements one side of the order book (bids or asks): an ordered index of prices,
// a canonical price -> PriceLevel map and a cached best price, kept mutually consistent.
//
// The two sides are mirror images: bids scan descending (best = highest), asks scan ascending
// (best = lowest). The ordered index compares prices numerically; the level map keys on the
// canonical string form so that numerically equal decimals land on the same level.
//
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|-------------------------|
// | SideBook      | One side's price levels and cached best            | add                     |
// |               |                                                    | cancel                  |
// |               |                                                    | consume_by_units        |
// |               |                                                    | consume_by_units_and_price |
// |               |                                                    | snapshot                |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeSet, HashMap};

use num_traits::Zero;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::trace;

use crate::price_level::PriceLevel;
use crate::snapshot::BookSnapshotRecord;
use crate::types::{Fill, Order, OrderId, Side};

/// Canonical map key for a price level. Two decimals that compare equal
/// numerically must produce the same key, so the value is normalized before
/// formatting (e.g. "1.50" and "1.5" both map to "1.5").
#[inline]
pub(crate) fn price_key(price: Decimal) -> String {
    price.normalize().to_string()
}

/// Errors that can occur during order book operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// No resting order matched the given (side, price, id).
    #[error("order {0} not found in the book")]
    OrderNotFound(OrderId),
}

/// One side of the book: bids or asks.
///
/// Invariants:
/// * `prices` and `levels` always hold exactly the same set of price levels;
/// * every level present is non-empty (re-established after any removal);
/// * `best` is `None` iff the side is empty, otherwise it equals the index
///   extremum (highest price for bids, lowest for asks).
#[derive(Debug)]
pub struct SideBook {
    /// Which side this book holds; fixes the scan orientation.
    side: Side,
    /// Price-ordered index over the levels (numeric ordering).
    prices: BTreeSet<Decimal>,
    /// Canonical price string -> level.
    levels: HashMap<String, PriceLevel>,
    /// Cached best price. Derived state: recomputed from `prices` whenever
    /// the level holding it disappears.
    best: Option<Decimal>,
}

impl SideBook {
    /// Creates an empty side book for the given side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            prices: BTreeSet::new(),
            levels: HashMap::new(),
            best: None,
        }
    }

    /// Adds a resting order, creating its price level on first use.
    ///
    /// # Notes
    /// - A same-id add at the same price replaces the order's units in place
    ///   without losing its queue position.
    /// - The cached best is refreshed only when the price strictly extends it.
    pub fn add(&mut self, order: Order) {
        let price = order.price;

        // 1. Get or create the level for this price.
        let level = self
            .levels
            .entry(price_key(price))
            .or_insert_with(PriceLevel::new);

        // 2. Append (or update in place) within the level's FIFO.
        let was_update = level.insert_or_update(order);

        // 3. New resting order: make sure the price is indexed and extend the
        //    cached best if this price improves it.
        if !was_update {
            self.prices.insert(price);
            match self.side {
                Side::Buy if self.best.map_or(true, |b| price > b) => self.best = Some(price),
                Side::Sell if self.best.map_or(true, |b| price < b) => self.best = Some(price),
                _ => {}
            }
        }
    }

    /// Removes a resting order located by `(price, id)`.
    ///
    /// # Returns
    /// * `Ok(Order)` - The removed order, with its remaining units
    /// * `Err(BookError::OrderNotFound)` - No level at that price, or no such
    ///   id at that level; the book is unchanged
    ///
    /// # Notes
    /// A level emptied by the removal is deleted from both the index and the
    /// map, and a drained best is recomputed from the index before returning.
    pub fn cancel(&mut self, price: Decimal, id: &str) -> Result<Order, BookError> {
        let key = price_key(price);
        let level = self
            .levels
            .get_mut(&key)
            .ok_or_else(|| BookError::OrderNotFound(id.to_string()))?;
        let removed = level
            .remove(id)
            .ok_or_else(|| BookError::OrderNotFound(id.to_string()))?;

        if level.is_empty() {
            let level_price = level.price();
            self.levels.remove(&key);
            self.prices.remove(&level_price);
            if self.best == Some(level_price) {
                self.recompute_best();
            }
        }
        Ok(removed)
    }

    /// Consumes up to `units` from the side, best price first, FIFO within
    /// each level.
    pub fn consume_by_units(&mut self, units: Decimal) -> Vec<Fill> {
        self.consume(units, None)
    }

    /// Consumes up to `units` from the side, stopping once the next level's
    /// price no longer satisfies `limit` (below it for bids, above it for
    /// asks).
    pub fn consume_by_units_and_price(&mut self, units: Decimal, limit: Decimal) -> Vec<Fill> {
        self.consume(units, Some(limit))
    }

    /// Shared consumption walk. Levels are visited extremum-first; a level
    /// fully drained is deleted from index and map as the walk advances, so
    /// the next iteration's extremum is the next level. The cached best is
    /// recomputed before returning whenever any level was drained.
    fn consume(&mut self, units: Decimal, limit: Option<Decimal>) -> Vec<Fill> {
        let mut fills = Vec::new();
        let mut need = units;
        let mut drained = false;

        while need > Decimal::zero() {
            let Some(price) = self.index_extremum() else {
                break;
            };
            if let Some(limit) = limit {
                let beyond_limit = match self.side {
                    Side::Buy => price < limit,
                    Side::Sell => price > limit,
                };
                if beyond_limit {
                    break;
                }
            }

            let key = price_key(price);
            let Some(level) = self.levels.get_mut(&key) else {
                break;
            };
            need = level.take_units(need, &mut fills);

            if level.is_empty() {
                self.levels.remove(&key);
                self.prices.remove(&price);
                drained = true;
            }
        }

        if drained {
            self.recompute_best();
            trace!(side = ?self.side, fills = fills.len(), "consume drained price levels");
        }
        fills
    }

    /// Returns up to `max_depth` levels (all of them when `None`) in scan
    /// order: bids descending, asks ascending.
    pub fn snapshot(&self, max_depth: Option<usize>) -> Vec<BookSnapshotRecord> {
        let depth = max_depth.unwrap_or(self.prices.len());
        let mut records = Vec::with_capacity(depth.min(self.prices.len()));
        match self.side {
            Side::Buy => {
                for price in self.prices.iter().rev().take(depth) {
                    if let Some(level) = self.levels.get(&price_key(*price)) {
                        records.push(BookSnapshotRecord {
                            price: level.price(),
                            size: level.size(),
                        });
                    }
                }
            }
            Side::Sell => {
                for price in self.prices.iter().take(depth) {
                    if let Some(level) = self.levels.get(&price_key(*price)) {
                        records.push(BookSnapshotRecord {
                            price: level.price(),
                            size: level.size(),
                        });
                    }
                }
            }
        }
        records
    }

    /// Sum of level sizes over all prices >= `price` (bid-side cumulative
    /// query).
    pub fn total_units_at_or_above(&self, price: Decimal) -> Decimal {
        self.prices
            .range(price..)
            .filter_map(|p| self.levels.get(&price_key(*p)))
            .fold(Decimal::zero(), |acc, level| acc + level.size())
    }

    /// Sum of level sizes over all prices <= `price` (ask-side cumulative
    /// query).
    pub fn total_units_at_or_below(&self, price: Decimal) -> Decimal {
        self.prices
            .range(..=price)
            .filter_map(|p| self.levels.get(&price_key(*p)))
            .fold(Decimal::zero(), |acc, level| acc + level.size())
    }

    /// Returns the cached best price (highest bid / lowest ask).
    #[inline]
    pub fn best_price(&self) -> Option<Decimal> {
        self.best
    }

    /// Returns true when no orders rest on this side.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Number of distinct price levels on this side.
    pub fn depth(&self) -> usize {
        self.prices.len()
    }

    /// Aggregate units resting at an exact price, if any.
    pub fn size_at_price(&self, price: Decimal) -> Option<Decimal> {
        self.levels.get(&price_key(price)).map(|level| level.size())
    }

    /// Number of orders resting at an exact price.
    pub fn order_count_at_price(&self, price: Decimal) -> usize {
        self.levels
            .get(&price_key(price))
            .map_or(0, |level| level.order_count())
    }

    /// The index extremum in scan order (highest for bids, lowest for asks).
    fn index_extremum(&self) -> Option<Decimal> {
        match self.side {
            Side::Buy => self.prices.iter().next_back().copied(),
            Side::Sell => self.prices.iter().next().copied(),
        }
    }

    /// Recomputes the cached best from the ordered index. Must run before a
    /// writer releases the lock whenever the level holding the best was
    /// removed.
    fn recompute_best(&mut self) {
        self.best = self.index_extremum();
    }
}
