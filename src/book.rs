//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module composes the two sides of the order book and owns the concurrency discipline:
// one reader-writer lock per side. Mutating operations acquire the writer lock of the side they
// mutate and nothing else; reads acquire reader locks only. There is no book-wide lock, so the
// two sides of a snapshot may be captured at slightly different moments.
//--------------------------------------------------------------------------------------------------

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::side_book::{BookError, SideBook};
use crate::snapshot::BookSnapshot;
use crate::types::{Fill, Order, Side};

/// The two-sided limit order book: a bid side and an ask side, each behind its
/// own reader-writer lock.
///
/// Between completed engine calls the book holds no executable cross: either a
/// side is empty or the best bid is strictly below the best ask. During a call
/// the invariant may be transiently broken inside the engine.
#[derive(Debug)]
pub struct Book {
    /// Resting buy orders, guarded by the bid-side lock.
    bids: RwLock<SideBook>,
    /// Resting sell orders, guarded by the ask-side lock.
    asks: RwLock<SideBook>,
}

impl Book {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self {
            bids: RwLock::new(SideBook::new(Side::Buy)),
            asks: RwLock::new(SideBook::new(Side::Sell)),
        }
    }

    /// Rests a buy order on the bid side.
    pub fn add_bid(&self, order: Order) {
        self.bids.write().add(order);
    }

    /// Rests a sell order on the ask side.
    pub fn add_ask(&self, order: Order) {
        self.asks.write().add(order);
    }

    /// Removes the resting order located by `(side, price, id)`.
    ///
    /// # Returns
    /// * `Ok(Order)` - The removed order, carrying its remaining units
    /// * `Err(BookError::OrderNotFound)` - No such resting order; the book is
    ///   unchanged
    pub fn cancel(&self, side: Side, price: Decimal, id: &str) -> Result<Order, BookError> {
        match side {
            Side::Buy => self.bids.write().cancel(price, id),
            Side::Sell => self.asks.write().cancel(price, id),
        }
    }

    /// Consumes up to `units` from the bid side, highest price first.
    pub fn consume_bids_by_units(&self, units: Decimal) -> Vec<Fill> {
        self.bids.write().consume_by_units(units)
    }

    /// Consumes up to `units` from the ask side, lowest price first.
    pub fn consume_asks_by_units(&self, units: Decimal) -> Vec<Fill> {
        self.asks.write().consume_by_units(units)
    }

    /// Consumes up to `units` from the bid side, stopping at the first level
    /// priced strictly below `price`.
    pub fn consume_bids_by_units_and_price(&self, units: Decimal, price: Decimal) -> Vec<Fill> {
        self.bids.write().consume_by_units_and_price(units, price)
    }

    /// Consumes up to `units` from the ask side, stopping at the first level
    /// priced strictly above `price`.
    pub fn consume_asks_by_units_and_price(&self, units: Decimal, price: Decimal) -> Vec<Fill> {
        self.asks.write().consume_by_units_and_price(units, price)
    }

    /// Returns the highest resting bid price, if any.
    #[inline]
    pub fn best_bid_price(&self) -> Option<Decimal> {
        self.bids.read().best_price()
    }

    /// Returns the lowest resting ask price, if any.
    #[inline]
    pub fn best_ask_price(&self) -> Option<Decimal> {
        self.asks.read().best_price()
    }

    /// Captures every level of both sides (bids descending, asks ascending).
    pub fn full_snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            bids: self.bids.read().snapshot(None),
            asks: self.asks.read().snapshot(None),
        }
    }

    /// Captures up to `depth` levels per side (bids descending, asks
    /// ascending).
    pub fn snapshot_with_depth(&self, depth: usize) -> BookSnapshot {
        BookSnapshot {
            bids: self.bids.read().snapshot(Some(depth)),
            asks: self.asks.read().snapshot(Some(depth)),
        }
    }

    /// Sum of resting bid units at prices >= `price`.
    pub fn total_bid_units_from_price(&self, price: Decimal) -> Decimal {
        self.bids.read().total_units_at_or_above(price)
    }

    /// Sum of resting ask units at prices <= `price`.
    pub fn total_ask_units_to_price(&self, price: Decimal) -> Decimal {
        self.asks.read().total_units_at_or_below(price)
    }
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::thread;

    fn order(id: &str, units: Decimal, price: Decimal, side: Side) -> Order {
        Order {
            id: id.to_string(),
            units,
            price,
            side,
        }
    }

    #[test]
    fn test_empty_book() {
        let book = Book::new();
        assert_eq!(book.best_bid_price(), None);
        assert_eq!(book.best_ask_price(), None);
        let snapshot = book.full_snapshot();
        assert!(snapshot.bids.is_empty());
        assert!(snapshot.asks.is_empty());
    }

    #[test]
    fn test_add_and_snapshot_both_sides() {
        let book = Book::new();
        book.add_bid(order("1", dec!(1), dec!(100), Side::Buy));
        book.add_bid(order("2", dec!(1), dec!(99), Side::Buy));
        book.add_ask(order("3", dec!(2), dec!(101), Side::Sell));

        let snapshot = book.full_snapshot();
        assert_eq!(snapshot.best_bid(), Some(dec!(100)));
        assert_eq!(snapshot.best_ask(), Some(dec!(101)));
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.asks.len(), 1);
        assert_eq!(snapshot.spread(), Some(dec!(1)));
    }

    #[test]
    fn test_depth_limited_snapshot() {
        let book = Book::new();
        for (i, price) in [dec!(100), dec!(99), dec!(98)].iter().enumerate() {
            book.add_bid(order(&i.to_string(), dec!(1), *price, Side::Buy));
        }
        let snapshot = book.snapshot_with_depth(2);
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.bids[0].price, dec!(100));
        assert_eq!(snapshot.bids[1].price, dec!(99));
    }

    #[test]
    fn test_cancel_routes_by_side() {
        let book = Book::new();
        book.add_bid(order("1", dec!(1), dec!(100), Side::Buy));
        book.add_ask(order("2", dec!(1), dec!(101), Side::Sell));

        let removed = book.cancel(Side::Sell, dec!(101), "2").unwrap();
        assert_eq!(removed.id, "2");
        assert_eq!(book.best_ask_price(), None);
        assert_eq!(book.best_bid_price(), Some(dec!(100)));

        assert!(book.cancel(Side::Sell, dec!(101), "2").is_err());
    }

    #[test]
    fn test_cumulative_totals() {
        let book = Book::new();
        book.add_bid(order("1", dec!(1), dec!(100), Side::Buy));
        book.add_bid(order("2", dec!(2), dec!(99), Side::Buy));
        book.add_ask(order("3", dec!(3), dec!(101), Side::Sell));
        book.add_ask(order("4", dec!(4), dec!(102), Side::Sell));

        assert_eq!(book.total_bid_units_from_price(dec!(99)), dec!(3));
        assert_eq!(book.total_bid_units_from_price(dec!(100)), dec!(1));
        assert_eq!(book.total_ask_units_to_price(dec!(101)), dec!(3));
        assert_eq!(book.total_ask_units_to_price(dec!(102)), dec!(7));
    }

    /// Adds from many threads land without losing orders; the per-side locks
    /// serialize the writers.
    #[test]
    fn test_concurrent_adds() {
        let book = Arc::new(Book::new());
        let mut handles = Vec::new();
        for t in 0..4 {
            let book = Arc::clone(&book);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    let id = format!("{t}-{i}");
                    book.add_bid(order(&id, dec!(1), dec!(100), Side::Buy));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(book.total_bid_units_from_price(dec!(100)), dec!(200));
        assert_eq!(book.best_bid_price(), Some(dec!(100)));
    }
}
