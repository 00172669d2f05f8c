//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Point-in-time aggregated views of the order book: one record per price level, bids descending
// and asks ascending. The two sides are captured under separate reader locks and may therefore
// be observed at slightly different moments; consumers needing a globally consistent view must
// coordinate externally.
//--------------------------------------------------------------------------------------------------

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One aggregated price level in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshotRecord {
    /// The price of the level.
    pub price: Decimal,
    /// Aggregate remaining units at that price.
    pub size: Decimal,
}

/// An aggregated view of both sides of the book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Bid levels, best (highest) first. Empty when the side is empty, never null.
    pub bids: Vec<BookSnapshotRecord>,
    /// Ask levels, best (lowest) first. Empty when the side is empty, never null.
    pub asks: Vec<BookSnapshotRecord>,
}

impl BookSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the best bid price, if any bids are present.
    #[inline]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|record| record.price)
    }

    /// Returns the best ask price, if any asks are present.
    #[inline]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|record| record.price)
    }

    /// Returns the spread (best ask - best bid) when both sides are present.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_snapshot_serializes_to_empty_arrays() {
        let snapshot = BookSnapshot::new();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"bids":[],"asks":[]}"#);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = BookSnapshot {
            bids: vec![BookSnapshotRecord {
                price: dec!(100),
                size: dec!(1),
            }],
            asks: vec![],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"bids":[{"price":"100","size":"1"}],"asks":[]}"#);
    }

    #[test]
    fn test_best_prices_and_spread() {
        let snapshot = BookSnapshot {
            bids: vec![
                BookSnapshotRecord {
                    price: dec!(100),
                    size: dec!(1),
                },
                BookSnapshotRecord {
                    price: dec!(99),
                    size: dec!(2),
                },
            ],
            asks: vec![BookSnapshotRecord {
                price: dec!(101),
                size: dec!(1),
            }],
        };
        assert_eq!(snapshot.best_bid(), Some(dec!(100)));
        assert_eq!(snapshot.best_ask(), Some(dec!(101)));
        assert_eq!(snapshot.spread(), Some(dec!(1)));

        assert_eq!(BookSnapshot::new().spread(), None);
    }
}
