// Expose the modules
pub mod book;
pub mod matching_engine;
pub mod price_level;
pub mod side_book;
pub mod snapshot;
pub mod types;

// Re-export key types for easier usage
pub use book::Book;
pub use matching_engine::{EngineError, EngineResult, MatchingEngine};
pub use price_level::PriceLevel;
pub use side_book::{BookError, SideBook};
pub use snapshot::{BookSnapshot, BookSnapshotRecord};
pub use types::{
    MatchResult, Order, OrderCancellation, OrderId, OrderLimit, OrderMarket, Side, Trade,
};
