//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a single price level: the FIFO queue of all orders resting at one
// exact price on one side of the book.
//
// Orders live in an arena (a slab of nodes with a free list) and are linked into a doubly-linked
// queue by arena index, with an id -> index map alongside. This gives O(1) append, O(1) peek,
// O(1) removal by id and in-place partial consumption without reordering.
//
// | Component     | Description                                                               |
// |--------------|---------------------------------------------------------------------------|
// | Node         | One resting order plus its prev/next links (arena indices)                |
// | PriceLevel   | The queue, the id map and the maintained size/volume aggregates           |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use num_traits::Zero;
use rust_decimal::Decimal;

use crate::types::{Fill, Order, OrderId};

/// A queue node owned by the level's arena. Links are arena indices, never references.
#[derive(Debug, Clone)]
struct Node {
    order: Order,
    prev: Option<usize>,
    next: Option<usize>,
}

/// All resting orders at one exact price on one side, in arrival order.
///
/// Invariants:
/// * `head`/`tail`/`slots`/`size` agree on emptiness;
/// * `size` equals the sum of the members' remaining units;
/// * every id in `slots` resolves to exactly one linked node;
/// * queue order is insertion order (earliest at head).
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price for this level; adopted from the first inserted order.
    price: Decimal,
    /// Aggregate remaining units over all members. Never negative.
    size: Decimal,
    /// Aggregate quote volume (`size × price`).
    volume: Decimal,
    /// Arena index of the earliest resting order.
    head: Option<usize>,
    /// Arena index of the latest resting order.
    tail: Option<usize>,
    /// Node arena. Freed slots are recycled via `free`.
    nodes: Vec<Node>,
    /// Recycled arena slots.
    free: Vec<usize>,
    /// O(1) lookup from order id to arena slot.
    slots: HashMap<OrderId, usize>,
}

impl PriceLevel {
    /// Creates an empty price level. The price is adopted from the first insert.
    pub fn new() -> Self {
        Self {
            price: Decimal::zero(),
            size: Decimal::zero(),
            volume: Decimal::zero(),
            head: None,
            tail: None,
            nodes: Vec::with_capacity(4),
            free: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Inserts a new resting order at the tail, or replaces the units of an
    /// order already resting here.
    ///
    /// A same-id update keeps the order's queue position: priority is preserved
    /// across modifications.
    ///
    /// # Returns
    /// * `true` - The id was already present and its units were replaced
    /// * `false` - A new order was appended at the tail
    pub fn insert_or_update(&mut self, order: Order) -> bool {
        if let Some(&slot) = self.slots.get(&order.id) {
            let previous_units = self.nodes[slot].order.units;
            let new_units = order.units;
            self.nodes[slot].order = order;
            self.apply_size_change(-previous_units);
            self.apply_size_change(new_units);
            return true;
        }

        if self.head.is_none() {
            self.price = order.price;
        }

        let id = order.id.clone();
        let units = order.units;
        let slot = self.alloc(Node {
            order,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.slots.insert(id, slot);
        self.apply_size_change(units);
        false
    }

    /// Removes a resting order by id, returning it.
    ///
    /// # Returns
    /// * `Some(Order)` - The removed order, with its remaining units
    /// * `None` - If the id is not resting at this level
    pub fn remove(&mut self, id: &str) -> Option<Order> {
        let slot = self.slots.remove(id)?;
        let order = self.nodes[slot].order.clone();
        self.unlink(slot);
        self.apply_size_change(-order.units);
        Some(order)
    }

    /// Consumes up to `units` from the queue, head to tail, appending one fill
    /// per touched order to `fills`.
    ///
    /// Fully consumed orders are removed. A partially consumed order has its
    /// units reduced in place and keeps its queue position.
    ///
    /// # Returns
    /// The quantity still needed after this level was exhausted (zero when the
    /// need was fully met here).
    pub fn take_units(&mut self, units: Decimal, fills: &mut Vec<Fill>) -> Decimal {
        let mut need = units;
        while need > Decimal::zero() {
            let Some(slot) = self.head else { break };
            let remaining = self.nodes[slot].order.units;
            if remaining <= need {
                let order = self.nodes[slot].order.clone();
                self.slots.remove(&order.id);
                self.unlink(slot);
                self.apply_size_change(-remaining);
                fills.push(Fill {
                    order_id: order.id,
                    units: remaining,
                    price: order.price,
                });
                need -= remaining;
            } else {
                let node = &mut self.nodes[slot];
                node.order.units = remaining - need;
                let fill = Fill {
                    order_id: node.order.id.clone(),
                    units: need,
                    price: node.order.price,
                };
                self.apply_size_change(-need);
                fills.push(fill);
                need = Decimal::zero();
            }
        }
        need
    }

    /// Returns the next order to be matched without removing it (FIFO peek).
    #[inline]
    pub fn front(&self) -> Option<&Order> {
        self.head.map(|slot| &self.nodes[slot].order)
    }

    /// Returns true if this price level has no orders.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns the number of orders resting at this level.
    pub fn order_count(&self) -> usize {
        self.slots.len()
    }

    /// The price for this level.
    #[inline]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Aggregate remaining units over all members.
    #[inline]
    pub fn size(&self) -> Decimal {
        self.size
    }

    /// Aggregate quote volume (`size × price`).
    #[inline]
    pub fn volume(&self) -> Decimal {
        self.volume
    }

    /// Places a node in the arena, recycling a freed slot when one exists.
    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Detaches a node from the queue and returns its slot to the free list.
    /// The id map entry must already be gone.
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.free.push(slot);
    }

    /// Applies a signed change to the aggregate size and refreshes the volume.
    /// Size is clamped at zero on underflow; correct callers never underflow.
    fn apply_size_change(&mut self, change: Decimal) {
        self.size += change;
        if self.size.is_sign_negative() {
            self.size = Decimal::zero();
        }
        self.volume = self.size * self.price;
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use rust_decimal_macros::dec;

    fn order(id: &str, units: Decimal) -> Order {
        Order {
            id: id.to_string(),
            units,
            price: dec!(100),
            side: Side::Buy,
        }
    }

    #[test]
    fn test_empty_level() {
        let level = PriceLevel::new();
        assert!(level.is_empty());
        assert_eq!(level.order_count(), 0);
        assert_eq!(level.size(), dec!(0));
        assert!(level.front().is_none());
    }

    /// The price is adopted from the first inserted order.
    #[test]
    fn test_price_adopted_on_first_insert() {
        let mut level = PriceLevel::new();
        level.insert_or_update(order("1", dec!(2)));
        assert_eq!(level.price(), dec!(100));
        assert_eq!(level.size(), dec!(2));
        assert_eq!(level.volume(), dec!(200));
    }

    #[test]
    fn test_fifo_insertion_order() {
        let mut level = PriceLevel::new();
        for id in ["1", "2", "3"] {
            assert!(!level.insert_or_update(order(id, dec!(1))));
        }
        assert_eq!(level.order_count(), 3);
        assert_eq!(level.front().unwrap().id, "1");

        level.remove("1");
        assert_eq!(level.front().unwrap().id, "2");
    }

    /// Re-inserting an existing id replaces its units without losing its
    /// queue position.
    #[test]
    fn test_insert_or_update_preserves_position() {
        let mut level = PriceLevel::new();
        level.insert_or_update(order("1", dec!(1)));
        level.insert_or_update(order("2", dec!(1)));

        assert!(level.insert_or_update(order("1", dec!(5))));
        assert_eq!(level.size(), dec!(6));
        assert_eq!(level.front().unwrap().id, "1");
        assert_eq!(level.front().unwrap().units, dec!(5));
        assert_eq!(level.order_count(), 2);
    }

    #[test]
    fn test_remove_middle_keeps_links() {
        let mut level = PriceLevel::new();
        for id in ["1", "2", "3"] {
            level.insert_or_update(order(id, dec!(1)));
        }

        let removed = level.remove("2").unwrap();
        assert_eq!(removed.units, dec!(1));
        assert_eq!(level.size(), dec!(2));

        // Queue is now 1 -> 3.
        let mut fills = Vec::new();
        level.take_units(dec!(2), &mut fills);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].order_id, "1");
        assert_eq!(fills[1].order_id, "3");
        assert!(level.is_empty());
    }

    #[test]
    fn test_remove_absent_id_is_none() {
        let mut level = PriceLevel::new();
        level.insert_or_update(order("1", dec!(1)));
        assert!(level.remove("99").is_none());
        assert_eq!(level.size(), dec!(1));
    }

    #[test]
    fn test_take_units_full_consumption() {
        let mut level = PriceLevel::new();
        level.insert_or_update(order("1", dec!(1)));
        level.insert_or_update(order("2", dec!(2)));

        let mut fills = Vec::new();
        let need = level.take_units(dec!(3), &mut fills);

        assert_eq!(need, dec!(0));
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].units, dec!(1));
        assert_eq!(fills[1].units, dec!(2));
        assert!(level.is_empty());
        assert_eq!(level.size(), dec!(0));
    }

    /// A partial take reduces the head in place; the head keeps its priority.
    #[test]
    fn test_take_units_partial_keeps_head() {
        let mut level = PriceLevel::new();
        level.insert_or_update(order("1", dec!(2)));
        level.insert_or_update(order("2", dec!(1)));

        let mut fills = Vec::new();
        let need = level.take_units(dec!(0.5), &mut fills);

        assert_eq!(need, dec!(0));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order_id, "1");
        assert_eq!(fills[0].units, dec!(0.5));
        assert_eq!(level.front().unwrap().id, "1");
        assert_eq!(level.front().unwrap().units, dec!(1.5));
        assert_eq!(level.size(), dec!(2.5));
    }

    #[test]
    fn test_take_units_exhausts_level_and_reports_need() {
        let mut level = PriceLevel::new();
        level.insert_or_update(order("1", dec!(1)));

        let mut fills = Vec::new();
        let need = level.take_units(dec!(4), &mut fills);

        assert_eq!(need, dec!(3));
        assert_eq!(fills.len(), 1);
        assert!(level.is_empty());
    }

    /// Freed arena slots are recycled by later inserts.
    #[test]
    fn test_slot_reuse_after_removal() {
        let mut level = PriceLevel::new();
        for i in 0..8 {
            level.insert_or_update(order(&i.to_string(), dec!(1)));
        }
        for i in 0..8 {
            level.remove(&i.to_string());
        }
        for i in 8..16 {
            level.insert_or_update(order(&i.to_string(), dec!(1)));
        }
        assert_eq!(level.order_count(), 8);
        assert_eq!(level.size(), dec!(8));
        assert_eq!(level.front().unwrap().id, "8");
    }
}
