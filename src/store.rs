//! Persistence collaborator contract.
//!
//! The benchmark treats the database as an opaque transactional store:
//! every transaction profile runs against a [`StoreTxn`] obtained from
//! [`Store::begin`], and either commits or rolls back the whole unit of
//! work. One typed method per operation the profiles perform, so adapters
//! stay honest about their query shapes.

use crate::model::{
    Customer, CustomerKey, District, DistrictKey, History, Item, NewOrder, Order, OrderKey,
    OrderLine, Stock, StockKey, Warehouse,
};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A row the reference schema guarantees was missing; a load-time or
    /// adapter bug, surfaced as a per-iteration failure.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("transaction conflict: {0}")]
    Conflict(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        StoreError::NotFound { entity }
    }
}

/// Transaction factory shared by all workers.
///
/// Each worker obtains one transaction per iteration. Commit and rollback
/// consume the boxed transaction, so it is released on every exit path.
pub trait Store: Send + Sync {
    fn begin<'a>(&'a self, read_only: bool) -> StoreResult<Box<dyn StoreTxn + 'a>>;
}

/// One logical transaction against the store.
///
/// Reads see the transaction's own uncommitted writes. The store must
/// provide at-least snapshot isolation for read-modify-write sequences
/// (the district order counter relies on it); the engine adds no locking
/// of its own.
pub trait StoreTxn {
    // ── point reads ──
    fn warehouse(&mut self, id: u64) -> StoreResult<Option<Warehouse>>;
    fn district(&mut self, key: DistrictKey) -> StoreResult<Option<District>>;
    fn customer(&mut self, key: CustomerKey) -> StoreResult<Option<Customer>>;
    fn item(&mut self, id: u64) -> StoreResult<Option<Item>>;
    fn stock(&mut self, key: StockKey) -> StoreResult<Option<Stock>>;
    fn order(&mut self, key: OrderKey) -> StoreResult<Option<Order>>;

    // ── updates (upserts; the loader also uses them for population) ──
    fn update_warehouse(&mut self, warehouse: &Warehouse) -> StoreResult<()>;
    fn update_district(&mut self, district: &District) -> StoreResult<()>;
    fn update_customer(&mut self, customer: &Customer) -> StoreResult<()>;
    fn update_stock(&mut self, stock: &Stock) -> StoreResult<()>;
    fn update_order(&mut self, order: &Order) -> StoreResult<()>;
    fn update_order_line(&mut self, line: &OrderLine) -> StoreResult<()>;

    // ── inserts ──
    fn insert_item(&mut self, item: &Item) -> StoreResult<()>;
    fn insert_order(&mut self, order: &Order) -> StoreResult<()>;
    fn insert_new_order(&mut self, new_order: &NewOrder) -> StoreResult<()>;
    fn insert_order_line(&mut self, line: &OrderLine) -> StoreResult<()>;
    fn insert_history(&mut self, history: &History) -> StoreResult<()>;

    // ── deletes ──
    fn delete_new_order(&mut self, key: OrderKey) -> StoreResult<()>;

    // ── queries ──
    /// Customers in (warehouse, district) sharing `last`, used by the
    /// by-name lookup's count step.
    fn count_customers_by_last_name(
        &mut self,
        warehouse_id: u64,
        district_id: u64,
        last: &str,
    ) -> StoreResult<u64>;

    /// Matching customer ids ordered by first name ascending.
    fn customer_ids_by_last_name(
        &mut self,
        warehouse_id: u64,
        district_id: u64,
        last: &str,
    ) -> StoreResult<Vec<u64>>;

    /// Lowest-order-id undelivered order in the district, if any.
    fn oldest_new_order(
        &mut self,
        warehouse_id: u64,
        district_id: u64,
    ) -> StoreResult<Option<NewOrder>>;

    /// The customer's most recently created order (highest order id).
    fn latest_order(&mut self, key: CustomerKey) -> StoreResult<Option<Order>>;

    /// All lines of an order, in line-number order.
    fn order_lines(&mut self, key: OrderKey) -> StoreResult<Vec<OrderLine>>;

    /// Distinct item ids referenced by order lines with order id in
    /// `[order_id_lo, order_id_hi)` whose stock quantity in this warehouse
    /// is below `threshold`.
    fn low_stock_item_ids(
        &mut self,
        warehouse_id: u64,
        district_id: u64,
        order_id_lo: u64,
        order_id_hi: u64,
        threshold: i64,
    ) -> StoreResult<Vec<u64>>;

    /// Count of stock rows for `item_id` in the warehouse below
    /// `threshold` (0 or 1; kept for query-shape parity with the
    /// reference benchmark's per-item recount).
    fn count_stock_below(
        &mut self,
        warehouse_id: u64,
        item_id: u64,
        threshold: i64,
    ) -> StoreResult<u64>;

    // ── transaction boundary ──
    fn commit(self: Box<Self>) -> StoreResult<()>;
    fn rollback(self: Box<Self>) -> StoreResult<()>;
}
