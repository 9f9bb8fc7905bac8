//! TPC-C entities.
//!
//! Only the fields the transaction logic touches, plus the descriptive
//! strings the profiles copy around (warehouse/district names for History
//! rows, the per-district stock strings for order lines).

/// Number of per-district description strings on a Stock row. An order
/// line selects one by `unskew(district_id) % STOCK_DISTRICTS`.
pub const STOCK_DISTRICTS: usize = 10;

/// Customer data blobs are truncated to this length whenever a bad-credit
/// Payment prepends its note.
pub const CUSTOMER_DATA_MAX: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct Warehouse {
    pub id: u64,
    pub name: String,
    pub tax: f64,
    pub ytd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DistrictKey {
    pub warehouse_id: u64,
    pub district_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct District {
    pub warehouse_id: u64,
    pub id: u64,
    pub name: String,
    pub tax: f64,
    pub ytd: f64,
    /// Sole source of new order ids within the district; incremented
    /// exactly once per committed New-Order.
    pub next_order_id: u64,
}

impl District {
    pub fn key(&self) -> DistrictKey {
        DistrictKey {
            warehouse_id: self.warehouse_id,
            district_id: self.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomerKey {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub customer_id: u64,
}

/// Credit rating values; anything else would be a load-time bug.
pub const CREDIT_GOOD: &str = "GC";
pub const CREDIT_BAD: &str = "BC";

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub id: u64,
    pub first: String,
    pub last: String,
    pub balance: f64,
    pub ytd_payment: f64,
    pub discount: f64,
    pub credit: String,
    pub delivery_cnt: u64,
    pub data: String,
}

impl Customer {
    pub fn key(&self) -> CustomerKey {
        CustomerKey {
            warehouse_id: self.warehouse_id,
            district_id: self.district_id,
            customer_id: self.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderKey {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub order_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub id: u64,
    pub customer_id: u64,
    pub entry_ts: u64,
    pub carrier_id: Option<u64>,
    pub line_count: u64,
    pub all_local: bool,
}

impl Order {
    pub fn key(&self) -> OrderKey {
        OrderKey {
            warehouse_id: self.warehouse_id,
            district_id: self.district_id,
            order_id: self.id,
        }
    }
}

/// Undelivered-order marker; deleted by Delivery once the order ships.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub order_id: u64,
    pub customer_id: u64,
}

impl NewOrder {
    pub fn key(&self) -> OrderKey {
        OrderKey {
            warehouse_id: self.warehouse_id,
            district_id: self.district_id,
            order_id: self.order_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderLineKey {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub order_id: u64,
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub order_id: u64,
    /// Line number within the order, 0..N-1.
    pub number: u64,
    pub item_id: u64,
    pub supply_warehouse_id: u64,
    pub quantity: u64,
    pub amount: f64,
    pub dist_info: String,
    /// Null until Delivery stamps it.
    pub delivery_ts: Option<u64>,
}

impl OrderLine {
    pub fn key(&self) -> OrderLineKey {
        OrderLineKey {
            warehouse_id: self.warehouse_id,
            district_id: self.district_id,
            order_id: self.order_id,
            number: self.number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StockKey {
    pub warehouse_id: u64,
    pub item_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stock {
    pub warehouse_id: u64,
    pub item_id: u64,
    pub quantity: i64,
    pub dist: [String; STOCK_DISTRICTS],
}

impl Stock {
    pub fn key(&self) -> StockKey {
        StockKey {
            warehouse_id: self.warehouse_id,
            item_id: self.item_id,
        }
    }
}

/// Immutable catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub data: String,
}

/// Append-only payment log row; never updated or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub customer_id: u64,
    pub customer_district_id: u64,
    pub customer_warehouse_id: u64,
    pub district_id: u64,
    pub warehouse_id: u64,
    pub ts: u64,
    pub amount: f64,
    pub data: String,
}
