//! The five TPC-C transaction profiles.
//!
//! Each profile is a self-contained unit of work: it generates its own
//! randomized inputs (kept separate from execution so tests can pin them),
//! runs against one store transaction, and commits or rolls back as a
//! whole. New-Order's 1-in-100 missing-item rollback is a designed
//! outcome, not an error; anything the store raises is contained by the
//! caller (the worker loop).

use crate::keyspace::{random_last_name, skew, unskew, Keyspace, WarehouseTopology, UNKNOWN_ITEM_ID};
use crate::model::{
    CustomerKey, DistrictKey, History, NewOrder, Order, OrderLine, StockKey, CREDIT_BAD,
    CUSTOMER_DATA_MAX, STOCK_DISTRICTS,
};
use crate::store::{Store, StoreError, StoreResult, StoreTxn};
use crate::now_millis;
use rand::Rng;

// ────────────────────────────────────────────────────────────────────────────────
// Transaction kinds and mix
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnType {
    NewOrder,
    Payment,
    OrderStatus,
    Delivery,
    StockLevel,
}

impl TxnType {
    pub const COUNT: usize = 5;

    pub const ALL: [TxnType; Self::COUNT] = [
        TxnType::NewOrder,
        TxnType::Payment,
        TxnType::OrderStatus,
        TxnType::Delivery,
        TxnType::StockLevel,
    ];

    /// Standard TPC-C mix.
    pub const STANDARD_WEIGHTS: [u32; Self::COUNT] = [45, 43, 4, 4, 4];

    pub fn name(self) -> &'static str {
        match self {
            TxnType::NewOrder => "new_order",
            TxnType::Payment => "payment",
            TxnType::OrderStatus => "order_status",
            TxnType::Delivery => "delivery",
            TxnType::StockLevel => "stock_level",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Weighted random selection.
    pub fn pick<R: Rng>(rng: &mut R, weights: &[u32; Self::COUNT]) -> TxnType {
        let total: u32 = weights.iter().sum();
        let mut draw = rng.gen_range(0..total);
        for (kind, &w) in Self::ALL.iter().zip(weights) {
            if draw < w {
                return *kind;
            }
            draw -= w;
        }
        TxnType::StockLevel
    }
}

/// How a transaction body ended. Both variants record a latency sample;
/// `RolledBack` is New-Order's designed missing-item path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnOutcome {
    Committed,
    RolledBack,
}

/// Shared input-generation context.
pub struct TxnContext {
    pub keyspace: Keyspace,
    pub topology: WarehouseTopology,
}

// ────────────────────────────────────────────────────────────────────────────────
// New-Order
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewOrderLineInput {
    pub item_id: u64,
    pub supply_warehouse_id: u64,
    pub quantity: u64,
}

#[derive(Debug, Clone)]
pub struct NewOrderInput {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub customer_id: u64,
    pub lines: Vec<NewOrderLineInput>,
    pub all_local: bool,
}

impl NewOrderInput {
    pub fn generate<R: Rng>(rng: &mut R, ctx: &TxnContext) -> Self {
        let warehouse_id = ctx.keyspace.random_warehouse(rng);
        let district_id = ctx.keyspace.random_district(rng);
        let customer_id = ctx.keyspace.random_customer(rng);

        let line_count = rng.gen_range(5..=15);
        // One transaction in a hundred deliberately orders an item that
        // does not exist, on its last line.
        let rollback = rng.gen_range(0..100) == 1;
        let mut all_local = true;
        let mut lines = Vec::with_capacity(line_count);
        for line in 0..line_count {
            let item_id = if rollback && line == line_count - 1 {
                UNKNOWN_ITEM_ID
            } else {
                ctx.keyspace.random_item(rng)
            };
            let supply_warehouse_id = if rng.gen_range(0..100) == 50 {
                all_local = false;
                ctx.topology.other_warehouse(rng, warehouse_id)
            } else {
                warehouse_id
            };
            lines.push(NewOrderLineInput {
                item_id,
                supply_warehouse_id,
                quantity: rng.gen_range(1..=9),
            });
        }
        Self {
            warehouse_id,
            district_id,
            customer_id,
            lines,
            all_local,
        }
    }
}

/// Enters a customer order: one Order + NewOrder pair, one line per input
/// line, a district counter bump, and a stock debit per line. Commits all
/// of it or, when an item is missing, nothing.
pub fn new_order(store: &dyn Store, input: &NewOrderInput) -> StoreResult<TxnOutcome> {
    let mut txn = store.begin(false)?;

    let customer = txn
        .customer(CustomerKey {
            warehouse_id: input.warehouse_id,
            district_id: input.district_id,
            customer_id: input.customer_id,
        })?
        .ok_or(StoreError::not_found("customer"))?;
    let mut district = txn
        .district(DistrictKey {
            warehouse_id: input.warehouse_id,
            district_id: input.district_id,
        })?
        .ok_or(StoreError::not_found("district"))?;
    let warehouse = txn
        .warehouse(input.warehouse_id)?
        .ok_or(StoreError::not_found("warehouse"))?;

    let order_id = district.next_order_id;
    district.next_order_id = order_id + 1;
    txn.update_district(&district)?;

    let order = Order {
        warehouse_id: input.warehouse_id,
        district_id: input.district_id,
        id: order_id,
        customer_id: input.customer_id,
        entry_ts: now_millis(),
        carrier_id: None,
        line_count: input.lines.len() as u64,
        all_local: input.all_local,
    };
    let new_order_row = NewOrder {
        warehouse_id: input.warehouse_id,
        district_id: input.district_id,
        order_id,
        customer_id: input.customer_id,
    };

    let tax_factor = 1.0 + warehouse.tax + district.tax;
    let discount_factor = 1.0 - customer.discount;

    let mut order_lines = Vec::with_capacity(input.lines.len());
    for (number, line) in input.lines.iter().enumerate() {
        let item = match txn.item(line.item_id)? {
            Some(item) => item,
            None => {
                // Designed rollback: the customer typed a bad item number.
                txn.rollback()?;
                return Ok(TxnOutcome::RolledBack);
            }
        };

        let mut stock = txn
            .stock(StockKey {
                warehouse_id: line.supply_warehouse_id,
                item_id: line.item_id,
            })?
            .ok_or(StoreError::not_found("stock"))?;
        let dist_info =
            stock.dist[(unskew(input.district_id) % STOCK_DISTRICTS as u64) as usize].clone();

        let quantity = line.quantity as i64;
        stock.quantity = if stock.quantity > quantity {
            stock.quantity - quantity
        } else {
            // Replenishment rule: a debit never leaves quantity at or
            // below zero.
            stock.quantity - quantity + 91
        };
        txn.update_stock(&stock)?;

        let amount = line.quantity as f64 * item.price * tax_factor * discount_factor;
        order_lines.push(OrderLine {
            warehouse_id: input.warehouse_id,
            district_id: input.district_id,
            order_id,
            number: number as u64,
            item_id: line.item_id,
            supply_warehouse_id: line.supply_warehouse_id,
            quantity: line.quantity,
            amount,
            dist_info,
            delivery_ts: None,
        });
    }

    txn.insert_order(&order)?;
    txn.insert_new_order(&new_order_row)?;
    for line in &order_lines {
        txn.insert_order_line(line)?;
    }
    txn.commit()?;
    Ok(TxnOutcome::Committed)
}

// ────────────────────────────────────────────────────────────────────────────────
// Payment
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PaymentInput {
    pub warehouse_id: u64,
    pub district_id: u64,
    /// Customer id used when `by_name` is false or the name matches
    /// nothing.
    pub customer_id: u64,
    /// Customer's home warehouse/district; differs from the paying
    /// district 15% of the time.
    pub customer_warehouse_id: u64,
    pub customer_district_id: u64,
    pub amount: f64,
    pub by_name: bool,
    pub last_name: String,
}

impl PaymentInput {
    pub fn generate<R: Rng>(rng: &mut R, ctx: &TxnContext) -> Self {
        let warehouse_id = ctx.keyspace.random_warehouse(rng);
        let district_id = ctx.keyspace.random_district(rng);
        let customer_id = ctx.keyspace.random_customer(rng);
        let amount = rng.gen_range(1..5000) as f64;
        let by_name = rng.gen_range(0..100) < 60;
        let (customer_warehouse_id, customer_district_id) = if rng.gen_range(0..100) < 85 {
            (warehouse_id, district_id)
        } else {
            (
                ctx.topology.other_warehouse(rng, warehouse_id),
                ctx.keyspace.random_district(rng),
            )
        };
        Self {
            warehouse_id,
            district_id,
            customer_id,
            customer_warehouse_id,
            customer_district_id,
            amount,
            by_name,
            last_name: random_last_name(rng),
        }
    }
}

/// Resolves the paying customer (by last name 60% of the time), then moves
/// the amount through customer balance, district ytd, warehouse ytd and an
/// append-only History row.
pub fn payment(store: &dyn Store, input: &PaymentInput) -> StoreResult<TxnOutcome> {
    let mut txn = store.begin(false)?;

    let mut customer_id = input.customer_id;
    if input.by_name {
        let mut count = txn.count_customers_by_last_name(
            input.customer_warehouse_id,
            input.customer_district_id,
            &input.last_name,
        )?;
        if count % 2 == 0 {
            count += 1;
        }
        let ids = txn.customer_ids_by_last_name(
            input.customer_warehouse_id,
            input.customer_district_id,
            &input.last_name,
        )?;
        // Reference-benchmark convention: force the count odd and take the
        // entry at min(count, matches) - 1 of the first-name-ordered list.
        // It narrows to a single customer by design; do not "fix" it.
        if !ids.is_empty() {
            customer_id = ids[(count as usize).min(ids.len()) - 1];
        }
    }

    let mut customer = txn
        .customer(CustomerKey {
            warehouse_id: input.customer_warehouse_id,
            district_id: input.customer_district_id,
            customer_id,
        })?
        .ok_or(StoreError::not_found("customer"))?;
    customer.balance -= input.amount;
    customer.ytd_payment += input.amount;

    let mut district = txn
        .district(DistrictKey {
            warehouse_id: input.customer_warehouse_id,
            district_id: input.customer_district_id,
        })?
        .ok_or(StoreError::not_found("district"))?;
    district.ytd += input.amount;

    let mut warehouse = txn
        .warehouse(input.customer_warehouse_id)?
        .ok_or(StoreError::not_found("warehouse"))?;
    warehouse.ytd += input.amount;

    let ts = now_millis();
    if customer.credit == CREDIT_BAD {
        let mut data = format!(
            "| {:4} {:2} {:4} {:2} {:4} ${:7.2} {:12} {:24}",
            customer_id,
            unskew(input.customer_district_id),
            unskew(input.customer_warehouse_id),
            unskew(input.district_id),
            unskew(input.warehouse_id),
            input.amount,
            ts,
            customer.data,
        );
        data.truncate(CUSTOMER_DATA_MAX);
        customer.data = data;
    }

    txn.update_customer(&customer)?;
    txn.update_district(&district)?;
    txn.update_warehouse(&warehouse)?;
    txn.insert_history(&History {
        customer_id,
        customer_district_id: input.customer_district_id,
        customer_warehouse_id: input.customer_warehouse_id,
        district_id: input.district_id,
        warehouse_id: input.warehouse_id,
        ts,
        amount: input.amount,
        data: format!("{:10} {:10}", warehouse.name, district.name),
    })?;

    txn.commit()?;
    Ok(TxnOutcome::Committed)
}

// ────────────────────────────────────────────────────────────────────────────────
// Order-Status
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OrderStatusInput {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub customer_id: u64,
    pub by_name: bool,
    pub last_name: String,
}

impl OrderStatusInput {
    pub fn generate<R: Rng>(rng: &mut R, ctx: &TxnContext) -> Self {
        Self {
            warehouse_id: ctx.keyspace.random_warehouse(rng),
            district_id: ctx.keyspace.random_district(rng),
            customer_id: ctx.keyspace.random_customer(rng),
            by_name: rng.gen_range(0..100) < 60,
            last_name: random_last_name(rng),
        }
    }
}

/// Read-only: resolves the customer and reads their latest order and its
/// lines. The transaction boundary is still opened and committed so the
/// collaborator's isolation settings apply.
pub fn order_status(store: &dyn Store, input: &OrderStatusInput) -> StoreResult<TxnOutcome> {
    let mut txn = store.begin(true)?;

    let mut customer_id = Some(input.customer_id);
    if input.by_name {
        let mut count = txn.count_customers_by_last_name(
            input.warehouse_id,
            input.district_id,
            &input.last_name,
        )?;
        if count % 2 == 0 {
            count += 1;
        }
        let ids = txn.customer_ids_by_last_name(
            input.warehouse_id,
            input.district_id,
            &input.last_name,
        )?;
        customer_id = if ids.is_empty() {
            None
        } else {
            Some(ids[(count as usize).min(ids.len()) - 1])
        };
    }

    if let Some(customer_id) = customer_id {
        let key = CustomerKey {
            warehouse_id: input.warehouse_id,
            district_id: input.district_id,
            customer_id,
        };
        if txn.customer(key)?.is_some() {
            if let Some(order) = txn.latest_order(key)? {
                // Touch every line, as the status screen would.
                for line in txn.order_lines(order.key())? {
                    let _ = line.item_id;
                }
            }
        }
    }

    txn.commit()?;
    Ok(TxnOutcome::Committed)
}

// ────────────────────────────────────────────────────────────────────────────────
// Delivery
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DeliveryInput {
    pub warehouse_id: u64,
    pub carrier_id: u64,
}

impl DeliveryInput {
    pub fn generate<R: Rng>(rng: &mut R, ctx: &TxnContext) -> Self {
        Self {
            warehouse_id: ctx.keyspace.random_warehouse(rng),
            carrier_id: rng.gen_range(0..10),
        }
    }
}

/// Ships the oldest undelivered order of every district in the warehouse,
/// inside one transaction. Districts without a backlog are skipped
/// silently.
pub fn delivery(
    store: &dyn Store,
    input: &DeliveryInput,
    districts_per_warehouse: u64,
) -> StoreResult<TxnOutcome> {
    let mut txn = store.begin(false)?;
    let ts = now_millis();

    for ordinal in 0..districts_per_warehouse {
        let district_id = skew(ordinal);
        let Some(new_order_row) = txn.oldest_new_order(input.warehouse_id, district_id)? else {
            continue;
        };

        let order_key = new_order_row.key();
        let mut order = txn
            .order(order_key)?
            .ok_or(StoreError::not_found("order"))?;
        txn.delete_new_order(order_key)?;
        order.carrier_id = Some(input.carrier_id);
        txn.update_order(&order)?;

        let mut amount_sum = 0.0;
        for mut line in txn.order_lines(order_key)? {
            amount_sum += line.amount;
            line.delivery_ts = Some(ts);
            txn.update_order_line(&line)?;
        }

        let mut customer = txn
            .customer(CustomerKey {
                warehouse_id: input.warehouse_id,
                district_id,
                customer_id: order.customer_id,
            })?
            .ok_or(StoreError::not_found("customer"))?;
        customer.balance += amount_sum;
        customer.delivery_cnt += 1;
        txn.update_customer(&customer)?;
    }

    txn.commit()?;
    Ok(TxnOutcome::Committed)
}

// ────────────────────────────────────────────────────────────────────────────────
// Stock-Level
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StockLevelInput {
    pub warehouse_id: u64,
    pub district_id: u64,
    pub threshold: i64,
}

impl StockLevelInput {
    pub fn generate<R: Rng>(rng: &mut R, ctx: &TxnContext) -> Self {
        Self {
            warehouse_id: ctx.keyspace.random_warehouse(rng),
            district_id: ctx.keyspace.random_district(rng),
            threshold: rng.gen_range(10..=20),
        }
    }
}

/// Read-only: counts distinct items in the district's last 20 orders whose
/// stock has fallen below the threshold. Returns the distinct count.
pub fn stock_level(store: &dyn Store, input: &StockLevelInput) -> StoreResult<usize> {
    let mut txn = store.begin(true)?;

    let district = txn
        .district(DistrictKey {
            warehouse_id: input.warehouse_id,
            district_id: input.district_id,
        })?
        .ok_or(StoreError::not_found("district"))?;
    let next_order_id = district.next_order_id;

    let item_ids = txn.low_stock_item_ids(
        input.warehouse_id,
        input.district_id,
        next_order_id.saturating_sub(20),
        next_order_id,
        input.threshold,
    )?;
    // The canonical benchmark re-counts each low-stock item individually;
    // the recount adds nothing to the statistic but is part of the
    // measured query shape.
    for &item_id in &item_ids {
        let _ = txn.count_stock_below(input.warehouse_id, item_id, input.threshold)?;
    }

    txn.commit()?;
    Ok(item_ids.len())
}

// ────────────────────────────────────────────────────────────────────────────────
// Dispatch
// ────────────────────────────────────────────────────────────────────────────────

/// Generates inputs for `kind` and runs it.
pub fn execute<R: Rng>(
    store: &dyn Store,
    kind: TxnType,
    rng: &mut R,
    ctx: &TxnContext,
) -> StoreResult<TxnOutcome> {
    match kind {
        TxnType::NewOrder => new_order(store, &NewOrderInput::generate(rng, ctx)),
        TxnType::Payment => payment(store, &PaymentInput::generate(rng, ctx)),
        TxnType::OrderStatus => order_status(store, &OrderStatusInput::generate(rng, ctx)),
        TxnType::Delivery => delivery(
            store,
            &DeliveryInput::generate(rng, ctx),
            ctx.keyspace.districts_per_warehouse(),
        ),
        TxnType::StockLevel => stock_level(store, &StockLevelInput::generate(rng, ctx))
            .map(|_| TxnOutcome::Committed),
    }
}
