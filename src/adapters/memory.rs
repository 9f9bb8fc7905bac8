//! In-memory transactional store adapter.
//!
//! `BTreeMap` tables behind a `parking_lot` read-write lock. Read-write
//! transactions serialize through a writer mutex and buffer every mutation
//! in an overlay that is applied atomically at commit; rollback simply
//! drops the overlay. That gives writers serializable isolation, which is
//! stronger than the snapshot isolation the engine assumes, and makes
//! "rollback persists nothing" directly observable. Read-only transactions
//! take only short read locks.

use crate::model::{
    Customer, CustomerKey, District, DistrictKey, History, Item, NewOrder, Order, OrderKey,
    OrderLine, OrderLineKey, Stock, StockKey, Warehouse,
};
use crate::store::{Store, StoreError, StoreResult, StoreTxn};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Tables {
    warehouses: BTreeMap<u64, Warehouse>,
    districts: BTreeMap<DistrictKey, District>,
    customers: BTreeMap<CustomerKey, Customer>,
    items: BTreeMap<u64, Item>,
    stocks: BTreeMap<StockKey, Stock>,
    orders: BTreeMap<OrderKey, Order>,
    new_orders: BTreeMap<OrderKey, NewOrder>,
    order_lines: BTreeMap<OrderLineKey, OrderLine>,
    histories: Vec<History>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    writer: Mutex<()>,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed transactions so far (tests assert the designed rollback
    /// path never commits).
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    pub fn rollback_count(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    /// Snapshot of every district, for invariant checks.
    pub fn districts(&self) -> Vec<District> {
        self.tables.read().districts.values().cloned().collect()
    }

    /// Snapshot of every stock row, for invariant checks.
    pub fn stocks(&self) -> Vec<Stock> {
        self.tables.read().stocks.values().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.tables.read().histories.len()
    }

    pub fn new_order_count(&self) -> usize {
        self.tables.read().new_orders.len()
    }
}

impl Store for MemoryStore {
    fn begin<'a>(&'a self, read_only: bool) -> StoreResult<Box<dyn StoreTxn + 'a>> {
        let writer = if read_only {
            None
        } else {
            Some(self.writer.lock())
        };
        Ok(Box::new(MemoryTxn {
            store: self,
            _writer: writer,
            read_only,
            buf: Overlay::default(),
        }))
    }
}

/// Buffered uncommitted writes; `None` in `new_orders` is a tombstone.
#[derive(Default)]
struct Overlay {
    warehouses: HashMap<u64, Warehouse>,
    items: HashMap<u64, Item>,
    districts: HashMap<DistrictKey, District>,
    customers: HashMap<CustomerKey, Customer>,
    stocks: HashMap<StockKey, Stock>,
    orders: HashMap<OrderKey, Order>,
    new_orders: HashMap<OrderKey, Option<NewOrder>>,
    order_lines: HashMap<OrderLineKey, OrderLine>,
    histories: Vec<History>,
}

pub struct MemoryTxn<'a> {
    store: &'a MemoryStore,
    _writer: Option<MutexGuard<'a, ()>>,
    read_only: bool,
    buf: Overlay,
}

impl MemoryTxn<'_> {
    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::Backend(
                "write attempted in read-only transaction".into(),
            ));
        }
        Ok(())
    }
}

impl StoreTxn for MemoryTxn<'_> {
    fn warehouse(&mut self, id: u64) -> StoreResult<Option<Warehouse>> {
        if let Some(w) = self.buf.warehouses.get(&id) {
            return Ok(Some(w.clone()));
        }
        Ok(self.store.tables.read().warehouses.get(&id).cloned())
    }

    fn district(&mut self, key: DistrictKey) -> StoreResult<Option<District>> {
        if let Some(d) = self.buf.districts.get(&key) {
            return Ok(Some(d.clone()));
        }
        Ok(self.store.tables.read().districts.get(&key).cloned())
    }

    fn customer(&mut self, key: CustomerKey) -> StoreResult<Option<Customer>> {
        if let Some(c) = self.buf.customers.get(&key) {
            return Ok(Some(c.clone()));
        }
        Ok(self.store.tables.read().customers.get(&key).cloned())
    }

    fn item(&mut self, id: u64) -> StoreResult<Option<Item>> {
        if let Some(i) = self.buf.items.get(&id) {
            return Ok(Some(i.clone()));
        }
        Ok(self.store.tables.read().items.get(&id).cloned())
    }

    fn stock(&mut self, key: StockKey) -> StoreResult<Option<Stock>> {
        if let Some(s) = self.buf.stocks.get(&key) {
            return Ok(Some(s.clone()));
        }
        Ok(self.store.tables.read().stocks.get(&key).cloned())
    }

    fn order(&mut self, key: OrderKey) -> StoreResult<Option<Order>> {
        if let Some(o) = self.buf.orders.get(&key) {
            return Ok(Some(o.clone()));
        }
        Ok(self.store.tables.read().orders.get(&key).cloned())
    }

    fn update_warehouse(&mut self, warehouse: &Warehouse) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    fn update_district(&mut self, district: &District) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.districts.insert(district.key(), district.clone());
        Ok(())
    }

    fn update_customer(&mut self, customer: &Customer) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.customers.insert(customer.key(), customer.clone());
        Ok(())
    }

    fn update_stock(&mut self, stock: &Stock) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.stocks.insert(stock.key(), stock.clone());
        Ok(())
    }

    fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.orders.insert(order.key(), order.clone());
        Ok(())
    }

    fn update_order_line(&mut self, line: &OrderLine) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.order_lines.insert(line.key(), line.clone());
        Ok(())
    }

    fn insert_item(&mut self, item: &Item) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.items.insert(item.id, item.clone());
        Ok(())
    }

    fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        self.check_writable()?;
        let key = order.key();
        if self.buf.orders.contains_key(&key)
            || self.store.tables.read().orders.contains_key(&key)
        {
            return Err(StoreError::Conflict(format!("duplicate order {key:?}")));
        }
        self.buf.orders.insert(key, order.clone());
        Ok(())
    }

    fn insert_new_order(&mut self, new_order: &NewOrder) -> StoreResult<()> {
        self.check_writable()?;
        let key = new_order.key();
        let buffered = matches!(self.buf.new_orders.get(&key), Some(Some(_)));
        if buffered || self.store.tables.read().new_orders.contains_key(&key) {
            return Err(StoreError::Conflict(format!("duplicate new-order {key:?}")));
        }
        self.buf.new_orders.insert(key, Some(new_order.clone()));
        Ok(())
    }

    fn insert_order_line(&mut self, line: &OrderLine) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.order_lines.insert(line.key(), line.clone());
        Ok(())
    }

    fn insert_history(&mut self, history: &History) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.histories.push(history.clone());
        Ok(())
    }

    fn delete_new_order(&mut self, key: OrderKey) -> StoreResult<()> {
        self.check_writable()?;
        self.buf.new_orders.insert(key, None);
        Ok(())
    }

    fn count_customers_by_last_name(
        &mut self,
        warehouse_id: u64,
        district_id: u64,
        last: &str,
    ) -> StoreResult<u64> {
        Ok(self.customer_ids_by_last_name(warehouse_id, district_id, last)?.len() as u64)
    }

    fn customer_ids_by_last_name(
        &mut self,
        warehouse_id: u64,
        district_id: u64,
        last: &str,
    ) -> StoreResult<Vec<u64>> {
        let lo = CustomerKey {
            warehouse_id,
            district_id,
            customer_id: 0,
        };
        let hi = CustomerKey {
            warehouse_id,
            district_id,
            customer_id: u64::MAX,
        };
        let tables = self.store.tables.read();
        // Name fields are immutable after load, so the overlay cannot
        // change which customers match.
        let mut matches: Vec<(String, u64)> = tables
            .customers
            .range(lo..=hi)
            .filter(|(_, c)| c.last == last)
            .map(|(_, c)| (c.first.clone(), c.id))
            .collect();
        matches.sort();
        Ok(matches.into_iter().map(|(_, id)| id).collect())
    }

    fn oldest_new_order(
        &mut self,
        warehouse_id: u64,
        district_id: u64,
    ) -> StoreResult<Option<NewOrder>> {
        let lo = OrderKey {
            warehouse_id,
            district_id,
            order_id: 0,
        };
        let hi = OrderKey {
            warehouse_id,
            district_id,
            order_id: u64::MAX,
        };
        let tables = self.store.tables.read();
        let base = tables
            .new_orders
            .range(lo..=hi)
            .filter(|(key, _)| !matches!(self.buf.new_orders.get(key), Some(None)))
            .map(|(_, no)| no.clone());
        let buffered = self
            .buf
            .new_orders
            .iter()
            .filter(|(key, _)| key.warehouse_id == warehouse_id && key.district_id == district_id)
            .filter_map(|(_, no)| no.clone());
        Ok(base
            .chain(buffered)
            .min_by_key(|no| no.order_id))
    }

    fn latest_order(&mut self, key: CustomerKey) -> StoreResult<Option<Order>> {
        let lo = OrderKey {
            warehouse_id: key.warehouse_id,
            district_id: key.district_id,
            order_id: 0,
        };
        let hi = OrderKey {
            warehouse_id: key.warehouse_id,
            district_id: key.district_id,
            order_id: u64::MAX,
        };
        let tables = self.store.tables.read();
        let base = tables
            .orders
            .range(lo..=hi)
            .map(|(_, o)| o)
            .filter(|o| o.customer_id == key.customer_id)
            .cloned();
        let buffered = self
            .buf
            .orders
            .values()
            .filter(|o| {
                o.warehouse_id == key.warehouse_id
                    && o.district_id == key.district_id
                    && o.customer_id == key.customer_id
            })
            .cloned();
        Ok(base.chain(buffered).max_by_key(|o| o.id))
    }

    fn order_lines(&mut self, key: OrderKey) -> StoreResult<Vec<OrderLine>> {
        let lo = OrderLineKey {
            warehouse_id: key.warehouse_id,
            district_id: key.district_id,
            order_id: key.order_id,
            number: 0,
        };
        let hi = OrderLineKey {
            warehouse_id: key.warehouse_id,
            district_id: key.district_id,
            order_id: key.order_id,
            number: u64::MAX,
        };
        let tables = self.store.tables.read();
        let mut lines: BTreeMap<OrderLineKey, OrderLine> = tables
            .order_lines
            .range(lo..=hi)
            .map(|(k, l)| (*k, l.clone()))
            .collect();
        for (k, l) in &self.buf.order_lines {
            if k.warehouse_id == key.warehouse_id
                && k.district_id == key.district_id
                && k.order_id == key.order_id
            {
                lines.insert(*k, l.clone());
            }
        }
        Ok(lines.into_values().collect())
    }

    fn low_stock_item_ids(
        &mut self,
        warehouse_id: u64,
        district_id: u64,
        order_id_lo: u64,
        order_id_hi: u64,
        threshold: i64,
    ) -> StoreResult<Vec<u64>> {
        let lo = OrderLineKey {
            warehouse_id,
            district_id,
            order_id: order_id_lo,
            number: 0,
        };
        let hi = OrderLineKey {
            warehouse_id,
            district_id,
            order_id: order_id_hi,
            number: 0,
        };
        let item_ids: BTreeSet<u64> = {
            let tables = self.store.tables.read();
            tables
                .order_lines
                .range(lo..hi)
                .map(|(_, l)| l.item_id)
                .collect()
        };
        let mut low = Vec::new();
        for item_id in item_ids {
            let key = StockKey {
                warehouse_id,
                item_id,
            };
            if let Some(stock) = self.stock(key)? {
                if stock.quantity < threshold {
                    low.push(item_id);
                }
            }
        }
        Ok(low)
    }

    fn count_stock_below(
        &mut self,
        warehouse_id: u64,
        item_id: u64,
        threshold: i64,
    ) -> StoreResult<u64> {
        let key = StockKey {
            warehouse_id,
            item_id,
        };
        match self.stock(key)? {
            Some(stock) if stock.quantity < threshold => Ok(1),
            _ => Ok(0),
        }
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        if !self.read_only {
            let mut tables = self.store.tables.write();
            for (id, w) in self.buf.warehouses {
                tables.warehouses.insert(id, w);
            }
            for (id, i) in self.buf.items {
                tables.items.insert(id, i);
            }
            for (k, d) in self.buf.districts {
                tables.districts.insert(k, d);
            }
            for (k, c) in self.buf.customers {
                tables.customers.insert(k, c);
            }
            for (k, s) in self.buf.stocks {
                tables.stocks.insert(k, s);
            }
            for (k, o) in self.buf.orders {
                tables.orders.insert(k, o);
            }
            for (k, no) in self.buf.new_orders {
                match no {
                    Some(no) => {
                        tables.new_orders.insert(k, no);
                    }
                    None => {
                        tables.new_orders.remove(&k);
                    }
                }
            }
            for (k, l) in self.buf.order_lines {
                tables.order_lines.insert(k, l);
            }
            tables.histories.extend(self.buf.histories);
        }
        self.store.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.store.rollbacks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse(id: u64) -> Warehouse {
        Warehouse {
            id,
            name: format!("wh-{id}"),
            tax: 0.1,
            ytd: 0.0,
        }
    }

    fn seed_warehouse(store: &MemoryStore, id: u64) {
        store.tables.write().warehouses.insert(id, warehouse(id));
    }

    #[test]
    fn committed_writes_become_visible() {
        let store = MemoryStore::new();
        seed_warehouse(&store, 7);

        let mut txn = store.begin(false).unwrap();
        let mut w = txn.warehouse(7).unwrap().unwrap();
        w.ytd += 100.0;
        txn.update_warehouse(&w).unwrap();
        txn.commit().unwrap();

        let mut txn = store.begin(true).unwrap();
        assert_eq!(txn.warehouse(7).unwrap().unwrap().ytd, 100.0);
        txn.commit().unwrap();
        assert_eq!(store.commit_count(), 2);
    }

    #[test]
    fn rollback_discards_every_buffered_write() {
        let store = MemoryStore::new();
        seed_warehouse(&store, 1);

        let mut txn = store.begin(false).unwrap();
        let mut w = txn.warehouse(1).unwrap().unwrap();
        w.ytd = 999.0;
        txn.update_warehouse(&w).unwrap();
        txn.insert_history(&History {
            customer_id: 0,
            customer_district_id: 0,
            customer_warehouse_id: 1,
            district_id: 0,
            warehouse_id: 1,
            ts: 0,
            amount: 1.0,
            data: String::new(),
        })
        .unwrap();
        txn.rollback().unwrap();

        let mut txn = store.begin(true).unwrap();
        assert_eq!(txn.warehouse(1).unwrap().unwrap().ytd, 0.0);
        drop(txn);
        assert_eq!(store.history_len(), 0);
        assert_eq!(store.commit_count(), 0);
        assert_eq!(store.rollback_count(), 1);
    }

    #[test]
    fn reads_see_own_uncommitted_writes() {
        let store = MemoryStore::new();
        seed_warehouse(&store, 3);

        let mut txn = store.begin(false).unwrap();
        let mut w = txn.warehouse(3).unwrap().unwrap();
        w.ytd = 5.0;
        txn.update_warehouse(&w).unwrap();
        assert_eq!(txn.warehouse(3).unwrap().unwrap().ytd, 5.0);
        txn.rollback().unwrap();
    }

    #[test]
    fn read_only_transactions_reject_writes() {
        let store = MemoryStore::new();
        seed_warehouse(&store, 2);
        let mut txn = store.begin(true).unwrap();
        let w = txn.warehouse(2).unwrap().unwrap();
        assert!(matches!(
            txn.update_warehouse(&w),
            Err(StoreError::Backend(_))
        ));
        txn.commit().unwrap();
    }

    #[test]
    fn deleted_new_order_is_invisible_to_oldest_lookup() {
        let store = MemoryStore::new();
        {
            let mut tables = store.tables.write();
            for oid in [10, 11] {
                tables.new_orders.insert(
                    OrderKey {
                        warehouse_id: 0,
                        district_id: 0,
                        order_id: oid,
                    },
                    NewOrder {
                        warehouse_id: 0,
                        district_id: 0,
                        order_id: oid,
                        customer_id: 4,
                    },
                );
            }
        }
        let mut txn = store.begin(false).unwrap();
        let oldest = txn.oldest_new_order(0, 0).unwrap().unwrap();
        assert_eq!(oldest.order_id, 10);
        txn.delete_new_order(oldest.key()).unwrap();
        let next = txn.oldest_new_order(0, 0).unwrap().unwrap();
        assert_eq!(next.order_id, 11);
        txn.commit().unwrap();
        assert_eq!(store.new_order_count(), 1);
    }

    #[test]
    fn duplicate_order_insert_conflicts() {
        let store = MemoryStore::new();
        let order = Order {
            warehouse_id: 0,
            district_id: 0,
            id: 1,
            customer_id: 0,
            entry_ts: 0,
            carrier_id: None,
            line_count: 5,
            all_local: true,
        };
        let mut txn = store.begin(false).unwrap();
        txn.insert_order(&order).unwrap();
        assert!(matches!(
            txn.insert_order(&order),
            Err(StoreError::Conflict(_))
        ));
        txn.rollback().unwrap();
    }
}
