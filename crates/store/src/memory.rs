use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{CartItemId, OrderId, OrderItemId, ProductId, SellerId, UserId, Version};
use domain::{
    CartItem, NewCartItem, NewOrder, NewProduct, NewSeller, NewUser, Order, OrderItem,
    OrderStatus, Product, Seller, User, UserRole,
};
use tokio::sync::RwLock;

use crate::repository::{
    CartRepository, OrderRepository, ProductRepository, SellerRepository, Store, UnitOfWork,
    UserRepository,
};
use crate::{Page, ProductQuery, Result, StoreError};

#[derive(Debug, Default, Clone)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    sellers: BTreeMap<SellerId, Seller>,
    users: BTreeMap<UserId, User>,
}

/// Id sequences. Like database sequences, ids handed to a unit that
/// later rolls back are not reused.
#[derive(Debug, Default)]
struct Sequences {
    products: AtomicI64,
    orders: AtomicI64,
    order_items: AtomicI64,
    cart_items: AtomicI64,
    sellers: AtomicI64,
    users: AtomicI64,
}

fn next_id(sequence: &AtomicI64) -> i64 {
    sequence.fetch_add(1, Ordering::Relaxed) + 1
}

#[derive(Debug, Default)]
struct Faults {
    injected_conflicts: AtomicUsize,
    commits: AtomicUsize,
}

/// In-memory store for tests and database-less runs.
///
/// Each unit of work buffers its writes privately and publishes them
/// under the write lock on commit, after re-checking the version of
/// every versioned row it wrote. Two units that read the same version of
/// a row therefore conflict when the second one commits, just as two
/// database transactions would.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    sequences: Arc<Sequences>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` commits that write a versioned row fail
    /// with `ConcurrencyConflict`, as if another writer got there first.
    pub fn inject_conflicts(&self, count: usize) {
        self.faults
            .injected_conflicts
            .store(count, Ordering::SeqCst);
    }

    /// Returns how many commits have been attempted, successful or not.
    pub fn commit_count(&self) -> usize {
        self.faults.commits.load(Ordering::SeqCst)
    }

    /// Returns the total number of products stored.
    pub async fn product_count(&self) -> usize {
        self.tables.read().await.products.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Unit = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Unit> {
        Ok(InMemoryUnitOfWork {
            tables: Arc::clone(&self.tables),
            sequences: Arc::clone(&self.sequences),
            faults: Arc::clone(&self.faults),
            pending: Tables::default(),
            removed_cart_items: BTreeSet::new(),
            updated_cart_items: BTreeSet::new(),
            expected_products: HashMap::new(),
            expected_orders: HashMap::new(),
        })
    }
}

/// Unit of work over an [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    tables: Arc<RwLock<Tables>>,
    sequences: Arc<Sequences>,
    faults: Arc<Faults>,
    pending: Tables,
    removed_cart_items: BTreeSet<CartItemId>,
    /// Committed cart rows this unit rewrote. They must still exist at commit.
    updated_cart_items: BTreeSet<CartItemId>,
    /// Version each committed row had when this unit first wrote it.
    expected_products: HashMap<ProductId, Version>,
    expected_orders: HashMap<OrderId, Version>,
}

/// Committed rows overlaid with the unit's own writes.
fn merged<'a, K: Ord + Copy, V>(
    committed: &'a BTreeMap<K, V>,
    pending: &'a BTreeMap<K, V>,
) -> BTreeMap<K, &'a V> {
    let mut rows: BTreeMap<K, &V> = committed.iter().map(|(k, v)| (*k, v)).collect();
    rows.extend(pending.iter().map(|(k, v)| (*k, v)));
    rows
}

impl InMemoryUnitOfWork {
    fn visible_cart_items<'a>(&'a self, committed: &'a Tables) -> Vec<&'a CartItem> {
        merged(&committed.cart_items, &self.pending.cart_items)
            .into_iter()
            .filter(|(id, _)| !self.removed_cart_items.contains(id))
            .map(|(_, item)| item)
            .collect()
    }

    fn remove_cart_item(&mut self, id: CartItemId, committed_has_it: bool) {
        self.pending.cart_items.remove(&id);
        if committed_has_it {
            self.removed_cart_items.insert(id);
        }
    }

    fn has_versioned_writes(&self) -> bool {
        !self.expected_products.is_empty() || !self.expected_orders.is_empty()
    }

    fn check_versions(&self, committed: &Tables) -> Result<()> {
        for (id, expected) in &self.expected_products {
            let actual = committed
                .products
                .get(id)
                .map(|p| p.version)
                .ok_or(StoreError::NotFound {
                    entity: "product",
                    id: id.as_i64(),
                })?;
            if actual != *expected {
                return Err(StoreError::conflict("product", id.as_i64(), *expected, actual));
            }
        }
        for (id, expected) in &self.expected_orders {
            let actual = committed
                .orders
                .get(id)
                .map(|o| o.version)
                .ok_or(StoreError::NotFound {
                    entity: "order",
                    id: id.as_i64(),
                })?;
            if actual != *expected {
                return Err(StoreError::conflict("order", id.as_i64(), *expected, actual));
            }
        }
        Ok(())
    }

    /// Fails if another unit deleted a cart row this unit rewrote.
    fn check_cart_rows(&self, committed: &Tables) -> Result<()> {
        let gone = self.updated_cart_items.iter().find(|id| {
            !committed.cart_items.contains_key(*id) && !self.removed_cart_items.contains(*id)
        });
        match gone {
            Some(id) => Err(StoreError::NotFound {
                entity: "cart item",
                id: id.as_i64(),
            }),
            None => Ok(()),
        }
    }

    /// Re-checks uniqueness against rows other units committed meanwhile.
    fn check_unique(&self, committed: &Tables) -> Result<()> {
        for item in self.pending.cart_items.values() {
            let taken = committed.cart_items.values().any(|other| {
                other.id != item.id
                    && other.user_id == item.user_id
                    && other.product_id == item.product_id
                    && !self.removed_cart_items.contains(&other.id)
                    && !self.pending.cart_items.contains_key(&other.id)
            });
            if taken {
                return Err(duplicate("cart_items_user_product_key"));
            }
        }
        for seller in self.pending.sellers.values() {
            if committed
                .sellers
                .values()
                .any(|other| other.id != seller.id && other.user_id == seller.user_id)
            {
                return Err(duplicate("sellers_user_id_key"));
            }
        }
        for user in self.pending.users.values() {
            if committed
                .users
                .values()
                .any(|other| other.id != user.id && other.email == user.email)
            {
                return Err(duplicate("users_email_key"));
            }
        }
        Ok(())
    }
}

fn duplicate(constraint: &str) -> StoreError {
    StoreError::Duplicate {
        constraint: constraint.to_string(),
    }
}

#[async_trait]
impl ProductRepository for InMemoryUnitOfWork {
    async fn create_product(&mut self, product: NewProduct) -> Result<Product> {
        let product = Product {
            id: ProductId::new(next_id(&self.sequences.products)),
            seller_id: product.seller_id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            version: Version::first(),
        };
        self.pending.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn product_by_id(&mut self, id: ProductId) -> Result<Option<Product>> {
        let committed = self.tables.read().await;
        Ok(self
            .pending
            .products
            .get(&id)
            .or_else(|| committed.products.get(&id))
            .cloned())
    }

    async fn list_products(&mut self, query: ProductQuery) -> Result<Vec<Product>> {
        let committed = self.tables.read().await;
        let rows = merged(&committed.products, &self.pending.products);
        Ok(query.page.apply(
            rows.into_values()
                .filter(|p| query.seller_id.is_none_or(|seller| p.seller_id == seller))
                .cloned(),
        ))
    }

    async fn update_product(&mut self, product: &Product) -> Result<Product> {
        let committed = self.tables.read().await;
        let is_committed = committed.products.contains_key(&product.id);
        let current = self
            .pending
            .products
            .get(&product.id)
            .or_else(|| committed.products.get(&product.id))
            .ok_or(StoreError::NotFound {
                entity: "product",
                id: product.id.as_i64(),
            })?;
        if current.version != product.version {
            return Err(StoreError::conflict(
                "product",
                product.id.as_i64(),
                product.version,
                current.version,
            ));
        }

        let mut updated = product.clone();
        updated.version = product.version.next();
        if is_committed {
            self.expected_products
                .entry(product.id)
                .or_insert(product.version);
        }
        self.pending.products.insert(product.id, updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl OrderRepository for InMemoryUnitOfWork {
    async fn create_order(&mut self, order: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let items = order
            .lines()
            .iter()
            .map(|line| OrderItem {
                id: OrderItemId::new(next_id(&self.sequences.order_items)),
                product_id: line.product_id(),
                unit_price: line.unit_price(),
                quantity: line.quantity(),
            })
            .collect();
        let order = Order {
            id: OrderId::new(next_id(&self.sequences.orders)),
            user_id: order.user_id(),
            status: OrderStatus::Pending,
            total_price: order.total_price(),
            items,
            created_at: now,
            updated_at: now,
            version: Version::first(),
        };
        self.pending.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn order_by_id(&mut self, id: OrderId) -> Result<Option<Order>> {
        let committed = self.tables.read().await;
        Ok(self
            .pending
            .orders
            .get(&id)
            .or_else(|| committed.orders.get(&id))
            .cloned())
    }

    async fn list_orders_by_user(&mut self, user_id: UserId, page: Page) -> Result<Vec<Order>> {
        let committed = self.tables.read().await;
        let rows = merged(&committed.orders, &self.pending.orders);
        Ok(page.apply(
            rows.into_values()
                .filter(|o| o.user_id == user_id)
                .cloned(),
        ))
    }

    async fn update_order(&mut self, order: &Order) -> Result<Order> {
        let committed = self.tables.read().await;
        let is_committed = committed.orders.contains_key(&order.id);
        let current = self
            .pending
            .orders
            .get(&order.id)
            .or_else(|| committed.orders.get(&order.id))
            .ok_or(StoreError::NotFound {
                entity: "order",
                id: order.id.as_i64(),
            })?;
        if current.version != order.version {
            return Err(StoreError::conflict(
                "order",
                order.id.as_i64(),
                order.version,
                current.version,
            ));
        }

        let mut updated = current.clone();
        updated.status = order.status;
        updated.updated_at = Utc::now();
        updated.version = order.version.next();
        if is_committed {
            self.expected_orders.entry(order.id).or_insert(order.version);
        }
        self.pending.orders.insert(order.id, updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl CartRepository for InMemoryUnitOfWork {
    async fn cart_item(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>> {
        let committed = self.tables.read().await;
        Ok(self
            .visible_cart_items(&committed)
            .into_iter()
            .find(|item| item.user_id == user_id && item.product_id == product_id)
            .cloned())
    }

    async fn cart_items(&mut self, user_id: UserId) -> Result<Vec<CartItem>> {
        let committed = self.tables.read().await;
        Ok(self
            .visible_cart_items(&committed)
            .into_iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_cart_item(&mut self, item: NewCartItem) -> Result<CartItem> {
        let committed = self.tables.read().await;
        let exists = self
            .visible_cart_items(&committed)
            .into_iter()
            .any(|other| other.user_id == item.user_id && other.product_id == item.product_id);
        if exists {
            return Err(duplicate("cart_items_user_product_key"));
        }

        let item = CartItem {
            id: CartItemId::new(next_id(&self.sequences.cart_items)),
            user_id: item.user_id,
            product_id: item.product_id,
            quantity: item.quantity,
        };
        self.pending.cart_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_cart_item(&mut self, item: &CartItem) -> Result<CartItem> {
        let committed = self.tables.read().await;
        let exists = self
            .visible_cart_items(&committed)
            .into_iter()
            .any(|other| other.id == item.id);
        if !exists {
            return Err(StoreError::NotFound {
                entity: "cart item",
                id: item.id.as_i64(),
            });
        }
        if committed.cart_items.contains_key(&item.id) {
            self.updated_cart_items.insert(item.id);
        }
        self.pending.cart_items.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<()> {
        let committed_has_it = self.tables.read().await.cart_items.contains_key(&id);
        self.remove_cart_item(id, committed_has_it);
        Ok(())
    }

    async fn delete_cart_items_for_products(
        &mut self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<u64> {
        let committed = Arc::clone(&self.tables);
        let committed = committed.read().await;
        let doomed: Vec<CartItemId> = self
            .visible_cart_items(&committed)
            .into_iter()
            .filter(|item| item.user_id == user_id && product_ids.contains(&item.product_id))
            .map(|item| item.id)
            .collect();
        for id in &doomed {
            self.remove_cart_item(*id, committed.cart_items.contains_key(id));
        }
        Ok(doomed.len() as u64)
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64> {
        let committed = Arc::clone(&self.tables);
        let committed = committed.read().await;
        let doomed: Vec<CartItemId> = self
            .visible_cart_items(&committed)
            .into_iter()
            .filter(|item| item.user_id == user_id)
            .map(|item| item.id)
            .collect();
        for id in &doomed {
            self.remove_cart_item(*id, committed.cart_items.contains_key(id));
        }
        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl SellerRepository for InMemoryUnitOfWork {
    async fn seller_by_user(&mut self, user_id: UserId) -> Result<Option<Seller>> {
        let committed = self.tables.read().await;
        Ok(merged(&committed.sellers, &self.pending.sellers)
            .into_values()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn create_seller(&mut self, seller: NewSeller) -> Result<Seller> {
        let committed = self.tables.read().await;
        if merged(&committed.sellers, &self.pending.sellers)
            .into_values()
            .any(|s| s.user_id == seller.user_id)
        {
            return Err(duplicate("sellers_user_id_key"));
        }

        let seller = Seller {
            id: SellerId::new(next_id(&self.sequences.sellers)),
            user_id: seller.user_id,
            store_name: seller.store_name,
            description: seller.description,
        };
        self.pending.sellers.insert(seller.id, seller.clone());
        Ok(seller)
    }

    async fn update_seller(&mut self, seller: &Seller) -> Result<Seller> {
        let committed = self.tables.read().await;
        if !self.pending.sellers.contains_key(&seller.id)
            && !committed.sellers.contains_key(&seller.id)
        {
            return Err(StoreError::NotFound {
                entity: "seller",
                id: seller.id.as_i64(),
            });
        }
        self.pending.sellers.insert(seller.id, seller.clone());
        Ok(seller.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUnitOfWork {
    async fn create_user(&mut self, user: NewUser) -> Result<User> {
        let committed = self.tables.read().await;
        if merged(&committed.users, &self.pending.users)
            .into_values()
            .any(|u| u.email == user.email)
        {
            return Err(duplicate("users_email_key"));
        }

        let user = User {
            id: UserId::new(next_id(&self.sequences.users)),
            email: user.email,
            full_name: user.full_name,
            hashed_password: user.hashed_password,
            is_active: true,
            role: UserRole::Buyer,
        };
        self.pending.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        let committed = self.tables.read().await;
        Ok(merged(&committed.users, &self.pending.users)
            .into_values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>> {
        let committed = self.tables.read().await;
        Ok(self
            .pending
            .users
            .get(&id)
            .or_else(|| committed.users.get(&id))
            .cloned())
    }

    async fn update_user(&mut self, user: &User) -> Result<User> {
        let committed = self.tables.read().await;
        if !self.pending.users.contains_key(&user.id) && !committed.users.contains_key(&user.id) {
            return Err(StoreError::NotFound {
                entity: "user",
                id: user.id.as_i64(),
            });
        }
        self.pending.users.insert(user.id, user.clone());
        Ok(user.clone())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self) -> Result<()> {
        let lock = Arc::clone(&self.tables);
        let mut tables = lock.write().await;
        self.faults.commits.fetch_add(1, Ordering::SeqCst);

        if self.has_versioned_writes() {
            let injected = self.faults.injected_conflicts.fetch_update(
                Ordering::SeqCst,
                Ordering::SeqCst,
                |n| n.checked_sub(1),
            );
            if injected.is_ok() {
                let (entity, id, expected) = match self.expected_products.iter().next() {
                    Some((id, v)) => ("product", id.as_i64(), *v),
                    None => self
                        .expected_orders
                        .iter()
                        .next()
                        .map(|(id, v)| ("order", id.as_i64(), *v))
                        .unwrap_or(("order", 0, Version::first())),
                };
                return Err(StoreError::conflict(entity, id, expected, expected.next()));
            }
        }

        self.check_versions(&tables)?;
        self.check_cart_rows(&tables)?;
        self.check_unique(&tables)?;

        let Self {
            pending,
            removed_cart_items,
            ..
        } = self;
        tables.products.extend(pending.products);
        tables.orders.extend(pending.orders);
        tables.cart_items.extend(pending.cart_items);
        tables.sellers.extend(pending.sellers);
        tables.users.extend(pending.users);
        for id in removed_cart_items {
            tables.cart_items.remove(&id);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        tracing::debug!(
            discarded_products = self.pending.products.len(),
            discarded_orders = self.pending.orders.len(),
            "rolling back in-memory unit of work"
        );
        Ok(())
    }
}
