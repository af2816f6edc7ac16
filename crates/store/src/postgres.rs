use std::collections::HashMap;

use async_trait::async_trait;
use common::{CartItemId, OrderId, OrderItemId, ProductId, SellerId, UserId, Version};
use domain::{
    CartItem, Money, NewCartItem, NewOrder, NewProduct, NewSeller, NewUser, Order, OrderItem,
    OrderStatus, Product, Seller, User, UserRole,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::repository::{
    CartRepository, OrderRepository, ProductRepository, SellerRepository, Store, UnitOfWork,
    UserRepository,
};
use crate::{Page, ProductQuery, Result, StoreError};

const PRODUCT_COLUMNS: &str = "id, seller_id, name, description, price, stock, version";
const ORDER_COLUMNS: &str = "id, user_id, status, total_price, created_at, updated_at, version";
const USER_COLUMNS: &str = "id, email, full_name, hashed_password, is_active, role";

/// PostgreSQL-backed store.
///
/// Each unit of work is one database transaction at the default
/// READ COMMITTED level. Versioned writes carry the expected version in
/// their `WHERE` clause, so a concurrent committed write makes the
/// update match zero rows instead of silently overwriting it.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Unit> {
        Ok(PgUnitOfWork {
            tx: self.pool.begin().await?,
        })
    }
}

/// Unit of work backed by a PostgreSQL transaction.
///
/// Dropping it without [`UnitOfWork::commit`] rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn decode_u32(column: &'static str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|e| StoreError::Decode {
        column,
        message: format!("{value}: {e}"),
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        seller_id: SellerId::new(row.try_get("seller_id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price")?),
        stock: decode_u32("stock", row.try_get("stock")?)?,
        version: Version::new(row.try_get("version")?),
    })
}

/// Maps an order row. Lines are attached separately.
fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        status: status.parse::<OrderStatus>().map_err(|e| StoreError::Decode {
            column: "status",
            message: e.to_string(),
        })?,
        total_price: Money::from_cents(row.try_get("total_price")?),
        items: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: Version::new(row.try_get("version")?),
    })
}

fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        unit_price: Money::from_cents(row.try_get("unit_price")?),
        quantity: decode_u32("quantity", row.try_get("quantity")?)?,
    })
}

fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: decode_u32("quantity", row.try_get("quantity")?)?,
    })
}

fn row_to_seller(row: &PgRow) -> Result<Seller> {
    Ok(Seller {
        id: SellerId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        store_name: row.try_get("store_name")?,
        description: row.try_get("description")?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        hashed_password: row.try_get("hashed_password")?,
        is_active: row.try_get("is_active")?,
        role: role.parse::<UserRole>().map_err(|e| StoreError::Decode {
            column: "role",
            message: e.to_string(),
        })?,
    })
}

impl PgUnitOfWork {
    /// Explains why a versioned `UPDATE` matched no row.
    async fn version_mismatch(
        &mut self,
        table: &'static str,
        entity: &'static str,
        id: i64,
        expected: Version,
    ) -> StoreError {
        let sql = format!("SELECT version FROM {table} WHERE id = $1");
        let probe: std::result::Result<Option<i64>, sqlx::Error> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await;
        match probe {
            Ok(Some(actual)) => StoreError::conflict(entity, id, expected, Version::new(actual)),
            Ok(None) => StoreError::NotFound { entity, id },
            Err(e) => e.into(),
        }
    }

    /// Loads lines for the given orders and attaches them in insertion order.
    async fn attach_items(&mut self, mut orders: Vec<Order>) -> Result<Vec<Order>> {
        if orders.is_empty() {
            return Ok(orders);
        }
        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, unit_price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let order_id: i64 = row.try_get("order_id")?;
            by_order
                .entry(order_id)
                .or_default()
                .push(row_to_order_item(row)?);
        }
        for order in &mut orders {
            order.items = by_order.remove(&order.id.as_i64()).unwrap_or_default();
        }
        Ok(orders)
    }
}

#[async_trait]
impl ProductRepository for PgUnitOfWork {
    async fn create_product(&mut self, product: NewProduct) -> Result<Product> {
        let sql = format!(
            "INSERT INTO products (seller_id, name, description, price, stock) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(product.seller_id.as_i64())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price.cents())
            .bind(i64::from(product.stock))
            .fetch_one(&mut *self.tx)
            .await?;
        row_to_product(&row)
    }

    async fn product_by_id(&mut self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_products(&mut self, query: ProductQuery) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::BIGINT IS NULL OR seller_id = $1) \
             ORDER BY id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(query.seller_id.map(|s| s.as_i64()))
            .bind(query.page.limit)
            .bind(query.page.offset)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn update_product(&mut self, product: &Product) -> Result<Product> {
        let sql = format!(
            "UPDATE products \
             SET name = $2, description = $3, price = $4, stock = $5, version = version + 1 \
             WHERE id = $1 AND version = $6 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(product.id.as_i64())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price.cents())
            .bind(i64::from(product.stock))
            .bind(product.version.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(self
                .version_mismatch("products", "product", product.id.as_i64(), product.version)
                .await),
        }
    }
}

#[async_trait]
impl OrderRepository for PgUnitOfWork {
    async fn create_order(&mut self, order: NewOrder) -> Result<Order> {
        let sql = format!(
            "INSERT INTO orders (user_id, status, total_price) VALUES ($1, $2, $3) \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(order.user_id().as_i64())
            .bind(OrderStatus::Pending.as_str())
            .bind(order.total_price().cents())
            .fetch_one(&mut *self.tx)
            .await?;
        let mut created = row_to_order(&row)?;

        for line in order.lines() {
            let item_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_items (order_id, product_id, unit_price, quantity)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(created.id.as_i64())
            .bind(line.product_id().as_i64())
            .bind(line.unit_price().cents())
            .bind(i64::from(line.quantity()))
            .fetch_one(&mut *self.tx)
            .await?;

            created.items.push(OrderItem {
                id: OrderItemId::new(item_id),
                product_id: line.product_id(),
                unit_price: line.unit_price(),
                quantity: line.quantity(),
            });
        }
        Ok(created)
    }

    async fn order_by_id(&mut self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let order = row_to_order(&row)?;
        Ok(self.attach_items(vec![order]).await?.pop())
    }

    async fn list_orders_by_user(&mut self, user_id: UserId, page: Page) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_i64())
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *self.tx)
            .await?;
        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
        self.attach_items(orders).await
    }

    async fn update_order(&mut self, order: &Order) -> Result<Order> {
        let sql = format!(
            "UPDATE orders SET status = $2, updated_at = NOW(), version = version + 1 \
             WHERE id = $1 AND version = $3 \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(order.id.as_i64())
            .bind(order.status.as_str())
            .bind(order.version.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => {
                let updated = row_to_order(&row)?;
                let mut loaded = self.attach_items(vec![updated]).await?;
                loaded.pop().ok_or(StoreError::NotFound {
                    entity: "order",
                    id: order.id.as_i64(),
                })
            }
            None => Err(self
                .version_mismatch("orders", "order", order.id.as_i64(), order.version)
                .await),
        }
    }
}

#[async_trait]
impl CartRepository for PgUnitOfWork {
    async fn cart_item(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>> {
        let row = sqlx::query(
            "SELECT id, user_id, product_id, quantity FROM cart_items \
             WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id.as_i64())
        .bind(product_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn cart_items(&mut self, user_id: UserId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(
            "SELECT id, user_id, product_id, quantity FROM cart_items \
             WHERE user_id = $1 ORDER BY id ASC",
        )
        .bind(user_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(row_to_cart_item).collect()
    }

    async fn create_cart_item(&mut self, item: NewCartItem) -> Result<CartItem> {
        let row = sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
             RETURNING id, user_id, product_id, quantity",
        )
        .bind(item.user_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(i64::from(item.quantity))
        .fetch_one(&mut *self.tx)
        .await?;
        row_to_cart_item(&row)
    }

    async fn update_cart_item(&mut self, item: &CartItem) -> Result<CartItem> {
        let row = sqlx::query(
            "UPDATE cart_items SET quantity = $2 WHERE id = $1 \
             RETURNING id, user_id, product_id, quantity",
        )
        .bind(item.id.as_i64())
        .bind(i64::from(item.quantity))
        .fetch_optional(&mut *self.tx)
        .await?;
        match row {
            Some(row) => row_to_cart_item(&row),
            None => Err(StoreError::NotFound {
                entity: "cart item",
                id: item.id.as_i64(),
            }),
        }
    }

    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_cart_items_for_products(
        &mut self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<u64> {
        let ids: Vec<i64> = product_ids.iter().map(|id| id.as_i64()).collect();
        let result =
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
                .bind(user_id.as_i64())
                .bind(&ids)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SellerRepository for PgUnitOfWork {
    async fn seller_by_user(&mut self, user_id: UserId) -> Result<Option<Seller>> {
        let row = sqlx::query(
            "SELECT id, user_id, store_name, description FROM sellers WHERE user_id = $1",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_seller).transpose()
    }

    async fn create_seller(&mut self, seller: NewSeller) -> Result<Seller> {
        let row = sqlx::query(
            "INSERT INTO sellers (user_id, store_name, description) VALUES ($1, $2, $3) \
             RETURNING id, user_id, store_name, description",
        )
        .bind(seller.user_id.as_i64())
        .bind(&seller.store_name)
        .bind(&seller.description)
        .fetch_one(&mut *self.tx)
        .await?;
        row_to_seller(&row)
    }

    async fn update_seller(&mut self, seller: &Seller) -> Result<Seller> {
        let row = sqlx::query(
            "UPDATE sellers SET store_name = $2, description = $3 WHERE id = $1 \
             RETURNING id, user_id, store_name, description",
        )
        .bind(seller.id.as_i64())
        .bind(&seller.store_name)
        .bind(&seller.description)
        .fetch_optional(&mut *self.tx)
        .await?;
        match row {
            Some(row) => row_to_seller(&row),
            None => Err(StoreError::NotFound {
                entity: "seller",
                id: seller.id.as_i64(),
            }),
        }
    }
}

#[async_trait]
impl UserRepository for PgUnitOfWork {
    async fn create_user(&mut self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (email, full_name, hashed_password) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.hashed_password)
            .fetch_one(&mut *self.tx)
            .await?;
        row_to_user(&row)
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn update_user(&mut self, user: &User) -> Result<User> {
        let sql = format!(
            "UPDATE users SET full_name = $2, hashed_password = $3, is_active = $4, role = $5 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id.as_i64())
            .bind(&user.full_name)
            .bind(&user.hashed_password)
            .bind(user.is_active)
            .bind(user.role.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        match row {
            Some(row) => row_to_user(&row),
            None => Err(StoreError::NotFound {
                entity: "user",
                id: user.id.as_i64(),
            }),
        }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
