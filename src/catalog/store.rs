//! Document store over redis.
//!
//! Each collection is one hash (`users`, `products`, ...) holding
//! `id -> JSON document` pairs, with ids allocated from an `INCR` counter per
//! collection. The demo's datasets are small, so secondary lookups
//! (orders by user, products by showroom) filter the collection in memory;
//! the only maintained index is `users:email -> id` for login.

use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::error::ApiError;
use super::models::{
    NewOrder, NewProduct, NewShowroom, Order, OrderStatus, Product, Role, Showroom, User,
};

const USERS: &str = "users";
const USER_EMAILS: &str = "users:email";
const PRODUCTS: &str = "products";
const SHOWROOMS: &str = "showrooms";
const ORDERS: &str = "orders";

#[derive(Clone)]
pub struct DocumentStore {
    connection: ConnectionManager,
}

impl DocumentStore {
    pub async fn connect(url: &str) -> Result<Self, ApiError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(3)
            .set_connection_timeout(Some(Duration::from_millis(500)));

        let client = Client::open(url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        tracing::info!("document store connected: {url}");
        Ok(Self { connection })
    }

    // --- generic document operations ---

    async fn alloc_id(&self, collection: &str) -> Result<String, ApiError> {
        let mut con = self.connection.clone();
        let id: i64 = con.incr(format!("{collection}:next_id"), 1).await?;
        Ok(id.to_string())
    }

    async fn put<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), ApiError> {
        let mut con = self.connection.clone();
        let json = serde_json::to_string(doc)?;
        let _: () = con.hset(collection, id, json).await?;
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, ApiError> {
        let mut con = self.connection.clone();
        let json: Option<String> = con.hget(collection, id).await?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn fetch_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, ApiError> {
        let mut con = self.connection.clone();
        let raw: HashMap<String, String> = con.hgetall(collection).await?;

        let mut entries: Vec<(String, String)> = raw.into_iter().collect();
        sort_by_numeric_id(&mut entries);

        entries
            .into_iter()
            .map(|(_, json)| serde_json::from_str(&json).map_err(ApiError::from))
            .collect()
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, ApiError> {
        let mut con = self.connection.clone();
        let removed: i64 = con.hdel(collection, id).await?;
        Ok(removed > 0)
    }

    // --- users ---

    /// Create a user, reserving the email atomically. `Err(UserExists)` when
    /// the email is already registered.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_digest: &str,
        role: Role,
    ) -> Result<User, ApiError> {
        let id = self.alloc_id(USERS).await?;

        let mut con = self.connection.clone();
        let reserved: bool = con.hset_nx(USER_EMAILS, email, &id).await?;
        if !reserved {
            return Err(ApiError::UserExists);
        }

        let user = User {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            password_digest: password_digest.to_string(),
            role,
        };
        self.put(USERS, &id, &user).await?;
        Ok(user)
    }

    pub async fn user_by_id(&self, id: &str) -> Result<Option<User>, ApiError> {
        self.fetch(USERS, id).await
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let mut con = self.connection.clone();
        let id: Option<String> = con.hget(USER_EMAILS, email).await?;
        match id {
            Some(id) => self.fetch(USERS, &id).await,
            None => Ok(None),
        }
    }

    // --- showrooms ---

    pub async fn create_showroom(&self, new: NewShowroom) -> Result<Showroom, ApiError> {
        let id = self.alloc_id(SHOWROOMS).await?;
        let showroom = Showroom {
            id: id.clone(),
            name: new.name,
            description: new.description,
            logo: new.logo,
        };
        self.put(SHOWROOMS, &id, &showroom).await?;
        Ok(showroom)
    }

    pub async fn showroom(&self, id: &str) -> Result<Option<Showroom>, ApiError> {
        self.fetch(SHOWROOMS, id).await
    }

    pub async fn showrooms(&self) -> Result<Vec<Showroom>, ApiError> {
        self.fetch_all(SHOWROOMS).await
    }

    pub async fn delete_showroom(&self, id: &str) -> Result<bool, ApiError> {
        self.remove(SHOWROOMS, id).await
    }

    // --- products ---

    pub async fn create_product(&self, new: NewProduct) -> Result<Product, ApiError> {
        let id = self.alloc_id(PRODUCTS).await?;
        let product = Product {
            id: id.clone(),
            name: new.name,
            category: new.category,
            image: new.image,
            price: new.price,
            showroom: new.showroom,
        };
        self.put(PRODUCTS, &id, &product).await?;
        Ok(product)
    }

    pub async fn product(&self, id: &str) -> Result<Option<Product>, ApiError> {
        self.fetch(PRODUCTS, id).await
    }

    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        self.fetch_all(PRODUCTS).await
    }

    pub async fn products_by_showroom(&self, showroom_id: &str) -> Result<Vec<Product>, ApiError> {
        let all: Vec<Product> = self.fetch_all(PRODUCTS).await?;
        Ok(all
            .into_iter()
            .filter(|p| p.showroom.as_deref() == Some(showroom_id))
            .collect())
    }

    pub async fn delete_product(&self, id: &str) -> Result<bool, ApiError> {
        self.remove(PRODUCTS, id).await
    }

    // --- orders ---

    pub async fn create_order(&self, user_id: &str, new: NewOrder) -> Result<Order, ApiError> {
        let id = self.alloc_id(ORDERS).await?;
        let order = Order {
            id: id.clone(),
            user: user_id.to_string(),
            items: new.items,
            total_price: new.total_price,
            status: OrderStatus::Pending,
            created_at: unix_now(),
        };
        self.put(ORDERS, &id, &order).await?;
        Ok(order)
    }

    pub async fn order(&self, id: &str) -> Result<Option<Order>, ApiError> {
        self.fetch(ORDERS, id).await
    }

    pub async fn orders_by_user(&self, user_id: &str) -> Result<Vec<Order>, ApiError> {
        let all: Vec<Order> = self.fetch_all(ORDERS).await?;
        Ok(all.into_iter().filter(|o| o.user == user_id).collect())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Stable listing order: numeric ids ascending, anything else after.
fn sort_by_numeric_id(entries: &mut [(String, String)]) {
    entries.sort_by_key(|(id, _)| id.parse::<u64>().unwrap_or(u64::MAX));
}
