//! Catalog document types stored as JSON in the document store.

use serde::{Deserialize, Serialize};

/// User role carried in the JWT `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// bcrypt digest. Never leaves the store layer; responses use
    /// [`User::public`].
    pub password_digest: String,
    #[serde(default)]
    pub role: Role,
}

/// User representation safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Showroom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Structured garment category ("top" / "bottom" / "shorts"). Optional for
    /// legacy records; the overlay side falls back to name keywords.
    #[serde(default)]
    pub category: Option<String>,
    /// Garment image reference (URL or path).
    pub image: String,
    pub price: f64,
    /// Referenced showroom id.
    #[serde(default)]
    pub showroom: Option<String>,
}

/// Product with its showroom reference resolved, the way list/read endpoints
/// return it.
#[derive(Debug, Clone, Serialize)]
pub struct PopulatedProduct {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub image: String,
    pub price: f64,
    pub showroom: Option<Showroom>,
}

impl Product {
    pub fn populate(self, showroom: Option<Showroom>) -> PopulatedProduct {
        PopulatedProduct {
            id: self.id,
            name: self.name,
            category: self.category,
            image: self.image,
            price: self.price,
            showroom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Referenced product id.
    pub product: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Owning user id.
    pub user: String,
    pub items: Vec<OrderItem>,
    pub total_price: f64,
    #[serde(default)]
    pub status: OrderStatus,
    /// Unix timestamp (seconds).
    pub created_at: u64,
}

/// Request bodies, shaped like the stored documents minus server-assigned
/// fields.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShowroom {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub image: String,
    pub price: f64,
    #[serde(default)]
    pub showroom: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    /// Older frontends send `totalPrice`.
    #[serde(alias = "totalPrice")]
    pub total_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulatedOrderItem {
    pub product: Option<Product>,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulatedOrder {
    pub id: String,
    pub user: String,
    pub items: Vec<PopulatedOrderItem>,
    pub total_price: f64,
    pub status: OrderStatus,
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_order_status_serde() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        let status: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_user_defaults_to_user_role() {
        let json = r#"{
            "id": "1",
            "name": "Alice",
            "email": "alice@example.com",
            "password_digest": "$2b$12$abc"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn test_public_user_has_no_digest() {
        let user = User {
            id: "1".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_digest: "$2b$12$abc".to_string(),
            role: Role::Admin,
        };
        let json = serde_json::to_string(&user.public()).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("\"role\":\"admin\""));
    }

    #[test]
    fn test_product_roundtrip() {
        let json = r#"{
            "id": "7",
            "name": "Blue Jeans",
            "image": "https://cdn.example.com/jeans.png",
            "price": 49.9,
            "showroom": "2"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.category.is_none());
        assert_eq!(product.showroom.as_deref(), Some("2"));
    }
}
