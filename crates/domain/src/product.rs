//! Catalog products and their stock rules.

use common::{ProductId, SellerId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A persisted catalog product.
///
/// `stock` is unsigned, so the non-negative stock invariant holds by
/// construction; the methods below keep every mutation inside it.
/// `version` is owned by the store and only ever compared here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub version: Version,
}

impl Product {
    /// Fails with `InsufficientStock` if fewer than `quantity` units are on hand.
    pub fn check_stock(&self, quantity: u32) -> Result<(), DomainError> {
        if self.stock < quantity {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                available: self.stock,
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Removes `quantity` units from stock.
    pub fn decrease_stock(&mut self, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        self.check_stock(quantity)?;
        self.stock -= quantity;
        Ok(())
    }

    /// Returns `quantity` units to stock. There is no upper bound beyond
    /// the counter's range.
    pub fn increase_stock(&mut self, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        self.stock = self
            .stock
            .checked_add(quantity)
            .ok_or(DomainError::QuantityOverflow {
                current: self.stock,
                added: quantity,
            })?;
        Ok(())
    }

    /// Fails with `PermissionDenied` unless `seller_id` owns this product.
    pub fn verify_owner(&self, seller_id: SellerId) -> Result<(), DomainError> {
        if self.seller_id != seller_id {
            return Err(DomainError::PermissionDenied {
                resource: "product",
                id: self.id.as_i64(),
            });
        }
        Ok(())
    }

    pub fn update_price(&mut self, price: Money) -> Result<(), DomainError> {
        validate_price(price)?;
        self.price = price;
        Ok(())
    }

    /// Applies the fields present in `update`.
    ///
    /// Every present field is validated before anything is written, so a
    /// rejected update leaves the product exactly as it was.
    pub fn apply_update(&mut self, update: &ProductUpdate) -> Result<(), DomainError> {
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        let stock = update.stock.map(validate_stock).transpose()?;
        if let Some(name) = &update.name {
            validate_name(name)?;
        }

        if let Some(name) = &update.name {
            self.name.clone_from(name);
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(stock) = stock {
            self.stock = stock;
        }
        Ok(())
    }
}

/// A product that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub seller_id: SellerId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
}

impl NewProduct {
    /// Validates the draft; the store assigns id and version on insert.
    pub fn new(
        seller_id: SellerId,
        name: impl Into<String>,
        description: Option<String>,
        price: Money,
        stock: u32,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        validate_name(&name)?;
        validate_price(price)?;
        Ok(Self {
            seller_id,
            name,
            description,
            price,
            stock,
        })
    }
}

/// Partial product update. Absent fields are left untouched.
///
/// `stock` is signed so that a negative direct set can be represented and
/// rejected rather than silently wrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i64>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
    }
}

fn validate_price(price: Money) -> Result<(), DomainError> {
    if !price.is_positive() {
        return Err(DomainError::InvalidPrice {
            price: price.cents(),
        });
    }
    Ok(())
}

fn validate_stock(stock: i64) -> Result<u32, DomainError> {
    u32::try_from(stock).map_err(|_| DomainError::NegativeStock { stock })
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::Blank { field: "name" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: u32) -> Product {
        Product {
            id: ProductId::new(1),
            seller_id: SellerId::new(10),
            name: "Keyboard".to_string(),
            description: None,
            price: Money::from_cents(10_000),
            stock,
            version: Version::first(),
        }
    }

    #[test]
    fn test_decrease_stock() {
        let mut p = product(100);
        p.decrease_stock(2).unwrap();
        assert_eq!(p.stock, 98);
    }

    #[test]
    fn test_decrease_stock_to_zero() {
        let mut p = product(3);
        p.decrease_stock(3).unwrap();
        assert_eq!(p.stock, 0);
    }

    #[test]
    fn test_decrease_stock_insufficient() {
        let mut p = product(100);
        let err = p.decrease_stock(1000).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product_id: ProductId::new(1),
                available: 100,
                requested: 1000,
            }
        );
        assert_eq!(p.stock, 100);
    }

    #[test]
    fn test_decrease_stock_zero_quantity() {
        let mut p = product(5);
        assert!(matches!(
            p.decrease_stock(0),
            Err(DomainError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn test_increase_stock() {
        let mut p = product(0);
        p.increase_stock(7).unwrap();
        assert_eq!(p.stock, 7);
        assert!(matches!(
            p.increase_stock(0),
            Err(DomainError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_increase_stock_overflow() {
        let mut p = product(u32::MAX);
        assert!(matches!(
            p.increase_stock(1),
            Err(DomainError::QuantityOverflow { .. })
        ));
        assert_eq!(p.stock, u32::MAX);
    }

    #[test]
    fn test_decrease_then_increase_restores_stock() {
        let mut p = product(42);
        p.decrease_stock(5).unwrap();
        p.increase_stock(5).unwrap();
        assert_eq!(p.stock, 42);
    }

    #[test]
    fn test_verify_owner() {
        let p = product(1);
        assert!(p.verify_owner(SellerId::new(10)).is_ok());
        assert_eq!(
            p.verify_owner(SellerId::new(11)),
            Err(DomainError::PermissionDenied {
                resource: "product",
                id: 1,
            })
        );
    }

    #[test]
    fn test_update_price_rejects_non_positive() {
        let mut p = product(1);
        assert!(p.update_price(Money::zero()).is_err());
        assert!(p.update_price(Money::from_cents(-5)).is_err());
        p.update_price(Money::from_cents(500)).unwrap();
        assert_eq!(p.price.cents(), 500);
    }

    #[test]
    fn test_apply_update_only_touches_present_fields() {
        let mut p = product(10);
        p.apply_update(&ProductUpdate {
            name: Some("Mechanical Keyboard".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(p.name, "Mechanical Keyboard");
        assert_eq!(p.price.cents(), 10_000);
        assert_eq!(p.stock, 10);
        assert_eq!(p.description, None);
    }

    #[test]
    fn test_apply_update_sets_stock_directly() {
        let mut p = product(10);
        p.apply_update(&ProductUpdate {
            stock: Some(0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(p.stock, 0);
    }

    #[test]
    fn test_apply_update_rejects_negative_stock_without_partial_write() {
        let mut p = product(10);
        let before = p.clone();
        let err = p
            .apply_update(&ProductUpdate {
                name: Some("Renamed".to_string()),
                stock: Some(-1),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(err, DomainError::NegativeStock { stock: -1 });
        assert_eq!(p, before);
    }

    #[test]
    fn test_apply_update_rejects_zero_price_without_partial_write() {
        let mut p = product(10);
        let before = p.clone();
        let result = p.apply_update(&ProductUpdate {
            description: Some("new".to_string()),
            price: Some(Money::zero()),
            ..Default::default()
        });

        assert!(matches!(result, Err(DomainError::InvalidPrice { price: 0 })));
        assert_eq!(p, before);
    }

    #[test]
    fn test_new_product_validation() {
        assert!(NewProduct::new(SellerId::new(1), "Mouse", None, Money::from_cents(100), 0).is_ok());
        assert!(matches!(
            NewProduct::new(SellerId::new(1), "Mouse", None, Money::zero(), 5),
            Err(DomainError::InvalidPrice { .. })
        ));
        assert!(matches!(
            NewProduct::new(SellerId::new(1), "  ", None, Money::from_cents(100), 5),
            Err(DomainError::Blank { field: "name" })
        ));
    }

    #[test]
    fn test_empty_update() {
        assert!(ProductUpdate::default().is_empty());
        assert!(
            !ProductUpdate {
                stock: Some(1),
                ..Default::default()
            }
            .is_empty()
        );
    }
}
