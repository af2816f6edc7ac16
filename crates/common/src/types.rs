use serde::{Deserialize, Serialize};

/// Declares an `i64`-backed identifier assigned by the store on insert.
///
/// Each identifier is its own type so a `ProductId` can never be passed
/// where an `OrderId` is expected.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw database identifier.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a registered user account.
    UserId
);

entity_id!(
    /// Identifier of a seller profile. One per user at most.
    SellerId
);

entity_id!(
    /// Identifier of a catalog product.
    ProductId
);

entity_id!(
    /// Identifier of a placed order.
    OrderId
);

entity_id!(
    /// Identifier of a single line of a placed order.
    OrderItemId
);

entity_id!(
    /// Identifier of a cart row.
    CartItemId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_preserve_raw_value() {
        let id = ProductId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(ProductId::from(42), id);
    }

    #[test]
    fn ids_display_as_plain_integer() {
        assert_eq!(OrderId::new(7).to_string(), "7");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId::new(15)).unwrap();
        assert_eq!(json, "15");

        let id: CartItemId = serde_json::from_str("3").unwrap();
        assert_eq!(id, CartItemId::new(3));
    }

    #[test]
    fn ids_order_by_raw_value() {
        assert!(SellerId::new(1) < SellerId::new(2));
    }
}
