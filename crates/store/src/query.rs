//! Pagination and listing filters.

use common::SellerId;

/// Offset/limit window over an id-ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    /// Creates a page, clamping the offset to zero and the limit to
    /// `1..=MAX_LIMIT`.
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Applies the window to an already ordered iterator.
    pub fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        items
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Builder for product listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: Page,
    pub seller_id: Option<SellerId>,
}

impl ProductQuery {
    /// Creates an unfiltered query over the first page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the listing to one seller's products.
    pub fn seller(mut self, seller_id: SellerId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamps_bounds() {
        assert_eq!(Page::new(-5, 0), Page { offset: 0, limit: 1 });
        assert_eq!(Page::new(3, 500), Page { offset: 3, limit: 100 });
    }

    #[test]
    fn test_page_apply() {
        let page = Page::new(2, 3);
        assert_eq!(page.apply(1..=10), vec![3, 4, 5]);
        assert!(Page::new(20, 5).apply(1..=10).is_empty());
    }

    #[test]
    fn test_product_query_builder() {
        let query = ProductQuery::new()
            .seller(SellerId::new(4))
            .page(Page::new(10, 20));

        assert_eq!(query.seller_id, Some(SellerId::new(4)));
        assert_eq!(query.page.offset, 10);
        assert_eq!(query.page.limit, 20);
    }
}
