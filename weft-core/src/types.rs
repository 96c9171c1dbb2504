//! Ordering and pagination for navigation queries.

use std::cmp::Ordering;

use smol_str::SmolStr;

use crate::fetch::EntityRow;
use crate::value::Value;

/// Sort order for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

/// Order by specification for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// The column name to order by.
    pub column: SmolStr,
    /// The sort order.
    pub order: SortOrder,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<SmolStr>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<SmolStr>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<SmolStr>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Compare two rows on this column. Nulls sort last regardless of order.
    pub fn compare(&self, a: &EntityRow, b: &EntityRow) -> Ordering {
        let left = a.attributes.get(&self.column).unwrap_or(&Value::Null);
        let right = b.attributes.get(&self.column).unwrap_or(&Value::Null);

        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = left.compare(right).unwrap_or(Ordering::Equal);
                match self.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
        }
    }
}

/// Compare rows by a list of order fields, left to right.
pub fn compare_rows(order_by: &[OrderByField], a: &EntityRow, b: &EntityRow) -> Ordering {
    order_by
        .iter()
        .map(|field| field.compare(a, b))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Skip/take pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to take.
    pub take: Option<u64>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of records to take.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Apply to an ordered list of items.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = self.skip.unwrap_or(0) as usize;
        let take = self.take.map(|t| t as usize).unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Key;

    fn row(id: i64, rating: Option<i64>) -> EntityRow {
        EntityRow::new(Key::Int(id)).with("rating", rating)
    }

    #[test]
    fn test_order_desc_nulls_last() {
        let mut rows = vec![row(1, Some(2)), row(2, None), row(3, Some(5))];
        rows.sort_by(|a, b| compare_rows(&[OrderByField::desc("rating")], a, b));
        let ids: Vec<_> = rows.iter().map(|r| r.key.clone()).collect();
        assert_eq!(ids, vec![Key::Int(3), Key::Int(1), Key::Int(2)]);
    }

    #[test]
    fn test_pagination_apply() {
        let page = Pagination::new().skip(1).take(2);
        assert_eq!(page.apply(vec![1, 2, 3, 4]), vec![2, 3]);
        assert!(Pagination::new().is_empty());
        assert_eq!(Pagination::new().apply(vec![1, 2]), vec![1, 2]);
    }
}
