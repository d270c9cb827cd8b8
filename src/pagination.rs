use serde::Deserialize;

pub const PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Only `ASC` sorts ascending; anything else, or nothing, is descending.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("ASC") => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub order: SortOrder,
}

impl Page {
    pub fn new(number: i64, order: SortOrder) -> Self {
        Self {
            number: number.max(1),
            order,
        }
    }

    pub fn first(order: SortOrder) -> Self {
        Self::new(1, order)
    }

    /// Saturates instead of overflowing, so absurd page numbers just land
    /// past the end.
    pub fn skip(&self) -> i64 {
        (self.number - 1).saturating_mul(PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    /// Applies the page window to an already ordered sequence.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(usize::try_from(self.skip()).unwrap_or(usize::MAX))
            .take(usize::try_from(self.limit()).unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Query string shared by the list and search endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub sort: Option<String>,
    pub query: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        let number = self
            .page
            .as_deref()
            .and_then(|page| page.trim().parse::<i64>().ok())
            .unwrap_or(1);
        Page::new(number, SortOrder::from_param(self.sort.as_deref()))
    }

    pub fn search_term(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|term| !term.is_empty())
    }
}
