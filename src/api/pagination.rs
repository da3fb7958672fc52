use serde::Serialize;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Page {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

/// Escape LIKE wildcards and wrap the term for a substring match
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Trimmed, non-empty filter value
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        Paginated {
            items,
            total_pages: page.total_pages(total),
            current_page: page.page,
            total,
        }
    }

    /// Render as `{ <key>: [...], totalPages, currentPage, total }`
    pub fn into_json(self, key: &str) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), serde_json::json!(self.items));
        body.insert("totalPages".to_string(), serde_json::json!(self.total_pages));
        body.insert("currentPage".to_string(), serde_json::json!(self.current_page));
        body.insert("total".to_string(), serde_json::json!(self.total));
        serde_json::Value::Object(body)
    }
}
