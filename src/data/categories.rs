//! Static news categories and effective-query composition
//!
//! Each category maps to the search keyword sent to the news API. The special
//! `all` category carries no keyword.

use serde::Serialize;

/// Identifier of the category that applies no keyword filter
pub const ALL_CATEGORY_ID: &str = "all";

/// A browsable news category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Unique identifier used on the command line and in session state
    pub id: &'static str,
    /// Label shown to the user
    pub label: &'static str,
    /// Keyword added to the search query, empty for `all`
    pub keyword: &'static str,
}

impl Category {
    pub fn is_all(&self) -> bool {
        self.id == ALL_CATEGORY_ID
    }
}

/// Static array of all categories, `all` first
pub static CATEGORIES: [Category; 8] = [
    Category {
        id: ALL_CATEGORY_ID,
        label: "Todas",
        keyword: "",
    },
    Category {
        id: "technology",
        label: "Tecnologia",
        keyword: "tecnologia",
    },
    Category {
        id: "business",
        label: "Negócios",
        keyword: "negócios",
    },
    Category {
        id: "sports",
        label: "Esportes",
        keyword: "esportes",
    },
    Category {
        id: "health",
        label: "Saúde",
        keyword: "saúde",
    },
    Category {
        id: "science",
        label: "Ciência",
        keyword: "ciência",
    },
    Category {
        id: "entertainment",
        label: "Entretenimento",
        keyword: "entretenimento",
    },
    Category {
        id: "politics",
        label: "Política",
        keyword: "política",
    },
];

/// Get a category by its ID
///
/// Returns `Some(&Category)` if found, `None` otherwise. Lookup is case sensitive.
pub fn get_category_by_id(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|category| category.id == id)
}

/// Get all available categories
pub fn all_categories() -> &'static [Category] {
    &CATEGORIES
}

/// Builds the search string actually sent to the API and used as cache key
///
/// An unknown category id is treated exactly like `all`: with no text it
/// still yields `default_query`, so the API never receives an empty `q`.
///
/// # Arguments
/// * `category_id` - Selected category; unknown ids behave like `all`
/// * `free_text` - User-entered search text (surrounding whitespace ignored)
/// * `default_query` - Term used when neither a keyword nor text is present
///
/// # Returns
/// * `"{keyword} {text}"` when a category keyword and text are both present
/// * the keyword alone, or the text alone, when only one is present
/// * `default_query` otherwise
pub fn effective_query(category_id: &str, free_text: &str, default_query: &str) -> String {
    let text = free_text.trim();
    let keyword = get_category_by_id(category_id)
        .filter(|category| !category.is_all())
        .map(|category| category.keyword)
        .unwrap_or("");

    match (keyword.is_empty(), text.is_empty()) {
        (false, false) => format!("{} {}", keyword, text),
        (false, true) => keyword.to_string(),
        (true, false) => text.to_string(),
        (true, true) => default_query.to_string(),
    }
}
