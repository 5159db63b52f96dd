//! Filter/sort/search pipeline shared by every list view.
//!
//! A view is three independent pieces of state: a free-text search, a set
//! of equality filters and a sort selection. `ListView::apply` keeps the
//! items that pass every predicate, then orders them with the single
//! comparator picked by the sort key. Input slices are never mutated.

pub mod lists;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::types::RiskLevel;

pub use lists::{
    ContractFilter, ContractSortKey, CountryFilter, CountrySortKey, DocumentFilter,
    DocumentSortKey, FactorFilter, FactorSortKey, PartnerFilter, PartnerSortKey,
};

// ---------------------------------------------------------------------------
// Sort state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(anyhow::anyhow!("Unknown sort direction: {s}")),
        }
    }
}

/// Active sort key and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K: Copy + PartialEq> SortState<K> {
    pub fn new(key: K, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Re-selecting the active key flips direction; a new key starts descending.
    pub fn toggle(&mut self, key: K) {
        if self.key == key {
            self.direction = self.direction.flip();
        } else {
            self.key = key;
            self.direction = SortDirection::Desc;
        }
    }
}

// ---------------------------------------------------------------------------
// Equality filters
// ---------------------------------------------------------------------------

/// An equality filter. `All` admits everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

/// `"all"` or an empty string mean no restriction.
impl<T> FromStr for Selection<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            trimmed.parse().map(Selection::Only)
        }
    }
}

// ---------------------------------------------------------------------------
// Comparators
// ---------------------------------------------------------------------------

/// Case-insensitive lexicographic order, ties broken by raw bytes so the
/// order is total.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Numeric order. NaN compares equal to everything.
pub fn compare_number(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Severity order through the rank table (CRITICAL=4 … LOW=1).
pub fn compare_level(a: RiskLevel, b: RiskLevel) -> Ordering {
    a.rank().cmp(&b.rank())
}

/// Lowercase and drop separators so `createdAt`, `created_at` and
/// `CREATED-AT` name the same sort key.
pub(crate) fn key_token(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A record type that can be shown in a list view.
pub trait Listable {
    type SortKey: Copy + PartialEq + fmt::Debug;
    type Filter: Default + Clone + fmt::Debug;

    /// Fields the free-text search looks at.
    fn search_fields(&self) -> Vec<&str>;

    fn passes(&self, filter: &Self::Filter) -> bool;

    /// Ascending comparison under `key`.
    fn compare_by(&self, other: &Self, key: Self::SortKey) -> Ordering;

    fn default_sort() -> SortState<Self::SortKey>;

    /// Case-insensitive substring match. `needle` must already be lowercase.
    fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || self
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Items left after the pipeline ran, plus the size of the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResult<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ViewResult<T> {
    pub fn matched(&self) -> usize {
        self.items.len()
    }

    pub fn excluded(&self) -> usize {
        self.total - self.items.len()
    }
}

/// Search, filter and sort state of one list view.
#[derive(Debug, Clone)]
pub struct ListView<T: Listable> {
    pub search: String,
    pub filter: T::Filter,
    pub sort: SortState<T::SortKey>,
}

impl<T: Listable> Default for ListView<T> {
    fn default() -> Self {
        Self {
            search: String::new(),
            filter: T::Filter::default(),
            sort: T::default_sort(),
        }
    }
}

impl<T: Listable> ListView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_filter(mut self, filter: T::Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, key: T::SortKey, direction: SortDirection) -> Self {
        self.sort = SortState::new(key, direction);
        self
    }

    pub fn toggle_sort(&mut self, key: T::SortKey) {
        self.sort.toggle(key);
    }

    /// Back to an empty search, "all" filters and the default sort.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Run search, filters and sort over `items`.
    ///
    /// The sort is stable: items equal under the active key keep their
    /// input order in both directions.
    pub fn apply<'a>(&self, items: &'a [T]) -> ViewResult<&'a T> {
        let needle = self.search.trim().to_lowercase();
        let mut kept: Vec<&T> = items
            .iter()
            .filter(|item| item.matches_search(&needle) && item.passes(&self.filter))
            .collect();

        let SortState { key, direction } = self.sort;
        kept.sort_by(|a, b| direction.apply(a.compare_by(b, key)));

        ViewResult {
            items: kept,
            total: items.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
