//! Structured description of a catalog listing request

use crate::status::CourseLevel;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Orderings offered by the course listing
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CourseSort {
    /// Most recently published first
    #[default]
    Newest,
    /// Most enrollments first
    Popular,
    /// Highest average rating first
    Rating,
    PriceLow,
    PriceHigh,
}

impl CourseSort {
    /// Parses a query-string value, falling back to the default ordering for
    /// anything unrecognized
    pub fn from_param(param: Option<&str>) -> Self {
        param.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

/// Filters applied on top of the implicit "published only" rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseFilter {
    /// Matches the category itself or any of its direct children
    pub category_id: Option<i64>,
    pub level: Option<CourseLevel>,
    /// Substring matched against title and description
    pub keyword: Option<String>,
    pub sort: CourseSort,
}

impl CourseFilter {
    /// The keyword with surrounding whitespace removed, or `None` if blank
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
    }
}
