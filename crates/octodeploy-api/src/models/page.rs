use serde::{Deserialize, Serialize};

/// Pagination envelope returned by every collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Page<T> {
    #[serde(default)]
    pub items_per_page: u32,
    #[serde(default)]
    pub last_page_number: u32,
    #[serde(default)]
    pub number_of_pages: u32,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}
