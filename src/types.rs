use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// CRM object as returned by search and batch endpoints.
///
/// Property values arrive as strings, or `null` when unset.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

impl Record {
    /// Property value, treating `null` and `""` as absent.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|value| value.as_deref())
            .filter(|value| !value.is_empty())
    }
}

/// Comparison applied by a search [`Filter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    HasProperty,
    NotHasProperty,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub property_name: String,
    pub operator: FilterOperator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Filter {
    pub fn new(
        property_name: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            operator,
            value: Some(value.into()),
        }
    }
}

/// Filters inside a group are AND-ed; groups are OR-ed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterGroup {
    pub filters: Vec<Filter>,
}

/// Search criteria for `POST /crm/v3/objects/{object}/search`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filter_groups: Vec<FilterGroup>,
    pub properties: Vec<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl SearchRequest {
    /// Single-group search returning the named properties.
    pub fn new<I, S>(filters: Vec<Filter>, properties: I, limit: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filter_groups: vec![FilterGroup { filters }],
            properties: properties.into_iter().map(Into::into).collect(),
            limit,
            after: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub results: Vec<Record>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<NextPage>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NextPage {
    pub after: String,
}

/// One entry of a batch update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordUpdate {
    pub id: String,
    pub properties: BTreeMap<String, String>,
}

impl RecordUpdate {
    pub fn new<I, K, V>(id: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id: id.into(),
            properties: properties
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Acknowledgement of a batch update.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub results: Vec<Record>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Official rate at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct ExchangeRate {
    /// Selling price, units of local currency per dollar.
    pub rate: f64,
    /// Timestamp as published by the source (RFC 3339).
    pub updated_at: String,
}

impl ExchangeRate {
    /// Date part (`YYYY-MM-DD`) of the publication timestamp.
    pub fn date(&self) -> &str {
        self.updated_at
            .split_once('T')
            .map_or(self.updated_at.as_str(), |(date, _)| date)
    }
}
