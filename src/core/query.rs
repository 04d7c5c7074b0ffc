//! Per-request query context
//!
//! A [`QueryContext`] is built once per incoming request by the collaborator
//! layer, after authentication. It carries who is asking, what they hold,
//! and which page they asked for. Rendering only ever borrows it.

use serde::Deserialize;
use serde_json::Value;

use crate::config::PaginationConfig;
use crate::core::error::{EngineError, EngineResult};
use crate::core::permission::{AccessMode, Caller, PermissionSet, Tier};

/// Raw JSON:API query-string parameters
///
/// All values stay strings until [`QueryParams::page_request`] validates them.
///
/// # Example
/// ```text
/// GET /rescues?page[size]=25&page[number]=3
/// GET /rescues?page[offset]=50&page[limit]=25&sort=-createdAt,system
/// GET /rescues?filter={"status":"open"}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    #[serde(rename = "page[size]")]
    pub page_size: Option<String>,

    #[serde(rename = "page[number]")]
    pub page_number: Option<String>,

    #[serde(rename = "page[offset]")]
    pub page_offset: Option<String>,

    #[serde(rename = "page[limit]")]
    pub page_limit: Option<String>,

    /// Comma separated fields, `-` prefix for descending
    pub sort: Option<String>,

    /// Filters as a JSON object
    pub filter: Option<String>,
}

fn parse_number(value: Option<&str>, parameter: &str) -> EngineResult<Option<u64>> {
    value
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|_| EngineError::BadRequest {
                message: format!("'{}' must be a non-negative integer", parameter),
                pointer: None,
            })
        })
        .transpose()
}

impl QueryParams {
    /// Build from decoded query-string pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let object: serde_json::Map<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        serde_json::from_value(Value::Object(object)).map_err(|e| EngineError::BadRequest {
            message: e.to_string(),
            pointer: None,
        })
    }

    /// Resolve the requested page
    ///
    /// `page[size]`/`page[number]` take precedence over `page[offset]`/`page[limit]`.
    /// Sizes clamp to `[1, max_size]`, page numbers below 1 clamp to 1.
    pub fn page_request(&self, config: &PaginationConfig) -> EngineResult<PageRequest> {
        let size = parse_number(self.page_size.as_deref(), "page[size]")?;
        let number = parse_number(self.page_number.as_deref(), "page[number]")?;
        let offset = parse_number(self.page_offset.as_deref(), "page[offset]")?;
        let limit = parse_number(self.page_limit.as_deref(), "page[limit]")?;

        if size.is_none() && number.is_none() && (offset.is_some() || limit.is_some()) {
            let limit = limit.unwrap_or(config.default_size);
            return Ok(PageRequest::from_offset(
                offset.unwrap_or(0),
                limit,
                config.max_size,
            ));
        }

        Ok(PageRequest::new(
            number.unwrap_or(1),
            size.unwrap_or(config.default_size),
            config.max_size,
        ))
    }

    /// Parse the sort expression
    pub fn sort_fields(&self) -> Vec<SortField> {
        self.sort.as_deref().map(SortField::parse_list).unwrap_or_default()
    }

    /// Parse the filter JSON, rejecting anything that is not an object
    pub fn filter_value(&self) -> EngineResult<Option<Value>> {
        let Some(raw) = self.filter.as_deref() else {
            return Ok(None);
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => Ok(Some(value)),
            _ => Err(EngineError::BadRequest {
                message: "filter must be a JSON object".to_string(),
                pointer: None,
            }),
        }
    }
}

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub number: u64,
    /// Number of items per page
    pub size: u64,
}

impl PageRequest {
    /// `number` is capped so the page offset always fits in a `u64`
    pub fn new(number: u64, size: u64, max_size: u64) -> Self {
        let size = size.clamp(1, max_size.max(1));
        Self {
            number: number.clamp(1, u64::MAX / size),
            size,
        }
    }

    /// Convert an offset/limit pair to the page containing `offset`
    pub fn from_offset(offset: u64, limit: u64, max_size: u64) -> Self {
        let size = limit.clamp(1, max_size.max(1));
        Self::new((offset / size).saturating_add(1), size, max_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        let config = PaginationConfig::default();
        Self::new(1, config.default_size, config.max_size)
    }
}

/// A single sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

impl SortField {
    /// Parse a JSON:API sort list such as `-createdAt,system`
    pub fn parse_list(raw: &str) -> Vec<SortField> {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty() && *part != "-")
            .map(|part| match part.strip_prefix('-') {
                Some(field) => SortField {
                    field: field.to_string(),
                    descending: true,
                },
                None => SortField {
                    field: part.to_string(),
                    descending: false,
                },
            })
            .collect()
    }
}

/// Everything the engine needs to know about the current request
#[derive(Debug, Clone)]
pub struct QueryContext {
    base_url: String,
    caller: Option<Caller>,
    permissions: PermissionSet,
    page: PageRequest,
    sort: Vec<SortField>,
    filter: Option<Value>,
}

impl QueryContext {
    /// Create an anonymous context rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            caller: None,
            permissions: PermissionSet::new(),
            page: PageRequest::default(),
            sort: Vec::new(),
            filter: None,
        }
    }

    /// Attach the authenticated caller and their resolved grants
    pub fn with_caller(mut self, caller: Caller, permissions: PermissionSet) -> Self {
        self.caller = Some(caller);
        self.permissions = permissions;
        self
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// Apply parsed query-string parameters
    pub fn with_params(mut self, params: &QueryParams, config: &PaginationConfig) -> EngineResult<Self> {
        self.page = params.page_request(config)?;
        self.sort = params.sort_fields();
        self.filter = params.filter_value()?;
        Ok(self)
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    pub fn sort(&self) -> &[SortField] {
        &self.sort
    }

    pub fn filter(&self) -> Option<&Value> {
        self.filter.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/<type>`
    pub fn collection_url(&self, resource_type: &str) -> String {
        format!("{}/{}", self.base_url, resource_type)
    }

    /// `<base>/<type>/<id>`
    pub fn resource_url(&self, resource_type: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, resource_type, id)
    }

    /// Effective tier of the caller for a namespace
    ///
    /// Without a caller only [`Tier::All`] is ever satisfied.
    pub fn effective_tier(&self, namespace: &str, mode: AccessMode, is_self: bool) -> Tier {
        if self.caller.is_none() {
            return Tier::All;
        }
        self.permissions.effective_tier(namespace, mode, is_self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_size: 100,
            max_size: 100,
        }
    }

    #[test]
    fn test_query_params_defaults() {
        let page = QueryParams::default().page_request(&config()).unwrap();
        assert_eq!(page, PageRequest { number: 1, size: 100 });
    }

    #[test]
    fn test_page_size_and_number() {
        let params =
            QueryParams::from_pairs([("page[size]", "25"), ("page[number]", "3")]).unwrap();
        let page = params.page_request(&config()).unwrap();
        assert_eq!(page, PageRequest { number: 3, size: 25 });
    }

    #[test]
    fn test_page_values_clamp() {
        let params =
            QueryParams::from_pairs([("page[size]", "5000"), ("page[number]", "0")]).unwrap();
        let page = params.page_request(&config()).unwrap();
        assert_eq!(page, PageRequest { number: 1, size: 100 });

        let zero = QueryParams::from_pairs([("page[size]", "0")]).unwrap();
        assert_eq!(zero.page_request(&config()).unwrap().size, 1);
    }

    #[test]
    fn test_offset_limit_converts_to_page() {
        let params =
            QueryParams::from_pairs([("page[offset]", "50"), ("page[limit]", "25")]).unwrap();
        let page = params.page_request(&config()).unwrap();
        assert_eq!(page, PageRequest { number: 3, size: 25 });
    }

    #[test]
    fn test_page_number_is_capped_to_a_reachable_offset() {
        let params = QueryParams::from_pairs([("page[number]", "18446744073709551615")]).unwrap();
        let page = params.page_request(&config()).unwrap();
        assert_eq!(page, PageRequest { number: u64::MAX / 100, size: 100 });

        let params = QueryParams::from_pairs([
            ("page[offset]", "18446744073709551615"),
            ("page[limit]", "1"),
        ])
        .unwrap();
        let page = params.page_request(&config()).unwrap();
        assert_eq!(page, PageRequest { number: u64::MAX, size: 1 });
    }

    #[test]
    fn test_non_numeric_page_is_bad_request() {
        let params = QueryParams::from_pairs([("page[number]", "two")]).unwrap();
        assert!(matches!(
            params.page_request(&config()),
            Err(EngineError::BadRequest { .. })
        ));
    }

    #[test]
    fn test_sort_parsing() {
        let fields = SortField::parse_list("-createdAt, system,,-");
        assert_eq!(
            fields,
            vec![
                SortField {
                    field: "createdAt".to_string(),
                    descending: true
                },
                SortField {
                    field: "system".to_string(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn test_filter_must_be_object() {
        let ok = QueryParams::from_pairs([("filter", r#"{"status":"open"}"#)]).unwrap();
        assert_eq!(
            ok.filter_value().unwrap(),
            Some(serde_json::json!({"status": "open"}))
        );

        let bad = QueryParams::from_pairs([("filter", "[1,2]")]).unwrap();
        assert!(bad.filter_value().is_err());
    }

    #[test]
    fn test_context_urls() {
        let ctx = QueryContext::new("https://api.fuelrats.com/");
        assert_eq!(ctx.collection_url("rats"), "https://api.fuelrats.com/rats");
        assert_eq!(
            ctx.resource_url("rats", "abc"),
            "https://api.fuelrats.com/rats/abc"
        );
    }

    #[test]
    fn test_anonymous_context_only_satisfies_all() {
        let ctx = QueryContext::new("http://localhost");
        assert_eq!(
            ctx.effective_tier("rescues", AccessMode::Read, true),
            Tier::All
        );

        let authed = QueryContext::new("http://localhost").with_caller(
            Caller::new(Uuid::new_v4()),
            ["rescues.read"].into_iter().collect(),
        );
        assert_eq!(
            authed.effective_tier("rescues", AccessMode::Read, false),
            Tier::Group
        );
    }

    #[test]
    fn test_with_params_applies_everything() {
        let params = QueryParams::from_pairs([
            ("page[size]", "10"),
            ("sort", "-updatedAt"),
            ("filter", r#"{"platform":"pc"}"#),
        ])
        .unwrap();
        let ctx = QueryContext::new("http://localhost")
            .with_params(&params, &config())
            .unwrap();
        assert_eq!(ctx.page().size, 10);
        assert_eq!(ctx.sort().len(), 1);
        assert!(ctx.filter().is_some());
    }
}
