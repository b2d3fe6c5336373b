//! Offset and cursor pagination types.
//!
//! Offset pages are page/size indexed and report `pages = ceil(total/size)`
//! (zero for an empty result set). Cursor pages are addressed by an opaque
//! base64 token; the token encodes a keyset position so pages stay stable
//! under inserts and deletes at other positions. The row id is always the
//! secondary sort key, so orderings with duplicate values are deterministic.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

/// Maximum items per page.
const MAX_PAGE_SIZE: u32 = 100;

/// Default items per page.
const DEFAULT_PAGE_SIZE: u32 = 50;

/// Sort direction for paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    Asc,
    Desc,
}

impl OrderBy {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

// Hand-written so the rejection message names the query parameter; the
// message ends up verbatim in the 422 remediation entry.
impl<'de> Deserialize<'de> for OrderBy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(de::Error::custom(format!(
                "orderBy must be 'asc' or 'desc', got '{raw}'"
            ))),
        }
    }
}

/// Query parameters for offset-paginated listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub order_by: OrderBy,
}

impl OffsetParams {
    /// Page clamped to >= 1 and size clamped to 1..=100.
    pub fn normalized(&self) -> (u32, u32) {
        (
            self.page.unwrap_or(1).max(1),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        )
    }

    // Widened before multiplying: page is caller-supplied and may sit at
    // u32::MAX, which would overflow a u32 product.
    pub fn offset(&self) -> i64 {
        let (page, size) = self.normalized();
        i64::from(page - 1) * i64::from(size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.normalized().1)
    }
}

/// Offset page: items plus total and computed page count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

impl<T> OffsetPage<T> {
    pub fn new(items: Vec<T>, total: i64, page: u32, size: u32) -> Self {
        let pages = if total <= 0 {
            0
        } else {
            ((total as u64).div_ceil(u64::from(size))) as u32
        };

        Self {
            items,
            total: total.max(0),
            page,
            size,
            pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> OffsetPage<U> {
        OffsetPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    // Query strings cannot carry null; an empty nextPage means "first page".
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

/// Query parameters for cursor-paginated listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub next_page: Option<String>,
    pub size: Option<u32>,
    pub order_by: OrderBy,
}

impl CursorParams {
    pub fn size(&self) -> u32 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size())
    }

    /// Decode the supplied token, treating absence as the start of the set.
    pub fn token(&self) -> Result<CursorToken, ValidationError> {
        match &self.next_page {
            None => Ok(CursorToken::Start),
            Some(raw) => CursorToken::decode(raw),
        }
    }
}

/// Keyset position inside an ordered listing. `key` is the serialized value
/// of the sort column, `id` breaks ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pos", rename_all = "snake_case")]
pub enum CursorToken {
    Start,
    After { key: String, id: i64 },
    Before { key: String, id: i64 },
}

impl CursorToken {
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("cursor token is always serializable");
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self, ValidationError> {
        let invalid = ValidationError::InvalidFormat {
            field: "nextPage",
            reason: "must be a cursor token returned by a previous page",
        };

        let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid.clone())?;
        serde_json::from_slice(&bytes).map_err(|_| invalid)
    }
}

/// Cursor page: items plus total and page tokens (null when absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub current_page: Option<String>,
    pub previous_page: Option<String>,
    pub next_page: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CursorPage<U> {
        CursorPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            current_page: self.current_page,
            previous_page: self.previous_page,
            next_page: self.next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_and_limit() {
        let params = OffsetParams {
            page: Some(3),
            size: Some(25),
            order_by: OrderBy::Asc,
        };
        assert_eq!(params.offset(), 50);
        assert_eq!(params.limit(), 25);
    }

    #[test]
    fn offset_survives_maximum_page_number() {
        let params = OffsetParams {
            page: Some(u32::MAX),
            size: Some(100),
            order_by: OrderBy::Asc,
        };
        assert_eq!(params.offset(), i64::from(u32::MAX - 1) * 100);
    }

    #[test]
    fn page_and_size_are_clamped() {
        let params = OffsetParams {
            page: Some(0),
            size: Some(999),
            order_by: OrderBy::Desc,
        };
        assert_eq!(params.normalized(), (1, 100));
    }

    #[test]
    fn pages_is_ceil_of_total_over_size() {
        let page = OffsetPage::<()>::new(vec![], 25, 1, 10);
        assert_eq!(page.pages, 3);

        let page = OffsetPage::<()>::new(vec![], 30, 1, 10);
        assert_eq!(page.pages, 3);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page = OffsetPage::<()>::new(vec![], 0, 1, 10);
        assert_eq!(page.pages, 0);
    }

    #[test]
    fn order_by_rejection_names_the_parameter() {
        let err = serde_json::from_str::<OrderBy>("\"sideways\"").unwrap_err();
        assert!(err.to_string().contains("orderBy"));
    }

    #[test]
    fn order_by_parses_both_directions() {
        assert_eq!(serde_json::from_str::<OrderBy>("\"asc\"").unwrap(), OrderBy::Asc);
        assert_eq!(serde_json::from_str::<OrderBy>("\"desc\"").unwrap(), OrderBy::Desc);
    }

    #[test]
    fn cursor_token_round_trips() {
        let token = CursorToken::After {
            key: "2024-05-01T00:00:00Z".into(),
            id: 42,
        };
        let decoded = CursorToken::decode(&token.encode()).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn start_token_is_stable() {
        assert_eq!(CursorToken::Start.encode(), CursorToken::Start.encode());
    }

    #[test]
    fn garbage_token_is_a_validation_error() {
        let err = CursorToken::decode("not-base64!!").unwrap_err();
        assert_eq!(err.field(), "nextPage");
    }

    #[test]
    fn empty_next_page_means_first_page() {
        let params: CursorParams =
            serde_json::from_str(r#"{"nextPage": "", "orderBy": "asc"}"#).unwrap();
        assert_eq!(params.next_page, None);
        assert_eq!(params.token().unwrap(), CursorToken::Start);
    }
}
