//! List query options.
//!
//! [`QueryOptions`] carries paging, filtering, sorting and a
//! modification time window for list endpoints. Every setter consumes the
//! value and returns a new one; setters whose input fails the guard hand
//! back the value unchanged, so a chain never fails halfway.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::schema::AttributeSchema;

/// Default number of items per page requested from list endpoints.
pub const DEFAULT_LIMIT: u32 = 100;

/// Timestamp format the service expects for `lastmodified`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Sort direction of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl SortOrder {
    /// Normalise a loosely-typed sort order.
    ///
    /// `"0"`, `"DESC"` and `"descending"` (in any case) mean descending;
    /// everything else is ascending.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == "0"
            || value.eq_ignore_ascii_case("desc")
            || value.eq_ignore_ascii_case("descending")
        {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }

    /// Value sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

impl From<&str> for SortOrder {
    fn from(value: &str) -> Self {
        SortOrder::parse(value)
    }
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        SortOrder::parse(&value)
    }
}

impl From<i64> for SortOrder {
    fn from(value: i64) -> Self {
        if value == 0 {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}

impl From<i32> for SortOrder {
    fn from(value: i32) -> Self {
        SortOrder::from(i64::from(value))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page size of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// At most this many items per page
    Count(u32),
    /// No page size; every page is walked
    Unlimited,
}

impl Limit {
    /// Numeric form, `-1` meaning unlimited.
    pub fn as_i64(&self) -> i64 {
        match self {
            Limit::Count(n) => i64::from(*n),
            Limit::Unlimited => -1,
        }
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Count(DEFAULT_LIMIT)
    }
}

/// Modification time window for a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Timespan {
    /// Changed at or after an absolute point in time
    Since(DateTime<Utc>),
    /// Changed within a window relative to now, e.g. `-2 days`
    Relative(Duration),
    /// Changed since midnight (UTC) of the day `n` days from today;
    /// `today` is `0`, `yesterday` is `-1`
    StartOfDay(i64),
}

impl Timespan {
    /// Parse an absolute timestamp or a relative expression.
    ///
    /// Accepted forms: `2024-05-01 13:45`, `2024-05-01 13:45:10`,
    /// `2024-05-01`, RFC 3339, `now`, `today`, `yesterday`, `tomorrow`,
    /// and `[+-]N unit[s] [ago]` with units second, minute, hour, day and
    /// week. Amounts too large to represent are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(Timespan::Since(dt.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%d %H:%M:%S", TIMESTAMP_FORMAT] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return Some(Timespan::Since(Utc.from_utc_datetime(&naive)));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Timespan::Since(Utc.from_utc_datetime(&naive)));
        }

        Self::parse_relative(value)
    }

    fn parse_relative(value: &str) -> Option<Self> {
        let lower = value.to_ascii_lowercase();
        match lower.as_str() {
            "now" => return Some(Timespan::Relative(Duration::zero())),
            "today" => return Some(Timespan::StartOfDay(0)),
            "yesterday" => return Some(Timespan::StartOfDay(-1)),
            "tomorrow" => return Some(Timespan::StartOfDay(1)),
            _ => {}
        }

        let mut words: Vec<&str> = lower.split_whitespace().collect();
        let ago = words.last() == Some(&"ago");
        if ago {
            words.pop();
        }
        let (amount, unit) = match words.as_slice() {
            [amount, unit] => (*amount, *unit),
            _ => return None,
        };

        let amount: i64 = amount.parse().ok()?;
        let amount = if ago {
            amount.checked_abs()?.checked_neg()?
        } else {
            amount
        };
        let unit = unit.strip_suffix('s').unwrap_or(unit);
        let offset = match unit {
            "sec" | "second" => Duration::try_seconds(amount),
            "min" | "minute" => Duration::try_minutes(amount),
            "hour" => Duration::try_hours(amount),
            "day" => Duration::try_days(amount),
            "week" => Duration::try_weeks(amount),
            _ => None,
        }?;
        Some(Timespan::Relative(offset))
    }

    /// Resolve to an absolute timestamp against `now`.
    ///
    /// Returns `None` when the window lands outside the representable
    /// date range.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Timespan::Since(at) => Some(*at),
            Timespan::Relative(offset) => now.checked_add_signed(*offset),
            Timespan::StartOfDay(days) => {
                let day = now
                    .date_naive()
                    .checked_add_signed(Duration::try_days(*days)?)?;
                day.and_hms_opt(0, 0, 0)
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }
        }
    }

    /// Format as the `lastmodified` query value.
    pub fn format(&self, now: DateTime<Utc>) -> Option<String> {
        self.resolve(now)
            .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
    }
}

impl From<DateTime<Utc>> for Timespan {
    fn from(at: DateTime<Utc>) -> Self {
        Timespan::Since(at)
    }
}

impl From<Duration> for Timespan {
    fn from(offset: Duration) -> Self {
        Timespan::Relative(offset)
    }
}

/// Paging, filtering and sorting for one list call.
///
/// Bound to the provider's [`AttributeSchema`] so that `filter` and
/// `sort_by` can be checked against what the endpoint declares.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ledgerlink::models::{AttributeSchema, QueryOptions, SortOrder};
///
/// let schema = Arc::new(
///     AttributeSchema::new(["Code", "Description"], ["Code", "Description"])
///         .unwrap()
///         .with_filters(["active"]),
/// );
///
/// let query = QueryOptions::new(schema)
///     .page(2)
///     .filter("active")
///     .filter("bogus")          // not declared, ignored
///     .sort_by("Code")
///     .sort_order("DESC");
///
/// assert_eq!(query.page_number(), 2);
/// assert_eq!(query.filter_name(), Some("active"));
/// assert_eq!(query.sort_field(), Some("code"));
/// assert_eq!(query.order(), SortOrder::Descending);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    schema: Arc<AttributeSchema>,
    page: u32,
    offset: u32,
    limit: Limit,
    timespan: Option<Timespan>,
    filter: Option<String>,
    sort_by: Option<String>,
    sort_order: SortOrder,
}

impl QueryOptions {
    /// Create options with defaults for the given schema.
    pub fn new(schema: Arc<AttributeSchema>) -> Self {
        Self {
            schema,
            page: 1,
            offset: 0,
            limit: Limit::default(),
            timespan: None,
            filter: None,
            sort_by: None,
            sort_order: SortOrder::default(),
        }
    }

    /// Set the page number. Page numbers start at 1; `0` is ignored.
    pub fn page(mut self, page: u32) -> Self {
        if page >= 1 {
            self.page = page;
        }
        self
    }

    /// Set the item offset within the page.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Set the page size. `-1` means unlimited; other negatives are ignored.
    pub fn limit(mut self, limit: i64) -> Self {
        match limit {
            -1 => self.limit = Limit::Unlimited,
            n if n >= 0 => self.limit = Limit::Count(u32::try_from(n).unwrap_or(u32::MAX)),
            _ => {}
        }
        self
    }

    /// Remove the page size limit.
    pub fn unlimited(mut self) -> Self {
        self.limit = Limit::Unlimited;
        self
    }

    /// Only return items modified within the given window.
    ///
    /// Strings are parsed with [`Timespan::parse`]. Unparsable input and
    /// windows that cannot be resolved against the current time are
    /// ignored.
    pub fn timespan(mut self, timespan: impl Into<TimespanInput>) -> Self {
        if let Some(ts) = timespan.into().0 {
            if ts.resolve(Utc::now()).is_some() {
                self.timespan = Some(ts);
            }
        }
        self
    }

    /// Apply a declared list filter. Undeclared filters are ignored.
    pub fn filter(mut self, filter: &str) -> Self {
        if self.schema.allows_filter(filter) {
            self.filter = Some(filter.to_string());
        }
        self
    }

    /// Sort by a readable field. Unknown fields are ignored.
    pub fn sort_by(mut self, field: &str) -> Self {
        if let Some(name) = self.schema.readable_field(field) {
            self.sort_by = Some(name.to_lowercase());
        }
        self
    }

    /// Set the sort direction from any accepted spelling.
    pub fn sort_order(mut self, order: impl Into<SortOrder>) -> Self {
        self.sort_order = order.into();
        self
    }

    /// Current page number.
    pub fn page_number(&self) -> u32 {
        self.page
    }

    /// Current offset.
    pub fn offset_value(&self) -> u32 {
        self.offset
    }

    /// Current page size.
    pub fn limit_value(&self) -> Limit {
        self.limit
    }

    /// Current time window.
    pub fn timespan_value(&self) -> Option<&Timespan> {
        self.timespan.as_ref()
    }

    /// Current filter.
    pub fn filter_name(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Current sort field, lower-cased.
    pub fn sort_field(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }

    /// Current sort direction.
    pub fn order(&self) -> SortOrder {
        self.sort_order
    }

    /// The schema these options are checked against.
    pub fn schema(&self) -> &Arc<AttributeSchema> {
        &self.schema
    }

    /// Render the options as query parameters.
    ///
    /// `now` anchors relative time windows.
    pub fn to_query_pairs(&self, now: DateTime<Utc>) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(ref filter) = self.filter {
            pairs.push(("filter".to_string(), filter.clone()));
        }
        if let Some(ref field) = self.sort_by {
            pairs.push(("sortby".to_string(), field.clone()));
            pairs.push(("sortorder".to_string(), self.sort_order.to_string()));
        }
        if let Some(value) = self.timespan.as_ref().and_then(|ts| ts.format(now)) {
            pairs.push(("lastmodified".to_string(), value));
        }
        if let Limit::Count(n) = self.limit {
            pairs.push(("limit".to_string(), n.to_string()));
            pairs.push(("page".to_string(), self.page.to_string()));
        }
        if self.offset > 0 {
            pairs.push(("offset".to_string(), self.offset.to_string()));
        }

        pairs
    }
}

/// Anything [`QueryOptions::timespan`] accepts.
#[derive(Debug, Clone)]
pub struct TimespanInput(Option<Timespan>);

impl From<Timespan> for TimespanInput {
    fn from(ts: Timespan) -> Self {
        Self(Some(ts))
    }
}

impl From<DateTime<Utc>> for TimespanInput {
    fn from(at: DateTime<Utc>) -> Self {
        Self(Some(Timespan::Since(at)))
    }
}

impl From<Duration> for TimespanInput {
    fn from(offset: Duration) -> Self {
        Self(Some(Timespan::Relative(offset)))
    }
}

impl From<&str> for TimespanInput {
    fn from(value: &str) -> Self {
        Self(Timespan::parse(value))
    }
}

impl From<String> for TimespanInput {
    fn from(value: String) -> Self {
        Self(Timespan::parse(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Arc<AttributeSchema> {
        Arc::new(
            AttributeSchema::new(
                ["DocumentNumber", "Description", "Total"],
                ["Description", "Total"],
            )
            .unwrap()
            .with_filters(["active", "inactive"]),
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let q = QueryOptions::new(schema());
        assert_eq!(q.page_number(), 1);
        assert_eq!(q.offset_value(), 0);
        assert_eq!(q.limit_value(), Limit::Count(DEFAULT_LIMIT));
        assert_eq!(q.order(), SortOrder::Ascending);
        assert!(q.filter_name().is_none());
    }

    #[test]
    fn test_sort_order_normalisation() {
        for x in ["0", "DESC", "descending", "desc", "Descending"] {
            assert_eq!(SortOrder::parse(x), SortOrder::Descending, "{x}");
        }
        for x in ["1", "ASC", "ascending", "sideways", ""] {
            assert_eq!(SortOrder::parse(x), SortOrder::Ascending, "{x}");
        }
        assert_eq!(SortOrder::from(0i32), SortOrder::Descending);
        assert_eq!(SortOrder::from(1i32), SortOrder::Ascending);
        assert_eq!(SortOrder::from(7i64), SortOrder::Ascending);
    }

    #[test]
    fn test_guards_ignore_invalid_values() {
        let q = QueryOptions::new(schema())
            .page(3)
            .page(0)
            .limit(25)
            .limit(-5)
            .filter("active")
            .filter("archived")
            .sort_by("Total")
            .sort_by("NoSuchField")
            .timespan("2024-01-01 10:00")
            .timespan("not a time");

        assert_eq!(q.page_number(), 3);
        assert_eq!(q.limit_value(), Limit::Count(25));
        assert_eq!(q.filter_name(), Some("active"));
        assert_eq!(q.sort_field(), Some("total"));
        assert!(matches!(q.timespan_value(), Some(Timespan::Since(_))));
    }

    #[test]
    fn test_sort_by_accepts_read_only_fields() {
        let q = QueryOptions::new(schema()).sort_by("documentnumber");
        assert_eq!(q.sort_field(), Some("documentnumber"));
    }

    #[test]
    fn test_unlimited() {
        let q = QueryOptions::new(schema()).limit(-1);
        assert_eq!(q.limit_value(), Limit::Unlimited);
        assert_eq!(q.limit_value().as_i64(), -1);

        let q = QueryOptions::new(schema()).unlimited().page(4);
        let pairs = q.to_query_pairs(fixed_now());
        assert!(pairs.iter().all(|(k, _)| k != "limit" && k != "page"));
    }

    #[test]
    fn test_setters_return_new_values() {
        let base = QueryOptions::new(schema());
        let paged = base.clone().page(5);
        assert_eq!(base.page_number(), 1);
        assert_eq!(paged.page_number(), 5);
    }

    #[test]
    fn test_query_pairs() {
        let q = QueryOptions::new(schema())
            .filter("inactive")
            .sort_by("Description")
            .sort_order("DESC")
            .timespan("-2 days")
            .limit(50)
            .page(2)
            .offset(10);

        let pairs = q.to_query_pairs(fixed_now());
        let expected: Vec<(String, String)> = [
            ("filter", "inactive"),
            ("sortby", "description"),
            ("sortorder", "descending"),
            ("lastmodified", "2024-05-08 12:30"),
            ("limit", "50"),
            ("page", "2"),
            ("offset", "10"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_timespan_parsing() {
        let now = fixed_now();
        assert_eq!(
            Timespan::parse("2024-03-01 08:15").and_then(|t| t.format(now)),
            Some("2024-03-01 08:15".to_string())
        );
        assert_eq!(
            Timespan::parse("2024-03-01").and_then(|t| t.format(now)),
            Some("2024-03-01 00:00".to_string())
        );
        assert_eq!(
            Timespan::parse("3 hours ago").and_then(|t| t.format(now)),
            Some("2024-05-10 09:30".to_string())
        );
        assert_eq!(
            Timespan::parse("today").and_then(|t| t.format(now)),
            Some("2024-05-10 00:00".to_string())
        );
        assert_eq!(
            Timespan::parse("yesterday").and_then(|t| t.format(now)),
            Some("2024-05-09 00:00".to_string())
        );
        assert_eq!(
            Timespan::parse("now").and_then(|t| t.format(now)),
            Some("2024-05-10 12:30".to_string())
        );
        assert_eq!(
            Timespan::parse("-1 week").and_then(|t| t.format(now)),
            Some("2024-05-03 12:30".to_string())
        );
        assert!(Timespan::parse("fortnight").is_none());
        assert!(Timespan::parse("").is_none());
    }

    #[test]
    fn test_timespan_rejects_out_of_range_amounts() {
        assert!(Timespan::parse("9999999999999 days").is_none());
        assert!(Timespan::parse("-9223372036854775808 seconds ago").is_none());
        assert!(Timespan::parse("9223372036854775807 weeks").is_none());

        let huge = Timespan::parse("100000000 weeks").unwrap();
        assert_eq!(huge.format(fixed_now()), None);
        assert_eq!(Timespan::StartOfDay(i64::MAX).resolve(fixed_now()), None);
    }

    #[test]
    fn test_unresolvable_timespan_is_ignored() {
        let q = QueryOptions::new(schema())
            .timespan("2024-01-01 10:00")
            .timespan("100000000 weeks");
        assert!(matches!(q.timespan_value(), Some(Timespan::Since(_))));

        let q = QueryOptions::new(schema()).timespan("100000000 weeks");
        assert!(q.timespan_value().is_none());
        let pairs = q.to_query_pairs(fixed_now());
        assert!(pairs.iter().all(|(k, _)| k != "lastmodified"));
    }
}
