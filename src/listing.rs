//! List aggregation for the admin views.
//!
//! A [`ListQuery`] filters a collection of records, sorts the matches and
//! cuts out one page. Records referencing members or groups are searched and
//! sorted by the names a [`NameLookup`] resolves for them; the records
//! themselves are never modified.

use std::num::NonZeroUsize;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Resolution of member and group ids to display names.
pub mod lookup;
pub use lookup::NameLookup;

/// [`Listable`] implementations for the stored document types.
mod records;

/// A record that can be listed.
pub trait Listable {
    /// The texts searched by substring and regex filters: names, matricule,
    /// ids.
    fn search_fields(&self, names: &NameLookup) -> Vec<String>;

    /// Status label, e.g. `PENDING`, if the record has one.
    fn status(&self) -> Option<&'static str> {
        None
    }

    /// Category label, e.g. a caisse type, if the record has one.
    fn kind(&self) -> Option<&'static str> {
        None
    }

    /// The date used by date-range filters.
    fn date(&self) -> Option<NaiveDate>;

    /// The value compared when sorting by `field`.
    fn sort_key(&self, field: SortField, names: &NameLookup) -> SortKey;
}

/// A comparable sort value.
///
/// Records without a value for the sort field compare equal to each other
/// and before every record that has one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    /// No value.
    None,
    /// Compared case-insensitively.
    Text(String),
    /// A whole amount.
    Number(u64),
    /// A point in time.
    Time(DateTime<Utc>),
}

impl SortKey {
    /// A text key, lowercased for comparison.
    #[must_use]
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_lowercase())
    }

    /// A key for an optional label.
    #[must_use]
    pub fn label(value: Option<&str>) -> Self {
        value.map_or(Self::None, Self::text)
    }
}

/// Fields records can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// Document id.
    Id,
    /// Display name of the record or of its subscriber.
    Name,
    /// Creation, registration or contribution time.
    #[default]
    Date,
    /// Status label.
    Status,
    /// Caisse type or other category.
    Type,
    /// Monthly or contributed amount.
    Amount,
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Record filters. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    contains: Option<String>,
    regex: Option<Regex>,
    statuses: Vec<String>,
    kinds: Vec<String>,
    from: Option<NaiveDate>,
    until: Option<NaiveDate>,
}

impl Filters {
    /// Keeps records where any search field contains `needle`, ignoring
    /// case. A blank needle matches everything.
    #[must_use]
    pub fn contains(mut self, needle: &str) -> Self {
        let needle = needle.trim();
        self.contains = (!needle.is_empty()).then(|| needle.to_lowercase());
        self
    }

    /// Keeps records where any search field matches `regex`.
    #[must_use]
    pub fn regex(mut self, regex: Regex) -> Self {
        self.regex = Some(regex);
        self
    }

    /// Keeps records whose status is one of `statuses`, ignoring case.
    #[must_use]
    pub fn statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.statuses = lowercase_all(statuses);
        self
    }

    /// Keeps records whose category is one of `kinds`, ignoring case.
    #[must_use]
    pub fn kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.kinds = lowercase_all(kinds);
        self
    }

    /// Keeps records dated within `from..=until`. Either bound may be open.
    #[must_use]
    pub fn between(mut self, from: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        self.from = from;
        self.until = until;
        self
    }

    /// Whether `record` passes every filter.
    #[must_use]
    pub fn matches<T: Listable + ?Sized>(&self, record: &T, names: &NameLookup) -> bool {
        if !matches_label(&self.statuses, record.status()) {
            return false;
        }

        if !matches_label(&self.kinds, record.kind()) {
            return false;
        }

        if self.from.is_some() || self.until.is_some() {
            let Some(date) = record.date() else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) {
                return false;
            }
            if self.until.is_some_and(|until| date > until) {
                return false;
            }
        }

        if self.contains.is_none() && self.regex.is_none() {
            return true;
        }

        let fields = record.search_fields(names);

        if let Some(needle) = &self.contains {
            if !fields
                .iter()
                .any(|field| field.to_lowercase().contains(needle.as_str()))
            {
                return false;
            }
        }

        if let Some(regex) = &self.regex {
            if !fields.iter().any(|field| regex.is_match(field)) {
                return false;
            }
        }

        true
    }
}

fn lowercase_all<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn matches_label(accepted: &[String], label: Option<&str>) -> bool {
    if accepted.is_empty() {
        return true;
    }
    label.is_some_and(|label| {
        let label = label.to_lowercase();
        accepted.iter().any(|accepted| accepted == &label)
    })
}

/// A filtered, sorted and paginated listing request.
#[derive(Debug, Clone)]
pub struct ListQuery {
    filters: Filters,
    sort: Option<(SortField, SortDirection)>,
    page: NonZeroUsize,
    page_size: NonZeroUsize,
}

impl ListQuery {
    /// The first page of the given size, unfiltered and in source order.
    #[must_use]
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            filters: Filters::default(),
            sort: None,
            page: NonZeroUsize::MIN,
            page_size,
        }
    }

    /// Replaces the filters.
    #[must_use]
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Sorts the matches by `field`.
    #[must_use]
    pub fn sort(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort = Some((field, direction));
        self
    }

    /// Selects the 1-based page to return.
    #[must_use]
    pub fn page(mut self, page: NonZeroUsize) -> Self {
        self.page = page;
        self
    }

    /// Runs the query over `records`.
    ///
    /// Sorting is stable: records with equal keys keep their source order in
    /// both directions. A page past the end is empty.
    pub fn run<'a, T, I>(&self, records: I, names: &NameLookup) -> Page<'a, T>
    where
        T: Listable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut matches: Vec<&'a T> = records
            .into_iter()
            .filter(|record| self.filters.matches(*record, names))
            .collect();

        if let Some((field, direction)) = self.sort {
            let mut keyed: Vec<(SortKey, &'a T)> = matches
                .into_iter()
                .map(|record| (record.sort_key(field, names), record))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| match direction {
                SortDirection::Ascending => a.cmp(b),
                SortDirection::Descending => a.cmp(b).reverse(),
            });
            matches = keyed.into_iter().map(|(_, record)| record).collect();
        }

        let total = matches.len();
        let start = (self.page.get() - 1).saturating_mul(self.page_size.get());
        let items = matches
            .into_iter()
            .skip(start)
            .take(self.page_size.get())
            .collect();

        Page {
            items,
            page: self.page,
            page_size: self.page_size,
            total,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    items: Vec<&'a T>,
    page: NonZeroUsize,
    page_size: NonZeroUsize,
    total: usize,
}

impl<'a, T> Page<'a, T> {
    /// The records on this page.
    #[must_use]
    pub fn items(&self) -> &[&'a T] {
        &self.items
    }

    /// Consumes the page, returning its records.
    #[must_use]
    pub fn into_items(self) -> Vec<&'a T> {
        self.items
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> NonZeroUsize {
        self.page
    }

    /// The requested page size.
    #[must_use]
    pub const fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// Number of records matching the filters, across all pages.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Number of non-empty pages. Zero when nothing matched.
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size.get())
    }

    /// Whether this page holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The page to show after one record was removed from a listing.
///
/// Stays on `current` unless it no longer exists, in which case it moves
/// back to the last page. Never returns less than 1.
#[must_use]
pub fn page_after_removal(
    current: NonZeroUsize,
    remaining: usize,
    page_size: NonZeroUsize,
) -> NonZeroUsize {
    let last = NonZeroUsize::new(remaining.div_ceil(page_size.get())).unwrap_or(NonZeroUsize::MIN);
    current.min(last)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row {
        id: u32,
        name: &'static str,
        status: &'static str,
        day: u32,
    }

    impl Listable for Row {
        fn search_fields(&self, _names: &NameLookup) -> Vec<String> {
            vec![self.name.to_string(), self.id.to_string()]
        }

        fn status(&self) -> Option<&'static str> {
            Some(self.status)
        }

        fn date(&self) -> Option<NaiveDate> {
            NaiveDate::from_ymd_opt(2026, 1, self.day)
        }

        fn sort_key(&self, field: SortField, _names: &NameLookup) -> SortKey {
            match field {
                SortField::Name => SortKey::text(self.name),
                SortField::Status => SortKey::text(self.status),
                SortField::Date => {
                    SortKey::Time(Utc.with_ymd_and_hms(2026, 1, self.day, 0, 0, 0).unwrap())
                }
                SortField::Id => SortKey::Number(u64::from(self.id)),
                SortField::Type | SortField::Amount => SortKey::None,
            }
        }
    }

    fn rows(n: u32) -> Vec<Row> {
        (1..=n)
            .map(|id| Row {
                id,
                name: if id % 2 == 0 { "Awa" } else { "Moussa" },
                status: if id % 3 == 0 { "APPROVED" } else { "PENDING" },
                day: (id % 28) + 1,
            })
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn ids<T>(page: &Page<'_, T>, id: impl Fn(&T) -> u32) -> Vec<u32> {
        page.items().iter().map(|row| id(*row)).collect()
    }

    #[test]
    fn empty_collection_has_no_pages() {
        let records: Vec<Row> = Vec::new();
        let page = ListQuery::new(size(10)).run(&records, &NameLookup::default());

        assert!(page.is_empty());
        assert_eq!(page.total(), 0);
        assert_eq!(page.total_pages(), 0);
    }

    #[test_case(1 => vec![1, 2, 3, 4]; "first")]
    #[test_case(3 => vec![9, 10]; "remainder on last page")]
    #[test_case(4 => Vec::<u32>::new(); "past the end")]
    fn pages_split_matches(page: usize) -> Vec<u32> {
        let records = rows(10);
        let page = ListQuery::new(size(4))
            .page(size(page))
            .run(&records, &NameLookup::default());

        assert_eq!(page.total(), 10);
        assert_eq!(page.total_pages(), 3);
        ids(&page, |row| row.id)
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = rows(20);
        let names = NameLookup::default();
        let query = ListQuery::new(size(100)).filters(
            Filters::default()
                .contains("awa")
                .statuses(["pending"])
                .between(NaiveDate::from_ymd_opt(2026, 1, 3), None),
        );

        let once = query.run(&records, &names);
        let twice = query.run(once.items().iter().copied(), &names);

        assert!(!once.is_empty());
        assert_eq!(once.items(), twice.items());
        assert!(once.items().iter().all(|row| row.name == "Awa" && row.status == "PENDING"));
    }

    #[test]
    fn zero_matches_give_an_empty_page() {
        let records = rows(5);
        let page = ListQuery::new(size(10))
            .filters(Filters::default().contains("nobody"))
            .run(&records, &NameLookup::default());

        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 0);
    }

    #[test]
    fn regex_and_date_range_combine() {
        let records = rows(10);
        let page = ListQuery::new(size(10))
            .filters(
                Filters::default()
                    .regex(Regex::new("^Mou").unwrap())
                    .between(None, NaiveDate::from_ymd_opt(2026, 1, 6)),
            )
            .run(&records, &NameLookup::default());

        assert_eq!(ids(&page, |row| row.id), vec![1, 3, 5]);
    }

    #[test_case(SortDirection::Ascending => vec![2, 4, 6, 1, 3, 5]; "ascending")]
    #[test_case(SortDirection::Descending => vec![1, 3, 5, 2, 4, 6]; "descending")]
    fn sort_is_stable_in_both_directions(direction: SortDirection) -> Vec<u32> {
        let records = rows(6);
        let page = ListQuery::new(size(10))
            .sort(SortField::Name, direction)
            .run(&records, &NameLookup::default());

        ids(&page, |row| row.id)
    }

    #[test]
    fn blank_search_matches_everything() {
        let records = rows(3);
        let page = ListQuery::new(size(10))
            .filters(Filters::default().contains("   ").statuses([" "]))
            .run(&records, &NameLookup::default());

        assert_eq!(page.total(), 3);
    }

    #[test_case(3, 8, 4 => 2; "last page emptied")]
    #[test_case(2, 8, 4 => 2; "page still full")]
    #[test_case(1, 0, 4 => 1; "nothing left")]
    #[test_case(5, 9, 2 => 5; "page still has a record")]
    fn page_after_removal_clamps(current: usize, remaining: usize, page_size: usize) -> usize {
        page_after_removal(size(current), remaining, size(page_size)).get()
    }
}
