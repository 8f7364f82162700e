use std::{fmt, num::NonZeroUsize, path::PathBuf, str::FromStr};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use kara::{
    CaisseType, Contract, Demand, DemandStatus, Group, Member, Settings,
    domain::{ContractStatus, Contribution, ContributionStatus, Participant},
    listing::{Filters, ListQuery, Listable, NameLookup, Page, SortDirection, SortField},
};
use regex::Regex;
use tracing::instrument;

use super::terminal::Colorize;

/// Command arguments for `kara list`.
#[derive(Debug, Parser)]
#[command(about = "List records with filters, sorting and pagination")]
pub struct List {
    /// Records to list.
    #[arg(value_enum)]
    entity: Entity,

    /// Case-insensitive substring match against names, matricules and ids.
    #[arg(long, conflicts_with = "regex")]
    contains: Option<String>,

    /// Regular expression match against names, matricules and ids.
    #[arg(long)]
    regex: Option<String>,

    /// Filter by status (comma-separated, case-insensitive, checked against
    /// the statuses of the listed records).
    #[arg(long, value_delimiter = ',', value_name = "STATUS")]
    status: Vec<String>,

    /// Filter by caisse type or category (comma-separated, case-insensitive,
    /// checked against the categories of the listed records).
    #[arg(long = "type", value_delimiter = ',', value_name = "TYPE")]
    kind: Vec<String>,

    /// Keep records dated on or after this day (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,

    /// Keep records dated on or before this day (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    until: Option<NaiveDate>,

    /// Sort field (default: id order).
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Sort in descending order.
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Page to show, starting at 1.
    #[arg(long, default_value = "1")]
    page: NonZeroUsize,

    /// Records per page (default: from kara.toml).
    #[arg(long)]
    page_size: Option<NonZeroUsize>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,
}

/// Listable collections.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Entity {
    Members,
    Groups,
    Demands,
    Contracts,
    Settings,
    Participants,
    Contributions,
}

impl Entity {
    /// Checks `--status` values against the statuses these records can have.
    fn status_labels(self, values: &[String]) -> anyhow::Result<Vec<&'static str>> {
        match self {
            Self::Demands => parsed_labels(values, DemandStatus::as_str),
            Self::Contracts => known_labels(
                self,
                "status",
                values,
                &[
                    ContractStatus::Active.as_str(),
                    ContractStatus::Completed.as_str(),
                    ContractStatus::Closed.as_str(),
                ],
            ),
            Self::Contributions => known_labels(
                self,
                "status",
                values,
                &[
                    ContributionStatus::Pending.as_str(),
                    ContributionStatus::Confirmed.as_str(),
                ],
            ),
            Self::Settings => known_labels(self, "status", values, &["PUBLISHED", "DRAFT"]),
            Self::Members | Self::Groups | Self::Participants => {
                known_labels(self, "status", values, &[])
            }
        }
    }

    /// Checks `--type` values against the categories of these records.
    fn kind_labels(self, values: &[String]) -> anyhow::Result<Vec<&'static str>> {
        match self {
            Self::Demands | Self::Contracts | Self::Settings => {
                parsed_labels(values, CaisseType::as_str)
            }
            Self::Participants => known_labels(self, "type", values, &["MEMBER", "GROUP"]),
            Self::Contributions => known_labels(self, "type", values, &["MONEY", "IN_KIND"]),
            Self::Members | Self::Groups => known_labels(self, "type", values, &[]),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Members => "members",
            Self::Groups => "groups",
            Self::Demands => "demands",
            Self::Contracts => "contracts",
            Self::Settings => "settings",
            Self::Participants => "participants",
            Self::Contributions => "contributions",
        })
    }
}

/// Parses each value as a `T` and keeps its stored label.
fn parsed_labels<T>(
    values: &[String],
    label: fn(T) -> &'static str,
) -> anyhow::Result<Vec<&'static str>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    values
        .iter()
        .map(|value| value.parse::<T>().map(label).map_err(|e| anyhow!("{e}")))
        .collect()
}

/// Matches each value against `known`, ignoring case and accepting `-` for
/// `_`.
fn known_labels(
    entity: Entity,
    flag: &str,
    values: &[String],
    known: &[&'static str],
) -> anyhow::Result<Vec<&'static str>> {
    values
        .iter()
        .map(|value| {
            let normalized = value.trim().to_ascii_uppercase().replace('-', "_");
            known
                .iter()
                .copied()
                .find(|label| *label == normalized)
                .ok_or_else(|| {
                    if known.is_empty() {
                        anyhow!("{entity} cannot be filtered by {flag}")
                    } else {
                        anyhow!(
                            "unknown {flag} '{value}' for {entity}, expected one of: {}",
                            known.join(", ")
                        )
                    }
                })
        })
        .collect()
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Sortable fields.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum SortArg {
    Id,
    Name,
    Date,
    Status,
    Type,
    Amount,
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Id => Self::Id,
            SortArg::Name => Self::Name,
            SortArg::Date => Self::Date,
            SortArg::Status => Self::Status,
            SortArg::Type => Self::Type,
            SortArg::Amount => Self::Amount,
        }
    }
}

impl List {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = super::load(root)?;
        let names = directory.name_lookup();
        let query = self.query(self.page_size.unwrap_or(directory.config().page_size()))?;

        match self.entity {
            Entity::Members => self.render(&query.run(directory.members(), &names), &names),
            Entity::Groups => self.render(&query.run(directory.groups(), &names), &names),
            Entity::Demands => self.render(&query.run(directory.demands(), &names), &names),
            Entity::Contracts => self.render(&query.run(directory.contracts(), &names), &names),
            Entity::Settings => self.render(&query.run(directory.settings(), &names), &names),
            Entity::Participants => {
                self.render(&query.run(directory.participants(), &names), &names)
            }
            Entity::Contributions => {
                self.render(&query.run(directory.contributions(), &names), &names)
            }
        }
    }

    fn query(&self, page_size: NonZeroUsize) -> anyhow::Result<ListQuery> {
        let mut filters = Filters::default()
            .statuses(self.entity.status_labels(&self.status)?)
            .kinds(self.entity.kind_labels(&self.kind)?)
            .between(self.from, self.until);

        if let Some(needle) = &self.contains {
            filters = filters.contains(needle);
        }

        if let Some(pattern) = &self.regex {
            let regex =
                Regex::new(pattern).with_context(|| format!("invalid regex: {pattern}"))?;
            filters = filters.regex(regex);
        }

        let mut query = ListQuery::new(page_size).filters(filters).page(self.page);
        if let Some(sort) = self.sort {
            let direction = if self.desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            query = query.sort(sort.into(), direction);
        }
        Ok(query)
    }

    fn render<T: Columns>(&self, page: &Page<'_, T>, names: &NameLookup) -> anyhow::Result<()> {
        let rows: Vec<Vec<String>> = page
            .items()
            .iter()
            .map(|record| record.values(names))
            .collect();

        match self.output {
            OutputFormat::Table => {
                render_table(T::HEADERS, &rows, self.quiet);
                if !self.quiet {
                    print_footer(page);
                }
                Ok(())
            }
            OutputFormat::Json => render_json(T::HEADERS, &rows, page),
            OutputFormat::Csv => {
                render_csv(T::HEADERS, &rows, self.quiet);
                Ok(())
            }
        }
    }
}

/// The columns shown for a listed record.
trait Columns: Listable {
    const HEADERS: &'static [&'static str];

    fn values(&self, names: &NameLookup) -> Vec<String>;
}

impl Columns for Member {
    const HEADERS: &'static [&'static str] = &["Id", "Matricule", "Name", "Contacts", "Created"];

    fn values(&self, _names: &NameLookup) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.matricule.clone(),
            self.full_name(),
            self.contacts.join(", "),
            self.created_at.date_naive().to_string(),
        ]
    }
}

impl Columns for Group {
    const HEADERS: &'static [&'static str] = &["Id", "Name", "Label", "Created"];

    fn values(&self, _names: &NameLookup) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.label.clone().unwrap_or_default(),
            self.created_at.date_naive().to_string(),
        ]
    }
}

impl Columns for Demand {
    const HEADERS: &'static [&'static str] = &[
        "Id",
        "Subscriber",
        "Type",
        "Contribution",
        "Months",
        "Status",
        "Created",
        "Contract",
    ];

    fn values(&self, names: &NameLookup) -> Vec<String> {
        vec![
            self.id.to_string(),
            names.subscriber_name(&self.terms.subscriber).into_owned(),
            self.terms.caisse_type.to_string(),
            self.terms.contribution.to_string(),
            self.terms.months_planned.to_string(),
            self.status.to_string(),
            self.created_at.date_naive().to_string(),
            self.contract_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        ]
    }
}

impl Columns for Contract {
    const HEADERS: &'static [&'static str] = &[
        "Id",
        "Subscriber",
        "Type",
        "Contribution",
        "Months",
        "First payment",
        "Status",
        "Settings",
    ];

    fn values(&self, names: &NameLookup) -> Vec<String> {
        vec![
            self.id.to_string(),
            names.subscriber_name(&self.subscriber).into_owned(),
            self.caisse_type.to_string(),
            self.contribution.to_string(),
            self.months_planned.to_string(),
            self.first_payment_date.to_string(),
            self.status.as_str().to_string(),
            self.settings_version.to_string(),
        ]
    }
}

impl Columns for Settings {
    const HEADERS: &'static [&'static str] =
        &["Id", "Type", "Published", "Minimum", "Penalty %", "Bonus months"];

    fn values(&self, _names: &NameLookup) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.caisse_type.to_string(),
            self.published_at
                .map_or_else(|| "draft".to_string(), |at| at.to_rfc3339()),
            self.minimum_monthly_amount
                .map(|amount| amount.to_string())
                .unwrap_or_default(),
            self.penalty_rate.to_string(),
            self.bonus_rates
                .keys()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ]
    }
}

impl Columns for Participant {
    const HEADERS: &'static [&'static str] = &["Id", "Event", "Participant", "Kind", "Joined"];

    fn values(&self, names: &NameLookup) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.event_id.to_string(),
            names.subscriber_name(&self.subscriber).into_owned(),
            self.subscriber.kind_label().to_string(),
            self.joined_at.date_naive().to_string(),
        ]
    }
}

impl Columns for Contribution {
    const HEADERS: &'static [&'static str] =
        &["Id", "Event", "Contributor", "Contribution", "Date", "Status"];

    fn values(&self, names: &NameLookup) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.event_id.to_string(),
            names.subscriber_name(&self.subscriber).into_owned(),
            self.kind.to_string(),
            self.date.to_string(),
            self.status.as_str().to_string(),
        ]
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>], quiet: bool) {
    if quiet {
        for row in rows {
            println!("{}", row.join("\t"));
        }
        return;
    }

    if rows.is_empty() {
        println!("{}", "No matching records.".dim());
        return;
    }

    // Determine column widths for alignment.
    let widths = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .map(|row| row[idx].chars().count())
                .max()
                .unwrap_or(0)
                .max(header.chars().count())
        })
        .collect::<Vec<_>>();

    for (header, width) in headers.iter().zip(&widths) {
        print!("{header:<width$}  ");
    }
    println!();

    for width in &widths {
        print!("{:-<width$}  ", "");
    }
    println!();

    for row in rows {
        for (value, width) in row.iter().zip(&widths) {
            print!("{value:<width$}  ");
        }
        println!();
    }
}

fn print_footer<T>(page: &Page<'_, T>) {
    let footer = format!(
        "Page {}/{} ({} records)",
        page.page(),
        page.total_pages(),
        page.total()
    );
    println!();
    println!("{}", footer.dim());
}

fn render_json<T>(headers: &[&str], rows: &[Vec<String>], page: &Page<'_, T>) -> anyhow::Result<()> {
    let items: Vec<serde_json::Map<String, serde_json::Value>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .zip(row)
                .map(|(header, value)| (json_key(header), serde_json::Value::from(value.as_str())))
                .collect()
        })
        .collect();

    let output = serde_json::json!({
        "page": page.page(),
        "pageSize": page.page_size(),
        "total": page.total(),
        "totalPages": page.total_pages(),
        "items": items,
    });

    serde_json::to_writer_pretty(std::io::stdout(), &output)
        .context("failed to render json output")?;
    println!();
    Ok(())
}

/// `"First payment"` becomes `"firstPayment"`.
fn json_key(header: &str) -> String {
    let mut key = String::new();
    for (i, word) in header
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .enumerate()
    {
        let word = word.to_lowercase();
        if i == 0 {
            key.push_str(&word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                key.extend(first.to_uppercase());
                key.push_str(chars.as_str());
            }
        }
    }
    key
}

fn render_csv(headers: &[&str], rows: &[Vec<String>], quiet: bool) {
    if !quiet {
        let header_line = headers
            .iter()
            .map(|header| csv_escape(header))
            .collect::<Vec<_>>()
            .join(",");
        println!("{header_line}");
    }

    for row in rows {
        let values = row
            .iter()
            .map(|value| csv_escape(value))
            .collect::<Vec<_>>()
            .join(",");
        println!("{values}");
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("Id" => "id")]
    #[test_case("First payment" => "firstPayment")]
    #[test_case("Penalty %" => "penalty")]
    #[test_case("Bonus months" => "bonusMonths")]
    fn json_keys_are_camel_case(header: &str) -> String {
        json_key(header)
    }

    #[test_case(Entity::Demands, " approved " => Some(vec!["APPROVED"]); "demand status")]
    #[test_case(Entity::Demands, "aproved" => None; "misspelt demand status")]
    #[test_case(Entity::Contracts, "closed" => Some(vec!["CLOSED"]); "contract status")]
    #[test_case(Entity::Contracts, "converted" => None; "demand status on contracts")]
    #[test_case(Entity::Contributions, "Confirmed" => Some(vec!["CONFIRMED"]); "contribution status")]
    #[test_case(Entity::Settings, "draft" => Some(vec!["DRAFT"]); "settings status")]
    #[test_case(Entity::Members, "pending" => None; "members have no status")]
    fn status_filters_are_checked(entity: Entity, value: &str) -> Option<Vec<&'static str>> {
        entity.status_labels(&[value.to_string()]).ok()
    }

    #[test_case(Entity::Demands, "libre-charitable" => Some(vec!["LIBRE_CHARITABLE"]); "caisse type")]
    #[test_case(Entity::Settings, "epargne" => None; "unknown caisse type")]
    #[test_case(Entity::Participants, "group" => Some(vec!["GROUP"]); "participant kind")]
    #[test_case(Entity::Contributions, "in-kind" => Some(vec!["IN_KIND"]); "contribution kind")]
    #[test_case(Entity::Groups, "member" => None; "groups have no type")]
    fn type_filters_are_checked(entity: Entity, value: &str) -> Option<Vec<&'static str>> {
        entity.kind_labels(&[value.to_string()]).ok()
    }

    #[test]
    fn misspelt_filter_fails_the_query() {
        let list = List::try_parse_from(["list", "contracts", "--status", "active,actve"]).unwrap();

        let error = list.query(NonZeroUsize::MIN).unwrap_err();

        assert_eq!(
            error.to_string(),
            "unknown status 'actve' for contracts, expected one of: ACTIVE, COMPLETED, CLOSED"
        );
    }

    #[test_case("plain" => "plain")]
    #[test_case("Riz, huile" => "\"Riz, huile\"")]
    #[test_case("dit \"oui\"" => "\"dit \"\"oui\"\"\"")]
    fn csv_values_are_escaped(value: &str) -> String {
        csv_escape(value)
    }
}
