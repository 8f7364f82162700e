use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CaisseType, DocumentId};

/// A version of the product configuration for one caisse type.
///
/// Every publication creates a new record; the id of the record is the
/// settings version contracts are created under. Records without a
/// publication date are drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Document id, used as the settings version.
    pub id: DocumentId,
    /// Product this configuration applies to.
    pub caisse_type: CaisseType,
    /// When this version was published. `None` for drafts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Bonus percentage earned when a contract reaches the given month.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bonus_rates: BTreeMap<u32, f64>,
    /// Penalty percentage applied to late contributions.
    #[serde(default)]
    pub penalty_rate: f64,
    /// Smallest accepted monthly amount, in FCFA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_monthly_amount: Option<u64>,
}

impl Settings {
    /// An empty draft for the given product.
    #[must_use]
    pub const fn draft(id: DocumentId, caisse_type: CaisseType) -> Self {
        Self {
            id,
            caisse_type,
            published_at: None,
            bonus_rates: BTreeMap::new(),
            penalty_rate: 0.0,
            minimum_monthly_amount: None,
        }
    }

    /// Marks this record as published at the given time.
    #[must_use]
    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// Whether this record has been published.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Picks the active settings for `caisse_type` among `candidates`.
///
/// The active record is the most recently published one for that type.
/// Drafts never qualify. Equal publication times are broken by the greater
/// id so the choice does not depend on iteration order.
pub fn resolve_active<'a, I>(candidates: I, caisse_type: CaisseType) -> Option<&'a Settings>
where
    I: IntoIterator<Item = &'a Settings>,
{
    candidates
        .into_iter()
        .filter(|settings| settings.caisse_type == caisse_type)
        .filter_map(|settings| settings.published_at.map(|at| (at, settings)))
        .max_by(|(at_a, a), (at_b, b)| at_a.cmp(at_b).then_with(|| a.id.cmp(&b.id)))
        .map(|(_, settings)| settings)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn id(s: &str) -> DocumentId {
        DocumentId::try_from(s).unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn latest_publication_wins() {
        let settings = [
            Settings::draft(id("S1"), CaisseType::Standard).published(at(1)),
            Settings::draft(id("S2"), CaisseType::Standard).published(at(3)),
            Settings::draft(id("S3"), CaisseType::Standard).published(at(2)),
        ];

        let active = resolve_active(&settings, CaisseType::Standard).unwrap();
        assert_eq!(active.id, id("S2"));
    }

    #[test]
    fn drafts_are_never_active() {
        let settings = [
            Settings::draft(id("S1"), CaisseType::Libre).published(at(1)),
            Settings::draft(id("S2"), CaisseType::Libre),
        ];

        let active = resolve_active(&settings, CaisseType::Libre).unwrap();
        assert_eq!(active.id, id("S1"));
    }

    #[test]
    fn other_types_are_ignored() {
        let settings = [Settings::draft(id("S1"), CaisseType::Libre).published(at(1))];
        assert!(resolve_active(&settings, CaisseType::Standard).is_none());
    }

    #[test]
    fn ties_are_broken_by_id() {
        let settings = [
            Settings::draft(id("S_B"), CaisseType::Standard).published(at(1)),
            Settings::draft(id("S_A"), CaisseType::Standard).published(at(1)),
        ];

        let active = resolve_active(&settings, CaisseType::Standard).unwrap();
        assert_eq!(active.id, id("S_B"));
    }

    #[test]
    fn bonus_rates_round_trip_through_yaml() {
        let mut settings = Settings::draft(id("S1"), CaisseType::Standard).published(at(1));
        settings.bonus_rates.insert(6, 2.5);
        settings.bonus_rates.insert(12, 5.0);

        let yaml = serde_yaml::to_string(&settings).unwrap();
        let back: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, settings);
    }
}
