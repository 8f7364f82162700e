use chrono::{NaiveDate, NaiveTime};

use crate::{
    domain::{Contract, Contribution, Demand, Group, Member, Participant, Settings},
    listing::{Listable, NameLookup, SortField, SortKey},
};

impl Listable for Member {
    fn search_fields(&self, _names: &NameLookup) -> Vec<String> {
        let mut fields = vec![
            self.full_name(),
            self.matricule.clone(),
            self.id.to_string(),
        ];
        fields.extend(self.email.clone());
        fields.extend(self.contacts.iter().cloned());
        fields
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.created_at.date_naive())
    }

    fn sort_key(&self, field: SortField, _names: &NameLookup) -> SortKey {
        match field {
            SortField::Id => SortKey::text(self.id.as_str()),
            SortField::Name => SortKey::text(&self.full_name()),
            SortField::Date => SortKey::Time(self.created_at),
            SortField::Status | SortField::Type | SortField::Amount => SortKey::None,
        }
    }
}

impl Listable for Group {
    fn search_fields(&self, _names: &NameLookup) -> Vec<String> {
        let mut fields = vec![self.name.clone(), self.id.to_string()];
        fields.extend(self.label.clone());
        fields
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.created_at.date_naive())
    }

    fn sort_key(&self, field: SortField, _names: &NameLookup) -> SortKey {
        match field {
            SortField::Id => SortKey::text(self.id.as_str()),
            SortField::Name => SortKey::text(&self.name),
            SortField::Date => SortKey::Time(self.created_at),
            SortField::Type => SortKey::label(self.label.as_deref()),
            SortField::Status | SortField::Amount => SortKey::None,
        }
    }
}

impl Listable for Demand {
    fn search_fields(&self, names: &NameLookup) -> Vec<String> {
        vec![
            names.subscriber_name(&self.terms.subscriber).into_owned(),
            self.terms.subscriber.id().to_string(),
            self.id.to_string(),
        ]
    }

    fn status(&self) -> Option<&'static str> {
        Some(self.status.as_str())
    }

    fn kind(&self) -> Option<&'static str> {
        Some(self.terms.caisse_type.as_str())
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.created_at.date_naive())
    }

    fn sort_key(&self, field: SortField, names: &NameLookup) -> SortKey {
        match field {
            SortField::Id => SortKey::text(self.id.as_str()),
            SortField::Name => SortKey::text(&names.subscriber_name(&self.terms.subscriber)),
            SortField::Date => SortKey::Time(self.created_at),
            SortField::Status => SortKey::text(self.status.as_str()),
            SortField::Type => SortKey::text(self.terms.caisse_type.as_str()),
            SortField::Amount => SortKey::Number(self.terms.contribution.value()),
        }
    }
}

impl Listable for Contract {
    fn search_fields(&self, names: &NameLookup) -> Vec<String> {
        let mut fields = vec![
            names.subscriber_name(&self.subscriber).into_owned(),
            self.subscriber.id().to_string(),
            self.id.to_string(),
        ];
        fields.extend(self.demand_id.as_ref().map(ToString::to_string));
        fields
    }

    fn status(&self) -> Option<&'static str> {
        Some(self.status.as_str())
    }

    fn kind(&self) -> Option<&'static str> {
        Some(self.caisse_type.as_str())
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.created_at.date_naive())
    }

    fn sort_key(&self, field: SortField, names: &NameLookup) -> SortKey {
        match field {
            SortField::Id => SortKey::text(self.id.as_str()),
            SortField::Name => SortKey::text(&names.subscriber_name(&self.subscriber)),
            SortField::Date => SortKey::Time(self.created_at),
            SortField::Status => SortKey::text(self.status.as_str()),
            SortField::Type => SortKey::text(self.caisse_type.as_str()),
            SortField::Amount => SortKey::Number(self.contribution.value()),
        }
    }
}

impl Listable for Participant {
    fn search_fields(&self, names: &NameLookup) -> Vec<String> {
        vec![
            names.subscriber_name(&self.subscriber).into_owned(),
            self.subscriber.id().to_string(),
            self.event_id.to_string(),
            self.id.to_string(),
        ]
    }

    fn kind(&self) -> Option<&'static str> {
        Some(self.subscriber.kind_label())
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.joined_at.date_naive())
    }

    fn sort_key(&self, field: SortField, names: &NameLookup) -> SortKey {
        match field {
            SortField::Id => SortKey::text(self.id.as_str()),
            SortField::Name => SortKey::text(&names.subscriber_name(&self.subscriber)),
            SortField::Date => SortKey::Time(self.joined_at),
            SortField::Type => SortKey::text(self.subscriber.kind_label()),
            SortField::Status | SortField::Amount => SortKey::None,
        }
    }
}

impl Listable for Contribution {
    fn search_fields(&self, names: &NameLookup) -> Vec<String> {
        vec![
            names.subscriber_name(&self.subscriber).into_owned(),
            self.subscriber.id().to_string(),
            self.kind.to_string(),
            self.event_id.to_string(),
            self.id.to_string(),
        ]
    }

    fn status(&self) -> Option<&'static str> {
        Some(self.status.as_str())
    }

    fn kind(&self) -> Option<&'static str> {
        Some(self.kind.kind_label())
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn sort_key(&self, field: SortField, names: &NameLookup) -> SortKey {
        match field {
            SortField::Id => SortKey::text(self.id.as_str()),
            SortField::Name => SortKey::text(&names.subscriber_name(&self.subscriber)),
            SortField::Date => SortKey::Time(self.date.and_time(NaiveTime::MIN).and_utc()),
            SortField::Status => SortKey::text(self.status.as_str()),
            SortField::Type => SortKey::text(self.kind.kind_label()),
            SortField::Amount => SortKey::Number(self.kind.value()),
        }
    }
}

impl Listable for Settings {
    fn search_fields(&self, _names: &NameLookup) -> Vec<String> {
        vec![self.id.to_string(), self.caisse_type.to_string()]
    }

    fn status(&self) -> Option<&'static str> {
        Some(if self.is_published() { "PUBLISHED" } else { "DRAFT" })
    }

    fn kind(&self) -> Option<&'static str> {
        Some(self.caisse_type.as_str())
    }

    fn date(&self) -> Option<NaiveDate> {
        self.published_at.map(|at| at.date_naive())
    }

    fn sort_key(&self, field: SortField, _names: &NameLookup) -> SortKey {
        match field {
            SortField::Id => SortKey::text(self.id.as_str()),
            SortField::Date => self.published_at.map_or(SortKey::None, SortKey::Time),
            SortField::Status => SortKey::label(self.status()),
            SortField::Type | SortField::Name => SortKey::text(self.caisse_type.as_str()),
            SortField::Amount => self.minimum_monthly_amount.map_or(SortKey::None, SortKey::Number),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use chrono::{TimeZone, Utc};

    use crate::{
        domain::{
            ContributionKind, ContributionStatus, DemandStatus, Subscriber,
            demand::tests::{id, standard_terms},
        },
        listing::{Filters, ListQuery, SortDirection},
    };

    use super::*;

    fn member(member_id: &str, first: &str, last: &str) -> Member {
        Member {
            id: id(member_id),
            matricule: format!("{member_id}.MK.010126"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            contacts: Vec::new(),
            email: None,
            group_id: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap(),
        }
    }

    fn demand(demand_id: &str, member_id: &str, status: DemandStatus) -> Demand {
        let mut demand = Demand::new(id(demand_id), standard_terms(member_id), id("AGENT_1")).unwrap();
        demand.status = status;
        demand
    }

    fn page_size() -> NonZeroUsize {
        NonZeroUsize::new(50).unwrap()
    }

    #[test]
    fn demands_are_searched_by_resolved_name() {
        let members = [member("MEM_1", "Awa", "Ndiaye"), member("MEM_2", "Moussa", "Fall")];
        let names = NameLookup::new(&members, []);
        let demands = [
            demand("DEM_1", "MEM_1", DemandStatus::Pending),
            demand("DEM_2", "MEM_2", DemandStatus::Pending),
            demand("DEM_3", "MEM_X", DemandStatus::Pending),
        ];

        let page = ListQuery::new(page_size())
            .filters(Filters::default().contains("NDIAYE"))
            .run(&demands, &names);
        assert_eq!(page.items(), [&demands[0]]);

        let page = ListQuery::new(page_size())
            .filters(Filters::default().contains("membre mem_x"))
            .run(&demands, &names);
        assert_eq!(page.items(), [&demands[2]]);
    }

    #[test]
    fn demands_filter_by_status_and_type() {
        let demands = [
            demand("DEM_1", "MEM_1", DemandStatus::Approved),
            demand("DEM_2", "MEM_1", DemandStatus::Pending),
            demand("DEM_3", "MEM_1", DemandStatus::Approved),
        ];

        let page = ListQuery::new(page_size())
            .filters(
                Filters::default()
                    .statuses(["approved"])
                    .kinds(["standard"]),
            )
            .sort(SortField::Id, SortDirection::Descending)
            .run(&demands, &NameLookup::default());

        assert_eq!(page.items(), [&demands[2], &demands[0]]);
    }

    #[test]
    fn members_sort_by_full_name() {
        let members = [
            member("MEM_1", "Moussa", "Fall"),
            member("MEM_2", "awa", "Ndiaye"),
            member("MEM_3", "Binta", "Sow"),
        ];

        let page = ListQuery::new(page_size())
            .sort(SortField::Name, SortDirection::Ascending)
            .run(&members, &NameLookup::default());

        let order: Vec<_> = page.items().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, ["MEM_2", "MEM_3", "MEM_1"]);
    }

    #[test]
    fn contributions_filter_by_date_and_kind() {
        let contribution = |contribution_id: &str, day: u32, kind: ContributionKind| Contribution {
            id: id(contribution_id),
            event_id: id("EVT_1"),
            subscriber: Subscriber::Group(id("GRP_1")),
            kind,
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            status: ContributionStatus::Confirmed,
        };
        let contributions = [
            contribution("C_1", 1, ContributionKind::in_kind("riz", Some(5_000))),
            contribution("C_2", 15, ContributionKind::in_kind("huile", None)),
            contribution("C_3", 15, ContributionKind::money(std::num::NonZeroU64::MIN)),
            contribution("C_4", 31, ContributionKind::in_kind("savon", None)),
        ];

        let page = ListQuery::new(page_size())
            .filters(
                Filters::default()
                    .kinds(["in_kind"])
                    .between(NaiveDate::from_ymd_opt(2026, 3, 2), NaiveDate::from_ymd_opt(2026, 3, 31)),
            )
            .run(&contributions, &NameLookup::default());

        assert_eq!(page.items(), [&contributions[1], &contributions[3]]);
    }
}
