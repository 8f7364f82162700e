//! Demand lifecycle against a data directory on disk: review, conversion,
//! reload and listing.

use std::num::{NonZeroU32, NonZeroU64, NonZeroUsize};

use chrono::{NaiveDate, Utc};
use kara::{
    CaisseType, ContributionKind, Demand, DemandStatus, DocumentId, Member, Settings, Subscriber,
    WorkflowError,
    domain::DemandTerms,
    listing::{Filters, ListQuery, SortDirection, SortField},
    storage::{Directory, Loaded},
};
use tempfile::TempDir;

fn id(s: &str) -> DocumentId {
    DocumentId::try_from(s).unwrap()
}

fn terms(caisse_type: CaisseType, member: &str, amount: u64) -> DemandTerms {
    DemandTerms {
        caisse_type,
        subscriber: Subscriber::Member(id(member)),
        contribution: ContributionKind::money(NonZeroU64::new(amount).unwrap()),
        months_planned: NonZeroU32::new(12).unwrap(),
        desired_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
    }
}

fn member(member_id: &str, first: &str, last: &str) -> Member {
    Member {
        id: id(member_id),
        matricule: format!("00{member_id}.MK.190126"),
        first_name: first.to_string(),
        last_name: last.to_string(),
        contacts: vec!["+221770000000".to_string()],
        email: None,
        group_id: None,
        created_at: Utc::now(),
    }
}

fn setup() -> (TempDir, Directory<Loaded>) {
    let tmp = TempDir::new().unwrap();
    let unloaded = Directory::new(tmp.path().to_path_buf());
    assert!(unloaded.init().unwrap());
    let mut directory = unloaded.load_all().unwrap();

    directory.save(member("MEM_1", "Awa", "Ndiaye")).unwrap();
    directory
        .save(Demand::new(id("DEM_1"), terms(CaisseType::Standard, "MEM_1", 10_000), id("AGENT_1")).unwrap())
        .unwrap();

    (tmp, directory)
}

fn reload(tmp: &TempDir) -> Directory<Loaded> {
    Directory::new(tmp.path().to_path_buf()).load_all().unwrap()
}

#[test]
fn approved_demand_converts_under_active_settings() {
    let (tmp, mut directory) = setup();
    let settings = directory
        .publish_settings(
            CaisseType::Standard,
            Settings::draft(id("DRAFT"), CaisseType::Standard),
        )
        .unwrap();

    directory.review().approve(&id("DEM_1"), &id("ADMIN_1")).unwrap();
    let converted = directory
        .conversion()
        .convert(&id("DEM_1"), &id("ADMIN_1"))
        .unwrap();

    assert_eq!(converted.status, DemandStatus::Converted);
    assert_eq!(converted.converted_by, Some(id("ADMIN_1")));

    let reloaded = reload(&tmp);
    let demand = reloaded.demands().get(&id("DEM_1")).unwrap();
    assert_eq!(demand, &converted);

    let contract_id = demand.contract_id.clone().unwrap();
    let contract = reloaded.contracts().get(&contract_id).unwrap();
    assert_eq!(contract.settings_version, settings.id);
    assert_eq!(contract.demand_id, Some(id("DEM_1")));
    assert_eq!(contract.planned_total(), 120_000);
}

#[test]
fn conversion_without_settings_changes_nothing() {
    let (tmp, mut directory) = setup();
    directory.review().approve(&id("DEM_1"), &id("ADMIN_1")).unwrap();

    let error = directory
        .conversion()
        .convert(&id("DEM_1"), &id("ADMIN_1"))
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Paramètres non configurés pour ce type de caisse"
    );
    let reloaded = reload(&tmp);
    assert!(reloaded.contracts().is_empty());
    assert_eq!(
        reloaded.demands().get(&id("DEM_1")).unwrap().status,
        DemandStatus::Approved
    );
}

#[test]
fn pending_demand_needs_approval_by_default() {
    let (_tmp, mut directory) = setup();
    directory
        .publish_settings(
            CaisseType::Standard,
            Settings::draft(id("DRAFT"), CaisseType::Standard),
        )
        .unwrap();

    let error = directory
        .conversion()
        .convert(&id("DEM_1"), &id("ADMIN_1"))
        .unwrap_err();

    assert!(matches!(
        error,
        WorkflowError::Conflict {
            status: DemandStatus::Pending,
            ..
        }
    ));
    assert!(directory.contracts().is_empty());
}

#[test]
fn demand_below_minimum_amount_is_refused() {
    let (_tmp, mut directory) = setup();
    let mut template = Settings::draft(id("DRAFT"), CaisseType::Standard);
    template.minimum_monthly_amount = Some(25_000);
    directory
        .publish_settings(CaisseType::Standard, template)
        .unwrap();
    directory.review().approve(&id("DEM_1"), &id("ADMIN_1")).unwrap();

    let error = directory
        .conversion()
        .convert(&id("DEM_1"), &id("ADMIN_1"))
        .unwrap_err();

    assert!(matches!(error, WorkflowError::InvalidTerms(_)));
    assert!(directory.contracts().is_empty());
}

#[test]
fn listing_resolves_names_and_placeholders() {
    let (_tmp, mut directory) = setup();
    directory
        .save(
            Demand::new(id("DEM_2"), terms(CaisseType::Libre, "MEM_GONE42", 5_000), id("AGENT_1"))
                .unwrap(),
        )
        .unwrap();
    let names = directory.name_lookup();

    let page = ListQuery::new(NonZeroUsize::new(10).unwrap())
        .filters(Filters::default().contains("gone42"))
        .run(directory.demands(), &names);
    assert_eq!(page.total(), 1);
    let orphan = page.items()[0];
    assert_eq!(
        names.subscriber_name(&orphan.terms.subscriber),
        "Membre GONE42"
    );

    let page = ListQuery::new(NonZeroUsize::new(1).unwrap())
        .sort(SortField::Amount, SortDirection::Descending)
        .run(directory.demands(), &names);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.items()[0].id, id("DEM_1"));
}
