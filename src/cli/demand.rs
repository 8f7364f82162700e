use std::path::PathBuf;

use clap::Parser;
use dialoguer::Confirm;
use kara::{Collection, Demand, DocumentId, WorkflowError, listing::NameLookup};
use tracing::instrument;

use super::{
    parse_id,
    terminal::{Colorize, status_label},
};

#[derive(Debug, Parser)]
pub struct Approve {
    /// The demand to approve
    #[arg(value_parser = parse_id)]
    id: DocumentId,

    /// The admin recording the decision
    #[arg(long, value_parser = parse_id)]
    admin: DocumentId,
}

impl Approve {
    #[instrument(level = "debug", skip_all, fields(demand = %self.id))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut directory = super::load(root)?;
        let demand = directory.review().approve(&self.id, &self.admin)?;

        println!(
            "{} demand {} is now {}",
            "✅".success(),
            demand.id,
            status_label(demand.status)
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Reject {
    /// The demand to reject
    #[arg(value_parser = parse_id)]
    id: DocumentId,

    /// The admin recording the decision
    #[arg(long, value_parser = parse_id)]
    admin: DocumentId,

    /// Why the demand is rejected
    #[arg(long)]
    reason: String,
}

impl Reject {
    #[instrument(level = "debug", skip_all, fields(demand = %self.id))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut directory = super::load(root)?;
        let demand = directory
            .review()
            .reject(&self.id, &self.admin, &self.reason)?;

        println!(
            "Demand {} is now {}: {}",
            demand.id,
            status_label(demand.status),
            demand.rejection_reason.unwrap_or_default().dim()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Convert {
    /// The demand to convert
    #[arg(value_parser = parse_id)]
    id: DocumentId,

    /// The admin performing the conversion
    #[arg(long, value_parser = parse_id)]
    admin: DocumentId,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,
}

impl Convert {
    #[instrument(level = "debug", skip_all, fields(demand = %self.id))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut directory = super::load(root)?;
        let demand = demand_to_convert(directory.demands(), &self.id)?;

        if !self.yes {
            print_terms(demand, &directory.name_lookup());

            let proceed = Confirm::new()
                .with_prompt(format!("Convert demand {} into a contract?", self.id))
                .default(false)
                .interact()?;
            if !proceed {
                println!("Cancelled");
                std::process::exit(130);
            }
        }

        let demand = directory.conversion().convert(&self.id, &self.admin)?;

        let contract = demand
            .contract_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        println!(
            "{}",
            format!("✅ Demand {} converted into contract {contract}", demand.id).success()
        );
        Ok(())
    }
}

/// Looks up the demand before anything is asked of the user.
fn demand_to_convert<'a>(
    demands: &'a Collection<Demand>,
    id: &DocumentId,
) -> Result<&'a Demand, WorkflowError> {
    demands
        .get(id)
        .ok_or_else(|| WorkflowError::NotFound(id.clone()))
}

fn print_terms(demand: &Demand, names: &NameLookup) {
    let terms = &demand.terms;
    println!("Demand {} ({})", demand.id, status_label(demand.status));
    println!(
        "  Subscriber:   {}",
        names.subscriber_name(&terms.subscriber)
    );
    println!("  Caisse type:  {}", terms.caisse_type);
    println!("  Contribution: {}", terms.contribution);
    println!("  Months:       {}", terms.months_planned);
    println!("  Start date:   {}", terms.desired_date);
    println!();
}
