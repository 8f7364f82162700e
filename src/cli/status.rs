use std::{collections::BTreeMap, path::PathBuf, process};

use clap::Parser;
use kara::{CaisseType, DemandStatus, domain::resolve_active, storage::Loaded};
use tracing::instrument;

use super::terminal::{Colorize, is_narrow, status_label};

#[derive(Debug, Parser, Default)]
#[command(about = "Show demand counts and conversion blockers")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

struct Summary {
    demands: BTreeMap<DemandStatus, usize>,
    members: usize,
    groups: usize,
    contracts: usize,
    participants: usize,
    contributions: usize,
    /// Caisse types with published settings.
    configured: Vec<CaisseType>,
    /// Approved demands whose caisse type has no active settings.
    blocked: Vec<String>,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = super::load(root)?;
        let summary = Summary::collect(&directory);

        match self.output {
            OutputFormat::Json => summary.output_json()?,
            OutputFormat::Table => {
                if self.quiet {
                    summary.output_quiet();
                } else {
                    summary.output_table();
                }
            }
        }

        // Approved demands that cannot be converted need attention.
        if !summary.blocked.is_empty() {
            process::exit(2);
        }

        Ok(())
    }
}

impl Summary {
    fn collect(directory: &kara::Directory<Loaded>) -> Self {
        let mut demands: BTreeMap<DemandStatus, usize> =
            DemandStatus::ALL.into_iter().map(|status| (status, 0)).collect();
        for demand in directory.demands() {
            *demands.entry(demand.status).or_insert(0) += 1;
        }

        let configured: Vec<CaisseType> = CaisseType::ALL
            .into_iter()
            .filter(|caisse_type| resolve_active(directory.settings(), *caisse_type).is_some())
            .collect();

        let blocked = directory
            .demands()
            .iter()
            .filter(|demand| demand.status == DemandStatus::Approved)
            .filter(|demand| !configured.contains(&demand.terms.caisse_type))
            .map(|demand| demand.id.to_string())
            .collect();

        Self {
            demands,
            members: directory.members().len(),
            groups: directory.groups().len(),
            contracts: directory.contracts().len(),
            participants: directory.participants().len(),
            contributions: directory.contributions().len(),
            configured,
            blocked,
        }
    }

    fn total_demands(&self) -> usize {
        self.demands.values().sum()
    }

    fn output_json(&self) -> anyhow::Result<()> {
        use serde_json::json;

        let demands: serde_json::Map<String, serde_json::Value> = self
            .demands
            .iter()
            .map(|(status, count)| (status.as_str().to_string(), json!(count)))
            .collect();

        let output = json!({
            "demands": {
                "byStatus": demands,
                "total": self.total_demands(),
                "blocked": self.blocked,
            },
            "members": self.members,
            "groups": self.groups,
            "contracts": self.contracts,
            "participants": self.participants,
            "contributions": self.contributions,
            "configuredTypes": self.configured.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(&self) {
        let counts = self
            .demands
            .iter()
            .map(|(status, count)| format!("{}={count}", status.as_str().to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{counts} contracts={} blocked={}",
            self.contracts,
            self.blocked.len()
        );
    }

    fn output_table(&self) {
        const MAX_BLOCKED_DISPLAY: usize = 5;

        if self.total_demands() == 0 && self.members == 0 {
            println!("No records found yet. Run 'kara init' to set up a data directory.");
            return;
        }

        println!("Demands");
        println!("{}", "───────".dim());
        if is_narrow() {
            for (status, count) in &self.demands {
                println!("{}: {count}", status_label(*status));
            }
        } else {
            println!("{:<10} Count", "Status");
            for (status, count) in &self.demands {
                // Pad before colouring so escape codes don't skew alignment.
                let label = format!("{:<10}", status.as_str());
                let label = label.replace(status.as_str(), &status_label(*status));
                println!("{label} {count}");
            }
        }
        println!("Total      {}", self.total_demands());
        println!();

        println!(
            "Members: {}  Groups: {}  Contracts: {}",
            self.members, self.groups, self.contracts
        );
        println!(
            "Charity participants: {}  Contributions: {}",
            self.participants, self.contributions
        );
        println!();

        if self.configured.is_empty() {
            println!("Active settings: {}", "none".warning());
        } else {
            let types: Vec<_> = self.configured.iter().map(|t| t.as_str()).collect();
            println!("Active settings: {}", types.join(", "));
        }

        if self.blocked.is_empty() {
            println!("Blocked conversions: {} ✅", "0".success());
        } else {
            println!(
                "Blocked conversions: {} ⚠️",
                self.blocked.len().to_string().warning()
            );
            for id in self.blocked.iter().take(MAX_BLOCKED_DISPLAY) {
                println!("  - {id}");
            }
            if self.blocked.len() > MAX_BLOCKED_DISPLAY {
                println!(
                    "  - ... and {} more",
                    self.blocked.len() - MAX_BLOCKED_DISPLAY
                );
            }
            println!(
                "{}",
                "Publish settings for these caisse types with 'kara settings publish'.".dim()
            );
        }
    }
}
