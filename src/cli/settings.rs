use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use kara::{
    CaisseType, DocumentId,
    storage::SettingsStore,
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
pub struct Settings {
    #[command(subcommand)]
    command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// Show the active settings for a caisse type
    Active {
        /// The caisse type, e.g. STANDARD or libre-charitable
        caisse_type: CaisseType,

        /// Print the settings record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Publish a new settings version for a caisse type
    ///
    /// Rules not given on the command line are copied from the currently
    /// active version.
    Publish {
        /// The caisse type, e.g. STANDARD or libre-charitable
        caisse_type: CaisseType,

        /// Bonus rate reached at a given month, as MONTH=PERCENT (repeatable)
        #[arg(long = "bonus", value_name = "MONTH=PERCENT", value_parser = parse_bonus)]
        bonuses: Vec<(u32, f64)>,

        /// Penalty percentage applied to late contributions
        #[arg(long, value_parser = parse_rate)]
        penalty_rate: Option<f64>,

        /// Smallest accepted monthly amount, in FCFA
        #[arg(long)]
        minimum_amount: Option<u64>,
    },
}

impl Settings {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self.command {
            SettingsCommand::Active { caisse_type, json } => show_active(root, caisse_type, json),
            SettingsCommand::Publish {
                caisse_type,
                bonuses,
                penalty_rate,
                minimum_amount,
            } => {
                let mut directory = super::load(root)?;
                let mut template = directory
                    .settings()
                    .active_settings(caisse_type)?
                    .unwrap_or_else(|| kara::Settings::draft(DocumentId::generate(), caisse_type));

                if !bonuses.is_empty() {
                    template.bonus_rates = bonuses.into_iter().collect::<BTreeMap<_, _>>();
                }
                if let Some(rate) = penalty_rate {
                    template.penalty_rate = rate;
                }
                if let Some(amount) = minimum_amount {
                    template.minimum_monthly_amount = Some(amount);
                }

                let published = directory
                    .publish_settings(caisse_type, template)
                    .context("failed to publish settings")?;
                println!(
                    "{}",
                    format!("✅ Published settings {} for {caisse_type}", published.id).success()
                );
                Ok(())
            }
        }
    }
}

fn show_active(root: PathBuf, caisse_type: CaisseType, json: bool) -> anyhow::Result<()> {
    let directory = super::load(root)?;
    let Some(settings) = directory.settings().active_settings(caisse_type)? else {
        println!(
            "{}",
            format!("No active settings for {caisse_type}").warning()
        );
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    println!("Settings {} ({caisse_type})", settings.id);
    if let Some(at) = settings.published_at {
        println!("  Published:       {}", at.to_rfc3339());
    }
    match settings.minimum_monthly_amount {
        Some(amount) => println!("  Minimum amount:  {amount} FCFA"),
        None => println!("  Minimum amount:  {}", "none".dim()),
    }
    println!("  Penalty rate:    {}%", settings.penalty_rate);
    if settings.bonus_rates.is_empty() {
        println!("  Bonus rates:     {}", "none".dim());
    } else {
        println!("  Bonus rates:");
        for (month, rate) in &settings.bonus_rates {
            println!("    month {month:>3}: {rate}%");
        }
    }
    Ok(())
}

/// Parse a `MONTH=PERCENT` bonus rule. Months start at 1.
fn parse_bonus(s: &str) -> Result<(u32, f64), String> {
    let (month, rate) = s
        .split_once('=')
        .ok_or_else(|| format!("expected MONTH=PERCENT, got '{s}'"))?;
    let month: u32 = month
        .trim()
        .parse()
        .map_err(|e| format!("invalid month '{month}': {e}"))?;
    if month == 0 {
        return Err("bonus months start at 1".to_string());
    }
    Ok((month, parse_rate(rate)?))
}

/// Parse a percentage: a finite, non-negative number.
fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid percentage '{s}': {e}"))?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(format!("percentage must be a non-negative number, got '{s}'"));
    }
    Ok(rate)
}
