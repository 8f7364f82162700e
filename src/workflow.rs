//! Admin workflows over Caisse Spéciale demands.
//!
//! [`DemandReview`] records admin decisions on pending demands and
//! [`DemandConversion`] turns approved demands into contracts. Both only see
//! the store traits, and both return an explicit [`Result`]: presenting the
//! outcome is left to the caller.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use crate::{
    domain::{
        CaisseType, Demand, DemandStatus, DemandUpdate, DocumentId, SubscriptionRequest,
        TermsError,
    },
    storage::{DemandStore, SettingsStore, StoreError, SubscriptionEngine, SubscriptionError},
};

/// Errors from the demand workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The demand does not exist.
    #[error("demande {0} introuvable")]
    NotFound(DocumentId),

    /// The demand's status does not allow the requested transition.
    #[error("la demande {id} est au statut {status}: {action} impossible")]
    Conflict {
        /// The demand.
        id: DocumentId,
        /// Its current status.
        status: DemandStatus,
        /// What was attempted.
        action: &'static str,
    },

    /// No active settings exist for the demand's product.
    #[error("Paramètres non configurés pour ce type de caisse")]
    PreconditionFailed {
        /// The product without settings.
        caisse_type: CaisseType,
    },

    /// A rejection was attempted without a reason.
    #[error("un motif de rejet est requis")]
    MissingReason,

    /// The demand's terms cannot be subscribed.
    #[error(transparent)]
    InvalidTerms(#[from] TermsError),

    /// The subscription engine refused or failed the request.
    #[error("la souscription a échoué")]
    Subscription(#[from] SubscriptionError),

    /// The demand store failed.
    #[error("accès aux demandes impossible")]
    Store(#[from] StoreError),
}

/// Converts approved demands into contracts.
///
/// Steps run strictly in order: load the demand, check its status, resolve
/// the active settings for its product, subscribe, then record the
/// conversion on the demand. Nothing is written unless every earlier step
/// succeeded.
#[derive(Debug)]
pub struct DemandConversion<'a, D, S, E> {
    demands: &'a mut D,
    settings: &'a S,
    engine: &'a mut E,
    require_approval: bool,
}

impl<'a, D, S, E> DemandConversion<'a, D, S, E>
where
    D: DemandStore,
    S: SettingsStore,
    E: SubscriptionEngine,
{
    /// A conversion workflow that requires demands to be approved first.
    pub const fn new(demands: &'a mut D, settings: &'a S, engine: &'a mut E) -> Self {
        Self {
            demands,
            settings,
            engine,
            require_approval: true,
        }
    }

    /// Sets whether pending demands must be approved before conversion.
    #[must_use]
    pub const fn require_approval(mut self, required: bool) -> Self {
        self.require_approval = required;
        self
    }

    /// Converts the demand `demand_id` on behalf of `admin`.
    ///
    /// Returns the updated demand, carrying the new contract id.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::NotFound`] if the demand does not exist
    /// - [`WorkflowError::Conflict`] if the demand was already converted or
    ///   rejected, or is still pending while approval is required
    /// - [`WorkflowError::PreconditionFailed`] if its product has no active
    ///   settings; the subscription engine is not called
    /// - [`WorkflowError::InvalidTerms`] if the terms cannot be subscribed
    /// - [`WorkflowError::Subscription`] if the engine fails; the demand is
    ///   left unchanged
    /// - [`WorkflowError::Store`] if the demand cannot be read or updated
    #[instrument(level = "debug", skip_all, fields(demand = %demand_id, admin = %admin))]
    pub fn convert(
        &mut self,
        demand_id: &DocumentId,
        admin: &DocumentId,
    ) -> Result<Demand, WorkflowError> {
        let demand = self
            .demands
            .demand(demand_id)?
            .ok_or_else(|| WorkflowError::NotFound(demand_id.clone()))?;

        self.check_convertible(&demand)?;

        let caisse_type = demand.terms.caisse_type;
        let settings = self
            .settings
            .active_settings(caisse_type)?
            .ok_or(WorkflowError::PreconditionFailed { caisse_type })?;
        tracing::debug!("Using settings {} for {caisse_type}", settings.id);

        let request = SubscriptionRequest::for_demand(&demand, &settings)?;
        let contract_id = self.engine.subscribe(&request)?;

        let update = DemandUpdate {
            status: Some(DemandStatus::Converted),
            contract_id: Some(contract_id.clone()),
            converted_by: Some(admin.clone()),
            converted_at: Some(Utc::now()),
            ..DemandUpdate::default()
        };

        let converted = self.demands.update_demand(demand_id, update).map_err(|e| {
            tracing::error!(
                "Contract {contract_id} was created but demand {demand_id} could not be updated: {e}"
            );
            WorkflowError::Store(e)
        })?;

        tracing::info!("Converted demand {demand_id} into contract {contract_id}");
        Ok(converted)
    }

    fn check_convertible(&self, demand: &Demand) -> Result<(), WorkflowError> {
        let allowed = match demand.status {
            DemandStatus::Approved => true,
            DemandStatus::Pending => !self.require_approval,
            DemandStatus::Rejected | DemandStatus::Converted => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(WorkflowError::Conflict {
                id: demand.id.clone(),
                status: demand.status,
                action: "conversion",
            })
        }
    }
}

/// Records admin decisions on demands.
#[derive(Debug)]
pub struct DemandReview<'a, D> {
    demands: &'a mut D,
}

impl<'a, D: DemandStore> DemandReview<'a, D> {
    /// A review workflow over `demands`.
    pub const fn new(demands: &'a mut D) -> Self {
        Self { demands }
    }

    /// Approves a pending demand.
    ///
    /// # Errors
    ///
    /// Fails if the demand does not exist, is not pending, or cannot be
    /// updated.
    #[instrument(level = "debug", skip_all, fields(demand = %demand_id, admin = %admin))]
    pub fn approve(
        &mut self,
        demand_id: &DocumentId,
        admin: &DocumentId,
    ) -> Result<Demand, WorkflowError> {
        let demand = self.load(demand_id)?;
        if demand.status != DemandStatus::Pending {
            return Err(WorkflowError::Conflict {
                id: demand.id,
                status: demand.status,
                action: "approbation",
            });
        }

        let approved = self.demands.update_demand(
            demand_id,
            DemandUpdate {
                status: Some(DemandStatus::Approved),
                decided_by: Some(admin.clone()),
                decided_at: Some(Utc::now()),
                ..DemandUpdate::default()
            },
        )?;

        tracing::info!("Approved demand {demand_id}");
        Ok(approved)
    }

    /// Rejects a pending or approved demand.
    ///
    /// # Errors
    ///
    /// Fails if the reason is blank, or if the demand does not exist, was
    /// already rejected or converted, or cannot be updated.
    #[instrument(level = "debug", skip_all, fields(demand = %demand_id, admin = %admin))]
    pub fn reject(
        &mut self,
        demand_id: &DocumentId,
        admin: &DocumentId,
        reason: &str,
    ) -> Result<Demand, WorkflowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::MissingReason);
        }

        let demand = self.load(demand_id)?;
        if demand.status.is_terminal() {
            return Err(WorkflowError::Conflict {
                id: demand.id,
                status: demand.status,
                action: "rejet",
            });
        }

        let rejected = self.demands.update_demand(
            demand_id,
            DemandUpdate {
                status: Some(DemandStatus::Rejected),
                decided_by: Some(admin.clone()),
                decided_at: Some(Utc::now()),
                rejection_reason: Some(reason.to_string()),
                ..DemandUpdate::default()
            },
        )?;

        tracing::info!("Rejected demand {demand_id}");
        Ok(rejected)
    }

    fn load(&self, demand_id: &DocumentId) -> Result<Demand, WorkflowError> {
        self.demands
            .demand(demand_id)?
            .ok_or_else(|| WorkflowError::NotFound(demand_id.clone()))
    }
}
