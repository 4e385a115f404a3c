pub(crate) mod planner;
pub(crate) mod tsql;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::catalog::{BackupCatalog, HeaderInspector, JsonCatalog, JsonHeaderSource};
use crate::chain::{self, RestorePlan, ValidationVerdict};
use crate::config::{AppConfig, OperationConfig, RestoreConfig};
use planner::RestoreOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Plan,
    Validate,
    Script,
}

/// What a restore run produced. Later fields stay empty when an earlier
/// stage was the last requested or validation rejected the chain.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub plan: RestorePlan,
    pub verdict: Option<ValidationVerdict>,
    pub operations: Vec<RestoreOperation>,
    pub script: Option<String>,
}

impl RestoreOutcome {
    /// False only when validation ran and rejected the chain.
    pub fn succeeded(&self) -> bool {
        self.verdict.as_ref().is_none_or(ValidationVerdict::is_ok)
    }
}

/// Public entry point for the restore process.
pub async fn run_restore_flow(app_config: &AppConfig) -> Result<RestoreOutcome> {
    let (stage, restore_config) = match &app_config.operation {
        Some(op @ OperationConfig::Plan(_)) => (RestoreStage::Plan, op.restore_config()),
        Some(op @ OperationConfig::Validate(_)) => (RestoreStage::Validate, op.restore_config()),
        Some(op @ OperationConfig::Script(_)) => (RestoreStage::Script, op.restore_config()),
        None => anyhow::bail!("Restore operation selected but no restore configuration found."),
    };

    let catalog = JsonCatalog::new(&restore_config.catalog_path);
    let inspector = JsonHeaderSource::new(&restore_config.headers_path);
    let outcome = perform_restore_orchestration(&catalog, &inspector, restore_config, stage).await?;

    if let (Some(script), Some(path)) = (&outcome.script, &restore_config.script_output_path) {
        tokio::fs::write(path, script)
            .await
            .with_context(|| format!("Failed to write restore script to {}", path.display()))?;
        info!("Restore script written to {}", path.display());
    }
    Ok(outcome)
}

/// catalog -> resolve -> validate -> plan -> render, stopping after `stage`.
pub async fn perform_restore_orchestration<C, I>(
    catalog: &C,
    inspector: &I,
    restore_config: &RestoreConfig,
    stage: RestoreStage,
) -> Result<RestoreOutcome>
where
    C: BackupCatalog + ?Sized,
    I: HeaderInspector + ?Sized,
{
    let snapshot = catalog
        .snapshot(&restore_config.source_database)
        .await
        .with_context(|| format!("Failed to load backup history for '{}'", restore_config.source_database))?;
    info!(
        generation = %snapshot.generation,
        taken_at = %snapshot.taken_at,
        "Loaded {} history rows for '{}'",
        snapshot.records.len(),
        snapshot.database
    );

    let plan = chain::resolve_snapshot(&snapshot, restore_config.target_time)
        .context("Failed to resolve a restore chain")?;
    for note in plan.notes() {
        info!("Note: {}", note);
    }

    let mut outcome = RestoreOutcome {
        plan,
        verdict: None,
        operations: Vec::new(),
        script: None,
    };
    if stage == RestoreStage::Plan {
        return Ok(outcome);
    }

    let verdict = chain::validate(&outcome.plan, inspector, restore_config.header_timeout).await;
    let valid = verdict.is_ok();
    outcome.verdict = Some(verdict);
    if stage == RestoreStage::Validate {
        return Ok(outcome);
    }
    if !valid {
        warn!("Chain failed validation; no restore script generated.");
        return Ok(outcome);
    }

    outcome.operations = planner::plan_operations(
        &outcome.plan,
        &restore_config.target_database,
        &restore_config.options,
    );
    outcome.script = Some(tsql::render_script(
        &outcome.operations,
        &restore_config.target_database,
    ));
    Ok(outcome)
}
