//! Validate command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use kaudit_core::{PolicyConfig, DEFAULT_POLICY_NAME};

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to a YAML file holding one policy or a list of policies
    pub path: PathBuf,

    /// Name of the policy the pipeline consults
    #[arg(long, default_value = DEFAULT_POLICY_NAME)]
    pub policy_name: String,
}

/// Outcome of validating a policy file.
#[derive(Debug)]
pub struct ValidationSummary {
    /// Every policy in the file.
    pub policies: Vec<PolicyConfig>,
    /// The policy the pipeline would consult, if present.
    pub active: Option<PolicyConfig>,
}

/// Runs the validate command.
pub fn run(args: &ValidateArgs) -> Result<()> {
    info!(path = ?args.path, "Validating audit policies");

    let summary = validate_file(&args.path, &args.policy_name)?;

    println!("kaudit Policy Validator");
    println!("=======================");
    println!("Path: {}", args.path.display());
    println!();
    for policy in &summary.policies {
        let marker = if policy.name == args.policy_name { "*" } else { " " };
        println!(
            "{marker} {} (level: {}, k8s auditing: {})",
            policy.name, policy.level, policy.k8s_auditing_enabled
        );
    }
    println!();

    match &summary.active {
        Some(policy) => println!(
            "✓ Auditing {} at level {}",
            if policy.level.is_enabled() { "enabled" } else { "disabled" },
            policy.level
        ),
        None => println!(
            "⚠ No policy named '{}'; auditing will be disabled",
            args.policy_name
        ),
    }
    Ok(())
}

/// Parses and validates every policy in `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, holds an
/// invalid policy, or defines the same name twice.
pub fn validate_file(path: &Path, policy_name: &str) -> Result<ValidationSummary> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let policies = PolicyConfig::from_yaml(&content)
        .with_context(|| format!("invalid policy file {}", path.display()))?;

    let mut seen = std::collections::HashSet::new();
    for policy in &policies {
        if !seen.insert(policy.name.as_str()) {
            anyhow::bail!("duplicate policy name '{}'", policy.name);
        }
    }

    let active = policies.iter().find(|p| p.name == policy_name).cloned();
    Ok(ValidationSummary { policies, active })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaudit_core::AuditLevel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn policy_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validate_finds_active_policy() {
        let file = policy_file(
            "- name: kube-auditing-webhook\n  auditLevel: Metadata\n- name: other\n  auditLevel: None\n",
        );

        let summary = validate_file(file.path(), DEFAULT_POLICY_NAME).unwrap();

        assert_eq!(summary.policies.len(), 2);
        assert_eq!(summary.active.unwrap().level, AuditLevel::Metadata);
    }

    #[test]
    fn test_validate_without_active_policy() {
        let file = policy_file("name: other\nauditLevel: Request\n");

        let summary = validate_file(file.path(), DEFAULT_POLICY_NAME).unwrap();
        assert!(summary.active.is_none());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let file = policy_file("- name: a\n- name: a\n");
        assert!(validate_file(file.path(), DEFAULT_POLICY_NAME).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let file = policy_file("name: a\nauditLevel: Everything\n");
        assert!(validate_file(file.path(), DEFAULT_POLICY_NAME).is_err());
    }

    #[test]
    fn test_run_reports_missing_file() {
        let args = ValidateArgs {
            path: PathBuf::from("/nonexistent/policy.yaml"),
            policy_name: DEFAULT_POLICY_NAME.to_string(),
        };
        assert!(run(&args).is_err());
    }
}
