//! Preflight checks for host tools.
//!
//! archstrap shells out to `curl` for transport and `gpg` for signature
//! verification. Checking for them up front gives one readable report
//! instead of a failure halfway through a download.

use anyhow::{bail, Result};

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - a run will fail.
    Fail,
    /// Tool missing but only needed on some paths.
    Warn,
}

impl CheckResult {
    fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }

    fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no check failed.
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    /// Count of failed checks.
    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let status_str = match check.status {
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
                CheckStatus::Warn => "WARN",
            };

            print!("  [{}] {}", status_str, check.name);
            if let Some(details) = &check.details {
                println!(": {}", details);
            } else {
                println!();
            }
        }

        println!();
        if self.all_passed() {
            println!("All checks passed.");
        } else {
            println!("{} check(s) failed.", self.fail_count());
        }
    }
}

/// Run all host tool checks.
pub fn run_checks() -> PreflightReport {
    let mut checks = Vec::new();

    checks.push(match which::which("curl") {
        Ok(path) => CheckResult::pass_with("curl", &path.display().to_string()),
        Err(_) => CheckResult::fail("curl", "not found in PATH; required for all downloads"),
    });

    checks.push(match which::which("gpg") {
        Ok(path) => CheckResult::pass_with("gpg", &path.display().to_string()),
        Err(_) => CheckResult::warn(
            "gpg",
            "not found in PATH; required only when verifying HTTP downloads",
        ),
    });

    PreflightReport { checks }
}

/// Execute the preflight command.
pub fn cmd_preflight(strict: bool) -> Result<()> {
    let report = run_checks();
    report.print();

    if strict && !report.all_passed() {
        bail!("Preflight failed: {} check(s)", report.fail_count());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_with_only_passes_passes() {
        let report = PreflightReport {
            checks: vec![CheckResult::pass_with("curl", "/usr/bin/curl")],
        };
        assert!(report.all_passed());
        assert_eq!(report.fail_count(), 0);
    }

    #[test]
    fn warnings_do_not_fail_the_report() {
        let report = PreflightReport {
            checks: vec![
                CheckResult::pass_with("curl", "/usr/bin/curl"),
                CheckResult::warn("gpg", "not found"),
            ],
        };
        assert!(report.all_passed());
    }

    #[test]
    fn failures_are_counted() {
        let report = PreflightReport {
            checks: vec![
                CheckResult::fail("curl", "not found"),
                CheckResult::warn("gpg", "not found"),
            ],
        };
        assert!(!report.all_passed());
        assert_eq!(report.fail_count(), 1);
    }
}
