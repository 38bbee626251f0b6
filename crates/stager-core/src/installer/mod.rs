//! Installer discovery and execution.
//!
//! Selection order: a discovered unattended script wins; otherwise, when the
//! manifest allows unscripted installs, top-level MSI and EXE files in the
//! payload root are run directly, optionally filtered to a single declared
//! target filename. Planning is pure and separately testable; execution
//! spawns child processes and records each exit status. A launch failure
//! never aborts the remaining attempts.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::Context;
use tracing::{info, trace, warn};

use crate::types::PackageManifest;

#[cfg(windows)]
const UNATTENDED_SCRIPT: &str = "Unattended-Install.ps1";
#[cfg(not(windows))]
const UNATTENDED_SCRIPT: &str = "unattended-install.sh";

const SUPPORT_DIR: &str = "Support";

/// One planned installer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerAction {
    /// Unattended script, run from its own directory with the payload root
    /// passed as the sole argument.
    Script { script: PathBuf, root: PathBuf },
    /// MSI through the platform installer in silent mode.
    Msi { path: PathBuf },
    /// EXE with the manifest's installation arguments.
    Exe { path: PathBuf, arguments: String },
}

/// Outcome of one attempted invocation.
#[derive(Debug)]
pub struct InstallerRun {
    pub action: InstallerAction,
    pub outcome: anyhow::Result<ExitStatus>,
}

impl InstallerRun {
    pub fn succeeded(&self) -> bool {
        matches!(&self.outcome, Ok(status) if status.success())
    }
}

/// Decide which installers to run for a payload root.
pub fn plan(root: &Path, manifest: &PackageManifest) -> anyhow::Result<Vec<InstallerAction>> {
    let script = root.join(SUPPORT_DIR).join(UNATTENDED_SCRIPT);
    if script.exists() {
        return Ok(vec![InstallerAction::Script {
            script,
            root: root.to_path_buf(),
        }]);
    }

    if !manifest.allow_unscripted_install {
        return Ok(Vec::new());
    }

    // Top-level files only, in stable order
    let mut entries: Vec<PathBuf> = std::fs::read_dir(root)
        .with_context(|| format!("Failed to list payload root: {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut actions = Vec::new();
    for path in entries {
        if let Some(target) = &manifest.installation_target {
            let name = path.file_name().map(|n| n.to_string_lossy().to_string());
            if name.as_deref() != Some(target.as_str()) {
                continue;
            }
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("msi") => actions.push(InstallerAction::Msi { path }),
            Some("exe") => actions.push(InstallerAction::Exe {
                path,
                arguments: manifest.installation_arguments.clone(),
            }),
            _ => {}
        }
    }

    Ok(actions)
}

/// Run every planned action, capturing output and exit status.
pub fn execute(actions: Vec<InstallerAction>) -> Vec<InstallerRun> {
    actions
        .into_iter()
        .map(|action| {
            let outcome = run_action(&action);
            if let Err(err) = &outcome {
                warn!(error = %err, ?action, "installer attempt failed to launch");
            }
            InstallerRun { action, outcome }
        })
        .collect()
}

fn run_action(action: &InstallerAction) -> anyhow::Result<ExitStatus> {
    match action {
        InstallerAction::Script { script, root } => run_script(script, root),
        InstallerAction::Msi { path } => run_msi(path),
        InstallerAction::Exe { path, arguments } => run_exe(path, arguments),
    }
}

fn run_script(script: &Path, root: &Path) -> anyhow::Result<ExitStatus> {
    info!(script = %script.display(), "running unattended install script");
    let workdir = script.parent().unwrap_or(root);

    let mut command = if cfg!(windows) {
        let mut command = Command::new("powershell.exe");
        command
            .arg("-ExecutionPolicy")
            .arg("Bypass")
            .arg("-File")
            .arg(script)
            .arg(root);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg(script).arg(root);
        command
    };

    let output = command
        .current_dir(workdir)
        .output()
        .with_context(|| format!("Failed to launch install script: {}", script.display()))?;
    trace!(stdout = %String::from_utf8_lossy(&output.stdout), "install script output");
    Ok(output.status)
}

fn run_msi(path: &Path) -> anyhow::Result<ExitStatus> {
    info!(msi = %path.display(), "running MSI installer");
    // Output is captured and dropped so a chatty installer cannot fill the pipe
    let output = Command::new("msiexec")
        .arg("/i")
        .arg(path)
        .arg("/quiet")
        .arg("/qn")
        .output()
        .with_context(|| format!("Failed to launch MSI installer: {}", path.display()))?;
    Ok(output.status)
}

fn run_exe(path: &Path, arguments: &str) -> anyhow::Result<ExitStatus> {
    info!(exe = %path.display(), arguments, "running EXE installer");
    let output = Command::new(path)
        .args(arguments.split_whitespace())
        .output()
        .with_context(|| format!("Failed to launch EXE installer: {}", path.display()))?;
    Ok(output.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(allow_unscripted: bool, target: Option<&str>) -> PackageManifest {
        PackageManifest {
            name: "app".to_string(),
            package_file: "app.zip".to_string(),
            version: "2.1".to_string(),
            min_agent: String::new(),
            installation_arguments: "/S /quiet".to_string(),
            allow_unscripted_install: allow_unscripted,
            installation_target: target.map(str::to_string),
        }
    }

    fn touch(path: &Path) {
        std::fs::write(path, b"").expect("touch");
    }

    #[test]
    fn unattended_script_wins_over_loose_installers() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let root = temp.path();
        std::fs::create_dir_all(root.join(SUPPORT_DIR)).expect("support dir");
        touch(&root.join(SUPPORT_DIR).join(UNATTENDED_SCRIPT));
        touch(&root.join("setup.msi"));

        let actions = plan(root, &manifest(true, None)).expect("plan");
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], InstallerAction::Script { root: r, .. } if r == root));
    }

    #[test]
    fn unscripted_disallowed_plans_nothing() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        touch(&temp.path().join("setup.msi"));
        touch(&temp.path().join("setup.exe"));

        let actions = plan(temp.path(), &manifest(false, None)).expect("plan");
        assert!(actions.is_empty());
    }

    #[test]
    fn unscripted_plans_msi_and_exe_by_extension() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        touch(&temp.path().join("alpha.msi"));
        touch(&temp.path().join("beta.EXE"));
        touch(&temp.path().join("notes.txt"));

        let actions = plan(temp.path(), &manifest(true, None)).expect("plan");
        assert_eq!(actions.len(), 2);
        assert!(matches!(&actions[0], InstallerAction::Msi { .. }));
        assert!(
            matches!(&actions[1], InstallerAction::Exe { arguments, .. } if arguments == "/S /quiet")
        );
    }

    #[test]
    fn installation_target_filters_by_exact_name() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        touch(&temp.path().join("alpha.msi"));
        touch(&temp.path().join("beta.exe"));

        let actions = plan(temp.path(), &manifest(true, Some("beta.exe"))).expect("plan");
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], InstallerAction::Exe { path, .. }
            if path.file_name().is_some_and(|n| n == "beta.exe")));
    }

    #[test]
    fn enumeration_is_not_recursive() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let nested = temp.path().join("nested");
        std::fs::create_dir_all(&nested).expect("nested dir");
        touch(&nested.join("inner.msi"));

        let actions = plan(temp.path(), &manifest(true, None)).expect("plan");
        assert!(actions.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn execute_records_exit_status_and_continues_after_failures() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let script = temp.path().join("unattended-install.sh");
        std::fs::write(&script, "#!/bin/sh\necho ran > \"$1/marker\"\n").expect("write");

        let actions = vec![
            InstallerAction::Exe {
                path: temp.path().join("missing.exe"),
                arguments: String::new(),
            },
            InstallerAction::Script {
                script,
                root: temp.path().to_path_buf(),
            },
        ];

        let runs = execute(actions);
        assert_eq!(runs.len(), 2);
        assert!(runs[0].outcome.is_err(), "missing binary fails to launch");
        assert!(runs[1].succeeded(), "script runs despite earlier failure");
        assert!(temp.path().join("marker").exists(), "root path was passed");
    }
}
