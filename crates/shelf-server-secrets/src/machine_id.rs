// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Best-effort stable machine identifier.
//!
//! Used as the key-derivation input when no operator key is configured,
//! so the derived key survives restarts on the same machine. Probes are
//! platform-specific; when every probe fails the hostname (plus a fixed
//! suffix) is hashed instead, which in practice always resolves.
//!
//! Native tools are invoked through [`CommandRunner`] so each probe is
//! testable without touching the real system.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::process::Command;

use crate::error::{SecretsError, SecretsResult};

/// Mixed into the hostname hash so the fallback identifier is distinct
/// from a bare hostname digest another application might compute.
const HOSTNAME_FALLBACK_SUFFIX: &str = "shelf-machine";

const LINUX_MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Executes a native command and captures its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
	/// Run a program, returning stdout if it exits successfully.
	async fn run(&self, program: &str, args: &[&str]) -> io::Result<String>;
}

/// [`CommandRunner`] backed by real process spawning.
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
	async fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
		let output = Command::new(program).args(args).output().await?;
		if !output.status.success() {
			return Err(io::Error::new(
				io::ErrorKind::Other,
				format!("{program} exited with {}", output.status),
			));
		}
		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	}
}

/// Resolve a stable identifier for this machine.
///
/// Platform probe first, hostname hash as the last resort.
/// [`SecretsError::MachineIdNotFound`] is only reachable when even the
/// hostname cannot be determined.
pub async fn resolve_machine_id(runner: &dyn CommandRunner) -> SecretsResult<String> {
	if let Some(id) = platform_machine_id(runner).await {
		tracing::debug!("machine identifier resolved from platform probe");
		return Ok(id);
	}

	tracing::debug!("platform probe failed, falling back to hostname hash");
	hostname_fallback(runner).await
}

/// The platform-specific probe. All probes compile on every platform;
/// the branch is picked for the build target.
async fn platform_machine_id(runner: &dyn CommandRunner) -> Option<String> {
	if cfg!(target_os = "linux") {
		read_machine_id_file(LINUX_MACHINE_ID_PATHS.iter().map(Path::new))
	} else if cfg!(target_os = "macos") {
		let output = runner
			.run("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])
			.await
			.ok()?;
		parse_ioreg_output(&output)
	} else if cfg!(target_os = "windows") {
		let output = runner
			.run(
				"reg",
				&[
					"query",
					r"HKLM\SOFTWARE\Microsoft\Cryptography",
					"/v",
					"MachineGuid",
				],
			)
			.await
			.ok()?;
		parse_reg_output(&output)
	} else {
		None
	}
}

/// Read the first non-empty machine-id file among the candidates.
fn read_machine_id_file<'a>(paths: impl Iterator<Item = &'a Path>) -> Option<String> {
	for path in paths {
		if let Ok(contents) = std::fs::read_to_string(path) {
			let id = contents.trim();
			if !id.is_empty() {
				return Some(id.to_string());
			}
		}
	}
	None
}

/// Extract `IOPlatformUUID` from `ioreg -rd1 -c IOPlatformExpertDevice`
/// output.
fn parse_ioreg_output(output: &str) -> Option<String> {
	for line in output.lines() {
		if !line.contains("IOPlatformUUID") {
			continue;
		}
		// "IOPlatformUUID" = "0F000000-0000-1000-8000-0800200C9A66"
		let fields: Vec<&str> = line.split('"').collect();
		let idx = fields.iter().position(|f| *f == "IOPlatformUUID")?;
		let uuid = fields.get(idx + 2)?.trim();
		if !uuid.is_empty() {
			return Some(uuid.to_string());
		}
	}
	None
}

/// Extract `MachineGuid` from `reg query` output.
fn parse_reg_output(output: &str) -> Option<String> {
	for line in output.lines() {
		if !line.contains("MachineGuid") {
			continue;
		}
		// MachineGuid    REG_SZ    9b1c2f40-...
		let guid = line.split_whitespace().last()?;
		if guid != "MachineGuid" && !guid.is_empty() {
			return Some(guid.to_string());
		}
	}
	None
}

async fn hostname_fallback(runner: &dyn CommandRunner) -> SecretsResult<String> {
	let output = runner
		.run("hostname", &[])
		.await
		.map_err(|_| SecretsError::MachineIdNotFound)?;

	let hostname = output.trim();
	if hostname.is_empty() {
		return Err(SecretsError::MachineIdNotFound);
	}

	Ok(hash_hostname(hostname))
}

fn hash_hostname(hostname: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(hostname.as_bytes());
	hasher.update(b":");
	hasher.update(HOSTNAME_FALLBACK_SUFFIX.as_bytes());
	hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	struct FakeRunner {
		stdout: Option<&'static str>,
	}

	#[async_trait]
	impl CommandRunner for FakeRunner {
		async fn run(&self, _program: &str, _args: &[&str]) -> io::Result<String> {
			match self.stdout {
				Some(out) => Ok(out.to_string()),
				None => Err(io::Error::other("command failed")),
			}
		}
	}

	#[test]
	fn parses_ioreg_uuid() {
		let output = r#"
+-o MacBookPro18,3  <class IOPlatformExpertDevice, id 0x100000110, registered>
    {
      "IOPlatformUUID" = "0F000000-0000-1000-8000-0800200C9A66"
      "IOPlatformSerialNumber" = "C02XXXXXXXXX"
    }
"#;
		assert_eq!(
			parse_ioreg_output(output).as_deref(),
			Some("0F000000-0000-1000-8000-0800200C9A66")
		);
	}

	#[test]
	fn ioreg_without_uuid_yields_none() {
		assert_eq!(parse_ioreg_output("no uuid here"), None);
	}

	#[test]
	fn parses_reg_machine_guid() {
		let output = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Cryptography\r\n    MachineGuid    REG_SZ    9b1c2f40-5e8a-4f0e-9d7c-1234567890ab\r\n";
		assert_eq!(
			parse_reg_output(output).as_deref(),
			Some("9b1c2f40-5e8a-4f0e-9d7c-1234567890ab")
		);
	}

	#[test]
	fn reg_output_without_guid_yields_none() {
		assert_eq!(parse_reg_output("ERROR: The system was unable to find the specified registry key or value."), None);
	}

	#[test]
	fn reads_first_non_empty_machine_id_file() {
		let dir = tempfile::tempdir().unwrap();
		let empty = dir.path().join("empty");
		let primary = dir.path().join("machine-id");
		std::fs::write(&empty, "  \n").unwrap();
		std::fs::write(&primary, "a1b2c3d4e5f6\n").unwrap();

		let paths: Vec<PathBuf> = vec![empty, primary];
		let id = read_machine_id_file(paths.iter().map(|p| p.as_path()));
		assert_eq!(id.as_deref(), Some("a1b2c3d4e5f6"));
	}

	#[test]
	fn missing_machine_id_files_yield_none() {
		let paths = [Path::new("/nonexistent/machine-id")];
		assert_eq!(read_machine_id_file(paths.iter().copied()), None);
	}

	#[tokio::test]
	async fn hostname_fallback_is_deterministic() {
		let runner = FakeRunner {
			stdout: Some("media-box\n"),
		};

		let id1 = hostname_fallback(&runner).await.unwrap();
		let id2 = hostname_fallback(&runner).await.unwrap();

		assert_eq!(id1, id2);
		assert_eq!(id1.len(), 64); // hex-encoded SHA-256
		assert_ne!(id1, hash_hostname("other-box"));
	}

	#[tokio::test]
	async fn hostname_failure_is_machine_id_not_found() {
		let runner = FakeRunner { stdout: None };
		assert!(matches!(
			hostname_fallback(&runner).await,
			Err(SecretsError::MachineIdNotFound)
		));
	}

	#[tokio::test]
	async fn blank_hostname_is_machine_id_not_found() {
		let runner = FakeRunner {
			stdout: Some("   \n"),
		};
		assert!(matches!(
			hostname_fallback(&runner).await,
			Err(SecretsError::MachineIdNotFound)
		));
	}
}
