//! Agent command-line planning.
//!
//! The agent's runtime arguments are computed deterministically from the
//! job: same request, same artifact, same command line. The destination
//! directory is derived from (request id, content name, content tag) under
//! the daemon's store root.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use wimc_core::ArtifactFormat;
use wimc_core::job::TransferMethod;

use crate::error::AgentError;

/// A fully computed agent invocation, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// The agent executable.
    pub binary: PathBuf,
    /// Destination directory for the fetched artifact.
    pub dest_dir: PathBuf,
    /// Arguments, in the order the agent expects them.
    pub args: Vec<String>,
}

impl LaunchPlan {
    /// Compute the invocation for a resolved artifact.
    ///
    /// Chunked transfers need both the index URL (`format.url`) and the
    /// store URL (`format.extra_info`); whole-file transfers need the
    /// provider URL. A missing URL fails with `MissingContentUrls`.
    pub fn build(
        binary: &Path,
        store_root: &Path,
        job_id: Uuid,
        name: &str,
        tag: &str,
        format: &ArtifactFormat,
        interval_secs: u64,
    ) -> Result<Self, AgentError> {
        let dest_dir = store_root
            .join(job_id.to_string())
            .join(format!("{name}_{tag}"));

        let mut args = vec![
            "--job".to_string(),
            job_id.to_string(),
            "--method".to_string(),
            format.method.as_str().to_string(),
            "--dest".to_string(),
            dest_dir.display().to_string(),
            "--interval".to_string(),
            interval_secs.to_string(),
        ];

        match format.method {
            TransferMethod::WholeFile => {
                if format.url.is_empty() {
                    return Err(AgentError::MissingContentUrls {
                        method: format.method.to_string(),
                    });
                }
                args.push("--url".to_string());
                args.push(format.url.clone());
            }
            TransferMethod::Chunk => {
                let store_url = format.extra_info.as_deref().unwrap_or_default();
                if format.url.is_empty() || store_url.is_empty() {
                    return Err(AgentError::MissingContentUrls {
                        method: format.method.to_string(),
                    });
                }
                args.push("--index".to_string());
                args.push(format.url.clone());
                args.push("--store".to_string());
                args.push(store_url.to_string());
            }
        }

        Ok(Self {
            binary: binary.to_path_buf(),
            dest_dir,
            args,
        })
    }

    /// Create the destination directory. Idempotent: an existing directory
    /// is not an error.
    pub fn ensure_dest(&self) -> Result<(), AgentError> {
        std::fs::create_dir_all(&self.dest_dir).map_err(|e| AgentError::Destination {
            path: self.dest_dir.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn whole_file_format() -> ArtifactFormat {
        ArtifactFormat {
            method: TransferMethod::WholeFile,
            url: "http://hub/nginx_1.21.tar.gz".to_string(),
            extra_info: None,
            size_bytes: Some(1024),
            created_at: Utc::now(),
        }
    }

    fn chunk_format() -> ArtifactFormat {
        ArtifactFormat {
            method: TransferMethod::Chunk,
            url: "http://hub/nginx_1.21.caidx".to_string(),
            extra_info: Some("http://hub/store".to_string()),
            size_bytes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dest_dir_derived_from_job_and_content() {
        let id = Uuid::new_v4();
        let plan = LaunchPlan::build(
            Path::new("/usr/bin/wimc-agent"),
            Path::new("/var/lib/wimc"),
            id,
            "nginx",
            "1.21",
            &whole_file_format(),
            10,
        )
        .unwrap();

        assert_eq!(
            plan.dest_dir,
            PathBuf::from(format!("/var/lib/wimc/{id}/nginx_1.21"))
        );
    }

    #[test]
    fn plan_is_deterministic() {
        let id = Uuid::new_v4();
        let build = || {
            LaunchPlan::build(
                Path::new("wimc-agent"),
                Path::new("/store"),
                id,
                "nginx",
                "1.21",
                &chunk_format(),
                5,
            )
            .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn chunk_plan_carries_url_pair() {
        let plan = LaunchPlan::build(
            Path::new("wimc-agent"),
            Path::new("/store"),
            Uuid::new_v4(),
            "nginx",
            "1.21",
            &chunk_format(),
            5,
        )
        .unwrap();

        let args = plan.args.join(" ");
        assert!(args.contains("--index http://hub/nginx_1.21.caidx"));
        assert!(args.contains("--store http://hub/store"));
    }

    #[test]
    fn chunk_plan_without_store_url_fails() {
        let mut format = chunk_format();
        format.extra_info = None;

        let err = LaunchPlan::build(
            Path::new("wimc-agent"),
            Path::new("/store"),
            Uuid::new_v4(),
            "nginx",
            "1.21",
            &format,
            5,
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::MissingContentUrls { .. }));
    }

    #[test]
    fn ensure_dest_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let plan = LaunchPlan::build(
            Path::new("wimc-agent"),
            tmp.path(),
            Uuid::new_v4(),
            "nginx",
            "1.21",
            &whole_file_format(),
            5,
        )
        .unwrap();

        plan.ensure_dest().unwrap();
        assert!(plan.dest_dir.is_dir());
        // Second call must not error on the existing directory
        plan.ensure_dest().unwrap();
    }
}
