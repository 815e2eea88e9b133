//! A [`ClusterBackend`] for Torque/PBS, driving `qstat`, `pbsnodes`, and `qmgr`
//! through a shell exactly as the original tooling does.

use std::path::PathBuf;
use std::process::Command as ProcessCommand;

use regex::Regex;
use tracing::{debug, error};

use crate::backend::{ClusterBackend, ClusterUpdate};
use crate::error::ClusterError;
use crate::node::Node;

/// Runs `command` through `bash -c`, returning stdout on success.
fn run_shell(command: &str) -> Result<String, ClusterError> {
    let output = ProcessCommand::new("/bin/bash")
        .arg("-c")
        .arg(command)
        .output()?;
    if !output.status.success() {
        return Err(ClusterError::CommandFailed {
            command: command.to_string(),
            status: output.status.code().unwrap_or(-1),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Drives a Torque/PBS installation rooted at `directory` (expects
/// `bin/qstat`, `bin/pbsnodes`, `bin/qmgr` underneath it).
pub struct TorqueBackend {
    qstat_cmd: String,
    pbsnodes_cmd: String,
    qmgr_cmd: String,
    job_pattern: Regex,
    node_pattern: Regex,
}

impl TorqueBackend {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let qstat_cmd = directory.join("bin/qstat").to_string_lossy().into_owned() + " -a";
        let pbsnodes_cmd = directory.join("bin/pbsnodes").to_string_lossy().into_owned();
        let qmgr_cmd = directory.join("bin/qmgr").to_string_lossy().into_owned();
        debug!(qstat_cmd, pbsnodes_cmd, qmgr_cmd, "torque backend configured");

        // Mirrors qstat -a's fixed-width job line: job id, user, queue, job name,
        // session id, nds, tsk (cores), memory, time, state, elapsed time.
        let job_pattern = Regex::new(
            r"(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(\d+)\s+(\d+)\s+(\S+)\s+(\S+)\s+([A-Z])\s+(\S+)",
        )
        .expect("job_pattern is a fixed valid regex");

        // Mirrors a pbsnodes -a stanza:
        //   hostname
        //       state = ...
        //       np = ...
        let node_pattern =
            Regex::new(r"(?m)^(\S+)\n\s+state\s=\s(\S+)\n\s+np\s=\s(\d+)\n")
                .expect("node_pattern is a fixed valid regex");

        Self {
            qstat_cmd,
            pbsnodes_cmd,
            qmgr_cmd,
            job_pattern,
            node_pattern,
        }
    }

    fn parse_jobs(&self, stdout: &str) -> (u32, u32, u32) {
        let mut queued_jobs = 0;
        let mut queued_cores = 0;
        let mut total_jobs = 0;
        for line in stdout.lines() {
            if let Some(caps) = self.job_pattern.captures(line) {
                total_jobs += 1;
                // Group 10 (1-indexed) is the state column, group 7 is core count.
                if &caps[10] == "Q" {
                    if let Ok(cores) = caps[7].parse::<u32>() {
                        queued_cores += cores;
                    }
                    queued_jobs += 1;
                }
            }
        }
        (queued_jobs, queued_cores, total_jobs)
    }

    fn parse_nodes(&self, stdout: &str) -> Vec<Node> {
        // pbsnodes output isn't newline-terminated before EOF; pad so the
        // trailing stanza still matches the pattern's final `\n`.
        let padded = format!("\n{}\n", stdout.trim_end());
        self.node_pattern
            .captures_iter(&padded)
            .filter_map(|caps| {
                let np: u32 = caps[3].parse().ok()?;
                Some(Node::new(caps[1].to_string(), np, caps[2].to_string()))
            })
            .collect()
    }
}

impl ClusterBackend for TorqueBackend {
    fn update(&mut self) -> Result<ClusterUpdate, ClusterError> {
        let qstat_out = run_shell(&self.qstat_cmd)?;
        let (queued_jobs, queued_cores, total_jobs) = self.parse_jobs(&qstat_out);

        let pbsnodes_cmd = format!("{} -a", self.pbsnodes_cmd);
        let pbsnodes_out = run_shell(&pbsnodes_cmd)?;
        let nodes = self.parse_nodes(&pbsnodes_out);

        Ok(ClusterUpdate {
            num_queued_jobs: queued_jobs,
            num_queued_cores: queued_cores,
            num_total_jobs: total_jobs,
            nodes,
        })
    }

    fn add_node(&mut self, hostname: &str, np: u32) -> Result<(), ClusterError> {
        let cmd = format!(
            "{} -c \"create node {} np={}\"",
            self.qmgr_cmd, hostname, np
        );
        run_shell(&cmd)?;
        debug!(hostname, np, "node created via qmgr");
        Ok(())
    }

    fn remove_node(&mut self, hostname: &str) -> Result<(), ClusterError> {
        let cmd = format!("{} -c \"delete node {}\"", self.qmgr_cmd, hostname);
        run_shell(&cmd)?;
        debug!(hostname, "node deleted via qmgr");
        Ok(())
    }

    fn offline_node(&mut self, hostname: &str) -> Result<(), ClusterError> {
        let cmd = format!("{} -o {}", self.pbsnodes_cmd, hostname);
        match run_shell(&cmd) {
            Ok(_) => {
                debug!(hostname, "node marked offline via pbsnodes");
                Ok(())
            }
            Err(e) => {
                error!(hostname, error = %e, "pbsnodes -o failed");
                Err(e)
            }
        }
    }
}
