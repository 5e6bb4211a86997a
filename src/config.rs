//! Planner configuration.
//!
//! All defaults which used to come from the process environment live here.
//! `PlannerConfig::with_process_env` is only meant to be called at the CLI boundary;
//! the planning pass itself never looks at the environment.

use crate::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ENV_CONDITION_BACKEND: &str = "DPL_CONDITION_BACKEND";
pub const ENV_CONDITION_QUERY_RATE: &str = "DPL_CONDITION_QUERY_RATE";
pub const ENV_CONDITION_QUERY_RATE_MULTIPLIER: &str = "DPL_CONDITION_QUERY_RATE_MULTIPLIER";
pub const ENV_SKIP_LIFETIME_CHECK: &str = "DPL_WORKAROUND_DO_NOT_CHECK_FOR_CORRECT_WORKFLOW_LIFETIMES";

const OFFLINE_CONDITION_BACKEND: &str = "http://alice-ccdb.cern.ch";
const ONLINE_CONDITION_BACKEND: &str = "http://o2-ccdb.internal";

/// Which outputs get redirected to an injected sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardingPolicy {
    None,
    #[default]
    Dangling,
    All,
}

/// Where redirected outputs end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardingDestination {
    File,
    Transport,
    #[default]
    Drop,
}

/// Whether a node may consume its own outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfMatchPolicy {
    #[default]
    Allow,
    Forbid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    #[default]
    Offline,
    Online,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub deployment: Deployment,
    /// Explicit condition backend URL; derived from `deployment` when unset.
    pub condition_backend: Option<String>,
    pub condition_query_rate: i32,
    pub condition_query_rate_multiplier: i32,
    pub forwarding_policy: ForwardingPolicy,
    pub forwarding_destination: ForwardingDestination,
    /// IPC id of the rate-limiting feedback channel; negative disables it.
    pub rate_limit_ipc_id: i32,
    pub ipc_folder: String,
    pub check_lifetimes: bool,
    pub self_match: SelfMatchPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            deployment: Deployment::Offline,
            condition_backend: None,
            condition_query_rate: 0,
            condition_query_rate_multiplier: 1,
            forwarding_policy: ForwardingPolicy::Dangling,
            forwarding_destination: ForwardingDestination::Drop,
            rate_limit_ipc_id: -1,
            ipc_folder: "/tmp/".to_string(),
            check_lifetimes: true,
            self_match: SelfMatchPolicy::Allow,
        }
    }
}

impl PlannerConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Layer the process environment over `self`.
    pub fn with_process_env(self) -> Result<Self> {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Layer values from `lookup` over `self`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_CONDITION_BACKEND) {
            self.condition_backend = Some(url);
        }
        if let Some(v) = lookup(ENV_CONDITION_QUERY_RATE) {
            self.condition_query_rate = parse_int(ENV_CONDITION_QUERY_RATE, &v)?;
        }
        if let Some(v) = lookup(ENV_CONDITION_QUERY_RATE_MULTIPLIER) {
            self.condition_query_rate_multiplier = parse_int(ENV_CONDITION_QUERY_RATE_MULTIPLIER, &v)?;
        }
        if let Some(v) = lookup(ENV_SKIP_LIFETIME_CHECK) {
            if parse_int(ENV_SKIP_LIFETIME_CHECK, &v)? != 0 {
                self.check_lifetimes = false;
            }
        }
        Ok(self)
    }

    pub fn condition_backend(&self) -> String {
        match (&self.condition_backend, self.deployment) {
            (Some(url), _) => url.clone(),
            (None, Deployment::Online) => ONLINE_CONDITION_BACKEND.to_string(),
            (None, Deployment::Offline) => OFFLINE_CONDITION_BACKEND.to_string(),
        }
    }

    pub fn rate_limiting(&self) -> bool {
        self.rate_limit_ipc_id >= 0
    }

    /// Channel description used by the dummy sink to push rate feedback.
    pub fn rate_limit_output_channel(&self) -> Option<String> {
        self.rate_limiting().then(|| {
            format!(
                "name=metric-feedback,type=push,method=bind,address=ipc://{}metric-feedback-{},transport=shmem,rateLogging=0",
                self.ipc_folder, self.rate_limit_ipc_id
            )
        })
    }
}

fn parse_int(key: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| PlanError::Config(format!("{} must be an integer, got {:?}", key, value)))
}

impl FromStr for ForwardingPolicy {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(ForwardingPolicy::None),
            "dangling" => Ok(ForwardingPolicy::Dangling),
            "all" => Ok(ForwardingPolicy::All),
            other => Err(PlanError::UnknownForwardingPolicy(other.to_string())),
        }
    }
}

impl FromStr for ForwardingDestination {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(ForwardingDestination::File),
            "transport" | "fairmq" => Ok(ForwardingDestination::Transport),
            "drop" => Ok(ForwardingDestination::Drop),
            other => Err(PlanError::UnknownForwardingDestination(other.to_string())),
        }
    }
}

impl FromStr for SelfMatchPolicy {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allow" => Ok(SelfMatchPolicy::Allow),
            "forbid" => Ok(SelfMatchPolicy::Forbid),
            other => Err(PlanError::Config(format!("unknown self-match policy {:?}", other))),
        }
    }
}

impl fmt::Display for ForwardingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForwardingPolicy::None => "none",
            ForwardingPolicy::Dangling => "dangling",
            ForwardingPolicy::All => "all",
        })
    }
}

impl fmt::Display for ForwardingDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForwardingDestination::File => "file",
            ForwardingDestination::Transport => "transport",
            ForwardingDestination::Drop => "drop",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn backend_follows_deployment() {
        let mut cfg = PlannerConfig::default();
        assert_eq!(cfg.condition_backend(), OFFLINE_CONDITION_BACKEND);
        cfg.deployment = Deployment::Online;
        assert_eq!(cfg.condition_backend(), ONLINE_CONDITION_BACKEND);
        cfg.condition_backend = Some("http://localhost:8080".into());
        assert_eq!(cfg.condition_backend(), "http://localhost:8080");
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_CONDITION_QUERY_RATE, "5"),
            (ENV_SKIP_LIFETIME_CHECK, "1"),
        ]
        .into_iter()
        .collect();
        let cfg = PlannerConfig::from_json(r#"{"condition_query_rate": 2}"#)
            .unwrap()
            .with_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.condition_query_rate, 5);
        assert_eq!(cfg.condition_query_rate_multiplier, 1);
        assert!(!cfg.check_lifetimes);
    }

    #[test]
    fn bad_env_integer_is_an_error() {
        let err = PlannerConfig::default()
            .with_env(|k| (k == ENV_CONDITION_QUERY_RATE).then(|| "fast".to_string()))
            .unwrap_err();
        assert!(matches!(err, PlanError::Config(_)));
    }

    #[test]
    fn parse_policies() {
        assert_eq!("all".parse::<ForwardingPolicy>().unwrap(), ForwardingPolicy::All);
        assert_eq!(
            "fairmq".parse::<ForwardingDestination>().unwrap(),
            ForwardingDestination::Transport
        );
        assert!(matches!(
            "proxy".parse::<ForwardingDestination>(),
            Err(PlanError::UnknownForwardingDestination(_))
        ));
    }

    #[test]
    fn rate_limit_channel_only_when_enabled() {
        let mut cfg = PlannerConfig::default();
        assert!(cfg.rate_limit_output_channel().is_none());
        cfg.rate_limit_ipc_id = 3;
        let chan = cfg.rate_limit_output_channel().unwrap();
        assert!(chan.contains("ipc:///tmp/metric-feedback-3"));
    }
}
