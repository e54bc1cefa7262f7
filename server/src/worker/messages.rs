use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Messages the host sends to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerMessage {
    /// First build of the session.
    Build {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<String>,
    },
    /// Build again after a reload.
    Rebuild {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<String>,
    },
    /// Seed for the localStorage shim.
    LocalStorage {
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl WorkerMessage {
    pub fn is_build(&self) -> bool {
        matches!(self, WorkerMessage::Build { .. } | WorkerMessage::Rebuild { .. })
    }
}

/// What a build command asks for, independent of its wire name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    /// Site config override, relative to the project root.
    pub config: Option<PathBuf>,
    /// Announce the server and maybe open the browser once it listens.
    pub initial_startup: bool,
}

impl BuildRequest {
    pub fn new(config: Option<String>, initial_startup: bool) -> Self {
        Self {
            config: config.map(PathBuf::from),
            initial_startup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_build_commands() {
        let build: WorkerMessage = serde_json::from_str(r#"{"type":"build"}"#).unwrap();
        assert_eq!(build, WorkerMessage::Build { config: None });
        assert!(build.is_build());

        let rebuild: WorkerMessage =
            serde_json::from_str(r#"{"type":"rebuild","config":"site.toml"}"#).unwrap();
        assert_eq!(
            rebuild,
            WorkerMessage::Rebuild {
                config: Some("site.toml".to_string())
            }
        );
    }

    #[test]
    fn parses_local_storage_payload() {
        let message: WorkerMessage =
            serde_json::from_str(r#"{"type":"localStorage","data":{"theme":"dark"}}"#).unwrap();

        assert_eq!(
            message,
            WorkerMessage::LocalStorage {
                data: json!({ "theme": "dark" })
            }
        );
        assert!(!message.is_build());
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(serde_json::from_str::<WorkerMessage>(r#"{"type":"stop"}"#).is_err());
        assert!(serde_json::from_str::<WorkerMessage>(r#"{"config":"x"}"#).is_err());
    }

    #[test]
    fn serializes_without_empty_override() {
        let json = serde_json::to_string(&WorkerMessage::Rebuild { config: None }).unwrap();
        assert_eq!(json, r#"{"type":"rebuild"}"#);
    }

    #[test]
    fn only_build_is_an_initial_startup() {
        let request = BuildRequest::new(Some("cfg/site.toml".into()), true);
        assert_eq!(request.config, Some(PathBuf::from("cfg/site.toml")));
        assert!(request.initial_startup);
        assert!(!BuildRequest::new(None, false).initial_startup);
    }
}
