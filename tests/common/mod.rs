use async_trait::async_trait;
use beechat::error::{BeeChatError, Result};
use beechat::providers::{CompletionRequest, CompletionResponse, Provider};
use beechat::storage::SqliteStorage;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("history.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Provider that answers from a script and records every request
///
/// `None` entries in the script fail with a 500 server error. Once the script
/// runs out, every call echoes the last user message.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<VecDeque<Option<String>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            script: Arc::new(Mutex::new(
                replies.into_iter().map(|r| r.map(Into::into)).collect(),
            )),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Some(reply)) => Ok(CompletionResponse::new(reply)),
            Some(None) => Err(BeeChatError::Server {
                status: 500,
                message: "scripted failure".to_string(),
            }
            .into()),
            None => {
                let last = request
                    .messages
                    .last()
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(CompletionResponse::new(format!("echo: {}", last)))
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
