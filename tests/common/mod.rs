// Shared test fixtures
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use folio_edge::config::{WorkerConfig, WorkerSettings};
use folio_edge::error::{ProxyError, Result};
use folio_edge::models::{RequestDescriptor, StoredResponse};
use folio_edge::network::Fetcher;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

pub const ORIGIN: &str = "http://localhost:8080";

#[derive(Clone)]
enum Script {
    Respond(StoredResponse),
    Fail,
    Hang,
}

/// In-memory network: each URL answers with a scripted response, a failure,
/// or never answers at all. Unscripted URLs fail.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: &'static str) {
        let response = StoredResponse::new(
            status,
            vec![("content-type".to_string(), content_type(url).to_string())],
            body,
        );
        self.routes.lock().insert(url.to_string(), Script::Respond(response));
    }

    pub fn fail(&self, url: &str) {
        self.routes.lock().insert(url.to_string(), Script::Fail);
    }

    pub fn hang(&self, url: &str) {
        self.routes.lock().insert(url.to_string(), Script::Hang);
    }

    /// Make every scripted URL fail, as if the machine went offline.
    pub fn go_offline(&self) {
        for script in self.routes.lock().values_mut() {
            *script = Script::Fail;
        }
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<StoredResponse> {
        let url = request.url().to_string();
        self.calls.lock().push(url.clone());

        let script = self.routes.lock().get(&url).cloned();
        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Fail) | None => Err(ProxyError::Network(format!("unreachable: {}", url))),
        }
    }
}

fn content_type(url: &str) -> &'static str {
    if url.ends_with(".js") {
        "application/javascript"
    } else if url.ends_with(".css") {
        "text/css"
    } else {
        "text/html"
    }
}

pub fn url(path_or_url: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path_or_url).unwrap()
}

pub fn get(path_or_url: &str) -> RequestDescriptor {
    RequestDescriptor::get(url(path_or_url))
}

pub fn navigate(path: &str) -> RequestDescriptor {
    get(path).with_accept("text/html,application/xhtml+xml,*/*;q=0.8")
}

pub fn settings_with(version: &str, precache: &[&str]) -> Arc<WorkerSettings> {
    let config = WorkerConfig {
        cache_version: version.to_string(),
        origin: ORIGIN.to_string(),
        precache: precache.iter().map(|p| p.to_string()).collect(),
        ..WorkerConfig::default()
    };
    Arc::new(WorkerSettings::from_config(&config).unwrap())
}

pub fn settings() -> Arc<WorkerSettings> {
    settings_with("portfolio-v2", &["/index.html", "/js/app.js"])
}
