//! Scripted in-memory fetcher shared by the session tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dockstream_common::error::{FetchError, FetchResult};
use dockstream_common::types::{ContainerDetail, ContainerId, ContainerSummary};
use dockstream_docker::ResourceFetcher;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Step<T> {
    Ok(T),
    Fail(String),
    Hang,
}

/// Plays back scripted answers; the last step repeats once a script is
/// exhausted.
#[derive(Default)]
pub struct ScriptedFetcher {
    listings: Mutex<VecDeque<Step<Vec<ContainerSummary>>>>,
    details: Mutex<HashMap<String, VecDeque<Step<ContainerDetail>>>>,
    list_calls: AtomicUsize,
    inspect_calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(self, steps: Vec<Step<Vec<ContainerSummary>>>) -> Self {
        *self.listings.lock().unwrap() = steps.into();
        self
    }

    pub fn with_details(self, id: &str, steps: Vec<Step<ContainerDetail>>) -> Self {
        let _ = self
            .details
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.into());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn inspect_calls(&self, id: &str) -> usize {
        self.inspect_calls
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }
}

fn next_step<T: Clone>(script: &mut VecDeque<Step<T>>) -> Option<Step<T>> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

async fn play<T>(step: Option<Step<T>>, missing: impl FnOnce() -> FetchError) -> FetchResult<T> {
    match step {
        Some(Step::Ok(value)) => Ok(value),
        Some(Step::Fail(message)) => Err(FetchError::Transport { message }),
        Some(Step::Hang) => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(FetchError::Transport {
                message: "hung fetch resumed".into(),
            })
        }
        None => Err(missing()),
    }
}

#[async_trait]
impl ResourceFetcher for ScriptedFetcher {
    async fn list_all(&self) -> FetchResult<Vec<ContainerSummary>> {
        let _ = self.list_calls.fetch_add(1, Ordering::SeqCst);
        let step = next_step(&mut self.listings.lock().unwrap());
        play(step, || FetchError::Transport {
            message: "no listing scripted".into(),
        })
        .await
    }

    async fn inspect_by_id(&self, id: &ContainerId) -> FetchResult<ContainerDetail> {
        *self
            .inspect_calls
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert(0) += 1;
        let step = self
            .details
            .lock()
            .unwrap()
            .get_mut(id.as_str())
            .and_then(next_step);
        play(step, || FetchError::NotFound { id: id.to_string() }).await
    }
}

/// Builds a listing entry named `/name`.
pub fn summary(id: &str, name: &str) -> ContainerSummary {
    ContainerSummary {
        id: ContainerId::new(id),
        names: vec![format!("/{name}")],
        image: "nginx:latest".into(),
        state: "running".into(),
        status: "Up 1 second".into(),
        extra: serde_json::Map::new(),
    }
}
