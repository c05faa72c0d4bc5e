use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use priority_queue::PriorityQueue;
use tokio::sync::Mutex;
use tracing::debug;

use webcrawler_core::Request;

/// Priority key: higher `priority` pops first; among equal priorities,
/// the request with the lower `counter` (inserted earlier) pops first.
/// Mirrors the original frontier's `heapq.heappush((-priority, counter, request))`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PopKey {
    priority: i64,
    counter: u64,
}

impl PartialOrd for PopKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PopKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.counter.cmp(&self.counter))
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct UrlKey(String);

struct FrontierState {
    queue: PriorityQueue<UrlKey, PopKey>,
    requests: HashMap<String, Request>,
    visited: HashSet<String>,
    in_queue: HashSet<String>,
    counter: u64,
}

impl FrontierState {
    fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            requests: HashMap::new(),
            visited: HashSet::new(),
            in_queue: HashSet::new(),
            counter: 0,
        }
    }
}

/// URL frontier: a priority queue with FIFO tie-break and exact
/// visited/in-queue dedup. A URL is never yielded twice — either it is
/// already visited, or it is already sitting in the queue.
pub struct Frontier {
    state: Mutex<FrontierState>,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FrontierState::new()),
        }
    }

    /// Add one request. Returns `false` if the URL is already visited or
    /// already queued — the request is then dropped silently, matching
    /// the dedup invariant.
    pub async fn add(&self, request: Request) -> bool {
        let mut state = self.state.lock().await;
        if state.visited.contains(&request.url) || state.in_queue.contains(&request.url) {
            return false;
        }
        let key = PopKey {
            priority: request.priority,
            counter: state.counter,
        };
        state.counter += 1;
        state.in_queue.insert(request.url.clone());
        state.queue.push(UrlKey(request.url.clone()), key);
        state.requests.insert(request.url.clone(), request);
        true
    }

    /// Pop the highest-priority request, skipping any that were marked
    /// visited while still queued (a race between `mark_visited` and an
    /// earlier `add` of the same URL from a different parent).
    pub async fn get(&self) -> Option<Request> {
        let mut state = self.state.lock().await;
        loop {
            let (key, _) = state.queue.pop()?;
            state.in_queue.remove(&key.0);
            let request = state.requests.remove(&key.0)?;
            if !state.visited.contains(&request.url) {
                return Some(request);
            }
        }
    }

    pub async fn mark_visited(&self, url: &str) {
        let mut state = self.state.lock().await;
        state.visited.insert(url.to_string());
    }

    pub async fn is_visited(&self, url: &str) -> bool {
        self.state.lock().await.visited.contains(url)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.queue.is_empty()
    }

    pub async fn visited_count(&self) -> usize {
        self.state.lock().await.visited.len()
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.queue.clear();
        state.requests.clear();
        state.visited.clear();
        state.in_queue.clear();
        state.counter = 0;
        debug!("frontier cleared");
    }

    /// Releases frontier state at the end of a run. The in-memory
    /// frontier holds nothing beyond its own maps, so this just drops
    /// them via `clear`.
    pub async fn close(&self) {
        self.clear().await;
    }
}
