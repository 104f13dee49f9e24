//! Scripted recommender for integration testing.
//!
//! Replays queued responses in order, then repeats a default. Every call
//! is recorded so tests can assert which games were analysed, and an
//! optional latency keeps requests in flight long enough to observe them.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use betbot::llm::{Recommender, RecommenderUsage};
use betbot::types::{Game, Recommendation, Selection};

pub struct ScriptedRecommender {
    queue: Mutex<VecDeque<Result<Recommendation, String>>>,
    default: Result<Recommendation, String>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedRecommender {
    /// Always answer with `selection` at `confidence`.
    pub fn always(selection: Selection, confidence: f64) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: Ok(recommendation(selection, confidence)),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Always fail with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Queue a one-off response ahead of the default.
    pub fn then(self, selection: Selection, confidence: f64) -> Self {
        self.queue
            .lock()
            .unwrap()
            .push_back(Ok(recommendation(selection, confidence)));
        self
    }

    /// Sleep this long before answering each request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Requests currently awaiting an answer.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most requests ever awaiting an answer at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Game ids analysed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn recommendation(selection: Selection, confidence: f64) -> Recommendation {
    Recommendation {
        confidence,
        reasoning: format!("Scripted {selection} at {confidence}"),
        recommendation: selection,
    }
}

#[async_trait]
impl Recommender for ScriptedRecommender {
    async fn recommend(&self, game: &Game) -> Result<Recommendation> {
        self.calls.lock().unwrap().push(game.id.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone());
        next.map_err(|msg| anyhow!(msg))
    }

    fn usage(&self) -> RecommenderUsage {
        RecommenderUsage {
            model: "scripted".into(),
            calls: self.calls.lock().unwrap().len() as u64,
            cost_usd: 0.0,
        }
    }
}
