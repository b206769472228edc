use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{GenerationParams, TextGeneration};
use crate::error::Result;

type Handler = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// In-process stand-in for an inference server.
///
/// The handler maps a prompt to the completion; the prompt is echoed ahead of
/// it when `return_full_text` is requested, as a causal decoder would.
pub struct MockGeneration {
    handler: Handler,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGeneration {
    pub fn new() -> Self {
        Self::with_handler(|_| Ok("Mock summary.".to_string()))
    }

    pub fn with_reply(reply: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::with_handler(move |prompt| Ok(reply(prompt)))
    }

    pub fn with_handler(handler: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(vec![]),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `generate` calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

impl Default for MockGeneration {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGeneration for MockGeneration {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let completion = (self.handler)(prompt)?;
        if params.return_full_text {
            Ok(format!("{}{}", prompt, completion))
        } else {
            Ok(completion)
        }
    }
}
