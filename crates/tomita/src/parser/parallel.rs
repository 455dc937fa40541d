//! # Batch Parsing
//!
//! Parses many independent inputs against one shared automaton. With the
//! `parallel` feature the inputs are spread over rayon's thread pool;
//! without it they are parsed in order on the calling thread. Results come
//! back in input order either way.

use crate::backend::glr::Forest;
use crate::error::ParseError;
use crate::lexer::Token;
use crate::parser::Parser;
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of parsing one input of a batch
#[derive(Debug)]
pub struct BatchResult {
    /// The input identifier (path or index)
    pub id: String,
    pub result: Result<Forest, ParseError>,
    pub duration: Duration,
}

impl BatchResult {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Inputs to parse together
#[derive(Debug, Clone, Default)]
pub struct ParseBatch {
    pub inputs: Vec<(String, Vec<Token>)>,
}

impl ParseBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: impl Into<String>, tokens: Vec<Token>) {
        self.inputs.push((id.into(), tokens));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Progress callback, called with `(completed, total)` after each input
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

impl Parser {
    fn parse_one(&self, id: &str, tokens: &[Token]) -> BatchResult {
        let start = Instant::now();
        let result = self.parse(tokens.iter().cloned());
        BatchResult {
            id: id.to_string(),
            result,
            duration: start.elapsed(),
        }
    }

    /// Parse every input of `batch`.
    pub fn parse_batch(&self, batch: &ParseBatch) -> Vec<BatchResult> {
        self.parse_batch_with_progress(batch, Box::new(|_, _| {}))
    }

    /// Parse every input of `batch`, reporting progress as inputs finish.
    pub fn parse_batch_with_progress(
        &self,
        batch: &ParseBatch,
        progress: ProgressCallback,
    ) -> Vec<BatchResult> {
        let total = batch.len();
        let completed = AtomicUsize::new(0);
        let run = |(id, tokens): &(String, Vec<Token>)| {
            let result = self.parse_one(id, tokens);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done, total);
            result
        };

        #[cfg(feature = "parallel")]
        let results: Vec<BatchResult> = batch.inputs.par_iter().map(run).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<BatchResult> = batch.inputs.iter().map(run).collect();

        debug!(
            "parsed batch of {total}: {} accepted",
            results.iter().filter(|r| r.is_ok()).count()
        );
        results
    }
}
