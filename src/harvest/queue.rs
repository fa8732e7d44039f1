//! Ordered queue of targets for one run

use crate::model::Target;
use std::collections::VecDeque;

/// Targets consumed strictly in configuration order
#[derive(Debug, Default)]
pub struct TargetQueue {
    pending: VecDeque<Target>,
    total: usize,
}

impl TargetQueue {
    pub fn new(targets: Vec<Target>) -> Self {
        let total = targets.len();
        Self {
            pending: VecDeque::from(targets),
            total,
        }
    }

    /// Removes and returns the next target
    pub fn next(&mut self) -> Option<Target> {
        self.pending.pop_front()
    }

    /// Targets not yet handed out
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Number of targets the queue started with
    pub fn len_total(&self) -> usize {
        self.total
    }

    /// 1-based position of the target most recently handed out
    pub fn position(&self) -> usize {
        self.total - self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
