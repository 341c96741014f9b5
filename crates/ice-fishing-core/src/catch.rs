use std::collections::VecDeque;

/// Default catch-history window.
pub const DEFAULT_WINDOW: usize = 50;

/// Successes over attempts in the most recent `window` outcomes.
///
/// Uses every outcome when fewer than `window` exist; 0 for an empty history.
pub fn catch_rate(outcomes: &[bool], window: usize) -> f64 {
    let recent = &outcomes[outcomes.len().saturating_sub(window)..];
    if recent.is_empty() {
        return 0.0;
    }
    let successes = recent.iter().filter(|&&hit| hit).count();
    successes as f64 / recent.len() as f64
}

/// Windowed catch rate spread over the window size, i.e. the mean catch per
/// window slot. Reporting only.
pub fn mean_catch_ratio(outcomes: &[bool], window: usize) -> f64 {
    if window == 0 {
        return 0.0;
    }
    catch_rate(outcomes, window) / window as f64
}

/// Sliding window of the most recent fishing outcomes for one bout.
#[derive(Clone, Debug)]
pub struct CatchHistory {
    window: usize,
    outcomes: VecDeque<bool>,
}

impl CatchHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            outcomes: VecDeque::with_capacity(window),
        }
    }

    pub fn record(&mut self, success: bool) {
        if self.window == 0 {
            return;
        }
        if self.outcomes.len() == self.window {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(success);
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }

    pub fn rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.successes() as f64 / self.outcomes.len() as f64
    }

    pub fn mean_ratio(&self) -> f64 {
        if self.window == 0 {
            return 0.0;
        }
        self.rate() / self.window as f64
    }

    /// Summed successes currently in the window.
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|&&hit| hit).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn outcomes(&self) -> impl Iterator<Item = bool> + '_ {
        self.outcomes.iter().copied()
    }
}

impl Default for CatchHistory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
