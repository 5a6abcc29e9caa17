//! Rolling average over the most recent samples.

/// Window averaging filter.
///
/// The first sample fills the whole window, so the average is usable right away
/// instead of ramping up from zero.
#[derive(Clone, Debug)]
pub struct WindowAverage<const N: usize> {
    window: [f32; N],
    next: usize,
    primed: bool,
}

impl<const N: usize> WindowAverage<N> {
    /// Create an empty filter.
    pub fn new() -> Self {
        WindowAverage {
            window: [0.0; N],
            next: 0,
            primed: false,
        }
    }

    /// Add a sample, replacing the oldest one.
    pub fn add_sample(&mut self, sample: f32) {
        if !self.primed {
            for v in self.window.iter_mut() {
                *v = sample;
            }
            self.primed = true;
        }

        self.window[self.next] = sample;
        self.next = (self.next + 1) % N;
    }

    /// Mean of the window, or `None` before the first sample.
    pub fn value(&self) -> Option<f32> {
        if self.primed {
            Some(self.window.iter().sum::<f32>() / N as f32)
        } else {
            None
        }
    }

    /// Add a sample and return the updated mean.
    pub fn update(&mut self, sample: f32) -> f32 {
        self.add_sample(sample);
        self.value().unwrap_or(sample)
    }
}

impl<const N: usize> Default for WindowAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}
