/// Length of one focus session.
pub const FOCUS_SECONDS: u32 = 25 * 60;

/// Pomodoro-style countdown shown next to the habit list. The owner drives
/// it by calling [`tick`](FocusTimer::tick) once a second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    total: u32,
    remaining: u32,
    running: bool,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(FOCUS_SECONDS)
    }
}

impl FocusTimer {
    pub fn new(total_seconds: u32) -> Self {
        let total = total_seconds.max(1);
        Self {
            total,
            remaining: total,
            running: false,
        }
    }

    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    /// Advance one second. Stops at zero.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        if self.remaining <= 1 {
            self.remaining = 0;
            self.running = false;
            tracing::info!("Focus session finished");
            return;
        }
        self.remaining -= 1;
    }

    pub fn reset(&mut self) {
        self.remaining = self.total;
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// `mm:ss`
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }

    /// Share of the session already elapsed, `0.0..=1.0`.
    pub fn elapsed_fraction(&self) -> f64 {
        1.0 - f64::from(self.remaining) / f64::from(self.total)
    }
}
