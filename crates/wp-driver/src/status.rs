use tracing::{debug, info};

/// The single operator-facing status line. Each update replaces the previous
/// one; history survives only in the log stream.
#[derive(Debug, Default)]
pub struct StatusLine {
    line: String,
    dot: bool,
}

impl StatusLine {
    pub fn update(&mut self, iteration: u64, message: &str) {
        self.line = format!("iteration {iteration} {message}");
        info!("{}", self.line);
    }

    /// Readiness probes tick the line with an alternating dot suffix so the
    /// operator can see the gate is still alive. Kept out of the info log.
    pub fn probe_tick(&mut self, iteration: u64, probe: &str) {
        let suffix = if self.dot { ".." } else { "" };
        self.dot = !self.dot;
        self.line = format!("iteration {iteration} checking environment for {probe}{suffix}");
        debug!("{}", self.line);
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_replace_the_line() {
        let mut status = StatusLine::default();
        status.update(0, "sethdseed1");
        assert_eq!(status.line(), "iteration 0 sethdseed1");
        status.update(3, "balance is 20");
        assert_eq!(status.line(), "iteration 3 balance is 20");
    }

    #[test]
    fn probe_ticks_alternate_the_dots() {
        let mut status = StatusLine::default();
        status.probe_tick(0, "stop_environment");
        assert_eq!(status.line(), "iteration 0 checking environment for stop_environment");
        status.probe_tick(0, "stop_environment");
        assert_eq!(
            status.line(),
            "iteration 0 checking environment for stop_environment.."
        );
        status.probe_tick(0, "stop_environment");
        assert_eq!(status.line(), "iteration 0 checking environment for stop_environment");
    }
}
