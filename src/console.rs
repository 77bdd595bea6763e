//! Operator console interface: a single `gc` command with subcommands
//! (spec.md §6).

use crate::collector::Collector;

impl Collector {
    /// Dispatches one `gc <subcommand>` console line and returns the
    /// response text the host should print. Unknown subcommands and
    /// malformed arguments return a usage string rather than panicking —
    /// this is operator input, not a trusted internal call.
    pub fn console_command(&mut self, line: &str) -> String {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("stop") => {
                self.threshold = 0;
                "gc: Threshold set to 0 (collector will step every frame)".to_string()
            }
            Some("now") => {
                self.threshold = self.alloc_bytes;
                "gc: Threshold set to AllocBytes".to_string()
            }
            Some("full") => {
                self.full_gc();
                "gc: full collection complete".to_string()
            }
            Some("count") => {
                format!("gc: {} live objects", self.allocation_count())
            }
            Some("pause") => match parts.next() {
                None => format!("gc: pause={}", self.pause_percent),
                Some(arg) => match arg.parse::<u32>() {
                    Ok(n) => {
                        self.set_pause_percent(n);
                        format!("gc: pause={}", self.pause_percent)
                    }
                    Err(_) => format!("gc: invalid pause value {arg:?}"),
                },
            },
            Some("stepmul") => match parts.next() {
                None => format!("gc: stepmul={}", self.step_mul_percent),
                Some(arg) => match arg.parse::<u32>() {
                    Ok(n) => {
                        self.set_step_mul_percent(n);
                        format!("gc: stepmul={}", self.step_mul_percent)
                    }
                    Err(_) => format!("gc: invalid stepmul value {arg:?}"),
                },
            },
            Some(other) => format!(
                "gc: unknown subcommand {other:?} (stop|now|full|count|pause[N]|stepmul[N])"
            ),
            None => self.stat_line(),
        }
    }

    /// `[State] Alloc:xK Thresh:xK Est:xK Steps:n MinStep:xK` (spec.md §6).
    pub fn stat_line(&self) -> String {
        format!(
            "[{:?}] Alloc:{}K Thresh:{}K Est:{}K Steps:{} MinStep:{}K",
            self.state,
            self.alloc_bytes / 1024,
            self.threshold / 1024,
            self.estimate / 1024,
            self.step_count,
            self.min_step_size / 1024,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GcOptions;

    #[test]
    fn pause_without_arg_reports_current_value() {
        let mut c = Collector::new(GcOptions::DEFAULT);
        assert_eq!(c.console_command("pause"), "gc: pause=150");
    }

    #[test]
    fn pause_with_arg_updates_value() {
        let mut c = Collector::new(GcOptions::DEFAULT);
        assert_eq!(c.console_command("pause 200"), "gc: pause=200");
        assert_eq!(c.pause_percent(), 200);
    }

    #[test]
    fn stepmul_floors_at_100() {
        let mut c = Collector::new(GcOptions::DEFAULT);
        c.console_command("stepmul 10");
        assert_eq!(c.step_mul_percent(), 100);
    }

    #[test]
    fn unknown_subcommand_reports_usage() {
        let mut c = Collector::new(GcOptions::DEFAULT);
        assert!(c.console_command("frobnicate").contains("unknown subcommand"));
    }

    #[test]
    fn stop_zeroes_threshold() {
        let mut c = Collector::new(GcOptions::DEFAULT);
        c.console_command("stop");
        assert_eq!(c.threshold(), 0);
    }

    #[test]
    fn count_reports_zero_for_empty_collector() {
        let mut c = Collector::new(GcOptions::DEFAULT);
        assert_eq!(c.console_command("count"), "gc: 0 live objects");
    }
}
