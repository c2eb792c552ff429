//! Run statistics.

use std::time::Duration;

use observability::DispatchStatsAggregator;
use router::RouterStatsSnapshot;

/// Statistics from a `run` session
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Input lines read
    pub lines_read: u64,

    /// Lines rejected (unknown signal, bad values)
    pub lines_rejected: u64,

    /// Total duration of the session
    pub duration: Duration,

    /// Dispatch totals and latency
    pub dispatch: DispatchStatsAggregator,

    /// Final per-router counters
    pub routers: Vec<RouterStatsSnapshot>,
}

impl RunStats {
    /// Value changes per second
    pub fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatch.total_values as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Routing Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Lines read: {}", self.lines_read);
        println!("   ├─ Lines rejected: {}", self.lines_rejected);
        println!("   └─ Values/s: {:.2}", self.rate());

        let summary = self.dispatch.summary();

        println!("\n📈 Dispatch");
        println!("   ├─ Values dispatched: {}", summary.total_values);
        println!("   ├─ Messages sent: {}", summary.total_sent);
        println!(
            "   ├─ Mappings aborted: {} ({:.2}%)",
            summary.total_aborted, summary.abort_rate
        );
        println!("   ├─ Queries sent: {}", summary.total_queries);
        println!("   └─ Latency (ms): {}", summary.latency_ms);

        if !self.routers.is_empty() {
            println!("\n📤 Routers ({})", self.routers.len());
            for (i, r) in self.routers.iter().enumerate() {
                let prefix = if i == self.routers.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} mappings, {} sent, {} queries, {} aborted, {} failed",
                    prefix,
                    r.dest_name,
                    r.mapping_count,
                    r.messages_sent,
                    r.queries_sent,
                    r.mappings_aborted,
                    r.transport_failures
                );
            }
        }

        println!();
    }
}
