//! Prometheus text exposition format.
//!
//! Renders an `OrchestratorMetrics` snapshot for scraping or for a
//! node-exporter textfile collector.

use crate::metrics::OrchestratorMetrics;

/// Render orchestrator metrics into Prometheus text format.
///
/// Unit metrics carry a `unit` label; everything else is unlabeled.
pub fn render_prometheus(m: &OrchestratorMetrics) -> String {
    let mut out = String::new();
    let units: Vec<_> = m.units.iter().map(|(name, u)| (escape_label(name), u)).collect();

    out.push_str("# HELP freightgrid_cycles_total Cycles run since start.\n");
    out.push_str("# TYPE freightgrid_cycles_total counter\n");
    out.push_str(&format!("freightgrid_cycles_total {}\n", m.cycle_count));

    out.push_str("# HELP freightgrid_running Whether the cycle loop is running.\n");
    out.push_str("# TYPE freightgrid_running gauge\n");
    out.push_str(&format!("freightgrid_running {}\n", u8::from(m.running)));

    out.push_str("# HELP freightgrid_last_cycle_duration_ms Duration of the last cycle.\n");
    out.push_str("# TYPE freightgrid_last_cycle_duration_ms gauge\n");
    out.push_str(&format!(
        "freightgrid_last_cycle_duration_ms {}\n",
        m.last_cycle_duration_ms
    ));

    out.push_str("# HELP freightgrid_unit_runs_total Unit executions.\n");
    out.push_str("# TYPE freightgrid_unit_runs_total counter\n");
    for (name, u) in &units {
        out.push_str(&format!("freightgrid_unit_runs_total{{unit=\"{name}\"}} {}\n", u.runs));
    }

    out.push_str("# HELP freightgrid_unit_failures_total Failed unit executions.\n");
    out.push_str("# TYPE freightgrid_unit_failures_total counter\n");
    for (name, u) in &units {
        out.push_str(&format!(
            "freightgrid_unit_failures_total{{unit=\"{name}\"}} {}\n",
            u.failures
        ));
    }

    out.push_str("# HELP freightgrid_unit_duration_ms_total Cumulative unit execution time.\n");
    out.push_str("# TYPE freightgrid_unit_duration_ms_total counter\n");
    for (name, u) in &units {
        out.push_str(&format!(
            "freightgrid_unit_duration_ms_total{{unit=\"{name}\"}} {}\n",
            u.total_duration_ms
        ));
    }

    out.push_str("# HELP freightgrid_unit_success_rate Unit success rate (0.0-1.0).\n");
    out.push_str("# TYPE freightgrid_unit_success_rate gauge\n");
    for (name, u) in &units {
        out.push_str(&format!(
            "freightgrid_unit_success_rate{{unit=\"{name}\"}} {:.4}\n",
            u.success_rate
        ));
    }

    out.push_str("# HELP freightgrid_unit_priority Current unit priority.\n");
    out.push_str("# TYPE freightgrid_unit_priority gauge\n");
    for (name, u) in &units {
        out.push_str(&format!(
            "freightgrid_unit_priority{{unit=\"{name}\"}} {}\n",
            u.priority
        ));
    }

    out.push_str("# HELP freightgrid_jobs Jobs held in state.\n");
    out.push_str("# TYPE freightgrid_jobs gauge\n");
    out.push_str(&format!("freightgrid_jobs{{state=\"all\"}} {}\n", m.jobs));
    out.push_str(&format!("freightgrid_jobs{{state=\"open\"}} {}\n", m.open_jobs));

    out.push_str("# HELP freightgrid_providers Providers held in state.\n");
    out.push_str("# TYPE freightgrid_providers gauge\n");
    out.push_str(&format!("freightgrid_providers {}\n", m.providers));

    out.push_str("# HELP freightgrid_pairs Matched pairs held in state.\n");
    out.push_str("# TYPE freightgrid_pairs gauge\n");
    out.push_str(&format!("freightgrid_pairs {}\n", m.pairs));

    out.push_str("# HELP freightgrid_market_demand_index Market demand index (0.0-1.0).\n");
    out.push_str("# TYPE freightgrid_market_demand_index gauge\n");
    out.push_str(&format!(
        "freightgrid_market_demand_index {:.4}\n",
        m.market.demand_index
    ));

    out.push_str("# HELP freightgrid_market_supply_index Market supply index (0.0-1.0).\n");
    out.push_str("# TYPE freightgrid_market_supply_index gauge\n");
    out.push_str(&format!(
        "freightgrid_market_supply_index {:.4}\n",
        m.market.supply_index
    ));

    out.push_str("# HELP freightgrid_market_stale Whether the market snapshot is stale.\n");
    out.push_str("# TYPE freightgrid_market_stale gauge\n");
    out.push_str(&format!("freightgrid_market_stale {}\n", u8::from(m.market_stale)));

    out.push_str("# HELP freightgrid_recent_errors Unit failures held in the error ring.\n");
    out.push_str("# TYPE freightgrid_recent_errors gauge\n");
    out.push_str(&format!("freightgrid_recent_errors {}\n", m.recent_errors.len()));

    out
}

/// Escape a label value for the text format: backslash, double quote,
/// and newline.
fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
