//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the search and cleaning code stays free of presentation concerns
//! - output changes are localized (and covered by snapshot-style tests)

use crate::domain::ScoreRecord;
use crate::report::RunSummary;

/// Run summary: input, cleaning counts, best candidate.
pub fn format_run_summary(s: &RunSummary<'_>) -> String {
    let mut out = String::new();
    let best = s.best;

    out.push_str("=== transit-finder - box transit search ===\n");
    out.push_str(&format!("Target: {}\n", s.target));
    out.push_str(&format!(
        "Sector: {}\n",
        s.sector.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!(
        "Samples: {} in -> {} searched ({} segment{}; removed: {} non-finite, {} duplicate, {} flagged, {} clipped)\n",
        s.clean.input,
        s.clean.output,
        s.segments,
        if s.segments == 1 { "" } else { "s" },
        s.clean.non_finite,
        s.clean.duplicate_times,
        s.clean.bad_quality,
        s.clean.clipped,
    ));
    out.push_str(&format!(
        "Trial periods: {} scored of {}\n",
        best.score_curve.snr.iter().filter(|v| v.is_finite()).count(),
        best.score_curve.len(),
    ));

    out.push_str("\nBest candidate:\n");
    out.push_str(&format!("- period   : {:.6} d\n", best.period));
    out.push_str(&format!("- epoch    : {:.6}\n", best.transit_time));
    out.push_str(&format!(
        "- duration : {:.4} d ({:.2} h)\n",
        best.duration,
        best.duration * 24.0
    ));
    out.push_str(&format!(
        "- depth    : {:.1} ppm (± {:.1})\n",
        best.depth * 1e6,
        best.depth_err * 1e6
    ));
    out.push_str(&format!("- snr      : {:.2}\n", best.snr));
    out.push_str(&format!(
        "- transits : {} observed, {} in-transit samples\n",
        s.stats.transits_observed, s.stats.in_transit_samples
    ));
    out.push_str(&format!(
        "- Rp/R*    : {:.4} | duty cycle {:.4}\n",
        s.stats.radius_ratio, s.stats.duty_cycle
    ));
    out.push('\n');

    out
}

/// The strongest distinct peaks of the score curve.
pub fn format_peaks(peaks: &[ScoreRecord]) -> String {
    let mut out = String::new();
    out.push_str("Top peaks:\n");
    out.push_str(
        format!(
            "{:>4} {:>12} {:>10} {:>12} {:>10} {:>14}\n",
            "#", "period_d", "snr", "depth_ppm", "dur_d", "epoch"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:->4} {:->12} {:->10} {:->12} {:->10} {:->14}\n",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for (i, p) in peaks.iter().enumerate() {
        out.push_str(
            format!(
                "{:>4} {:>12.6} {:>10.2} {:>12.1} {:>10.4} {:>14.6}\n",
                i + 1,
                p.period,
                p.snr,
                p.depth * 1e6,
                p.duration,
                p.transit_time
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::CleanReport;
    use crate::domain::{BestFit, ScoreCurve};
    use crate::report::TransitStats;

    fn peak(period: f64, snr: f64) -> ScoreRecord {
        ScoreRecord {
            period,
            power: 0.5 * snr * snr,
            snr,
            depth: 0.001,
            depth_err: 0.001 / snr,
            transit_time: 1.25,
            duration: 0.1,
        }
    }

    #[test]
    fn peaks_table_snapshot() {
        let txt = format_peaks(&[peak(3.5, 42.0), peak(7.0, 12.5)]);
        let expected = concat!(
            "Top peaks:\n",
            "   #     period_d        snr    depth_ppm      dur_d          epoch\n",
            "---- ------------ ---------- ------------ ---------- --------------\n",
            "   1     3.500000      42.00       1000.0     0.1000       1.250000\n",
            "   2     7.000000      12.50       1000.0     0.1000       1.250000\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn summary_mentions_target_and_candidate() {
        let best = BestFit::from_record(peak(3.5, 42.0), ScoreCurve::from_records(&[peak(3.5, 42.0)]));
        let clean = CleanReport {
            input: 1000,
            non_finite: 2,
            output: 998,
            ..CleanReport::default()
        };
        let summary = RunSummary {
            target: "TIC 1",
            sector: None,
            segments: 1,
            clean: &clean,
            best: &best,
            stats: TransitStats {
                transits_observed: 8,
                in_transit_samples: 30,
                radius_ratio: 0.0316,
                duty_cycle: 0.0286,
            },
        };
        let txt = format_run_summary(&summary);
        assert!(txt.contains("Target: TIC 1\n"));
        assert!(txt.contains("Sector: -\n"));
        assert!(txt.contains("1000 in -> 998 searched (1 segment;"));
        assert!(txt.contains("- period   : 3.500000 d\n"));
        assert!(txt.contains("- depth    : 1000.0 ppm"));
        assert!(txt.contains("Trial periods: 1 scored of 1\n"));
    }
}
