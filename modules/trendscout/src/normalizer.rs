//! Per-source aggregates and the cross-source metrics derived from them.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use trendscout_common::{NormalizedMetrics, SourceSummary, SourceType, TimePoint};

use crate::aggregator::Aggregation;

/// Summarize every known source, including ones that returned nothing.
pub fn summarize(aggregation: &Aggregation) -> BTreeMap<SourceType, SourceSummary> {
    SourceType::ALL
        .into_iter()
        .map(|source| {
            let values: Vec<i64> = aggregation.items_for(source).map(|i| i.value).collect();
            let item_count = values.len() as u32;
            let average_value = if values.is_empty() {
                0.0
            } else {
                round1(values.iter().sum::<i64>() as f64 / values.len() as f64)
            };

            let summary = SourceSummary {
                available: item_count > 0,
                item_count,
                average_value,
                peak_value: values.iter().copied().max().unwrap_or(0),
                timeseries: timeseries(aggregation, source),
                error: aggregation.errors.get(&source).cloned(),
            };
            (source, summary)
        })
        .collect()
}

/// Daily mean of a source's dated items, oldest first.
fn timeseries(aggregation: &Aggregation, source: SourceType) -> Vec<TimePoint> {
    let mut by_day: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for item in aggregation.items_for(source) {
        if let Some(at) = item.published_at {
            let slot = by_day.entry(at.date_naive()).or_insert((0, 0));
            slot.0 += item.value;
            slot.1 += 1;
        }
    }
    by_day
        .into_iter()
        .map(|(date, (sum, n))| TimePoint {
            date,
            value: (sum as f64 / n as f64).round() as i64,
        })
        .collect()
}

/// Derive comparable metrics. No data at all yields zeroed metrics.
pub fn normalize(summaries: &BTreeMap<SourceType, SourceSummary>) -> NormalizedMetrics {
    let available: Vec<(SourceType, &SourceSummary)> = summaries
        .iter()
        .filter(|(_, s)| s.available)
        .map(|(t, s)| (*t, s))
        .collect();

    if available.is_empty() {
        return NormalizedMetrics::default();
    }

    let source_scores: BTreeMap<String, f64> = available
        .iter()
        .map(|(t, s)| (t.tag().to_string(), s.average_value.min(100.0)))
        .collect();

    let total_weight: f64 = available.iter().map(|(t, _)| t.weight()).sum();
    let weighted: f64 = available
        .iter()
        .map(|(t, s)| t.weight() * s.average_value.min(100.0))
        .sum();

    let velocity = summaries
        .get(&SourceType::SearchVolume)
        .map(|s| velocity(&s.timeseries))
        .unwrap_or(0.0);

    NormalizedMetrics {
        raw_growth_estimate: round1(weighted / total_weight),
        velocity,
        source_diversity: available.len() as u32,
        mention_volume: available.iter().map(|(_, s)| s.item_count).sum(),
        source_scores,
        sources_used: available.iter().map(|(t, _)| *t).collect(),
    }
}

/// Percent change of the recent half of a series over its older half, ±100.
/// Odd-length series leave the middle point out.
pub fn velocity(series: &[TimePoint]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let half = series.len() / 2;
    let mean = |points: &[TimePoint]| {
        points.iter().map(|p| p.value as f64).sum::<f64>() / points.len() as f64
    };
    let older = mean(&series[..half]);
    let recent = mean(&series[series.len() - half..]);
    if older == 0.0 {
        return 0.0;
    }
    round1(((recent - older) / older * 100.0).clamp(-100.0, 100.0))
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
