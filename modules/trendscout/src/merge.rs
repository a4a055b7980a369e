//! Cross-source dedup and ranking.
//!
//! Items merge by case-insensitive name. Display fields come from the
//! contributing item that sorts first by `(source_type, url, name)`, so the
//! result does not depend on input order and partial merges can be combined.

use std::cmp::Ordering;
use std::collections::HashMap;

use trendscout_common::{MergedTrend, SignalItem};

pub fn merge_and_rank(batches: &[Vec<SignalItem>]) -> Vec<MergedTrend> {
    let mut merged: HashMap<String, MergedTrend> = HashMap::new();
    for item in batches.iter().flatten() {
        fold_into(&mut merged, MergedTrend::from_item(item.clone()));
    }
    rank(merged.into_values().collect())
}

/// Combine already-merged lists. `combine(&[merge(a), merge(b)])` equals
/// `merge(a ++ b)`.
pub fn combine(lists: &[Vec<MergedTrend>]) -> Vec<MergedTrend> {
    let mut merged: HashMap<String, MergedTrend> = HashMap::new();
    for trend in lists.iter().flatten() {
        fold_into(&mut merged, trend.clone());
    }
    rank(merged.into_values().collect())
}

fn fold_into(merged: &mut HashMap<String, MergedTrend>, trend: MergedTrend) {
    let key = trend.item.merge_key();
    match merged.get_mut(&key) {
        Some(existing) => existing.absorb(trend),
        None => {
            merged.insert(key, trend);
        }
    }
}

/// Score desc, occurrences desc, then lowercase name.
pub fn rank(mut trends: Vec<MergedTrend>) -> Vec<MergedTrend> {
    trends.sort_by(ranking);
    trends
}

fn ranking(a: &MergedTrend, b: &MergedTrend) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.occurrences.cmp(&a.occurrences))
        .then_with(|| a.item.merge_key().cmp(&b.item.merge_key()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendscout_common::SourceType;

    fn item(name: &str, value: i64, source: SourceType) -> SignalItem {
        SignalItem::new(name, value, source).with_url(format!("https://example.com/{source}/{name}"))
    }

    fn scored(trends: &[MergedTrend]) -> Vec<(String, i64, u32, i64)> {
        trends
            .iter()
            .map(|t| (t.name().to_lowercase(), t.score, t.occurrences, t.value()))
            .collect()
    }

    #[test]
    fn merges_case_insensitively_and_keeps_value_invariant() {
        let merged = merge_and_rank(&[
            vec![item("Yoga Mats", 70, SourceType::SearchVolume)],
            vec![item("yoga mats", 45, SourceType::ForumMentions)],
            vec![item("YOGA MATS", 50, SourceType::VideoPlatform)],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 165);
        assert_eq!(merged[0].occurrences, 3);
        assert_eq!(merged[0].value(), 55);
        // display fields come from the search-volume item
        assert_eq!(merged[0].name(), "Yoga Mats");
        for trend in &merged {
            let expected = (trend.score as f64 / trend.occurrences as f64).round() as i64;
            assert_eq!(trend.value(), expected);
        }
    }

    #[test]
    fn higher_occurrences_win_score_ties() {
        let merged = merge_and_rank(&[vec![
            item("solo", 100, SourceType::SearchVolume),
            item("pair", 50, SourceType::SearchVolume),
            item("pair", 50, SourceType::ForumMentions),
        ]]);
        assert_eq!(merged[0].name(), "pair");
        assert_eq!(merged[1].name(), "solo");
    }

    #[test]
    fn full_ties_break_on_name() {
        let merged = merge_and_rank(&[vec![
            item("zumba", 60, SourceType::SearchVolume),
            item("aerobics", 60, SourceType::SearchVolume),
        ]]);
        assert_eq!(merged[0].name(), "aerobics");
    }

    #[test]
    fn merge_is_order_independent() {
        let a = vec![item("Yoga", 60, SourceType::VideoPlatform), item("Pilates", 40, SourceType::LaunchBoard)];
        let b = vec![item("yoga", 80, SourceType::ForumMentions)];
        let c = vec![item("Pilates", 41, SourceType::SearchVolume), item("Barre", 90, SourceType::ForumMentions)];

        let forward = merge_and_rank(&[a.clone(), b.clone(), c.clone()]);
        let backward = merge_and_rank(&[c, b, a]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn combining_partial_merges_matches_a_single_merge() {
        let a = vec![item("Yoga", 61, SourceType::VideoPlatform)];
        let b = vec![item("yoga", 80, SourceType::ForumMentions), item("Barre", 90, SourceType::ForumMentions)];
        let c = vec![item("YOGA", 75, SourceType::SearchVolume)];

        let whole = merge_and_rank(&[a.clone(), b.clone(), c.clone()]);
        let left = combine(&[merge_and_rank(&[a.clone(), b.clone()]), merge_and_rank(&[c.clone()])]);
        let right = combine(&[merge_and_rank(&[a]), merge_and_rank(&[b, c])]);

        assert_eq!(scored(&whole), scored(&left));
        assert_eq!(whole, left);
        assert_eq!(whole, right);
        assert_eq!(whole[0].score, 216);
        assert_eq!(whole[0].value(), 72);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(merge_and_rank(&[]).is_empty());
        assert!(merge_and_rank(&[vec![], vec![]]).is_empty());
    }
}
