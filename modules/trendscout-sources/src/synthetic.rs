//! Deterministic stand-in series.
//!
//! Used when no live provider is configured and as the substitute when a
//! live provider fails. Names depend only on the query text and values on the
//! query and window, so the same request always yields the same series.

use chrono::{DateTime, Duration, Utc};

use trendscout_common::{
    create_seed, seeded_random, title_case, Country, SignalItem, SourceType, TimeRange,
};

/// Per-source shape of the synthetic series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticProfile {
    pub source_type: SourceType,
    pub multiplier: f64,
    pub count: usize,
}

impl SyntheticProfile {
    pub const DEFAULT_COUNT: usize = 6;

    pub fn for_source(source_type: SourceType) -> Self {
        let multiplier = match source_type {
            SourceType::SearchVolume => 1.1,
            SourceType::ForumMentions => 0.9,
            SourceType::LaunchBoard => 1.0,
            SourceType::VideoPlatform => 1.2,
        };
        Self {
            source_type,
            multiplier,
            count: Self::DEFAULT_COUNT,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Query text the series is derived from.
    pub fn query(&self, keyword: &str, country: Country) -> String {
        match self.source_type {
            SourceType::SearchVolume => format!("{keyword} {country}"),
            SourceType::ForumMentions => format!("{keyword} reddit"),
            SourceType::LaunchBoard => format!("{keyword} product"),
            SourceType::VideoPlatform => format!("{keyword} video"),
        }
    }

    pub fn generate(
        &self,
        keyword: &str,
        country: Country,
        range: TimeRange,
        now: DateTime<Utc>,
    ) -> Vec<SignalItem> {
        generate_trend_items(
            &self.query(keyword, country),
            self.source_type,
            self.multiplier,
            self.count,
            range,
            now,
        )
    }
}

/// Build `count` items for `query` spread evenly over `range`. Item `i` is
/// dated `i * step` days before `now` (`step = days / count`, at least one)
/// and valued `round((r * 60 + 40) * multiplier)` with `r` seeded from the
/// query, window and index.
pub fn generate_trend_items(
    query: &str,
    source_type: SourceType,
    multiplier: f64,
    count: usize,
    range: TimeRange,
    now: DateTime<Utc>,
) -> Vec<SignalItem> {
    let tag = source_type.tag();
    let seed = create_seed(&format!("{query}-{tag}-{range}"));
    let step = (range.days() / count.max(1) as i64).max(1);
    let display = title_case(query);
    let slug = query.split_whitespace().collect::<Vec<_>>().join("-");

    (0..count)
        .map(|index| {
            let weight = seeded_random(seed + index as u64);
            let value = ((weight * 60.0 + 40.0) * multiplier).round() as i64;
            let position = index + 1;

            let mut item = SignalItem::new(format!("{display} {tag} {position}"), value, source_type)
                .with_description(describe(&display, source_type, position, value))
                .with_url(format!("https://example.com/{tag}/{slug}/{position}"))
                .published(now - Duration::days(index as i64 * step));

            if source_type == SourceType::VideoPlatform {
                item.channel_title = Some(format!("{query} Channel"));
                item.comments = Some((weight * 500.0).floor() as u32);
            }
            item
        })
        .collect()
}

fn describe(display: &str, source_type: SourceType, position: usize, value: i64) -> String {
    match source_type {
        SourceType::SearchVolume => format!("Search interest for {display} at index {value}."),
        SourceType::ForumMentions => format!("Forum thread #{position} about {display}."),
        SourceType::LaunchBoard => format!("Emerging product around {display} ({value} estimated votes)."),
        SourceType::VideoPlatform => format!("Trending video on {display} ({value} estimated interactions)."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-03-10T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn series_is_deterministic() {
        let profile = SyntheticProfile::for_source(SourceType::ForumMentions);
        let a = profile.generate("fitness apps", Country::Us, TimeRange::Month, now());
        let b = profile.generate("fitness apps", Country::Us, TimeRange::Month, now());
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn values_stay_within_multiplied_band() {
        for source in SourceType::ALL {
            let profile = SyntheticProfile::for_source(source);
            let low = (40.0 * profile.multiplier).round() as i64;
            let high = (100.0 * profile.multiplier).round() as i64;
            for item in profile.generate("meal prep", Country::Fr, TimeRange::Month, now()) {
                assert!(item.value >= low && item.value <= high, "{source}: {}", item.value);
                assert_eq!(item.source_type, source);
            }
        }
    }

    #[test]
    fn names_and_urls_follow_query() {
        let items = SyntheticProfile::for_source(SourceType::SearchVolume)
            .with_count(2)
            .generate("fitness apps", Country::Us, TimeRange::Month, now());
        assert_eq!(items[0].name, "Fitness Apps US google 1");
        assert_eq!(items[1].name, "Fitness Apps US google 2");
        assert_eq!(
            items[0].url.as_deref(),
            Some("https://example.com/google/fitness-apps-US/1")
        );
        assert_eq!(items[1].published_at, Some(now() - Duration::days(15)));
    }

    #[test]
    fn window_sets_spacing_and_values() {
        let profile = SyntheticProfile::for_source(SourceType::SearchVolume);
        let week = profile.generate("fitness apps", Country::Us, TimeRange::Week, now());
        let quarter = profile.generate("fitness apps", Country::Us, TimeRange::Quarter, now());

        assert_eq!(week[5].published_at, Some(now() - Duration::days(5)));
        assert_eq!(quarter[5].published_at, Some(now() - Duration::days(75)));

        let values = |items: &[SignalItem]| items.iter().map(|i| i.value).collect::<Vec<_>>();
        assert_ne!(values(&week), values(&quarter));
        assert_eq!(
            week.iter().map(|i| &i.name).collect::<Vec<_>>(),
            quarter.iter().map(|i| &i.name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn video_items_carry_channel_and_comments() {
        let items = SyntheticProfile::for_source(SourceType::VideoPlatform).generate(
            "yoga",
            Country::Global,
            TimeRange::Week,
            now(),
        );
        assert!(items.iter().all(|i| i.channel_title.as_deref() == Some("yoga video Channel")));
        assert!(items.iter().all(|i| i.comments.is_some_and(|c| c < 500)));

        let forum = SyntheticProfile::for_source(SourceType::ForumMentions).generate(
            "yoga",
            Country::Global,
            TimeRange::Week,
            now(),
        );
        assert!(forum.iter().all(|i| i.channel_title.is_none() && i.comments.is_none()));
    }

    #[test]
    fn country_only_changes_search_volume() {
        let reddit = SyntheticProfile::for_source(SourceType::ForumMentions);
        assert_eq!(
            reddit.generate("yoga", Country::Us, TimeRange::Month, now()),
            reddit.generate("yoga", Country::De, TimeRange::Month, now())
        );
        let google = SyntheticProfile::for_source(SourceType::SearchVolume);
        assert_ne!(
            google.generate("yoga", Country::Us, TimeRange::Month, now())[0].name,
            google.generate("yoga", Country::De, TimeRange::Month, now())[0].name
        );
    }
}
