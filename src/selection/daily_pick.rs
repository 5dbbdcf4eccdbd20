use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};

use crate::models::{ContentItem, ContentType};

/// Daily picks roll over at midnight Korea Standard Time (UTC+09:00, no DST),
/// regardless of where the server or the viewer happens to be. Using a civil
/// calendar date here keeps every client and every restart on the same pick.
const PICK_ZONE_OFFSET_SECS: i32 = 9 * 3600;

/// Resolves the instant `now` to the calendar date the daily picks are keyed by.
pub fn pick_date(now: DateTime<Utc>) -> NaiveDate {
    let zone = FixedOffset::east_opt(PICK_ZONE_OFFSET_SECS)
        .expect("pick zone offset is within +/-24h");
    now.with_timezone(&zone).date_naive()
}

/// Today's pick date for the current wall clock.
pub fn pick_date_today() -> NaiveDate {
    pick_date(Utc::now())
}

/// True when the stored video reference marks a failed upload rather than a
/// playable asset.
fn is_error_video_ref(video_ref: &str) -> bool {
    video_ref == "error" || video_ref.starts_with("ERROR")
}

/// An item may enter a feed or the daily-pick pool only if it is published and
/// its video reference resolves to something the video host can play.
pub fn is_eligible(item: &ContentItem) -> bool {
    if !item.metadata.published {
        return false;
    }
    match item.metadata.video_ref.as_deref() {
        Some(video_ref) => !is_error_video_ref(video_ref),
        None => false,
    }
}

/// Second stage of the fetch/filter/select pipeline: drops unpublished items and
/// items with missing or error-sentinel video references.
pub fn filter_eligible(items: Vec<ContentItem>) -> Vec<ContentItem> {
    items.into_iter().filter(is_eligible).collect()
}

/// Deterministic index into a pool of `pool_size` candidates for a given date.
///
/// `seed = year*10000 + month*100 + day`, pushed through `sin` and scaled; the
/// fractional part spreads the picks across the pool. This is a deterministic
/// hash, not a statistically uniform PRNG, and that is the point: the same date
/// and pool size map to the same index on every call, on every host, with no
/// stored state. Returns `None` for an empty pool.
pub fn date_seed_index(date: NaiveDate, salt: u32, pool_size: usize) -> Option<usize> {
    if pool_size == 0 {
        return None;
    }
    let seed = date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32;
    let x = (seed as f64 + salt as f64).sin() * 10_000.0;
    let frac = x - x.floor();
    let index = (frac * pool_size as f64).floor() as usize;
    // frac is in [0, 1) so index < pool_size already; the min guards the
    // rounding edge where frac * pool_size lands exactly on pool_size.
    Some(index.min(pool_size - 1))
}

/// Picks the one item of `content_type` that is free for everyone on `date`.
///
/// An admin override (`override_id`, from the featured-picks table) wins when it
/// still resolves to a member of the eligible pool; otherwise the seeded index
/// decides. The pool is sorted by id internally, so callers may pass it in any
/// order and still observe the same pick. An empty pool means nothing is free
/// today — the caller renders that, it is not an error.
pub fn select_daily_free<'a>(
    content_type: ContentType,
    date: NaiveDate,
    pool: &'a [ContentItem],
    override_id: Option<&str>,
) -> Option<&'a ContentItem> {
    let mut ordered: Vec<&ContentItem> = pool
        .iter()
        .filter(|item| item.metadata.content_type == content_type)
        .collect();
    if ordered.is_empty() {
        return None;
    }
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    if let Some(wanted) = override_id {
        if let Some(item) = ordered.iter().find(|item| item.id == wanted) {
            return Some(*item);
        }
        // The override points at a deleted or no-longer-eligible item; fall
        // through to the deterministic fallback.
        log::warn!(
            "featured pick override '{}' for {} on {} does not resolve, using fallback",
            wanted,
            content_type,
            date
        );
    }

    let index = date_seed_index(date, content_type.seed_salt(), ordered.len())?;
    Some(ordered[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, content_type: ContentType, video_ref: Option<&str>, published: bool) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            metadata: crate::models::ContentMetadata {
                title: format!("item {}", id),
                content_type,
                price: 9_000,
                creator_id: 1,
                course_id: None,
                published,
                video_ref: video_ref.map(|s| s.to_string()),
                description: String::new(),
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                last_updated_at: None,
            },
        }
    }

    fn drill_pool(n: usize) -> Vec<ContentItem> {
        (0..n)
            .map(|i| item(&format!("drill-{:02}", i), ContentType::Drill, Some("1234"), true))
            .collect()
    }

    #[test]
    fn seed_index_is_deterministic_and_in_bounds() {
        for day in 1..=28 {
            let date = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
            for size in 1..=17 {
                let first = date_seed_index(date, 2, size).unwrap();
                let second = date_seed_index(date, 2, size).unwrap();
                assert_eq!(first, second);
                assert!(first < size);
            }
        }
    }

    #[test]
    fn seed_index_empty_pool_is_none() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(date_seed_index(date, 1, 0), None);
    }

    #[test]
    fn select_is_stable_under_pool_permutation() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let pool = drill_pool(9);
        let picked = select_daily_free(ContentType::Drill, date, &pool, None)
            .unwrap()
            .id
            .clone();

        let mut reversed = pool.clone();
        reversed.reverse();
        let picked_again = select_daily_free(ContentType::Drill, date, &reversed, None)
            .unwrap()
            .id
            .clone();
        assert_eq!(picked, picked_again);
    }

    #[test]
    fn select_single_item_pool_always_picks_it() {
        let pool = drill_pool(1);
        for day in 1..=28 {
            let date = NaiveDate::from_ymd_opt(2025, 2, day).unwrap();
            let picked = select_daily_free(ContentType::Drill, date, &pool, None).unwrap();
            assert_eq!(picked.id, "drill-00");
        }
    }

    #[test]
    fn select_empty_pool_is_none() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(select_daily_free(ContentType::Drill, date, &[], None).is_none());
    }

    #[test]
    fn override_takes_priority_over_fallback() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let pool = drill_pool(9);
        let fallback = select_daily_free(ContentType::Drill, date, &pool, None)
            .unwrap()
            .id
            .clone();
        // Point the override somewhere the fallback would not land.
        let forced = pool.iter().find(|i| i.id != fallback).unwrap().id.clone();
        let picked = select_daily_free(ContentType::Drill, date, &pool, Some(&forced)).unwrap();
        assert_eq!(picked.id, forced);
    }

    #[test]
    fn dangling_override_falls_back_to_seeded_pick() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let pool = drill_pool(9);
        let fallback = select_daily_free(ContentType::Drill, date, &pool, None)
            .unwrap()
            .id
            .clone();
        let picked = select_daily_free(ContentType::Drill, date, &pool, Some("gone-forever")).unwrap();
        assert_eq!(picked.id, fallback);
    }

    #[test]
    fn select_ignores_items_of_other_types() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let mut pool = drill_pool(4);
        pool.push(item("aaa-sparring", ContentType::Sparring, Some("77:abc"), true));
        let picked = select_daily_free(ContentType::Drill, date, &pool, None).unwrap();
        assert_eq!(picked.metadata.content_type, ContentType::Drill);
    }

    #[test]
    fn filter_eligible_drops_sentinels_and_unpublished() {
        let pool = vec![
            item("a", ContentType::Drill, Some("1234"), true),
            item("b", ContentType::Drill, Some("error"), true),
            item("c", ContentType::Drill, Some("ERROR: transcode failed"), true),
            item("d", ContentType::Drill, None, true),
            item("e", ContentType::Drill, Some("5678:abcd"), false),
        ];
        let kept = filter_eligible(pool);
        let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn pick_date_resolves_in_fixed_zone() {
        // 2025-06-14 20:00 UTC is already 2025-06-15 in UTC+9.
        let now = Utc.with_ymd_and_hms(2025, 6, 14, 20, 0, 0).unwrap();
        assert_eq!(pick_date(now), NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        // ...while 2025-06-14 10:00 UTC is still the 14th.
        let earlier = Utc.with_ymd_and_hms(2025, 6, 14, 10, 0, 0).unwrap();
        assert_eq!(pick_date(earlier), NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
    }
}
