use crate::store::{ActionCollections, Collection};
use flowcap_common::action::ActionRecord;

/// Minimum Jaro-Winkler similarity for a title to count as a fuzzy hit.
pub const FUZZY_THRESHOLD: f64 = 0.85;

/// Stores a copy of `record` among the favorites.
pub async fn add_favorite(collections: &ActionCollections, record: &ActionRecord) -> bool {
    let mut favorite = record.clone();
    favorite.is_favorite = Some(true);
    favorite.is_selected = false;
    collections.add(Collection::Favorites, favorite).await
}

pub async fn remove_favorite(collections: &ActionCollections, id: &str) -> bool {
    collections.delete(Collection::Favorites, id).await
}

/// Flips the favorite state of the action with `id`, looking it up in the
/// favorites first and then in the recorded and clipboard lists. Returns the
/// new state, or `None` if no such action exists.
pub async fn toggle_favorite(collections: &ActionCollections, id: &str) -> Option<bool> {
    if collections.get(Collection::Favorites, id).await.is_some() {
        return Some(!remove_favorite(collections, id).await);
    }
    for source in [Collection::Recorded, Collection::Clipboard] {
        if let Some(record) = collections.get(source, id).await {
            return Some(add_favorite(collections, &record).await);
        }
    }
    None
}

/// Case-insensitive search over title, url, method and category.
///
/// When nothing matches as a substring, titles similar to the query are
/// returned instead, best match first.
pub fn search<'a>(records: &'a [ActionRecord], query: &str) -> Vec<&'a ActionRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }

    let hits: Vec<&ActionRecord> = records
        .iter()
        .filter(|r| {
            [
                r.title.as_str(),
                r.url.as_str(),
                r.method.as_str(),
                r.category.as_deref().unwrap_or_default(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect();
    if !hits.is_empty() {
        return hits;
    }

    let mut fuzzy: Vec<(f64, &ActionRecord)> = records
        .iter()
        .map(|r| (strsim::jaro_winkler(&r.title.to_lowercase(), &needle), r))
        .filter(|(score, _)| *score >= FUZZY_THRESHOLD)
        .collect();
    fuzzy.sort_by(|a, b| b.0.total_cmp(&a.0));
    fuzzy.into_iter().map(|(_, r)| r).collect()
}
