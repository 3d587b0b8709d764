use flowcap_engine::action::ActionRecord;
use flowcap_engine::favorites::{add_favorite, search, toggle_favorite};
use flowcap_engine::store::{ActionCollections, Collection, MemoryStore};
use std::sync::Arc;

fn record(id: &str, title: &str, method: &str, category: &str) -> ActionRecord {
    ActionRecord {
        id: id.into(),
        url: format!("https://graph.microsoft.com/v1.0/me/{}", title),
        method: method.into(),
        title: title.into(),
        icon: String::new(),
        action_json: "{}".into(),
        body: None,
        is_selected: false,
        is_favorite: None,
        category: Some(category.into()),
    }
}

fn titles<'a>(hits: &[&'a ActionRecord]) -> Vec<&'a str> {
    hits.iter().map(|r| r.title.as_str()).collect()
}

#[test]
fn test_substring_search_is_case_insensitive() {
    let records = vec![
        record("1", "calendarView", "GET", "outlook"),
        record("2", "joinedTeams", "GET", "teams"),
        record("3", "messages", "POST", "outlook"),
    ];

    assert_eq!(titles(&search(&records, "TEAMS")), vec!["joinedTeams"]);
    assert_eq!(
        titles(&search(&records, "outlook")),
        vec!["calendarView", "messages"]
    );
    assert_eq!(titles(&search(&records, "post")), vec!["messages"]);
    assert_eq!(search(&records, "  ").len(), 3);
}

#[test]
fn test_fuzzy_fallback_ranks_closest_title_first() {
    let records = vec![
        record("1", "messages", "GET", "outlook"),
        record("2", "mailFolders", "GET", "outlook"),
        record("3", "drive", "GET", "http"),
    ];

    // no substring hit, but a near miss on "messages"
    let hits = search(&records, "mesages");
    assert_eq!(titles(&hits).first(), Some(&"messages"));
    assert!(!titles(&hits).contains(&"drive"));

    assert!(search(&records, "zzzzzz").is_empty());
}

#[tokio::test]
async fn test_toggle_favorite_round_trip() {
    let collections = ActionCollections::new(Arc::new(MemoryStore::new()));
    collections
        .add(Collection::Recorded, record("r1", "events", "GET", "outlook"))
        .await;

    assert_eq!(toggle_favorite(&collections, "r1").await, Some(true));
    let favorite = collections.get(Collection::Favorites, "r1").await.unwrap();
    assert!(favorite.is_favorite());

    assert_eq!(toggle_favorite(&collections, "r1").await, Some(false));
    assert!(collections.get(Collection::Favorites, "r1").await.is_none());
    // the recorded copy is untouched
    assert!(collections.get(Collection::Recorded, "r1").await.is_some());

    assert_eq!(toggle_favorite(&collections, "missing").await, None);
}

#[tokio::test]
async fn test_add_favorite_clears_selection() {
    let collections = ActionCollections::new(Arc::new(MemoryStore::new()));
    let mut selected = record("r1", "events", "GET", "outlook");
    selected.is_selected = true;

    assert!(add_favorite(&collections, &selected).await);
    assert!(!add_favorite(&collections, &selected).await);
    let stored = collections.get(Collection::Favorites, "r1").await.unwrap();
    assert!(!stored.is_selected);
}
