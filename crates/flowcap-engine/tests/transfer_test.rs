use flowcap_engine::store::{ActionCollections, Collection, MemoryStore};
use flowcap_engine::transfer::{
    ImportError, export_collection_file, import_favorites, import_favorites_file, parse_actions,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn action(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": "https://s.com/_api/web/lists",
        "method": "GET",
        "title": title,
        "icon": "icon.png",
        "actionJson": "{\"id\":\"x\"}",
        "isSelected": true
    })
}

#[tokio::test]
async fn test_missing_action_json_rejects_whole_import() {
    let collections = ActionCollections::new(Arc::new(MemoryStore::new()));
    let mut broken = action("2", "items");
    broken.as_object_mut().unwrap().remove("actionJson");
    let text = json!([action("1", "lists"), broken]).to_string();

    let err = import_favorites(&collections, &text).await.unwrap_err();
    assert!(matches!(err, ImportError::MissingFields { index: 1 }));
    assert!(
        err.to_string()
            .contains("missing required action properties")
    );
    assert!(collections.list(Collection::Favorites).await.is_empty());
}

#[test]
fn test_error_messages_are_distinct() {
    let syntax = parse_actions("[{").unwrap_err();
    assert!(matches!(syntax, ImportError::InvalidJson(_)));
    assert!(syntax.to_string().starts_with("Invalid JSON syntax"));

    let object = parse_actions(r#"{"id":"1"}"#).unwrap_err();
    assert!(matches!(object, ImportError::NotAnArray));
    assert_eq!(
        object.to_string(),
        "Import file must contain an array of actions"
    );

    let empty_title = parse_actions(&json!([{"id": "1", "title": "", "actionJson": "{}"}]).to_string())
        .unwrap_err();
    assert!(matches!(empty_title, ImportError::MissingFields { index: 0 }));
}

#[tokio::test]
async fn test_import_marks_favorites_and_skips_known_ids() {
    let collections = ActionCollections::new(Arc::new(MemoryStore::new()));
    let first = json!([action("1", "lists")]).to_string();
    let summary = import_favorites(&collections, &first).await.unwrap();
    assert_eq!((summary.added, summary.skipped), (1, 0));

    let second = json!([action("1", "lists"), action("2", "items")]).to_string();
    let summary = import_favorites(&collections, &second).await.unwrap();
    assert_eq!((summary.added, summary.skipped), (1, 1));

    let favorites = collections.list(Collection::Favorites).await;
    assert_eq!(favorites.len(), 2);
    assert!(favorites.iter().all(|r| r.is_favorite() && !r.is_selected));
}

#[tokio::test]
async fn test_export_then_import_through_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("favorites.json");

    let source = ActionCollections::new(Arc::new(MemoryStore::new()));
    let text = json!([action("1", "lists"), action("2", "items")]).to_string();
    import_favorites(&source, &text).await.unwrap();
    let exported = export_collection_file(&source, Collection::Favorites, &path)
        .await
        .unwrap();
    assert_eq!(exported, 2);

    let target = ActionCollections::new(Arc::new(MemoryStore::new()));
    let summary = import_favorites_file(&target, &path).await.unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(
        target.list(Collection::Favorites).await,
        source.list(Collection::Favorites).await
    );
}

#[tokio::test]
async fn test_import_missing_file() {
    let dir = tempdir().unwrap();
    let collections = ActionCollections::new(Arc::new(MemoryStore::new()));
    let err = import_favorites_file(&collections, &dir.path().join("nope.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Io(_)));
}
