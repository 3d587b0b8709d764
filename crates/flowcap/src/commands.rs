use anyhow::{Context, bail};
use flowcap_engine::action::ActionRecord;
use flowcap_engine::classifier::{classify_url, get_title};
use flowcap_engine::config::FlowcapConfig;
use flowcap_engine::events::HttpHeader;
use flowcap_engine::favorites;
use flowcap_engine::settings::{PageDetectionMode, SettingsPatch, SettingsStore};
use flowcap_engine::store::{ActionCollections, ActionStore, Collection, FileStore};
use flowcap_engine::synthesizer::{HeaderSet, RequestBody, synthesize};
use flowcap_engine::template_source::TemplateSource;
use flowcap_engine::transfer;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn open_store(config: &FlowcapConfig) -> Arc<dyn ActionStore> {
    Arc::new(FileStore::new(&config.store.path))
}

pub async fn serve(mut config: FlowcapConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.bridge.port = port;
    }
    info!(store = %config.store.path.display(), "Opening action store");
    let store = open_store(&config);

    let (addr, session) = flowcap_r::launch(&config, store).await?;
    println!("Connect the extension shim to ws://{}", addr);

    tokio::select! {
        _ = session.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
        }
    }
    Ok(())
}

pub async fn classify(file: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let request: Value = serde_json::from_str(&text).context("Request file is not valid JSON")?;

    let url = request
        .get("url")
        .and_then(Value::as_str)
        .context("Request file needs a \"url\"")?;
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("GET");
    let headers = match request.get("headers") {
        Some(list) if list.is_array() => {
            let pairs: Vec<HttpHeader> =
                serde_json::from_value(list.clone()).context("Malformed header list")?;
            HeaderSet::OrderedPairs(pairs)
        }
        Some(map) if map.is_object() => HeaderSet::from_json_object(map),
        _ => HeaderSet::default(),
    };
    let body = match request.get("body") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => RequestBody::from_bytes(text.as_bytes()),
        Some(other) => Some(RequestBody::Json(other.clone())),
    };

    let Some(kind) = classify_url(url) else {
        bail!("{} does not match any known action family", url);
    };
    let title = get_title(url);
    info!(kind = kind.label(), title = %title, "Classified request");

    let synthesized = synthesize(kind, method, url, &headers, &title, body.as_ref());
    println!("{}", synthesized.action_json);
    Ok(())
}

fn print_records(records: &[&ActionRecord]) {
    for record in records {
        println!(
            "{}\t{}\t{}\t{}",
            record.id,
            record.category.as_deref().unwrap_or("-"),
            record.method,
            record.title
        );
    }
}

pub async fn favorites_list(config: &FlowcapConfig) -> anyhow::Result<()> {
    let collections = ActionCollections::new(open_store(config));
    let records = collections.list(Collection::Favorites).await;
    print_records(&records.iter().collect::<Vec<_>>());
    Ok(())
}

pub async fn favorites_search(config: &FlowcapConfig, query: &str) -> anyhow::Result<()> {
    let collections = ActionCollections::new(open_store(config));
    let records = collections.list(Collection::Favorites).await;
    let hits = favorites::search(&records, query);
    if hits.is_empty() {
        eprintln!("No favorites match \"{}\"", query);
    }
    print_records(&hits);
    Ok(())
}

pub async fn favorites_remove(config: &FlowcapConfig, id: &str) -> anyhow::Result<()> {
    let collections = ActionCollections::new(open_store(config));
    if !favorites::remove_favorite(&collections, id).await {
        bail!("No favorite with id {}", id);
    }
    println!("Removed {}", id);
    Ok(())
}

pub async fn favorites_export(config: &FlowcapConfig, path: &Path) -> anyhow::Result<()> {
    let collections = ActionCollections::new(open_store(config));
    let count = transfer::export_collection_file(&collections, Collection::Favorites, path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Exported {} favorites to {}", count, path.display());
    Ok(())
}

pub async fn favorites_import(config: &FlowcapConfig, path: &Path) -> anyhow::Result<()> {
    let collections = ActionCollections::new(open_store(config));
    let summary = transfer::import_favorites_file(&collections, path).await?;
    println!(
        "Imported {} favorites ({} already present)",
        summary.added, summary.skipped
    );
    Ok(())
}

pub async fn settings_show(config: &FlowcapConfig) -> anyhow::Result<()> {
    let settings = SettingsStore::new(open_store(config)).load().await;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub async fn settings_mode(config: &FlowcapConfig, mode: PageDetectionMode) -> anyhow::Result<()> {
    let settings = SettingsStore::new(open_store(config))
        .update(&SettingsPatch::mode(mode))
        .await;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub async fn settings_reset(config: &FlowcapConfig) -> anyhow::Result<()> {
    let settings = SettingsStore::new(open_store(config)).reset().await;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub async fn templates(
    config: &FlowcapConfig,
    url: Option<String>,
    refresh: bool,
) -> anyhow::Result<()> {
    let store = open_store(config);
    let url = match url {
        Some(url) => url,
        None => SettingsStore::new(store.clone())
            .load()
            .await
            .template_source_url
            .context("No template source URL given or configured")?,
    };

    let source = TemplateSource::new(store);
    let items = if refresh {
        source.refresh(&url).await?
    } else {
        source.load(&url).await?
    };
    print_records(&items.iter().collect::<Vec<_>>());
    Ok(())
}
