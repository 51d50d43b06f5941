#![allow(clippy::all)]

use std::sync::Arc;

use eduflow_local::{
    config::{EmulatorOptions, DEFAULT_STORAGE_KEY},
    query::QueryOp,
    storage::MemorySlot,
    to_record, ChainMode, EmuError, LocalClient,
};
use serde_json::json;

fn client(mode: ChainMode) -> LocalClient {
    LocalClient::with_slot(Arc::new(MemorySlot::new()), DEFAULT_STORAGE_KEY, mode)
}

fn seed_contents(client: &LocalClient) {
    for (title, status, views) in [
        ("Algebra", "published", 30),
        ("Drafting", "draft", 5),
        ("Binary", "published", 12),
        ("Colour", "published", 7),
    ] {
        client.from("contents").insert(to_record(json!({
            "title": title,
            "status": status,
            "views": views,
            "creator_id": "demo-user-id",
        })));
    }
}

fn titles(rows: &[eduflow_local::Record]) -> Vec<&str> {
    rows.iter().filter_map(|r| r["title"].as_str()).collect()
}

#[tokio::test]
async fn awaiting_a_chain_yields_newest_first() {
    let client = client(ChainMode::Compat);
    seed_contents(&client);
    let res = client
        .from("contents")
        .select("*")
        .eq("status", "published")
        .order("created_at", false)
        .await;
    assert!(res.error.is_none());
    let rows = res.data.unwrap();
    assert_eq!(titles(&rows), ["Colour", "Binary", "Algebra"]);
}

#[test]
fn chained_eq_narrows_the_cursor() {
    let client = client(ChainMode::Compat);
    seed_contents(&client);
    let rows = client
        .from("contents")
        .select("*")
        .eq("status", "published")
        .eq("views", 12)
        .execute()
        .data
        .unwrap();
    assert_eq!(titles(&rows), ["Binary"]);
}

#[test]
fn limit_and_single_take_from_the_front() {
    let client = client(ChainMode::Compat);
    seed_contents(&client);
    let limited = client.from("contents").select("*").limit(2).execute();
    assert_eq!(titles(&limited.data.unwrap()), ["Colour", "Binary"]);

    let first = client.from("contents").select("*").single();
    assert_eq!(first.data.unwrap()["title"], json!("Colour"));

    let none = client.from("contents").select("*").eq("title", "nope").single();
    assert!(none.data.is_none());
    assert!(none.error.is_none());
}

#[test]
fn read_is_isolated_from_later_mutation() {
    let client = client(ChainMode::Compat);
    seed_contents(&client);
    let pending = client.from("contents").select("*");
    client
        .from("contents")
        .insert(to_record(json!({"title": "Late", "status": "published"})));
    client.from("contents").delete().eq("title", "Algebra");

    let rows = pending.eq("status", "published").execute().data.unwrap();
    assert_eq!(titles(&rows), ["Colour", "Binary", "Algebra"]);
}

#[test]
fn compat_mode_ignores_not_and_order() {
    let client = client(ChainMode::Compat);
    seed_contents(&client);
    let rows = client
        .from("contents")
        .select("*")
        .not("title", "in", "(Colour,Binary)")
        .order("views", true)
        .execute()
        .data
        .unwrap();
    assert_eq!(titles(&rows), ["Colour", "Binary", "Drafting", "Algebra"]);
}

#[test]
fn faithful_mode_excludes_and_sorts() {
    let client = client(ChainMode::Faithful);
    seed_contents(&client);
    let rows = client
        .from("contents")
        .select("*")
        .not("title", "in", "(Colour,Binary)")
        .order("views", true)
        .execute()
        .data
        .unwrap();
    assert_eq!(titles(&rows), ["Drafting", "Algebra"]);
}

#[test]
fn faithful_mode_reports_unknown_operator() {
    let client = client(ChainMode::Faithful);
    seed_contents(&client);
    let res = client
        .from("contents")
        .select("*")
        .not("title", "ilike", "%a%")
        .limit(1)
        .execute();
    assert!(matches!(res.error, Some(EmuError::UnsupportedOperator { .. })));

    let ok = client.from("contents").select("*").limit(2).execute();
    assert_eq!(ok.into_result().unwrap().map(|rows| rows.len()), Some(2));
    let failed = client
        .from("contents")
        .select("*")
        .not("title", "ilike", "%a%")
        .execute();
    assert!(failed.into_result().is_err());
}

#[test]
fn chain_mode_comes_from_options() {
    let mut options = EmulatorOptions::default();
    options
        .apply_env_from(|key| (key == "EDUFLOW_CHAIN_MODE").then(|| "faithful".to_string()))
        .unwrap();
    let client = LocalClient::open(&options);
    assert_eq!(client.chain_mode(), ChainMode::Faithful);
}

#[test]
fn ops_are_recorded_for_explain() {
    let client = client(ChainMode::Compat);
    let query = client.from("categories").select("id, name").eq("id", "cat2").limit(1);
    assert_eq!(query.ops().len(), 3);
    assert!(matches!(query.ops()[0], QueryOp::Select { .. }));
    assert_eq!(query.explain(), "categories: select(id, name) -> eq(id) -> limit(1)");
    assert_eq!(query.single().data.unwrap()["name"], json!("English"));
}

#[test]
fn profiles_read_as_rows_keyed_by_id() {
    let client = client(ChainMode::Compat);
    let profile = client
        .from("profiles")
        .select("full_name, avatar_url, role")
        .eq("id", "demo-user-id")
        .single()
        .data
        .unwrap();
    assert_eq!(profile["full_name"], json!("Demo User"));
    assert_eq!(profile["role"], json!("learner"));
}

#[test]
fn unknown_table_reads_empty() {
    let client = client(ChainMode::Compat);
    let res = client.from("comments").select("*").execute();
    assert_eq!(res.data.map(|rows| rows.len()), Some(0));
}
