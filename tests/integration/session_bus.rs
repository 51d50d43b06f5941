#![allow(clippy::all)]

use std::sync::Arc;

use eduflow_local::{
    config::DEFAULT_STORAGE_KEY,
    session::{Credentials, Role, SignUpData, SignUpOptions, SignUpRequest, UserAttributes},
    storage::MemorySlot,
    AuthEvent, ChainMode, LocalClient, Session,
};
use parking_lot::Mutex;
use serde_json::json;

type Seen = Arc<Mutex<Vec<(AuthEvent, Option<Session>)>>>;

fn client_over(slot: Arc<MemorySlot>) -> LocalClient {
    LocalClient::with_slot(slot, DEFAULT_STORAGE_KEY, ChainMode::Compat)
}

fn recording(client: &LocalClient) -> (Seen, eduflow_local::session::Subscription) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = client
        .auth()
        .on_auth_state_change(move |event, session| sink.lock().push((event, session.cloned())));
    (seen, sub)
}

fn creator_request(name: &str) -> SignUpRequest {
    SignUpRequest {
        email: Some("kru@example.com".into()),
        password: "hunter2".into(),
        options: SignUpOptions {
            data: SignUpData {
                full_name: Some(name.into()),
                role: Some(Role::Creator),
            },
        },
    }
}

#[tokio::test]
async fn sign_in_emits_exactly_one_signed_in() {
    let client = client_over(Arc::new(MemorySlot::new()));
    let (seen, _sub) = recording(&client);
    let res = client
        .auth()
        .sign_in_with_password(Credentials {
            email: Some("learner@example.com".into()),
            password: "anything".into(),
        })
        .await;
    assert!(res.error.is_none());

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    let (event, session) = &seen[0];
    assert_eq!(*event, AuthEvent::SignedIn);
    let session = session.as_ref().unwrap();
    assert_eq!(session.user.id, "demo-user-id");
    assert_eq!(session.user.email.as_deref(), Some("learner@example.com"));
    assert_eq!(session.access_token, "demo-token");
}

#[tokio::test]
async fn sign_out_emits_signed_out_without_session() {
    let client = client_over(Arc::new(MemorySlot::new()));
    let (seen, _sub) = recording(&client);
    client.auth().sign_out().await;
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, AuthEvent::SignedOut);
    assert!(seen[0].1.is_none());
}

#[tokio::test]
async fn unsubscribed_listener_hears_nothing() {
    let client = client_over(Arc::new(MemorySlot::new()));
    let (seen, sub) = recording(&client);
    assert!(sub.unsubscribe());
    assert!(!sub.unsubscribe());
    client.auth().sign_in_with_password(Credentials::default()).await;
    client.auth().sign_out().await;
    assert!(seen.lock().is_empty());
    assert_eq!(client.auth().listener_count(), 0);
}

#[tokio::test]
async fn dropping_the_handle_keeps_the_listener() {
    let client = client_over(Arc::new(MemorySlot::new()));
    let (seen, sub) = recording(&client);
    drop(sub);
    client.auth().sign_out().await;
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn listeners_run_in_registration_order() {
    let client = client_over(Arc::new(MemorySlot::new()));
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in 0..4 {
        let order = order.clone();
        client
            .auth()
            .on_auth_state_change(move |_, _| order.lock().push(tag));
    }
    client.auth().sign_out().await;
    assert_eq!(*order.lock(), [0, 1, 2, 3]);
}

#[tokio::test]
async fn clones_share_one_bus() {
    let client = client_over(Arc::new(MemorySlot::new()));
    let (seen, _sub) = recording(&client);
    client.clone().auth().sign_out().await;
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn sign_up_persists_profile_across_reopen() {
    let slot = Arc::new(MemorySlot::new());
    let client = client_over(slot.clone());
    let (seen, _sub) = recording(&client);
    let res = client.auth().sign_up(creator_request("Kru Malee")).await;
    let user = res.data.user.unwrap();
    assert_eq!(user.user_metadata.unwrap().role, Role::Creator);
    assert_eq!(seen.lock()[0].0, AuthEvent::SignedUp);

    let reopened = client_over(slot);
    let profile = reopened
        .from("profiles")
        .select("*")
        .eq("id", "demo-user-id")
        .single()
        .data
        .unwrap();
    assert_eq!(profile["full_name"], json!("Kru Malee"));
    assert_eq!(profile["role"], json!("creator"));
}

#[tokio::test]
async fn sign_out_keeps_the_profile() {
    let client = client_over(Arc::new(MemorySlot::new()));
    client.auth().sign_up(creator_request("Kru Somsri")).await;
    client.auth().sign_out().await;
    let signed_in = client
        .auth()
        .sign_in_with_password(Credentials::default())
        .await;
    let role = signed_in.data.user.and_then(|u| u.user_metadata).map(|m| m.role);
    assert_eq!(role, Some(Role::Creator));
}

#[tokio::test]
async fn update_user_always_succeeds() {
    let client = client_over(Arc::new(MemorySlot::new()));
    let (seen, _sub) = recording(&client);
    let res = client
        .auth()
        .update_user(UserAttributes {
            password: Some("new-secret".into()),
        })
        .await;
    assert!(res.error.is_none());
    assert_eq!(res.data.user.map(|u| u.id).as_deref(), Some("demo-user-id"));
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn get_session_reports_none_after_sign_in() {
    let client = client_over(Arc::new(MemorySlot::new()));
    client.auth().sign_in_with_password(Credentials::default()).await;
    let res = client.auth().get_session().await;
    assert!(res.data.is_none());
    assert!(res.error.is_none());
}

#[tokio::test]
async fn unknown_stored_role_is_reported_as_stored() {
    let client = client_over(Arc::new(MemorySlot::new()));
    client
        .from("profiles")
        .upsert(eduflow_local::to_record(json!({ "id": "demo-user-id", "role": "admin" })));
    let res = client
        .auth()
        .sign_in_with_password(Credentials::default())
        .await;
    let role = res.data.user.and_then(|u| u.user_metadata).map(|m| m.role);
    assert_eq!(role, Some(Role::Other("admin".into())));
    assert_eq!(role.as_ref().map(Role::as_str), Some("admin"));
}
