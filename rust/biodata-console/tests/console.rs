#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use wasm_bindgen_test::wasm_bindgen_test;

use std::sync::Arc;

use biodata_access::{Denial, Operation, RawIdentity};
use biodata_console::{Console, ConsoleSettings};
use biodata_network::{ApiError, MockTransport, OutboundRequest};
use biodata_storage::{JsonStorage, MemoryStorage};
use pretty_assertions::assert_eq;
use serde_json::json;
use testresult::TestResult;

fn console_with(local: &MemoryStorage, transport: &MockTransport) -> Console<MockTransport> {
    Console::init(
        ConsoleSettings::default(),
        Arc::new(local.clone()),
        Arc::new(MemoryStorage::default()),
        transport.clone(),
    )
}

#[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
#[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
async fn it_injects_the_normalized_identity_into_table_requests() -> TestResult {
    let transport = MockTransport::default();
    let console = console_with(&MemoryStorage::default(), &transport);
    console.sign_in(RawIdentity::from_json(
        r#"{"userId":"7","userType":"internal","canAccessLogin":false}"#,
    )?);

    console.database().tables("biodata").await?;

    let sent = transport.requests();
    assert_eq!(sent[0].query["userId"], json!(7));
    assert_eq!(sent[0].query["userType"], json!("internal"));
    assert_eq!(sent[0].body, None);
    Ok(())
}

#[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
#[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
async fn it_signs_out_and_redirects_after_a_rejected_session() -> TestResult {
    let transport = MockTransport::default();
    transport.respond(401, json!({"error": "session expired"}));
    let local = MemoryStorage::default();
    let console = console_with(&local, &transport);
    console.sign_in(RawIdentity::from_json(r#"{"userId":7,"userType":"internal"}"#)?);

    let result = console.database().tables("biodata").await;

    assert!(matches!(result, Err(ApiError::Unauthenticated { .. })));
    assert_eq!(console.session().user_id, None);
    assert_eq!(local.get_json::<serde_json::Value>("userInfo")?, None);
    assert_eq!(
        console.navigate("/query").denial(),
        Some(&Denial::NotAuthenticated)
    );
    Ok(())
}

#[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
#[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
async fn it_keeps_the_session_after_a_forbidden_response() -> TestResult {
    let transport = MockTransport::default();
    transport.respond(403, json!({"error": "no write access to biodata.samples"}));
    let console = console_with(&MemoryStorage::default(), &transport);
    console.sign_in(RawIdentity::from_json(r#"{"userId":7,"userType":"internal"}"#)?);

    let result = console
        .client()
        .send(OutboundRequest::post(
            "/api/database/query",
            json!({"sql": "delete from samples", "dataSource": "biodata"}),
        ))
        .await;

    assert_eq!(
        result,
        Err(ApiError::Forbidden {
            reason: "no write access to biodata.samples".into()
        })
    );
    assert!(console.session().is_authenticated());
    Ok(())
}

#[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
#[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
async fn it_refuses_restricted_writes_locally() -> TestResult {
    let transport = MockTransport::default();
    let console = console_with(&MemoryStorage::default(), &transport);
    console.sign_in(RawIdentity::from_json(
        r#"{"userId":1,"userType":"admin","permission":"super_admin","canAccessLogin":true}"#,
    )?);

    assert!(console.check("login", Operation::Read).allowed);
    assert!(!console.check("login", Operation::Write).allowed);

    let result = console
        .database()
        .execute_query("login", "update users set password = ''")
        .await;

    assert!(matches!(result, Err(ApiError::Forbidden { .. })));
    assert!(transport.requests().is_empty());
    Ok(())
}

#[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
#[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
async fn it_migrates_legacy_sessions_on_startup() -> TestResult {
    let local = MemoryStorage::default();
    local.set_json("user", &json!({"userId": "12", "userType": "external"}))?;

    let console = console_with(&local, &MockTransport::default());

    assert_eq!(console.session().user_id, Some(12.into()));
    assert_eq!(console.panels().owner().as_str(), "12");
    assert_eq!(
        local.get_json::<serde_json::Value>("userInfo")?.map(|info| info["userId"].clone()),
        Some(json!(12))
    );
    Ok(())
}
