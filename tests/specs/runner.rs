// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner deployment specs: package → upload → register → call → teardown.

use serde_json::json;
use serial_test::serial;

use flame_cache::CacheClient;
use flame_core::{
    ApplicationAttributes, FlameContext, FlameErrorCode, PackageConfig, SessionState, Shim,
};
use flame_runner::{
    MethodRegistry, Runner, RunnerOptions, RunnerService, RunnerValue, FLMRUN_TEMPLATE,
};

use super::support::{cache, cluster::Cluster};

fn registry() -> MethodRegistry {
    MethodRegistry::new()
        .direct(|_state, args, _kwargs| {
            let a = args[0].as_i64().unwrap_or(0);
            let b = args[1].as_i64().unwrap_or(0);
            Ok(json!(a + b))
        })
        .method("increment", |state, _args, _kwargs| {
            let count = state["count"].as_i64().unwrap_or(0) + 1;
            state["count"] = json!(count);
            Ok(json!(count))
        })
        .method("add", |state, args, _kwargs| {
            let delta = args.first().and_then(|v| v.as_i64()).unwrap_or(0);
            let count = state["count"].as_i64().unwrap_or(0) + delta;
            state["count"] = json!(count);
            Ok(json!(count))
        })
        .method("get_count", |state, _args, _kwargs| Ok(state["count"].clone()))
}

struct Deployment {
    cluster: Cluster,
    context: FlameContext,
    storage_dir: tempfile::TempDir,
    project_dir: tempfile::TempDir,
    _instance_workdir: tempfile::TempDir,
}

/// Stand up cache, instance, frontend, template app, storage, and a
/// project directory to package; leaves the cwd inside the project.
async fn deployment() -> Deployment {
    let cache_base = cache::spawn().await;

    let instance_workdir = tempfile::tempdir().unwrap();
    let service = RunnerService::new(registry(), CacheClient::new(Some(cache_base.clone())))
        .with_workdir(instance_workdir.path());
    let cluster = Cluster::start(service, Some(cache_base)).await;

    let conn = cluster.connect().await;
    conn.register_application(FLMRUN_TEMPLATE, ApplicationAttributes::new(Shim::Grpc))
        .await
        .unwrap();

    let storage_dir = tempfile::tempdir().unwrap();
    let mut context = cluster.context();
    context.package = Some(PackageConfig {
        storage: format!("file://{}", storage_dir.path().display()),
        excludes: vec![".git".to_string()],
    });

    let project_dir = tempfile::tempdir().unwrap();
    std::fs::write(project_dir.path().join("module.rs"), b"pub fn f() {}").unwrap();
    std::fs::create_dir_all(project_dir.path().join(".git")).unwrap();
    std::fs::write(project_dir.path().join(".git/HEAD"), b"ref: main").unwrap();
    std::env::set_current_dir(project_dir.path()).unwrap();

    Deployment {
        cluster,
        context,
        storage_dir,
        project_dir,
        _instance_workdir: instance_workdir,
    }
}

#[tokio::test]
#[serial]
async fn deploy_call_chain_and_teardown() {
    let deployment = deployment().await;
    let conn = deployment.cluster.connect().await;

    let mut runner = Runner::deploy(&deployment.context, "myapp").await.unwrap();

    // The archive landed in storage and the application points at it.
    let stored = deployment.storage_dir.path().join("myapp.tar.gz");
    assert!(stored.exists());
    let app = conn.get_application("myapp").await.unwrap();
    assert_eq!(app.spec.url.as_deref(), Some(format!("file://{}", stored.display()).as_str()));
    assert_eq!(app.spec.working_directory.as_deref(), Some("/opt/myapp"));

    // Direct invocation: sum(1, 2) == 3.
    let sum_service = runner
        .service(serde_json::Value::Null, RunnerOptions::default())
        .await
        .unwrap();
    let result = sum_service
        .invoke(vec![RunnerValue::plain(&1).unwrap(), RunnerValue::plain(&2).unwrap()])
        .unwrap();
    assert_eq!(result.get_json::<i64>().await.unwrap(), 3);

    // Stateful counter: results arrive in order 1, 2, 7, 7.
    let counter = runner
        .service(json!({"count": 0}), RunnerOptions { stateful: true, autoscale: false })
        .await
        .unwrap();
    let mut results = Vec::new();
    for call in [
        counter.method("increment", vec![]).unwrap(),
        counter.method("increment", vec![]).unwrap(),
        counter.method("add", vec![RunnerValue::plain(&5).unwrap()]).unwrap(),
        counter.method("get_count", vec![]).unwrap(),
    ] {
        results.push(call.get_json::<i64>().await.unwrap());
    }
    assert_eq!(results, vec![1, 2, 7, 7]);

    // Chained references: a later call consumes an earlier result by ref.
    let chained = runner
        .service(json!({"count": 0}), RunnerOptions { stateful: true, autoscale: false })
        .await
        .unwrap();
    let first = chained.method("add", vec![RunnerValue::plain(&14).unwrap()]).unwrap();
    let first_ref = first.object_ref().await.unwrap();
    let second = chained.method("add", vec![RunnerValue::from_ref(first_ref)]).unwrap();
    assert_eq!(second.get_json::<i64>().await.unwrap(), 28);
    let count = chained.method("get_count", vec![]).unwrap();
    assert_eq!(count.get_json::<i64>().await.unwrap(), 28);

    let session_id = counter.session().id().to_string();
    runner.teardown().await;

    // Sessions closed, application gone, archives cleaned up.
    let closed = conn.get_session(&session_id).await.unwrap();
    assert_eq!(closed.record().state, SessionState::Closed);
    let err = conn.get_application("myapp").await.unwrap_err();
    assert_eq!(err.code, FlameErrorCode::NotFound);
    assert!(!stored.exists());
    assert!(!deployment.project_dir.path().join("myapp.tar.gz").exists());
}

#[tokio::test]
#[serial]
async fn teardown_cleans_storage_even_when_frontend_is_gone() {
    let deployment = deployment().await;

    let mut runner = Runner::deploy(&deployment.context, "doomed").await.unwrap();
    runner.service(json!({"count": 0}), RunnerOptions::default()).await.unwrap();

    // Session close and unregister will now fail; cleanup must continue.
    deployment.cluster.stop_frontend();
    runner.teardown().await;

    assert!(!deployment.storage_dir.path().join("doomed.tar.gz").exists());
    assert!(!deployment.project_dir.path().join("doomed.tar.gz").exists());
}

#[tokio::test]
#[serial]
async fn deploy_without_package_config_is_invalid() {
    let deployment = deployment().await;
    let mut context = deployment.context.clone();
    context.package = None;

    let err = Runner::deploy(&context, "nopkg").await.unwrap_err();
    assert_eq!(err.code, FlameErrorCode::InvalidConfig);
}

#[tokio::test]
#[serial]
async fn failed_registration_rolls_back_storage() {
    let deployment = deployment().await;
    let conn = deployment.cluster.connect().await;

    // Without the template application, deployment fails after upload...
    conn.unregister_application(FLMRUN_TEMPLATE).await.unwrap();
    let err = Runner::deploy(&deployment.context, "rollback").await.unwrap_err();
    assert_eq!(err.code, FlameErrorCode::Internal);
    assert!(err.message.contains(FLMRUN_TEMPLATE));

    // ...and both the stored and the local archive are rolled back.
    assert!(!deployment.storage_dir.path().join("rollback.tar.gz").exists());
    assert!(!deployment.project_dir.path().join("rollback.tar.gz").exists());
}
