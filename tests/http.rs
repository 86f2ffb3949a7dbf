#![cfg(unix)]

mod common;

use common::{fastq_reads, Sandbox};
use msianalyzer_web::server::{build_router, AppState};
use msianalyzer_web::Config;
use reqwest::multipart::{Form, Part};
use reqwest::{header, StatusCode};
use serde_json::Value;
use tokio::net::TcpListener;

async fn spawn_app(config: Config) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(AppState::new(config));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fastq_part(name: &str, reads: usize) -> Part {
    Part::bytes(fastq_reads(reads)).file_name(name.to_string())
}

fn analysis_form(name: &str, pileup: bool) -> Form {
    let form = Form::new()
        .text("marker", "BAT-26")
        .text("threads", "1")
        .text("run_tests", "on")
        .part("fastq", fastq_part(name, 100));
    if pileup {
        form.text("pileup_fastq", name.to_string())
    } else {
        form
    }
}

async fn submit(client: &reqwest::Client, base: &str, form: Form) -> (StatusCode, Value) {
    let resp = client.post(format!("{base}/v1/analyses")).multipart(form).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn analysis_is_created_and_downloadable() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();

    let (status, summary) = submit(&client, &base, analysis_form("S1_BAT26.fastq", true)).await;
    assert_eq!(status, StatusCode::CREATED, "{summary}");
    assert_eq!(summary["marker"], "BAT26");
    assert_eq!(summary["fastq_files"][0]["reads"], 100);
    assert_eq!(summary["steps"].as_array().unwrap().len(), 2);
    assert!(summary["steps"][0]["command"].as_str().unwrap().contains("--run-tests"));

    let artifacts = summary["artifacts"].as_array().unwrap();
    let kinds: Vec<&str> = artifacts.iter().map(|a| a["kind"].as_str().unwrap()).collect();
    assert!(kinds.contains(&"report"));
    assert!(kinds.contains(&"plot"));

    for artifact in artifacts {
        let url = format!("{base}{}", artifact["download_url"].as_str().unwrap());
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment"));
        let body = resp.bytes().await.unwrap();
        assert!(!body.is_empty());
        assert_eq!(body.len() as u64, artifact["size"].as_u64().unwrap());
    }

    let run_id = summary["run_id"].as_str().unwrap();
    let fetched: Value = client
        .get(format!("{base}/v1/runs/{run_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["artifacts"], summary["artifacts"]);
}

#[tokio::test]
async fn only_listed_outputs_are_served() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();
    let (_, summary) = submit(&client, &base, analysis_form("S1_BAT26.fastq", false)).await;
    let run_id = summary["run_id"].as_str().unwrap();

    for path in ["fastq/S1_BAT26.fastq", "manifest_runtime.json", "BAT26%2F..%2F..%2Fcalls.log"] {
        let resp = client
            .get(format!("{base}/v1/runs/{run_id}/files/{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "not_found");
    }

    let resp = client
        .get(format!("{base}/v1/runs/msianalyzer_nope/files/x.tsv"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_submissions_get_422_without_running() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();

    let (status, body) = submit(&client, &base, Form::new().text("marker", "BAT26")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "no_fastq_files");

    let form = Form::new().part("fastq", fastq_part("S1.fastq", 1));
    let (status, body) = submit(&client, &base, form).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "missing_marker_name");

    let form = analysis_form("S1.fastq", false).text("min_similarity", "high");
    let (status, body) = submit(&client, &base, form).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["detail"]["field"], "min_similarity");

    let form = Form::new()
        .text("marker", "BAT26")
        .part("fastq", Part::bytes(b"not a fastq".to_vec()).file_name("S1.fastq"));
    let (status, body) = submit(&client, &base, form).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "malformed_fastq");

    assert!(sandbox.calls().is_empty());
    assert!(sandbox.run_dirs().is_empty());
}

#[tokio::test]
async fn tool_failure_maps_to_bad_gateway() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();

    let (status, body) = submit(&client, &base, analysis_form("fail_S1.fastq", false)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "non_zero_exit");
    assert_eq!(body["error"]["details"]["exit_code"], 3);
    assert!(body["error"]["details"]["stderr"].as_str().unwrap().contains("boom"));
    assert!(sandbox.run_dirs().is_empty());
}

#[tokio::test]
async fn runs_can_be_cleared_and_are_evicted() {
    let sandbox = Sandbox::new();
    let config = Config {
        max_retained_runs: 1,
        ..sandbox.config()
    };
    let base = spawn_app(config).await;
    let client = reqwest::Client::new();

    let (_, first) = submit(&client, &base, analysis_form("S1.fastq", false)).await;
    let (_, second) = submit(&client, &base, analysis_form("S1.fastq", false)).await;
    let first_id = first["run_id"].as_str().unwrap();
    let second_id = second["run_id"].as_str().unwrap();
    assert_ne!(first_id, second_id);

    let resp = client.get(format!("{base}/v1/runs/{first_id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(sandbox.run_dirs().len(), 1);

    let resp = client.delete(format!("{base}/v1/runs/{second_id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = client.get(format!("{base}/v1/runs/{second_id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "run_not_found");
    assert!(sandbox.run_dirs().is_empty());
}

#[tokio::test]
async fn pileup_is_added_to_a_retained_run() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();
    let (_, summary) = submit(&client, &base, analysis_form("S1_BAT26.fastq", false)).await;
    let run_id = summary["run_id"].as_str().unwrap();
    assert_eq!(summary["artifacts"].as_array().unwrap().len(), 1);

    let resp = client
        .post(format!("{base}/v1/runs/{run_id}/pileup"))
        .form(&[("fastq", "S1_BAT26.fastq")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["steps"][1]["step"], "pileup");
    assert!(updated["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["kind"] == "plot"));

    let resp = client
        .post(format!("{base}/v1/runs/{run_id}/pileup"))
        .form(&[("fastq", "other.fastq")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn browsers_get_html_pages() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();

    let landing = client.get(format!("{base}/")).send().await.unwrap().text().await.unwrap();
    assert!(landing.contains("action=\"/v1/analyses\""));

    let resp = client
        .post(format!("{base}/v1/analyses"))
        .header(header::ACCEPT, "text/html")
        .multipart(analysis_form("S1_BAT26.fastq", false))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    let page = resp.text().await.unwrap();
    assert!(page.contains("BAT26_summary.tsv"));
    assert!(page.contains("Clear results"));

    let resp = client
        .post(format!("{base}/v1/analyses"))
        .header(header::ACCEPT, "text/html")
        .multipart(analysis_form("fail_S1.fastq", false))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert!(resp.text().await.unwrap().contains("Traceback"));
}

#[tokio::test]
async fn service_endpoints() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "ok");

    let ready = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    let ready: Value = ready.json().await.unwrap();
    assert_eq!(ready["msianalyzer"], "msianalyzer 0.0.0-fake");

    let markers: Value = client
        .get(format!("{base}/v1/markers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(markers["markers"].as_array().unwrap().len(), 5);
    assert_eq!(markers["markers"][1]["name"], "BAT26");

    let missing = Config {
        msianalyzer: sandbox.dir.path().join("bin/msianalyzer"),
        ..sandbox.config()
    };
    let base = spawn_app(missing).await;
    let ready = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn oversized_uploads_are_rejected() {
    let sandbox = Sandbox::new();
    let config = Config {
        max_upload_bytes: 1024,
        ..sandbox.config()
    };
    let base = spawn_app(config).await;
    let client = reqwest::Client::new();

    let (status, body) = submit(&client, &base, analysis_form("S1.fastq", false)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "payload_too_large");
    assert!(sandbox.calls().is_empty());
}

#[tokio::test]
async fn failed_pileup_keeps_the_retained_run() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();
    let form = analysis_form("S1_BAT26.fastq", false).part("fastq", fastq_part("broken_S2.fastq", 10));
    let (status, summary) = submit(&client, &base, form).await;
    assert_eq!(status, StatusCode::CREATED, "{summary}");
    let run_id = summary["run_id"].as_str().unwrap();

    let resp = client
        .post(format!("{base}/v1/runs/{run_id}/pileup"))
        .form(&[("fastq", "broken_S2.fastq")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "non_zero_exit");
    assert_eq!(body["error"]["details"]["step"], "pileup");
    assert_eq!(body["error"]["details"]["exit_code"], 4);

    let fetched: Value = client
        .get(format!("{base}/v1/runs/{run_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["artifacts"], summary["artifacts"]);
    assert_eq!(fetched["steps"], summary["steps"]);

    let report = summary["artifacts"][0]["download_url"].as_str().unwrap();
    let resp = client.get(format!("{base}{report}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_pileup_forms_get_json_errors() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();
    let (_, summary) = submit(&client, &base, analysis_form("S1_BAT26.fastq", false)).await;
    let run_id = summary["run_id"].as_str().unwrap();

    let resp = client
        .post(format!("{base}/v1/runs/{run_id}/pileup"))
        .form(&[("sample", "S1_BAT26.fastq")])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error(), "{}", resp.status());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_form");
    assert!(!body["error"]["message"].as_str().unwrap().is_empty());

    let resp = client
        .post(format!("{base}/v1/runs/{run_id}/pileup"))
        .body("fastq=S1_BAT26.fastq")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_form");
    assert_eq!(sandbox.calls().len(), 1);
}

#[tokio::test]
async fn large_reports_download_in_full() {
    let sandbox = Sandbox::new();
    let base = spawn_app(sandbox.config()).await;
    let client = reqwest::Client::new();
    let (status, summary) = submit(&client, &base, analysis_form("big_S1.fastq", false)).await;
    assert_eq!(status, StatusCode::CREATED, "{summary}");

    let artifact = &summary["artifacts"][0];
    let size = artifact["size"].as_u64().unwrap();
    assert!(size > 1024 * 1024, "{size}");

    let resp = client
        .get(format!("{base}{}", artifact["download_url"].as_str().unwrap()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_LENGTH].to_str().unwrap(), size.to_string());
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len() as u64, size);
    assert!(body.ends_with(b"200000\n"));
}
