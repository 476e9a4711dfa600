//! 端到端链运行：浏览器和 LLM 使用预设替身，下载和提交走本地 fixture 服务器的真实 HTTP

use std::collections::{HashMap, VecDeque};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use quiz_solver::config::ConfigSource;
use quiz_solver::infrastructure::{build_http_client, BrowserLauncher, PageRenderer};
use quiz_solver::services::{
    DefaultSummarizer, FileFetcher, HttpFileFetcher, HttpSubmitter, LlmGateway, SubmissionPayload,
    Submitter,
};
use quiz_solver::{Answer, ChainController, ChainStatus, Config, QuizStepExecutor, StepError, StepServices};

const CONFIG_TOML: &str = r#"
email = "student@example.com"
secret = "s3cret"
llm_api_key = "sk-test"
step_delay_ms = 0
render_settle_ms = 0
http_timeout_secs = 5
"#;

const SALES_CSV: &str = "region,amount\nnorth,10\nsouth,20\neast,30\n";

// ---------- fixture 服务器 ----------

struct Fixture {
    base: String,
    submissions: Mutex<Vec<Value>>,
}

impl Fixture {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn submissions(&self) -> Vec<Value> {
        self.submissions.lock().unwrap().clone()
    }
}

async fn sales_csv() -> HttpResponse {
    HttpResponse::Ok().content_type("text/csv").body(SALES_CSV)
}

/// 按题目 URL 评分：q1 指向 q2，q2 结束链
async fn submit(fixture: web::Data<Fixture>, body: web::Json<Value>) -> HttpResponse {
    let body = body.into_inner();
    let quiz_url = body["url"].as_str().unwrap_or_default().to_string();
    fixture.submissions.lock().unwrap().push(body);

    if quiz_url.ends_with("/q1") {
        HttpResponse::Ok().json(json!({ "correct": true, "url": fixture.url("/q2") }))
    } else {
        HttpResponse::Ok().json(json!({ "correct": true }))
    }
}

async fn unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().finish()
}

async fn verdict_without_correct() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "url": "https://x/next" }))
}

fn start_fixture() -> Arc<Fixture> {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let fixture = Arc::new(Fixture {
        base: format!("http://{}", listener.local_addr().unwrap()),
        submissions: Mutex::new(Vec::new()),
    });

    let data = web::Data::from(fixture.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/files/sales.csv", web::get().to(sales_csv))
            .route("/submit", web::post().to(submit))
            .route("/unavailable", web::post().to(unavailable))
            .route("/no-verdict", web::post().to(verdict_without_correct))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    actix_rt::spawn(server);

    fixture
}

// ---------- 预设的浏览器和 LLM ----------

struct FakeRenderer {
    pages: HashMap<String, String>,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render_text(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("navigation to {} failed", url))
    }

    async fn shutdown(&mut self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeLauncher {
    pages: HashMap<String, String>,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageRenderer>> {
        Ok(Box::new(FakeRenderer {
            pages: self.pages.clone(),
            shutdowns: self.shutdowns.clone(),
        }))
    }
}

struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmGateway for ScriptedLlm {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str, _deterministic: bool) -> Result<String> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted reply left"))
    }
}

struct Harness {
    controller: ChainController,
    solver: Arc<ScriptedLlm>,
    shutdowns: Arc<AtomicUsize>,
}

fn harness(fixture: &Fixture, extractions: &[&str], answers: &[&str]) -> Harness {
    let source = ConfigSource::new("chain_flow.toml", CONFIG_TOML);
    let config = Config::resolve(Some(&source), |_| None).unwrap();
    let http = build_http_client(config.http_timeout).unwrap();

    let solver = Arc::new(ScriptedLlm::new(answers));
    let services = StepServices {
        extractor_llm: Arc::new(ScriptedLlm::new(extractions)),
        solver_llm: solver.clone(),
        fetcher: Arc::new(HttpFileFetcher::new(http.clone())),
        summarizer: Arc::new(DefaultSummarizer),
        submitter: Arc::new(HttpSubmitter::new(http)),
    };

    let shutdowns = Arc::new(AtomicUsize::new(0));
    let pages = HashMap::from([
        (fixture.url("/q1"), "Q1. What is 2+2? Post your answer to /submit".to_string()),
        (fixture.url("/q2"), "Q2. Sum the amount column of sales.csv".to_string()),
    ]);
    let launcher = Arc::new(FakeLauncher {
        pages,
        shutdowns: shutdowns.clone(),
    });

    let controller = ChainController::new(
        launcher,
        Arc::new(QuizStepExecutor::new(&config, services)),
        config.chain_budget,
        config.step_delay,
    );
    Harness {
        controller,
        solver,
        shutdowns,
    }
}

// ---------- 链场景 ----------

#[actix_rt::test]
async fn test_chain_runs_to_completion() {
    let fixture = start_fixture();
    let q1_extraction = json!({
        "question": "2+2?",
        "submit_url": "/submit",
        "file_urls": [],
        "instructions": ""
    })
    .to_string();
    let q2_extraction = format!(
        "```json\n{}\n```",
        json!({
            "question": "What is the total amount?",
            "submit_url": fixture.url("/submit"),
            "file_urls": ["files/missing.csv", fixture.url("/files/sales.csv")],
            "instructions": "Return an integer"
        })
    );
    let h = harness(
        &fixture,
        &[&q1_extraction, &q2_extraction],
        &["ANSWER: 4", "north + south + east = 60\nANSWER: 60"],
    );

    let report = h.controller.run(&fixture.url("/q1")).await;

    assert_eq!(report.status, ChainStatus::Completed);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.last_url, Some(fixture.url("/q2")));
    assert_eq!(h.shutdowns.load(Ordering::SeqCst), 1);

    let submissions = fixture.submissions();
    assert_eq!(
        submissions,
        vec![
            json!({
                "email": "student@example.com",
                "secret": "s3cret",
                "url": fixture.url("/q1"),
                "answer": 4
            }),
            json!({
                "email": "student@example.com",
                "secret": "s3cret",
                "url": fixture.url("/q2"),
                "answer": 60
            }),
        ]
    );

    // 缺失的文件被跳过，另一个送到解答模型
    let prompts = h.solver.prompts();
    assert!(prompts[0].contains("Downloaded files: 0"));
    assert!(prompts[1].contains("Downloaded files: 1"));
    assert!(prompts[1].contains("sales.csv:\nCSV Analysis:"));
    assert!(prompts[1].contains("- amount: count=3 sum=60"));
}

#[actix_rt::test]
async fn test_invalid_extraction_stops_chain() {
    let fixture = start_fixture();
    let h = harness(&fixture, &["{\"question\": \"2+2?\", \"submit_url\": "], &["ANSWER: 4"]);

    let report = h.controller.run(&fixture.url("/q1")).await;

    assert!(matches!(report.status, ChainStatus::StepFailed(StepError::Extraction(_))));
    assert_eq!(report.attempts, 1);
    assert!(fixture.submissions().is_empty());
    assert!(h.solver.prompts().is_empty());
    assert_eq!(h.shutdowns.load(Ordering::SeqCst), 1);
}

#[actix_rt::test]
async fn test_unrenderable_page_stops_chain() {
    let fixture = start_fixture();
    let h = harness(&fixture, &[], &[]);

    let report = h.controller.run(&fixture.url("/nowhere")).await;

    assert!(matches!(report.status, ChainStatus::StepFailed(StepError::Render(_))));
    assert_eq!(report.attempts, 1);
    assert_eq!(h.shutdowns.load(Ordering::SeqCst), 1);
}

// ---------- HTTP 适配器 ----------

#[actix_rt::test]
async fn test_fetcher_downloads_file() {
    let fixture = start_fixture();
    let fetcher = HttpFileFetcher::new(build_http_client(std::time::Duration::from_secs(5)).unwrap());

    let file = assert_ok!(fetcher.fetch(&fixture.url("/files/sales.csv?v=2")).await);

    assert_eq!(file.filename, "sales.csv");
    assert_eq!(file.byte_size, SALES_CSV.len());
    assert!(file.content_type.starts_with("text/csv"));
    assert_eq!(file.preview.as_deref(), Some(SALES_CSV));
}

#[actix_rt::test]
async fn test_fetcher_rejects_missing_file() {
    let fixture = start_fixture();
    let fetcher = HttpFileFetcher::new(build_http_client(std::time::Duration::from_secs(5)).unwrap());

    let err = assert_err!(fetcher.fetch(&fixture.url("/files/missing.csv")).await);

    assert!(err.to_string().contains("404"), "unexpected error: {}", err);
}

#[actix_rt::test]
async fn test_submitter_error_statuses_and_bad_verdicts() {
    let fixture = start_fixture();
    let submitter = HttpSubmitter::new(build_http_client(std::time::Duration::from_secs(5)).unwrap());
    let answer = Answer::Text("Paris".to_string());
    let payload = SubmissionPayload {
        email: "student@example.com",
        secret: "s3cret",
        url: "https://x/q1",
        answer: &answer,
    };

    let unavailable = submitter.submit(&fixture.url("/unavailable"), &payload).await;
    assert!(unavailable.unwrap_err().to_string().contains("503"));

    assert_err!(submitter.submit(&fixture.url("/no-verdict"), &payload).await);

    let graded = assert_ok!(submitter.submit(&fixture.url("/submit"), &payload).await);
    assert!(graded.correct);
    assert!(graded.next_url.is_none());
    assert_eq!(fixture.submissions()[0]["answer"], "Paris");
}
