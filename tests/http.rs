use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct CheckInResponse {
    id: u64,
    user_id: String,
    mood: u8,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreakResponse {
    length: u32,
}

#[derive(Debug, Deserialize)]
struct ShareResponse {
    percentage: u8,
}

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    streak: Option<StreakResponse>,
    trend: Vec<serde_json::Value>,
    average_mood: Option<f64>,
    distribution: BTreeMap<String, ShareResponse>,
    total_check_ins: usize,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("mood_ledger_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_mood_ledger"))
        .env("HOST", "127.0.0.1")
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

#[tokio::test]
async fn http_create_then_list_and_today() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/checkins", server.base_url))
        .json(&serde_json::json!({ "user_id": "http-ana", "mood": 4, "notes": "ran 5k" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let created: CheckInResponse = response.json().await.unwrap();
    assert_eq!(created.user_id, "http-ana");
    assert_eq!(created.mood, 4);
    assert_eq!(created.notes.as_deref(), Some("ran 5k"));

    let listed: Vec<CheckInResponse> = client
        .get(format!("{}/api/checkins?user_id=http-ana&limit=5", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.first().map(|c| c.id), Some(created.id));

    let today: Option<CheckInResponse> = client
        .get(format!("{}/api/checkins/today?user_id=http-ana", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(today.map(|c| c.id), Some(created.id));
}

#[tokio::test]
async fn http_rejects_out_of_range_mood() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/checkins", server.base_url))
        .json(&serde_json::json!({ "user_id": "http-ben", "mood": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let listed: Vec<CheckInResponse> = client
        .get(format!("{}/api/checkins?user_id=http-ben", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn http_dashboard_aggregates_recent_check_ins() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let empty: DashboardResponse = client
        .get(format!("{}/api/dashboard?user_id=http-cy", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(empty.streak.is_none());
    assert!(empty.average_mood.is_none());
    assert!(empty.distribution.is_empty());

    for _ in 0..4 {
        let response = client
            .post(format!("{}/api/checkins", server.base_url))
            .json(&serde_json::json!({ "user_id": "http-cy", "mood": 4 }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    let dashboard: DashboardResponse = client
        .get(format!("{}/api/dashboard?user_id=http-cy", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard.streak.map(|s| s.length), Some(1));
    assert_eq!(dashboard.trend.len(), 4);
    assert_eq!(dashboard.average_mood, Some(4.0));
    assert_eq!(dashboard.distribution.len(), 1);
    assert_eq!(dashboard.distribution["4"].percentage, 100);
    assert_eq!(dashboard.total_check_ins, 4);
}
