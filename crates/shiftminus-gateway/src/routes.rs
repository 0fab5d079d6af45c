//! API route handlers for the gateway.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDate, NaiveTime};
use shiftminus_core::config::GatewayConfig;
use shiftminus_core::types::Department;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::server::AppState;

fn failure(error: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": false, "error": error.to_string()}))
}

fn parse_date(value: &serde_json::Value, field: &str) -> Result<NaiveDate, String> {
    let raw = value[field].as_str().unwrap_or("");
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("'{field}' must be a YYYY-MM-DD date, got '{raw}'"))
}

fn parse_time(value: &serde_json::Value, field: &str) -> Result<NaiveTime, String> {
    let raw = value[field].as_str().unwrap_or("");
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| format!("'{field}' must be an HH:MM time, got '{raw}'"))
}

fn parse_count(value: &serde_json::Value, field: &str) -> Result<u32, String> {
    value[field]
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| format!("'{field}' must be a non-negative integer"))
}

fn parse_slot(body: &serde_json::Value) -> Result<(NaiveDate, NaiveTime, NaiveTime, u32), String> {
    Ok((
        parse_date(body, "date")?,
        parse_time(body, "start")?,
        parse_time(body, "end")?,
        parse_count(body, "count")?,
    ))
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "shiftminus-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Program and arguments for the notify job. Without `job_command` the
/// running binary is re-executed, forwarding `--config` when one was given.
pub fn job_invocation(
    config: &GatewayConfig,
    config_path: Option<&std::path::Path>,
) -> std::io::Result<(PathBuf, Vec<String>)> {
    let (program, mut args) = match &config.job_command {
        Some(command) => (PathBuf::from(command), Vec::new()),
        None => {
            let mut args = Vec::new();
            if let Some(path) = config_path {
                args.push("--config".to_string());
                args.push(path.display().to_string());
            }
            (std::env::current_exe()?, args)
        }
    };
    args.extend(config.job_args.iter().cloned());
    Ok((program, args))
}

/// Run the notify job as a child process and hand back its output.
pub async fn run_notify(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let (program, args) = match job_invocation(&state.gateway_config, state.config_path.as_deref()) {
        Ok(invocation) => invocation,
        Err(e) => {
            return Json(serde_json::json!({"status": "error", "message": e.to_string()}));
        }
    };

    tracing::info!("🚀 Spawning notify job: {} {}", program.display(), args.join(" "));
    match tokio::process::Command::new(&program).args(&args).output().await {
        Ok(output) => {
            tracing::info!("✅ Notify job exited with {}", output.status);
            Json(serde_json::json!({
                "status": "ok",
                "stdout": String::from_utf8_lossy(&output.stdout),
                "stderr": String::from_utf8_lossy(&output.stderr),
            }))
        }
        Err(e) => {
            tracing::error!("❌ Failed to spawn notify job: {e}");
            Json(serde_json::json!({"status": "error", "message": e.to_string()}))
        }
    }
}

/// Open shortfalls for `?department=`.
pub async fn list_shortfalls(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let Some(raw) = params.get("department") else {
        return failure("'department' query parameter is required");
    };
    let department = match raw.parse::<Department>() {
        Ok(d) => d,
        Err(e) => return failure(e),
    };
    let today = state.services.config.today();
    match state.desk.open_for(department, today).await {
        Ok(records) => Json(serde_json::json!({
            "ok": true,
            "department": department,
            "shortfalls": records,
            "count": records.len(),
        })),
        Err(e) => failure(e),
    }
}

/// Register a shortfall.
pub async fn add_shortfall(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let category = body["category"].as_str().unwrap_or("");
    let (date, start, end, count) = match parse_slot(&body) {
        Ok(fields) => fields,
        Err(e) => return failure(e),
    };
    match state.desk.register(category, date, start, end, count).await {
        Ok(shortfall) => Json(serde_json::json!({"ok": true, "shortfall": shortfall})),
        Err(e) => failure(e),
    }
}

/// Record helpers found for a shortfall.
pub async fn fill_shortfall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let (remaining, filled) = match (parse_count(&body, "remaining"), parse_count(&body, "filled")) {
        (Ok(remaining), Ok(filled)) => (remaining, filled),
        (Err(e), _) | (_, Err(e)) => return failure(e),
    };
    match state.desk.fill(id, remaining, filled).await {
        Ok(outcome) => Json(serde_json::json!({"ok": true, "id": id, "result": outcome})),
        Err(e) => failure(e),
    }
}

/// Push the department's open list to its group.
pub async fn send_notice(
    State(state): State<Arc<AppState>>,
    Path(department): Path<String>,
) -> Json<serde_json::Value> {
    let department = match department.parse::<Department>() {
        Ok(d) => d,
        Err(e) => return failure(e),
    };
    let today = state.services.config.today();
    match state.desk.send_notice(department, today).await {
        Ok(Some(delivery)) => Json(serde_json::json!({
            "ok": delivery.is_sent(),
            "sent": true,
            "delivery": delivery,
        })),
        Ok(None) => Json(serde_json::json!({"ok": true, "sent": false})),
        Err(e) => failure(e),
    }
}

/// Current deadline state.
pub async fn get_deadline(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let today = state.services.config.today();
    match state.desk.deadline(today).await {
        Ok(deadline) => Json(serde_json::json!({
            "ok": true,
            "deadline": deadline,
            "days_left": deadline.days_left(today),
        })),
        Err(e) => failure(e),
    }
}

/// Replace the deadline.
pub async fn set_deadline(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let date = match parse_date(&body, "deadline") {
        Ok(d) => d,
        Err(e) => return failure(e),
    };
    match state.desk.set_deadline(date).await {
        Ok(()) => Json(serde_json::json!({"ok": true, "deadline": date})),
        Err(e) => failure(e),
    }
}

/// Announce the current deadline to the deadline group.
pub async fn announce_deadline(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let today = state.services.config.today();
    match state.desk.announce_deadline(today).await {
        Ok(Some(delivery)) => Json(serde_json::json!({
            "ok": delivery.is_sent(),
            "delivery": delivery,
        })),
        Ok(None) => failure("no submission deadline is set"),
        Err(e) => failure(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Days;
    use shiftminus_core::config::ShiftConfig;
    use shiftminus_core::traits::Messenger;
    use shiftminus_core::types::{Delivery, PushTarget};
    use shiftminus_scheduler::Services;
    use shiftminus_store::MemoryStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<String>>);

    #[async_trait]
    impl Messenger for Outbox {
        async fn send(&self, _target: &PushTarget, text: &str) -> Delivery {
            self.0.lock().unwrap().push(text.to_string());
            Delivery::Sent { attempts: 1 }
        }

        fn channel_name(&self) -> &str {
            "outbox"
        }
    }

    struct Fixture {
        state: Arc<AppState>,
        store: Arc<MemoryStore>,
        outbox: Arc<Outbox>,
    }

    fn fixture(mut config: ShiftConfig) -> Fixture {
        config.line.sales.group_id = "G-sales".into();
        config.line.sales.access_token = "tok".into();
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox::default());
        let services = Services::new(config, store.clone(), store.clone(), outbox.clone());
        Fixture {
            state: Arc::new(AppState::new(services, None)),
            store,
            outbox,
        }
    }

    fn today(f: &Fixture) -> NaiveDate {
        f.state.services.config.today()
    }

    fn query(pairs: &[(&str, &str)]) -> Query<HashMap<String, String>> {
        Query(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    // ---- Health & trigger ----

    #[tokio::test]
    async fn test_health_check() {
        let f = fixture(ShiftConfig::default());
        let json = health_check(State(f.state)).await.0;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_run_notify_captures_output() {
        let mut config = ShiftConfig::default();
        config.gateway.job_command = Some("echo".into());
        config.gateway.job_args = vec!["hello".into()];
        let f = fixture(config);

        let json = run_notify(State(f.state)).await.0;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["stdout"], "hello\n");
        assert_eq!(json["stderr"], "");
    }

    #[tokio::test]
    async fn test_run_notify_spawn_failure() {
        let mut config = ShiftConfig::default();
        config.gateway.job_command = Some("/nonexistent/shiftminus-job".into());
        let f = fixture(config);

        let json = run_notify(State(f.state)).await.0;
        assert_eq!(json["status"], "error");
        assert!(json["message"].as_str().is_some());
    }

    #[test]
    fn test_job_invocation_forwards_config_path() {
        let config = GatewayConfig::default();
        let path = std::path::Path::new("/etc/shiftminus/config.toml");
        let (program, args) = job_invocation(&config, Some(path)).unwrap();
        assert_eq!(program, std::env::current_exe().unwrap());
        assert_eq!(args, ["--config", "/etc/shiftminus/config.toml", "notify"]);
    }

    #[test]
    fn test_job_invocation_without_config_path() {
        let config = GatewayConfig::default();
        let (program, args) = job_invocation(&config, None).unwrap();
        assert_eq!(program, std::env::current_exe().unwrap());
        assert_eq!(args, ["notify"]);
    }

    #[test]
    fn test_job_invocation_custom_command_skips_config() {
        let config = GatewayConfig {
            job_command: Some("/usr/local/bin/notify-job".into()),
            job_args: vec!["--once".into()],
            ..GatewayConfig::default()
        };
        let path = std::path::Path::new("/etc/shiftminus/config.toml");
        let (program, args) = job_invocation(&config, Some(path)).unwrap();
        assert_eq!(program, PathBuf::from("/usr/local/bin/notify-job"));
        assert_eq!(args, ["--once"]);
    }

    // ---- Shortfalls ----

    #[tokio::test]
    async fn test_add_and_list_shortfalls() {
        let f = fixture(ShiftConfig::default());
        let date = today(&f).format("%Y-%m-%d").to_string();
        let body = serde_json::json!({
            "category": "販売", "date": date, "start": "09:00", "end": "13:00", "count": 2
        });
        let json = add_shortfall(State(f.state.clone()), Json(body)).await.0;
        assert_eq!(json["ok"], true);
        assert_eq!(json["shortfall"]["time_range"], "09:00〜13:00");

        let json = list_shortfalls(State(f.state.clone()), query(&[("department", "sales")])).await.0;
        assert_eq!(json["ok"], true);
        assert_eq!(json["count"], 1);
        assert_eq!(json["shortfalls"][0]["minus_count"], 2);
    }

    #[tokio::test]
    async fn test_add_shortfall_rejects_bad_time() {
        let f = fixture(ShiftConfig::default());
        let body = serde_json::json!({
            "category": "販売", "date": "2025-07-10", "start": "9am", "end": "13:00", "count": 1
        });
        let json = add_shortfall(State(f.state), Json(body)).await.0;
        assert_eq!(json["ok"], false);
        assert!(f.store.shortfall_rows().is_empty());
    }

    #[tokio::test]
    async fn test_list_requires_valid_department() {
        let f = fixture(ShiftConfig::default());
        let json = list_shortfalls(State(f.state.clone()), query(&[])).await.0;
        assert_eq!(json["ok"], false);
        let json = list_shortfalls(State(f.state), query(&[("department", "hr")])).await.0;
        assert_eq!(json["ok"], false);
    }

    #[tokio::test]
    async fn test_fill_shortfall() {
        let f = fixture(ShiftConfig::default());
        let id = f.store.seed_shortfall("製造", "07/10", today(&f), "09:00〜13:00", 2);

        let body = serde_json::json!({"remaining": 2, "filled": 1});
        let json = fill_shortfall(State(f.state.clone()), Path(id), Json(body)).await.0;
        assert_eq!(json["ok"], true);
        assert_eq!(json["result"]["outcome"], "remaining");
        assert_eq!(json["result"]["remaining"], 1);

        let body = serde_json::json!({"remaining": 1, "filled": 5});
        let json = fill_shortfall(State(f.state), Path(id), Json(body)).await.0;
        assert_eq!(json["ok"], false);
        assert_eq!(f.store.shortfall_rows()[0].minus_count, 1);
    }

    #[tokio::test]
    async fn test_send_notice() {
        let f = fixture(ShiftConfig::default());
        let json = send_notice(State(f.state.clone()), Path("販売".into())).await.0;
        assert_eq!(json["sent"], false);

        f.store.seed_shortfall("販売", "12/31", today(&f) + Days::new(30), "09:00〜13:00", 1);
        let json = send_notice(State(f.state), Path("sales".into())).await.0;
        assert_eq!(json["ok"], true);
        assert_eq!(json["sent"], true);
        assert_eq!(f.outbox.0.lock().unwrap().len(), 1);
    }

    // ---- Deadline ----

    #[tokio::test]
    async fn test_deadline_endpoints() {
        let f = fixture(ShiftConfig::default());
        let json = get_deadline(State(f.state.clone())).await.0;
        assert_eq!(json["deadline"]["state"], "absent");

        let json = announce_deadline(State(f.state.clone())).await.0;
        assert_eq!(json["ok"], false);

        let date = today(&f) + Days::new(5);
        let body = serde_json::json!({"deadline": date.format("%Y-%m-%d").to_string()});
        let json = set_deadline(State(f.state.clone()), Json(body)).await.0;
        assert_eq!(json["ok"], true);

        let json = get_deadline(State(f.state.clone())).await.0;
        assert_eq!(json["deadline"]["state"], "active");
        assert_eq!(json["days_left"], 5);

        let json = announce_deadline(State(f.state)).await.0;
        assert_eq!(json["ok"], true);
        assert!(f.outbox.0.lock().unwrap()[0].starts_with("⚠️シフト提出締切日は"));
    }
}
