use crate::task::{Task, TaskFields};
use directories::ProjectDirs;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, create_dir_all};
#[cfg(debug_assertions)]
use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter};
#[cfg(debug_assertions)]
use std::io::Write as IoWrite;
use std::path::PathBuf;

const TABLE: &str = "todos";
const SELECT_COLUMNS: &str = "id,created_at,job,assignor,jobdesc,deadline,finishdate";

#[cfg(debug_assertions)]
fn log_http_request(method: &str, url: &str, api_key: &str, body: Option<&str>) {
    let head = format!("[HTTP OUT] {} {}", method, url);
    log_to_file_line(&head);
    log_to_file_line(&format!("  apikey: {}", mask_key(api_key)));
    if let Some(b) = body {
        log_to_file_line(&format!("  Body: {}", truncate(b, 4000)));
    }
}

#[cfg(debug_assertions)]
fn log_http_response(status: u16, body: &str) {
    log_to_file_line(&format!("[HTTP IN] Status: {}", status));
    log_to_file_line(&format!("  Body: {}", truncate(body, 4000)));
}

#[cfg(debug_assertions)]
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", &s[..max], s.len() - max)
    }
}

#[cfg(not(debug_assertions))]
fn log_http_request(_method: &str, _url: &str, _api_key: &str, _body: Option<&str>) {}
#[cfg(not(debug_assertions))]
fn log_http_response(_status: u16, _body: &str) {}

#[cfg(debug_assertions)]
static INIT_LOG_ONCE: std::sync::Once = std::sync::Once::new();

#[cfg(debug_assertions)]
fn log_file_path() -> PathBuf {
    config_dir().join("store_debug.log")
}

#[cfg(debug_assertions)]
fn log_to_file_line(s: &str) {
    if let Ok(mut f) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path())
    {
        let _ = writeln!(f, "{}", s);
    }
}

#[cfg(debug_assertions)]
fn init_log_notice() {
    INIT_LOG_ONCE.call_once(|| {
        let path = log_file_path();
        log_to_file_line(&format!("Store debug logs -> {}", path.display()));
    });
}

/// Shorten an API key for log output so the log file never carries the
/// full secret.
#[allow(dead_code)]
fn mask_key(key: &str) -> String {
    if key.len() <= 10 {
        return "*****".to_string();
    }
    let head = &key[..6];
    let tail = &key[key.len() - 4..];
    format!("{}…{}", head, tail)
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    pub project_url: String,
    pub api_key: String,
}

pub fn config_dir() -> PathBuf {
    let dir = ProjectDirs::from("", "", "TaskDesk")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    create_dir_all(&dir).ok();
    dir
}

pub fn config_path() -> PathBuf {
    config_dir().join("store.json")
}

pub fn load_config() -> Option<StoreConfig> {
    let file = File::open(config_path()).ok()?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).ok()
}

pub fn save_config(cfg: &StoreConfig) -> Result<(), String> {
    let file = File::create(config_path())
        .map_err(|e| format!("Open store config failed: {}", e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, cfg)
        .map_err(|e| format!("Write store config failed: {}", e))
}

/// The remote persistence capability the controller talks to. One shared
/// implementation per session; tests substitute their own.
pub trait TaskStore {
    fn list_tasks(&self) -> Result<Vec<Task>, String>;
    fn insert_task(&self, fields: &TaskFields) -> Result<(), String>;
    fn update_task(&self, id: i64, fields: &TaskFields) -> Result<(), String>;
    fn delete_task(&self, id: i64) -> Result<(), String>;
}

pub struct StoreClient {
    pub base_url: String,
    pub api_key: String,
    pub client: Client,
}

impl StoreClient {
    pub fn from_config(cfg: &StoreConfig) -> Result<Self, String> {
        #[cfg(debug_assertions)]
        init_log_notice();
        if cfg.project_url.trim().is_empty() {
            return Err("Store project URL is empty".into());
        }
        if cfg.api_key.trim().is_empty() {
            return Err("Store API key is empty".into());
        }
        let client = Client::builder()
            .build()
            .map_err(|e| format!("HTTP client build failed: {}", e))?;
        Ok(Self {
            base_url: cfg.project_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.trim().to_string(),
            client,
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    fn collection_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    fn list_url(&self) -> String {
        format!(
            "{}?select={}&order=created_at.desc",
            self.collection_url(),
            SELECT_COLUMNS
        )
    }

    fn row_url(&self, id: i64) -> String {
        format!("{}?id=eq.{}", self.collection_url(), id)
    }
}

/// Pull the `message` field out of a PostgREST error body, falling back to
/// the raw text when the body is not the expected JSON shape.
fn response_message(text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        if let Some(msg) = v.get("message").and_then(|x| x.as_str()) {
            return msg.to_string();
        }
    }
    text.to_string()
}

impl TaskStore for StoreClient {
    fn list_tasks(&self) -> Result<Vec<Task>, String> {
        let url = self.list_url();
        log_http_request("GET", &url, &self.api_key, None);
        let resp = self
            .client
            .get(&url)
            .header("apikey", self.api_key.as_str())
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .map_err(|e| format!("GET {} failed: {}", url, e))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| format!("read {} failed: {}", url, e))?;
        log_http_response(status.as_u16(), &text);
        if !status.is_success() {
            return Err(format!(
                "List tasks failed: HTTP {} - {}",
                status,
                response_message(&text)
            ));
        }
        serde_json::from_str(&text).map_err(|e| format!("parse tasks failed: {}", e))
    }

    fn insert_task(&self, fields: &TaskFields) -> Result<(), String> {
        let url = self.collection_url();
        log_http_request(
            "POST",
            &url,
            &self.api_key,
            Some(&serde_json::to_string(fields).unwrap_or_default()),
        );
        let resp = self
            .client
            .post(&url)
            .header("apikey", self.api_key.as_str())
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("Prefer", "return=minimal")
            .header(CONTENT_TYPE, "application/json")
            .json(fields)
            .send()
            .map_err(|e| format!("POST {} failed: {}", url, e))?;
        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        log_http_response(status.as_u16(), &text);
        if !status.is_success() {
            return Err(format!(
                "Create task failed: HTTP {} - {}",
                status,
                response_message(&text)
            ));
        }
        Ok(())
    }

    fn update_task(&self, id: i64, fields: &TaskFields) -> Result<(), String> {
        let url = self.row_url(id);
        log_http_request(
            "PATCH",
            &url,
            &self.api_key,
            Some(&serde_json::to_string(fields).unwrap_or_default()),
        );
        let resp = self
            .client
            .patch(&url)
            .header("apikey", self.api_key.as_str())
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("Prefer", "return=minimal")
            .header(CONTENT_TYPE, "application/json")
            .json(fields)
            .send()
            .map_err(|e| format!("PATCH {} failed: {}", url, e))?;
        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        log_http_response(status.as_u16(), &text);
        if !status.is_success() {
            return Err(format!(
                "Update task failed: HTTP {} - {}",
                status,
                response_message(&text)
            ));
        }
        Ok(())
    }

    fn delete_task(&self, id: i64) -> Result<(), String> {
        let url = self.row_url(id);
        log_http_request("DELETE", &url, &self.api_key, None);
        let resp = self
            .client
            .delete(&url)
            .header("apikey", self.api_key.as_str())
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .map_err(|e| format!("DELETE {} failed: {}", url, e))?;
        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        log_http_response(status.as_u16(), &text);
        if !status.is_success() {
            return Err(format!(
                "Delete task failed: HTTP {} - {}",
                status,
                response_message(&text)
            ));
        }
        Ok(())
    }
}
