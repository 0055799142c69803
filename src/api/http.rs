use super::types::{
    Checkin, ClosedKind, Column, Folder, Habit, Project, ProjectData, Tag, Task,
};
use super::TickTickApi;
use crate::config::{Credentials, Host, Settings};
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use rand::Rng;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

const BROWSER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/117.0";
const ERROR_BODY_LIMIT: usize = 200;

/// Which TickTick API family a request goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Api {
    /// OAuth-protected open API
    Open,
    /// Session-authenticated web API
    Web,
}

/// Blocking HTTP implementation of [`TickTickApi`]
///
/// Project CRUD and single-task operations use the open API with the bearer
/// token. Everything the open API lacks (sync, batch moves, tags, habits,
/// folders, columns, statistics) uses the web API, which needs a session
/// obtained by signing in with username and password. The session is fetched
/// lazily on the first web request.
pub struct HttpClient {
    client: Client,
    host: Host,
    timeout_secs: u64,
    credentials: Credentials,
    device_id: String,
    session: OnceCell<String>,
}

impl HttpClient {
    pub fn new(settings: &Settings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::config_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            host: settings.host,
            timeout_secs: settings.timeout.as_secs(),
            credentials: settings.credentials.clone(),
            device_id: object_id(),
            session: OnceCell::new(),
        })
    }

    fn base(&self, api: Api) -> String {
        match api {
            Api::Open => self.host.open_api_base(),
            Api::Web => self.host.web_api_base(),
        }
    }

    fn url(&self, api: Api, path: &str) -> AppResult<Url> {
        Ok(Url::parse(&self.base(api))?.join(path)?)
    }

    fn x_device(&self) -> String {
        json!({
            "platform": "web",
            "os": "macOS 10.15.7",
            "device": "Firefox 117.0",
            "name": "",
            "version": 6070,
            "id": self.device_id,
            "channel": "website",
            "campaign": "",
            "websocket": "",
        })
        .to_string()
    }

    fn web_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
        headers.insert(
            "X-Device",
            HeaderValue::from_str(&self.x_device())
                .map_err(|e| AppError::config_with_source("Invalid device header", e))?,
        );
        Ok(headers)
    }

    fn access_token(&self) -> AppResult<&str> {
        self.credentials
            .access_token
            .as_deref()
            .ok_or_else(|| AppError::missing_credentials(["TICKTICK_ACCESS_TOKEN"]))
    }

    fn session_token(&self) -> AppResult<&str> {
        self.session
            .get_or_try_init(|| self.sign_on())
            .map(String::as_str)
    }

    fn sign_on(&self) -> AppResult<String> {
        let mut missing = Vec::new();
        if self.credentials.username.is_none() {
            missing.push("TICKTICK_USERNAME");
        }
        if self.credentials.password.is_none() {
            missing.push("TICKTICK_PASSWORD");
        }
        if !missing.is_empty() {
            return Err(AppError::missing_credentials(missing));
        }

        let mut url = self.url(Api::Web, "user/signon")?;
        url.query_pairs_mut()
            .append_pair("wc", "true")
            .append_pair("remember", "true");
        debug!("signing in to {}", self.host.domain());

        let request = self
            .client
            .post(url.clone())
            .headers(self.web_headers()?)
            .json(&json!({
                "username": self.credentials.username,
                "password": self.credentials.password,
            }));
        let body: Value = self.send_json(request, "POST", &url)?;
        body.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::api_response("sign-on response carried no session token"))
    }

    fn request(&self, api: Api, method: Method, path: &str) -> AppResult<(RequestBuilder, Url)> {
        let url = self.url(api, path)?;
        let builder = self.client.request(method, url.clone());
        let builder = match api {
            Api::Open => builder.header(AUTHORIZATION, format!("Bearer {}", self.access_token()?)),
            Api::Web => builder
                .headers(self.web_headers()?)
                .header(COOKIE, format!("t={}", self.session_token()?)),
        };
        Ok((builder, url))
    }

    fn execute(&self, request: RequestBuilder, method: &str, url: &Url) -> AppResult<Response> {
        debug!(method, path = url.path(), "sending request");
        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                AppError::NetworkTimeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                AppError::HttpRequest {
                    method: method.to_string(),
                    url: url.path().to_string(),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(AppError::HttpStatus {
            status_code: status.as_u16(),
            reason: error_reason(status, &body),
        })
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        url: &Url,
    ) -> AppResult<T> {
        let response = self.execute(request, method, url)?;
        let text = response.text().map_err(|e| AppError::HttpRequest {
            method: method.to_string(),
            url: url.path().to_string(),
            source: Some(Box::new(e)),
        })?;
        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| {
            AppError::api_response(format!("could not decode {} response: {e}", url.path()))
        })
    }

    fn get<T: DeserializeOwned>(&self, api: Api, path: &str) -> AppResult<T> {
        let (request, url) = self.request(api, Method::GET, path)?;
        self.send_json(request, "GET", &url)
    }

    fn get_query<T: DeserializeOwned>(&self, api: Api, path: &str, query: &[(&str, String)]) -> AppResult<T> {
        let (request, url) = self.request(api, Method::GET, path)?;
        self.send_json(request.query(query), "GET", &url)
    }

    fn send_body<T: DeserializeOwned>(
        &self,
        api: Api,
        method: Method,
        path: &str,
        body: &Value,
    ) -> AppResult<T> {
        let label = method.as_str().to_string();
        let (request, url) = self.request(api, method, path)?;
        info!(method = %label, path = url.path(), "mutating request");
        self.send_json(request.json(body), &label, &url)
    }

    fn send_empty(&self, api: Api, method: Method, path: &str) -> AppResult<()> {
        let label = method.as_str().to_string();
        let (request, url) = self.request(api, method, path)?;
        info!(method = %label, path = url.path(), "mutating request");
        self.execute(request, &label, &url).map(|_| ())
    }

    /// Post to a web-API batch endpoint and surface per-id failures
    fn batch(&self, path: &str, body: Value, id: &str) -> AppResult<Value> {
        let response: Value = self.send_body(Api::Web, Method::POST, path, &body)?;
        check_batch(&response, id)?;
        Ok(response)
    }

    fn has_session_credentials(&self) -> bool {
        self.credentials.username.is_some() && self.credentials.password.is_some()
    }
}

/// 24-hex-digit identifier in the format the web API expects for new objects
fn object_id() -> String {
    let mut rng = rand::thread_rng();
    (0..24)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}

fn error_reason(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    let reason = status.canonical_reason().unwrap_or("unknown status");
    if body.is_empty() {
        return reason.to_string();
    }
    let truncated: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    if truncated.len() < body.len() {
        format!("{reason}: {truncated}...")
    } else {
        format!("{reason}: {truncated}")
    }
}

/// Batch endpoints answer 200 even when an item failed; failures are listed in
/// `id2error`.
fn check_batch(response: &Value, id: &str) -> AppResult<()> {
    match response.get("id2error").and_then(|errors| errors.get(id)) {
        Some(error) if !error.is_null() => Err(AppError::api_response(format!(
            "{id} was rejected: {}",
            error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string())
        ))),
        _ => Ok(()),
    }
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::api_response(format!("unexpected {what} payload: {e}")))
}

fn list_field<T: DeserializeOwned>(state: &Value, pointer: &str, what: &str) -> AppResult<Vec<T>> {
    match state.pointer(pointer) {
        Some(Value::Array(items)) => decode(Value::Array(items.clone()), what),
        _ => Ok(Vec::new()),
    }
}

fn closed_window(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

impl TickTickApi for HttpClient {
    fn inbox_id(&self) -> AppResult<String> {
        let status = self.user_status()?;
        status
            .get("inboxId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::api_response("user status carried no inboxId"))
    }

    fn user_profile(&self) -> AppResult<Value> {
        self.get(Api::Web, "user/profile")
    }

    fn user_status(&self) -> AppResult<Value> {
        self.get(Api::Web, "user/status")
    }

    fn user_statistics(&self) -> AppResult<Value> {
        self.get(Api::Web, "statistics/general")
    }

    fn user_preferences(&self) -> AppResult<Value> {
        self.get_query(
            Api::Web,
            "user/preferences/settings",
            &[("includeWeb", "true".to_string())],
        )
    }

    fn sync_state(&self) -> AppResult<Value> {
        self.get(Api::Web, "batch/check/0")
    }

    fn get_task(&self, task_id: &str, project_id: Option<&str>) -> AppResult<Option<Task>> {
        let result: AppResult<Value> = match project_id {
            Some(project_id) if self.credentials.access_token.is_some() => {
                self.get(Api::Open, &format!("project/{project_id}/task/{task_id}"))
            }
            _ => self.get(Api::Web, &format!("task/{task_id}")),
        };
        match result {
            Ok(Value::Null) => Ok(None),
            Ok(value) => decode(value, "task").map(Some),
            Err(AppError::HttpStatus { status_code: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_tasks(&self) -> AppResult<Vec<Task>> {
        if !self.has_session_credentials() && self.credentials.access_token.is_some() {
            // Open API only: walk every project plus the inbox alias
            let mut tasks = Vec::new();
            let mut ids = vec!["inbox".to_string()];
            ids.extend(self.list_projects()?.into_iter().map(|p| p.id));
            for id in ids {
                tasks.extend(self.project_data(&id)?.tasks);
            }
            return Ok(tasks);
        }
        let state = self.sync_state()?;
        list_field(&state, "/syncTaskBean/update", "task list")
    }

    fn create_task(&self, task: &Task) -> AppResult<Task> {
        let body = serde_json::to_value(task)?;
        let created: Value = self.send_body(Api::Open, Method::POST, "task", &body)?;
        decode(created, "task")
    }

    fn update_task(&self, task: &Task) -> AppResult<Task> {
        let body = serde_json::to_value(task)?;
        let updated: Value =
            self.send_body(Api::Open, Method::POST, &format!("task/{}", task.id), &body)?;
        decode(updated, "task")
    }

    fn complete_task(&self, project_id: &str, task_id: &str) -> AppResult<()> {
        self.send_empty(
            Api::Open,
            Method::POST,
            &format!("project/{project_id}/task/{task_id}/complete"),
        )
    }

    fn delete_task(&self, project_id: &str, task_id: &str) -> AppResult<()> {
        self.send_empty(
            Api::Open,
            Method::DELETE,
            &format!("project/{project_id}/task/{task_id}"),
        )
    }

    fn move_task(&self, task_id: &str, from_project_id: &str, to_project_id: &str) -> AppResult<()> {
        let body = json!([{
            "taskId": task_id,
            "fromProjectId": from_project_id,
            "toProjectId": to_project_id,
        }]);
        self.batch("batch/taskProject", body, task_id).map(|_| ())
    }

    fn set_task_parent(&self, task_id: &str, parent_id: &str, project_id: &str) -> AppResult<()> {
        let body = json!([{"taskId": task_id, "parentId": parent_id, "projectId": project_id}]);
        self.batch("batch/taskParent", body, task_id).map(|_| ())
    }

    fn unset_task_parent(&self, task_id: &str, old_parent_id: &str, project_id: &str) -> AppResult<()> {
        let body = json!([{"taskId": task_id, "oldParentId": old_parent_id, "projectId": project_id}]);
        self.batch("batch/taskParent", body, task_id).map(|_| ())
    }

    fn closed_tasks(
        &self,
        kind: ClosedKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<Task>> {
        let value: Value = self.get_query(
            Api::Web,
            "project/all/closed",
            &[
                ("from", closed_window(from)),
                ("to", closed_window(to)),
                ("status", kind.as_status().to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        decode(value, "closed task list")
    }

    fn deleted_tasks(&self, limit: u32) -> AppResult<Vec<Task>> {
        let value: Value = self.get_query(
            Api::Web,
            "project/all/trash/pagination",
            &[("start", "0".to_string()), ("limit", limit.to_string())],
        )?;
        list_field(&value, "/tasks", "trash")
    }

    fn list_projects(&self) -> AppResult<Vec<Project>> {
        self.get(Api::Open, "project")
    }

    fn get_project(&self, project_id: &str) -> AppResult<Project> {
        self.get(Api::Open, &format!("project/{project_id}"))
    }

    fn project_data(&self, project_id: &str) -> AppResult<ProjectData> {
        self.get(Api::Open, &format!("project/{project_id}/data"))
    }

    fn create_project(&self, project: &Project) -> AppResult<Project> {
        let body = serde_json::to_value(project)?;
        let created: Value = self.send_body(Api::Open, Method::POST, "project", &body)?;
        decode(created, "project")
    }

    fn update_project(&self, project: &Project) -> AppResult<Project> {
        let body = serde_json::to_value(project)?;
        let updated: Value = self.send_body(
            Api::Open,
            Method::POST,
            &format!("project/{}", project.id),
            &body,
        )?;
        decode(updated, "project")
    }

    fn delete_project(&self, project_id: &str) -> AppResult<()> {
        self.send_empty(Api::Open, Method::DELETE, &format!("project/{project_id}"))
    }

    fn list_folders(&self) -> AppResult<Vec<Folder>> {
        let state = self.sync_state()?;
        list_field(&state, "/projectGroups", "folder list")
    }

    fn create_folder(&self, name: &str) -> AppResult<Folder> {
        let id = object_id();
        let body = json!({"add": [{"id": id, "name": name, "listType": "group"}]});
        self.batch("batch/projectGroup", body, &id)?;
        Ok(Folder {
            id,
            name: name.to_string(),
            ..Folder::default()
        })
    }

    fn rename_folder(&self, folder_id: &str, name: &str) -> AppResult<Folder> {
        let body = json!({"update": [{"id": folder_id, "name": name, "listType": "group"}]});
        self.batch("batch/projectGroup", body, folder_id)?;
        Ok(Folder {
            id: folder_id.to_string(),
            name: name.to_string(),
            ..Folder::default()
        })
    }

    fn delete_folder(&self, folder_id: &str) -> AppResult<()> {
        self.batch("batch/projectGroup", json!({"delete": [folder_id]}), folder_id)
            .map(|_| ())
    }

    fn list_columns(&self, project_id: &str) -> AppResult<Vec<Column>> {
        self.get(Api::Web, &format!("column/project/{project_id}"))
    }

    fn create_column(&self, column: &Column) -> AppResult<Column> {
        let mut column = column.clone();
        column.id = object_id();
        let body = json!({"add": [serde_json::to_value(&column)?]});
        self.batch("column", body, &column.id)?;
        Ok(column)
    }

    fn update_column(&self, column: &Column) -> AppResult<Column> {
        let body = json!({"update": [serde_json::to_value(column)?]});
        self.batch("column", body, &column.id)?;
        Ok(column.clone())
    }

    fn delete_column(&self, project_id: &str, column_id: &str) -> AppResult<()> {
        let body = json!({"delete": [{"columnId": column_id, "projectId": project_id}]});
        self.batch("column", body, column_id).map(|_| ())
    }

    fn list_tags(&self) -> AppResult<Vec<Tag>> {
        let state = self.sync_state()?;
        list_field(&state, "/tags", "tag list")
    }

    fn create_tag(&self, tag: &Tag) -> AppResult<Tag> {
        let body = json!({"add": [serde_json::to_value(tag)?]});
        self.batch("batch/tag", body, &tag.name)?;
        Ok(tag.clone())
    }

    fn update_tag(&self, tag: &Tag) -> AppResult<Tag> {
        let body = json!({"update": [serde_json::to_value(tag)?]});
        self.batch("batch/tag", body, &tag.name)?;
        Ok(tag.clone())
    }

    fn rename_tag(&self, name: &str, new_name: &str) -> AppResult<()> {
        let body = json!({"name": name, "newName": new_name});
        self.send_body::<Value>(Api::Web, Method::PUT, "tag/rename", &body)
            .map(|_| ())
    }

    fn merge_tags(&self, source: &str, target: &str) -> AppResult<()> {
        let body = json!({"name": source, "newName": target});
        self.send_body::<Value>(Api::Web, Method::PUT, "tag/merge", &body)
            .map(|_| ())
    }

    fn delete_tag(&self, name: &str) -> AppResult<()> {
        let (request, url) = self.request(Api::Web, Method::DELETE, "tag")?;
        info!(path = url.path(), "mutating request");
        self.execute(request.query(&[("name", name)]), "DELETE", &url)
            .map(|_| ())
    }

    fn list_habits(&self) -> AppResult<Vec<Habit>> {
        self.get(Api::Web, "habits")
    }

    fn habit_sections(&self) -> AppResult<Vec<Value>> {
        self.get(Api::Web, "habitSections")
    }

    fn habit_preferences(&self) -> AppResult<Value> {
        self.get_query(
            Api::Web,
            "user/preferences/habit",
            &[("platform", "web".to_string())],
        )
    }

    fn create_habit(&self, habit: &Habit) -> AppResult<Habit> {
        let mut habit = habit.clone();
        habit.id = object_id();
        let body = json!({"add": [serde_json::to_value(&habit)?], "update": [], "delete": []});
        self.batch("habits/batch", body, &habit.id)?;
        Ok(habit)
    }

    fn update_habit(&self, habit: &Habit) -> AppResult<Habit> {
        let body = json!({"add": [], "update": [serde_json::to_value(habit)?], "delete": []});
        self.batch("habits/batch", body, &habit.id)?;
        Ok(habit.clone())
    }

    fn delete_habit(&self, habit_id: &str) -> AppResult<()> {
        let body = json!({"add": [], "update": [], "delete": [habit_id]});
        self.batch("habits/batch", body, habit_id).map(|_| ())
    }

    fn checkin_habit(&self, checkin: &Checkin) -> AppResult<Value> {
        let id = object_id();
        let body = json!({
            "add": [{
                "id": id,
                "habitId": checkin.habit_id,
                "checkinStamp": checkin.stamp,
                "value": checkin.value,
                "status": 2,
            }],
            "update": [],
            "delete": [],
        });
        self.batch("habitCheckins/batch", body, &id)
    }

    fn habit_checkins(&self, habit_ids: &[String], after_stamp: i64) -> AppResult<Value> {
        let body = json!({"habitIds": habit_ids, "afterStamp": after_stamp});
        let response: Value =
            self.send_body(Api::Web, Method::POST, "habitCheckins/query", &body)?;
        Ok(response.get("checkins").cloned().unwrap_or_else(|| json!({})))
    }

    fn focus_heatmap(&self, from_stamp: i64, to_stamp: i64) -> AppResult<Vec<Value>> {
        self.get(
            Api::Web,
            &format!("pomodoros/statistics/heatmap/{from_stamp}/{to_stamp}"),
        )
    }

    fn focus_by_tag(&self, from_stamp: i64, to_stamp: i64) -> AppResult<Value> {
        let response: Value = self.get(
            Api::Web,
            &format!("pomodoros/statistics/dist/{from_stamp}/{to_stamp}"),
        )?;
        Ok(response
            .get("tagDurations")
            .cloned()
            .unwrap_or_else(|| json!({})))
    }
}
