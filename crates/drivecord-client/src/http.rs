//! [`DriveApi`] over the DriveCord REST API.
//!
//! Every call is a blocking POST whose JSON body carries the account's `uid`
//! and `token`. Filesystem calls add the session's `cwd` next to a `path`
//! relative to it. Endpoints are grouped under the base URL:
//!
//! |--------------------|--------------------------------------------|
//! | Prefix             | Calls                                      |
//! |--------------------|--------------------------------------------|
//! | `access/`          | logout (login lives in [`crate::access`])  |
//! | `instance/`        | instance list, permissions, members        |
//! | `fs/<id>/`         | structure and every file operation         |
//! | `dbg/<id>/`        | memory usage, cache dumps, traces          |
//! |--------------------|--------------------------------------------|

use std::collections::BTreeMap;
use std::fmt;

use drivecord_kernel::{ApiError, ApiResult, DriveApi};
use drivecord_types::{
    Instance, InstanceId, Member, MemoryUsage, Permissions, PulledObject, SnapshotEntry,
    TraceHop,
};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::constants::REQUEST_TIMEOUT;

/// Account credentials sent with every request.
#[derive(Clone)]
pub struct Credentials {
    pub user_id: u64,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Blocking HTTP client for one account.
#[derive(Debug)]
pub struct HttpDrive {
    client: Client,
    base: String,
    credentials: Credentials,
}

impl HttpDrive {
    /// Client for the API rooted at `base_url` (a trailing `/` is added if
    /// missing).
    pub fn new(base_url: &str, credentials: Credentials) -> ApiResult<Self> {
        Ok(Self {
            client: build_client()?,
            base: normalize_base(base_url),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn user_id(&self) -> u64 {
        self.credentials.user_id
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    fn post(&self, endpoint: &str, extra: Value) -> ApiResult<String> {
        let url = format!("{}{endpoint}", self.base);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(&self.body(extra))
            .send()
            .map_err(|e| ApiError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| ApiError::transport(e.to_string()))?;
        let result = classify(status, text);
        if let Err(err) = &result {
            debug!(%url, status, error = %err, "request refused");
        }
        result
    }

    fn post_json<T: DeserializeOwned>(&self, endpoint: &str, extra: Value) -> ApiResult<T> {
        decode(&self.post(endpoint, extra)?)
    }

    /// Auth fields merged with `extra`'s fields.
    fn body(&self, extra: Value) -> Value {
        let mut body = json!({
            "uid": self.credentials.user_id,
            "token": self.credentials.token,
        });
        if let (Value::Object(fields), Value::Object(more)) = (&mut body, extra) {
            fields.extend(more);
        }
        body
    }

    fn fs(&self, instance: InstanceId, op: &str, cwd: &str, mut extra: Value) -> ApiResult<String> {
        if let Value::Object(fields) = &mut extra {
            fields.insert("cwd".to_string(), Value::String(cwd.to_string()));
        }
        self.post(&format!("fs/{instance}/{op}"), extra)
    }
}

impl DriveApi for HttpDrive {
    fn instances(&self) -> ApiResult<Vec<Instance>> {
        decode_instances(&self.post("instance/fetchAll", json!({}))?)
    }

    fn logout(&self) -> ApiResult<()> {
        match self.post("access/logout", json!({})) {
            Ok(_) => Ok(()),
            Err(ApiError::Status(404)) => Err(ApiError::conflict("Already logged out.")),
            Err(err) => Err(err),
        }
    }

    fn permissions(&self, instance: InstanceId) -> ApiResult<Permissions> {
        self.post_json(&format!("instance/{instance}/getPerms"), json!({}))
    }

    fn members(&self, instance: InstanceId) -> ApiResult<Vec<Member>> {
        decode_members(&self.post(&format!("instance/{instance}/fetchMembers"), json!({}))?)
    }

    fn update_permissions(
        &self,
        instance: InstanceId,
        member_id: u64,
        permissions: Permissions,
    ) -> ApiResult<()> {
        self.post(
            &format!("instance/{instance}/updatePerms"),
            json!({ "member_id": member_id, "perms": permissions }),
        )?;
        Ok(())
    }

    fn structure(&self, instance: InstanceId) -> ApiResult<SnapshotEntry> {
        self.post_json(&format!("fs/{instance}/structure"), json!({}))
    }

    fn make_file(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()> {
        self.fs(instance, "mkfile", cwd, json!({ "path": path }))?;
        Ok(())
    }

    fn make_dir(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()> {
        self.fs(instance, "mkdir", cwd, json!({ "path": path }))?;
        Ok(())
    }

    fn remove(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<()> {
        self.fs(instance, "rm", cwd, json!({ "path": path }))?;
        Ok(())
    }

    fn rename(&self, instance: InstanceId, cwd: &str, path: &str, new_name: &str) -> ApiResult<()> {
        self.fs(
            instance,
            "rename",
            cwd,
            json!({ "path": path, "new_name": new_name }),
        )?;
        Ok(())
    }

    fn read_file(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<String> {
        self.fs(instance, "read", cwd, json!({ "path": path }))
    }

    fn pull(&self, instance: InstanceId, cwd: &str, path: &str) -> ApiResult<PulledObject> {
        decode(&self.fs(instance, "pull", cwd, json!({ "path": path }))?)
    }

    fn write_file(&self, instance: InstanceId, cwd: &str, path: &str, content: &str) -> ApiResult<()> {
        self.fs(
            instance,
            "write",
            cwd,
            json!({ "path": path, "content": content }),
        )?;
        Ok(())
    }

    fn upload(&self, instance: InstanceId, cwd: &str, path: &str, content: &str) -> ApiResult<()> {
        self.fs(
            instance,
            "upload",
            cwd,
            json!({ "path": path, "content": content }),
        )?;
        Ok(())
    }

    fn memory_usage(&self, instance: InstanceId) -> ApiResult<MemoryUsage> {
        self.post_json(&format!("dbg/{instance}/memusage"), json!({}))
    }

    fn dump_cache(&self, instance: InstanceId, index: u64) -> ApiResult<String> {
        self.post(&format!("dbg/{instance}/dumpcache"), json!({ "index": index }))
    }

    fn recache(&self, instance: InstanceId, index: u64) -> ApiResult<String> {
        self.post(&format!("dbg/{instance}/recache"), json!({ "index": index }))
    }

    fn trace(&self, instance: InstanceId, path: &str) -> ApiResult<Vec<TraceHop>> {
        decode_trace(&self.post(&format!("dbg/{instance}/trace"), json!({ "path": path }))?)
    }
}

// ============================================================================
// Response handling
// ============================================================================

pub(crate) fn build_client() -> ApiResult<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::transport(e.to_string()))
}

/// Trimmed, with exactly the one trailing `/` endpoints are appended to.
pub(crate) fn normalize_base(base_url: &str) -> String {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Map an HTTP status to the body on success or to an [`ApiError`].
pub(crate) fn classify(status: u16, body: String) -> ApiResult<String> {
    match status {
        200..=299 => Ok(body),
        401 => Err(ApiError::Unauthorized),
        403 => Err(ApiError::Forbidden),
        501 => Err(ApiError::DriveNotFound),
        // Refusals come back as plain text or as a JSON string.
        409 => Err(ApiError::Conflict(
            serde_json::from_str::<String>(&body).unwrap_or(body),
        )),
        other => {
            warn!(status = other, "unexpected response status");
            Err(ApiError::Status(other))
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|e| ApiError::decode(e.to_string()))
}

/// `{"<id>": "<name>", ...}`, ordered by id.
pub(crate) fn decode_instances(body: &str) -> ApiResult<Vec<Instance>> {
    let raw: BTreeMap<String, String> = decode(body)?;
    let mut instances = raw
        .into_iter()
        .map(|(id, name)| {
            id.parse::<u64>()
                .map(|id| Instance::new(id, name))
                .map_err(|_| ApiError::decode(format!("instance id `{id}` is not a number")))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    instances.sort_by_key(|instance| instance.id);
    Ok(instances)
}

/// Permission slot of a member triple: a record, or `false` when unregistered.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPermissions {
    Record(Permissions),
    Unregistered(bool),
}

#[derive(Deserialize)]
struct RawMember(String, u64, RawPermissions);

/// `[[name, id, perms | false], ...]`
pub(crate) fn decode_members(body: &str) -> ApiResult<Vec<Member>> {
    let raw: Vec<RawMember> = decode(body)?;
    Ok(raw
        .into_iter()
        .map(|RawMember(name, id, permissions)| Member {
            name,
            id,
            permissions: match permissions {
                RawPermissions::Record(record) => Some(record),
                RawPermissions::Unregistered(_) => None,
            },
        })
        .collect())
}

/// Message ids arrive as numbers or strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// `[[id, url], ...]`
pub(crate) fn decode_trace(body: &str) -> ApiResult<Vec<TraceHop>> {
    let raw: Vec<(RawId, String)> = decode(body)?;
    Ok(raw
        .into_iter()
        .map(|(id, url)| TraceHop { id: id.into(), url })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            user_id: 42,
            token: "secret".into(),
        }
    }

    #[test]
    fn test_classify_statuses() {
        assert_eq!(classify(200, "ok".into()), Ok("ok".to_string()));
        assert_eq!(classify(401, String::new()), Err(ApiError::Unauthorized));
        assert_eq!(classify(403, String::new()), Err(ApiError::Forbidden));
        assert_eq!(classify(501, String::new()), Err(ApiError::DriveNotFound));
        assert_eq!(classify(500, String::new()), Err(ApiError::Status(500)));
        assert_eq!(classify(404, String::new()), Err(ApiError::Status(404)));
    }

    #[test]
    fn test_conflict_carries_server_text() {
        assert_eq!(
            classify(409, "Object already exists".into()),
            Err(ApiError::conflict("Object already exists"))
        );
        assert_eq!(
            classify(409, r#""Invalid path: ~/x""#.into()),
            Err(ApiError::conflict("Invalid path: ~/x"))
        );
    }

    #[test]
    fn test_instances_sorted_by_id() {
        let instances = decode_instances(r#"{"20": "work", "3": "family"}"#).unwrap();
        assert_eq!(instances, [Instance::new(3, "family"), Instance::new(20, "work")]);

        let err = decode_instances(r#"{"abc": "broken"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_member_triples() {
        let body = r#"[
            ["amy", 1, {"read": true, "write": true, "admin": false, "owner": false}],
            ["bob", 2, false]
        ]"#;
        let members = decode_members(body).unwrap();
        assert_eq!(members[0].name, "amy");
        assert_eq!(
            members[0].permissions,
            Some(Permissions::none().with_read(true).with_write(true))
        );
        assert_eq!(members[1].id, 2);
        assert!(!members[1].is_registered());
    }

    #[test]
    fn test_trace_pairs() {
        let hops = decode_trace(r#"[[1001, "https://a/1"], ["h", "https://a/2"]]"#).unwrap();
        assert_eq!(hops[0].id, "1001");
        assert_eq!(hops[1].id, "h");
        assert_eq!(hops[1].url, "https://a/2");

        assert!(matches!(decode_trace("{}"), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_body_merges_auth() {
        let drive = HttpDrive::new("http://localhost:8000/api", credentials()).unwrap();
        assert_eq!(drive.base_url(), "http://localhost:8000/api/");

        let body = drive.body(json!({ "path": "a.txt" }));
        assert_eq!(body, json!({ "uid": 42, "token": "secret", "path": "a.txt" }));
    }

    #[test]
    fn test_debug_hides_token() {
        let printed = format!("{:?}", credentials());
        assert!(!printed.contains("secret"));
        assert!(printed.contains("42"));
    }
}
