//! Messages exchanged with the hub's gRPC services.
//!
//! These mirror the hub's protobuf definitions field for field; only the
//! subset the CLI uses is declared.

use serde::{Serialize, Serializer};

macro_rules! enum_names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }, $ser:ident) => {
        impl $ty {
            pub(crate) fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        pub(crate) fn $ser<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
            match $ty::try_from(*value) {
                Ok(v) => serializer.serialize_str(v.as_str()),
                Err(_) => serializer.serialize_i32(*value),
            }
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum TaskType {
    Deployment = 0,
    Job = 1,
    CronJob = 2,
}

enum_names!(TaskType {
    Deployment => "Deployment",
    Job => "Job",
    CronJob => "CronJob",
}, serialize_task_type);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum TaskStatus {
    Starting = 0,
    Running = 1,
    StartFailed = 2,
    Updating = 3,
    UpdateFailed = 4,
    Cancelling = 5,
    Cancelled = 6,
    Done = 7,
    Failed = 8,
}

enum_names!(TaskStatus {
    Starting => "Starting",
    Running => "Running",
    StartFailed => "StartFailed",
    Updating => "Updating",
    UpdateFailed => "UpdateFailed",
    Cancelling => "Cancelling",
    Cancelled => "Cancelled",
    Done => "Done",
    Failed => "Failed",
}, serialize_task_status);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum AppStatus {
    Launching = 0,
    Running = 1,
    LaunchFailed = 2,
    Updating = 3,
    Cancelling = 4,
    Cancelled = 5,
    Failed = 6,
}

enum_names!(AppStatus {
    Launching => "Launching",
    Running => "Running",
    LaunchFailed => "LaunchFailed",
    Updating => "Updating",
    Cancelling => "Cancelling",
    Cancelled => "Cancelled",
    Failed => "Failed",
}, serialize_app_status);

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Task {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(enumeration = "TaskType", tag = "3")]
    #[serde(rename = "type", serialize_with = "serialize_task_type")]
    pub r#type: i32,
    #[prost(string, tag = "4")]
    pub image: String,
    #[prost(int32, tag = "5")]
    pub replica: i32,
    #[prost(string, tag = "6")]
    pub schedule: String,
    #[prost(enumeration = "TaskStatus", tag = "7")]
    #[serde(serialize_with = "serialize_task_status")]
    pub status: i32,
    #[prost(string, tag = "8")]
    pub data_center_name: String,
    #[prost(int64, tag = "9")]
    pub creation_date: i64,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct TaskId {
    #[prost(string, tag = "1")]
    pub task_id: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct CreateTaskRequest {
    #[prost(message, optional, tag = "1")]
    pub task: Option<Task>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct CreateTaskResponse {
    #[prost(string, tag = "1")]
    pub task_id: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct UpdateTaskRequest {
    #[prost(message, optional, tag = "1")]
    pub task: Option<Task>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct TaskListResponse {
    #[prost(message, repeated, tag = "1")]
    pub tasks: Vec<Task>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct TaskDetailResponse {
    #[prost(message, optional, tag = "1")]
    pub task: Option<Task>,
}

pub mod custom_value {
    use serde::Serialize;

    #[derive(Clone, PartialEq, Serialize, prost::Oneof)]
    #[serde(untagged)]
    pub enum Value {
        #[prost(string, tag = "2")]
        Str(String),
        #[prost(int64, tag = "3")]
        Int(i64),
        #[prost(bool, tag = "4")]
        Bool(bool),
    }
}

/// A chart value override, e.g. `replicaCount:3`.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct CustomValue {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(oneof = "custom_value::Value", tags = "2, 3, 4")]
    pub value: Option<custom_value::Value>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct App {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub chart_name: String,
    #[prost(string, tag = "4")]
    pub chart_repo: String,
    #[prost(string, tag = "5")]
    pub chart_version: String,
    #[prost(string, tag = "6")]
    pub namespace_id: String,
    #[prost(enumeration = "AppStatus", tag = "7")]
    #[serde(serialize_with = "serialize_app_status")]
    pub status: i32,
    #[prost(message, repeated, tag = "8")]
    pub custom_values: Vec<CustomValue>,
    #[prost(int64, tag = "9")]
    pub creation_date: i64,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct AppId {
    #[prost(string, tag = "1")]
    pub app_id: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct CreateAppRequest {
    #[prost(message, optional, tag = "1")]
    pub app: Option<App>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct CreateAppResponse {
    #[prost(string, tag = "1")]
    pub app_id: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct AppListResponse {
    #[prost(message, repeated, tag = "1")]
    pub apps: Vec<App>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct AppDetailResponse {
    #[prost(message, optional, tag = "1")]
    pub app: Option<App>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Namespace {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    /// Millicores.
    #[prost(int64, tag = "3")]
    pub cpu_limit: i64,
    /// MiB.
    #[prost(int64, tag = "4")]
    pub mem_limit: i64,
    /// GiB.
    #[prost(int64, tag = "5")]
    pub storage_limit: i64,
    #[prost(int64, tag = "6")]
    pub creation_date: i64,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct NamespaceId {
    #[prost(string, tag = "1")]
    pub namespace_id: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct CreateNamespaceRequest {
    #[prost(message, optional, tag = "1")]
    pub namespace: Option<Namespace>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct CreateNamespaceResponse {
    #[prost(string, tag = "1")]
    pub namespace_id: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct NamespaceListResponse {
    #[prost(message, repeated, tag = "1")]
    pub namespaces: Vec<Namespace>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Cluster {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub region: String,
    #[prost(string, tag = "4")]
    pub status: String,
    #[prost(int32, tag = "5")]
    pub nodes: i32,
    #[prost(int64, tag = "6")]
    pub cpu_total: i64,
    #[prost(int64, tag = "7")]
    pub mem_total: i64,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ClusterListResponse {
    #[prost(message, repeated, tag = "1")]
    pub clusters: Vec<Cluster>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Chart {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub repo: String,
    #[prost(string, tag = "3")]
    pub latest_version: String,
    #[prost(string, tag = "4")]
    pub app_version: String,
    #[prost(string, tag = "5")]
    pub description: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ChartListRequest {
    #[prost(string, tag = "1")]
    pub repo: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ChartListResponse {
    #[prost(message, repeated, tag = "1")]
    pub charts: Vec<Chart>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct User {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(int64, tag = "4")]
    pub creation_date: i64,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct RegisterRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub email: String,
    #[prost(string, tag = "3")]
    #[serde(skip)]
    pub password: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub email: String,
    #[prost(string, tag = "2")]
    #[serde(skip)]
    pub password: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct AuthResult {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    #[serde(skip)]
    pub access_token: String,
    #[prost(string, tag = "3")]
    #[serde(skip)]
    pub refresh_token: String,
    #[prost(int64, tag = "4")]
    pub expiration: i64,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct LogoutRequest {
    #[prost(string, tag = "1")]
    pub refresh_token: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct BalanceRequest {
    #[prost(string, tag = "1")]
    pub symbol: String,
    #[prost(string, tag = "2")]
    pub address: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Balance {
    #[prost(string, tag = "1")]
    pub symbol: String,
    #[prost(string, tag = "2")]
    pub address: String,
    #[prost(string, tag = "3")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct SendCoinsRequest {
    #[prost(string, tag = "1")]
    pub symbol: String,
    #[prost(string, tag = "2")]
    pub target_address: String,
    #[prost(string, tag = "3")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct SendCoinsResponse {
    #[prost(string, tag = "1")]
    pub tx_hash: String,
}
