use std::collections::HashSet;
use std::sync::Mutex;

use super::Hub;
use super::proto::*;
use crate::cli::error::AnkrError;

/// A hub that records every call and fails for ids listed in `failing`.
#[derive(Default)]
pub(crate) struct MockHub {
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) failing: HashSet<String>,
    pub(crate) tasks: Vec<Task>,
    pub(crate) created_tasks: Mutex<Vec<Task>>,
    pub(crate) updated_tasks: Mutex<Vec<Task>>,
    pub(crate) created_apps: Mutex<Vec<App>>,
    pub(crate) auth: Option<AuthResult>,
}

impl MockHub {
    pub(crate) fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn outcome(&self, call: &str, id: &str) -> Result<(), AnkrError> {
        self.record(format!("{call} {id}"));
        if self.failing.contains(id) {
            Err(tonic::Status::internal(format!("{call} {id} failed")).into())
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Hub for MockHub {
    async fn create_task(&self, task: Task) -> Result<String, AnkrError> {
        self.record(format!("create_task {}", task.name));
        self.created_tasks.lock().unwrap().push(task);
        Ok(String::from("task-1"))
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AnkrError> {
        self.record("list_tasks");
        Ok(self.tasks.clone())
    }

    async fn task_detail(&self, task_id: &str) -> Result<Task, AnkrError> {
        self.outcome("task_detail", task_id)?;
        self.tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(|| tonic::Status::not_found(task_id.to_string()).into())
    }

    async fn update_task(&self, task: Task) -> Result<(), AnkrError> {
        self.outcome("update_task", &task.id)?;
        self.updated_tasks.lock().unwrap().push(task);
        Ok(())
    }

    async fn cancel_task(&self, task_id: &str) -> Result<(), AnkrError> {
        self.outcome("cancel_task", task_id)
    }

    async fn purge_task(&self, task_id: &str) -> Result<(), AnkrError> {
        self.outcome("purge_task", task_id)
    }

    async fn create_app(&self, app: App) -> Result<String, AnkrError> {
        self.record(format!("create_app {}", app.name));
        self.created_apps.lock().unwrap().push(app);
        Ok(String::from("app-1"))
    }

    async fn list_apps(&self) -> Result<Vec<App>, AnkrError> {
        self.record("list_apps");
        Ok(Vec::new())
    }

    async fn app_detail(&self, app_id: &str) -> Result<App, AnkrError> {
        self.outcome("app_detail", app_id)?;
        Ok(App {
            id: app_id.to_string(),
            ..Default::default()
        })
    }

    async fn cancel_app(&self, app_id: &str) -> Result<(), AnkrError> {
        self.outcome("cancel_app", app_id)
    }

    async fn purge_app(&self, app_id: &str) -> Result<(), AnkrError> {
        self.outcome("purge_app", app_id)
    }

    async fn create_namespace(&self, namespace: Namespace) -> Result<String, AnkrError> {
        self.record(format!("create_namespace {}", namespace.name));
        Ok(String::from("ns-1"))
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, AnkrError> {
        self.record("list_namespaces");
        Ok(Vec::new())
    }

    async fn delete_namespace(&self, namespace_id: &str) -> Result<(), AnkrError> {
        self.outcome("delete_namespace", namespace_id)
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>, AnkrError> {
        self.record("list_clusters");
        Ok(Vec::new())
    }

    async fn list_charts(&self, repo: &str) -> Result<Vec<Chart>, AnkrError> {
        self.record(format!("list_charts {repo}"));
        Ok(Vec::new())
    }

    async fn register(&self, request: RegisterRequest) -> Result<User, AnkrError> {
        self.record(format!("register {}", request.email));
        Ok(User {
            id: String::from("user-1"),
            name: request.name,
            email: request.email,
            creation_date: 0,
        })
    }

    async fn login(&self, email: &str, _password: &str) -> Result<AuthResult, AnkrError> {
        self.record(format!("login {email}"));
        self.auth
            .clone()
            .ok_or_else(|| tonic::Status::unauthenticated("bad credentials").into())
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AnkrError> {
        self.record(format!("logout {refresh_token}"));
        Ok(())
    }

    async fn user_detail(&self) -> Result<User, AnkrError> {
        self.record("user_detail");
        Ok(User::default())
    }

    async fn balance(&self, symbol: &str, address: &str) -> Result<Balance, AnkrError> {
        self.record(format!("balance {symbol} {address}"));
        Ok(Balance {
            symbol: symbol.to_string(),
            address: address.to_string(),
            amount: String::from("100"),
        })
    }

    async fn send_coins(&self, request: SendCoinsRequest) -> Result<String, AnkrError> {
        self.record(format!(
            "send_coins {} {} {}",
            request.symbol, request.target_address, request.amount
        ));
        Ok(String::from("0xfeed"))
    }
}
