pub(crate) mod proto;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use http::uri::PathAndQuery;
use tonic::{
    Request,
    client::Grpc,
    codec::ProstCodec,
    transport::{Channel, Endpoint},
};

use crate::cli::error::AnkrError;

use self::proto::*;

pub(crate) const HUB_PORT: u16 = 50051;
pub(crate) const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// The remote management service. Every command talks to the hub through
/// this trait so handlers can be exercised without a network.
#[async_trait::async_trait]
pub(crate) trait Hub: Send + Sync {
    async fn create_task(&self, task: Task) -> Result<String, AnkrError>;
    async fn list_tasks(&self) -> Result<Vec<Task>, AnkrError>;
    async fn task_detail(&self, task_id: &str) -> Result<Task, AnkrError>;
    async fn update_task(&self, task: Task) -> Result<(), AnkrError>;
    async fn cancel_task(&self, task_id: &str) -> Result<(), AnkrError>;
    async fn purge_task(&self, task_id: &str) -> Result<(), AnkrError>;

    async fn create_app(&self, app: App) -> Result<String, AnkrError>;
    async fn list_apps(&self) -> Result<Vec<App>, AnkrError>;
    async fn app_detail(&self, app_id: &str) -> Result<App, AnkrError>;
    async fn cancel_app(&self, app_id: &str) -> Result<(), AnkrError>;
    async fn purge_app(&self, app_id: &str) -> Result<(), AnkrError>;

    async fn create_namespace(&self, namespace: Namespace) -> Result<String, AnkrError>;
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, AnkrError>;
    async fn delete_namespace(&self, namespace_id: &str) -> Result<(), AnkrError>;

    async fn list_clusters(&self) -> Result<Vec<Cluster>, AnkrError>;
    async fn list_charts(&self, repo: &str) -> Result<Vec<Chart>, AnkrError>;

    async fn register(&self, request: RegisterRequest) -> Result<User, AnkrError>;
    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AnkrError>;
    async fn logout(&self, refresh_token: &str) -> Result<(), AnkrError>;
    async fn user_detail(&self) -> Result<User, AnkrError>;

    async fn balance(&self, symbol: &str, address: &str) -> Result<Balance, AnkrError>;
    async fn send_coins(&self, request: SendCoinsRequest) -> Result<String, AnkrError>;
}

/// Builds the plaintext endpoint address for a hub URL, adding the default
/// port when none is given.
pub(crate) fn endpoint_addr(hub_url: &str) -> Result<String, AnkrError> {
    let hub_url = hub_url.trim().trim_end_matches('/');
    if hub_url.is_empty() {
        return Err(AnkrError::MissingArguments(String::from("hub-url")));
    }

    let url = if hub_url.contains("://") {
        url::Url::parse(hub_url)?
    } else {
        url::Url::parse(&format!("http://{hub_url}"))?
    };
    let host = url
        .host_str()
        .ok_or_else(|| AnkrError::InvalidInput(format!("hub url `{hub_url}` has no host")))?;
    let port = url.port().unwrap_or(HUB_PORT);

    Ok(format!("http://{host}:{port}"))
}

fn not_found(what: &str, id: &str) -> AnkrError {
    AnkrError::Remote {
        code: tonic::Code::NotFound,
        message: format!("{what} {id} not found"),
    }
}

#[derive(Clone)]
pub(crate) struct GrpcHub {
    grpc: Grpc<Channel>,
    addr: String,
    token: Option<String>,
}

impl GrpcHub {
    #[tracing::instrument(skip(token))]
    pub(crate) async fn connect(hub_url: &str, token: Option<String>) -> Result<Self, AnkrError> {
        let addr = endpoint_addr(hub_url)?;
        let connection_error = |reason: String| AnkrError::Connection {
            addr: addr.clone(),
            reason,
        };

        let channel = Endpoint::from_shared(addr.clone())
            .map_err(|e| connection_error(e.to_string()))?
            .connect_timeout(DIAL_TIMEOUT)
            .connect()
            .await
            .map_err(|e| connection_error(e.to_string()))?;
        tracing::debug!("connected to hub at {addr}");

        Ok(Self {
            grpc: Grpc::new(channel),
            addr,
            token,
        })
    }

    fn unreachable(&self, reason: impl ToString) -> AnkrError {
        AnkrError::Connection {
            addr: self.addr.clone(),
            reason: reason.to_string(),
        }
    }

    async fn unary<Req, Resp>(&self, path: &'static str, message: Req) -> Result<Resp, AnkrError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.grpc.clone();
        grpc.ready().await.map_err(|e| self.unreachable(e))?;

        let mut request = Request::new(message);
        request.set_timeout(CALL_TIMEOUT);
        if let Some(token) = &self.token {
            request
                .metadata_mut()
                .insert("authorization", format!("Bearer {token}").parse()?);
        }

        tracing::debug!("calling {path}");
        let call = grpc.unary(
            request,
            PathAndQuery::from_static(path),
            ProstCodec::<Req, Resp>::default(),
        );

        match tokio::time::timeout(CALL_TIMEOUT, call).await {
            Ok(response) => Ok(response?.into_inner()),
            Err(_) => Err(AnkrError::Deadline(path.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Hub for GrpcHub {
    async fn create_task(&self, task: Task) -> Result<String, AnkrError> {
        let res: CreateTaskResponse = self
            .unary(
                "/ankr.hub.TaskMgr/CreateTask",
                CreateTaskRequest { task: Some(task) },
            )
            .await?;
        Ok(res.task_id)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AnkrError> {
        let res: TaskListResponse = self.unary("/ankr.hub.TaskMgr/TaskList", Empty {}).await?;
        Ok(res.tasks)
    }

    async fn task_detail(&self, task_id: &str) -> Result<Task, AnkrError> {
        let res: TaskDetailResponse = self
            .unary(
                "/ankr.hub.TaskMgr/TaskDetail",
                TaskId {
                    task_id: task_id.to_string(),
                },
            )
            .await?;
        res.task.ok_or_else(|| not_found("task", task_id))
    }

    async fn update_task(&self, task: Task) -> Result<(), AnkrError> {
        let _: Empty = self
            .unary(
                "/ankr.hub.TaskMgr/UpdateTask",
                UpdateTaskRequest { task: Some(task) },
            )
            .await?;
        Ok(())
    }

    async fn cancel_task(&self, task_id: &str) -> Result<(), AnkrError> {
        let _: Empty = self
            .unary(
                "/ankr.hub.TaskMgr/CancelTask",
                TaskId {
                    task_id: task_id.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn purge_task(&self, task_id: &str) -> Result<(), AnkrError> {
        let _: Empty = self
            .unary(
                "/ankr.hub.TaskMgr/PurgeTask",
                TaskId {
                    task_id: task_id.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn create_app(&self, app: App) -> Result<String, AnkrError> {
        let res: CreateAppResponse = self
            .unary("/ankr.hub.AppMgr/CreateApp", CreateAppRequest { app: Some(app) })
            .await?;
        Ok(res.app_id)
    }

    async fn list_apps(&self) -> Result<Vec<App>, AnkrError> {
        let res: AppListResponse = self.unary("/ankr.hub.AppMgr/AppList", Empty {}).await?;
        Ok(res.apps)
    }

    async fn app_detail(&self, app_id: &str) -> Result<App, AnkrError> {
        let res: AppDetailResponse = self
            .unary(
                "/ankr.hub.AppMgr/AppDetail",
                AppId {
                    app_id: app_id.to_string(),
                },
            )
            .await?;
        res.app.ok_or_else(|| not_found("app", app_id))
    }

    async fn cancel_app(&self, app_id: &str) -> Result<(), AnkrError> {
        let _: Empty = self
            .unary(
                "/ankr.hub.AppMgr/CancelApp",
                AppId {
                    app_id: app_id.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn purge_app(&self, app_id: &str) -> Result<(), AnkrError> {
        let _: Empty = self
            .unary(
                "/ankr.hub.AppMgr/PurgeApp",
                AppId {
                    app_id: app_id.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn create_namespace(&self, namespace: Namespace) -> Result<String, AnkrError> {
        let res: CreateNamespaceResponse = self
            .unary(
                "/ankr.hub.NamespaceMgr/CreateNamespace",
                CreateNamespaceRequest {
                    namespace: Some(namespace),
                },
            )
            .await?;
        Ok(res.namespace_id)
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, AnkrError> {
        let res: NamespaceListResponse = self
            .unary("/ankr.hub.NamespaceMgr/NamespaceList", Empty {})
            .await?;
        Ok(res.namespaces)
    }

    async fn delete_namespace(&self, namespace_id: &str) -> Result<(), AnkrError> {
        let _: Empty = self
            .unary(
                "/ankr.hub.NamespaceMgr/DeleteNamespace",
                NamespaceId {
                    namespace_id: namespace_id.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>, AnkrError> {
        let res: ClusterListResponse = self
            .unary("/ankr.hub.ClusterMgr/ClusterList", Empty {})
            .await?;
        Ok(res.clusters)
    }

    async fn list_charts(&self, repo: &str) -> Result<Vec<Chart>, AnkrError> {
        let res: ChartListResponse = self
            .unary(
                "/ankr.hub.ChartMgr/ChartList",
                ChartListRequest {
                    repo: repo.to_string(),
                },
            )
            .await?;
        Ok(res.charts)
    }

    async fn register(&self, request: RegisterRequest) -> Result<User, AnkrError> {
        self.unary("/ankr.hub.UserMgr/Register", request).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AnkrError> {
        self.unary(
            "/ankr.hub.UserMgr/Login",
            LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            },
        )
        .await
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AnkrError> {
        let _: Empty = self
            .unary(
                "/ankr.hub.UserMgr/Logout",
                LogoutRequest {
                    refresh_token: refresh_token.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn user_detail(&self) -> Result<User, AnkrError> {
        self.unary("/ankr.hub.UserMgr/UserDetail", Empty {}).await
    }

    async fn balance(&self, symbol: &str, address: &str) -> Result<Balance, AnkrError> {
        self.unary(
            "/ankr.hub.WalletMgr/Balance",
            BalanceRequest {
                symbol: symbol.to_string(),
                address: address.to_string(),
            },
        )
        .await
    }

    async fn send_coins(&self, request: SendCoinsRequest) -> Result<String, AnkrError> {
        let res: SendCoinsResponse = self.unary("/ankr.hub.WalletMgr/SendCoins", request).await?;
        Ok(res.tx_hash)
    }
}

#[cfg(test)]
mod test {
    use tonic::client::Grpc;
    use tonic::transport::Endpoint;

    use super::{GrpcHub, endpoint_addr};
    use crate::cli::error::AnkrError;

    #[test]
    fn endpoint_addr_adds_default_port() {
        assert_eq!(
            endpoint_addr("hub.ankr.network").unwrap(),
            "http://hub.ankr.network:50051"
        );
        assert_eq!(
            endpoint_addr("hub.ankr.network:6000").unwrap(),
            "http://hub.ankr.network:6000"
        );
        assert_eq!(
            endpoint_addr("http://10.0.0.5/").unwrap(),
            "http://10.0.0.5:50051"
        );
    }

    #[test]
    fn empty_hub_url_is_missing() {
        assert!(endpoint_addr("  ").is_err());
    }

    #[tokio::test]
    async fn dial_failure_is_returned_not_fatal() {
        // Nothing listens on port 1 locally.
        let res = GrpcHub::connect("127.0.0.1:1", None).await;
        assert!(matches!(
            res,
            Err(AnkrError::Connection { addr, .. }) if addr == "http://127.0.0.1:1"
        ));
    }

    #[tokio::test]
    async fn connection_errors_name_the_hub_address() {
        let addr = endpoint_addr("hub.ankr.network").unwrap();
        let channel = Endpoint::from_shared(addr.clone()).unwrap().connect_lazy();
        let hub = GrpcHub {
            grpc: Grpc::new(channel),
            addr,
            token: None,
        };

        match hub.unreachable("transport error") {
            AnkrError::Connection { addr, reason } => {
                assert_eq!(addr, "http://hub.ankr.network:50051");
                assert_eq!(reason, "transport error");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
