use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage, ImageExt};
use typed_builder::TypedBuilder;

const MYSQL_IMAGE: &str = "mysql";
const MYSQL_PORT: u16 = 3306;
const READY_MESSAGE: &str = "ready for connections";

/// Credentials and image tag of a throwaway MySQL server.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "snaplink".to_string(), setter(into))]
    pub database: String,
    #[builder(default = "snaplink".to_string(), setter(into))]
    pub username: String,
    #[builder(default = "snaplink".to_string(), setter(into))]
    pub password: String,
    #[builder(default = "root".to_string(), setter(into))]
    pub root_password: String,
    #[builder(default = "8.4".to_string(), setter(into))]
    pub tag: String,
}

impl MysqlConfig {
    /// DSN for the application user against `host:port`.
    pub fn dsn(&self, host: &str, port: u16) -> String {
        format!(
            "mysql://{user}:{password}@{host}:{port}/{database}",
            user = self.username,
            password = self.password,
            database = self.database,
        )
    }

    fn request(&self) -> ContainerRequest<GenericImage> {
        GenericImage::new(MYSQL_IMAGE, self.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(READY_MESSAGE))
            .with_env_var("MYSQL_DATABASE", self.database.as_str())
            .with_env_var("MYSQL_USER", self.username.as_str())
            .with_env_var("MYSQL_PASSWORD", self.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", self.root_password.as_str())
    }
}

/// Disposable MySQL server backing the storage integration tests.
///
/// Dropping it stops and removes the container.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = config.request().start().await?;
        Ok(Self { container, config })
    }

    pub async fn host(&self) -> Result<String> {
        Ok(self.container.get_host().await?.to_string())
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(MYSQL_PORT).await?)
    }

    /// DSN in the form accepted by `sqlx::MySqlPool::connect`.
    pub async fn database_url(&self) -> Result<String> {
        let host = self.host().await?;
        let port = self.port().await?;
        Ok(self.config.dsn(&host, port))
    }
}
