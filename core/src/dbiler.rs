//! Async handle bound to one remote database.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{DbClient, Outcome};
use crate::config::ClientConfig;
use crate::error::BuildError;
use crate::http::HttpRequest;
use crate::transport::{Transport, UreqTransport};

/// Tracing target for requests that could not be built.
pub const REQUEST_TARGET: &str = "dbiler::request";

/// Client handle exposing the seven dbiler operations.
///
/// Each call is a single round trip and always resolves to a value of the
/// operation's result type. Failures are logged and surface only as that
/// type's default, so "nothing matched" and "the call failed" look the same
/// to the caller.
///
/// Concurrent calls through one handle share nothing but the immutable
/// configuration and the transport.
#[derive(Debug, Clone)]
pub struct Dbiler<T = UreqTransport> {
    client: DbClient,
    transport: T,
}

impl Dbiler<UreqTransport> {
    /// Handle over the default HTTP transport.
    pub fn connect(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Dbiler<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            client: DbClient::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    /// Inserts `doc` and returns its identifier.
    pub async fn insert<D>(&self, doc: &D) -> Option<String>
    where
        D: Serialize + ?Sized,
    {
        self.call(self.client.build_insert(doc), DbClient::parse_insert)
            .await
    }

    pub async fn find<D, Q, P>(&self, query: &Q, projection: &P) -> Vec<D>
    where
        D: DeserializeOwned,
        Q: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        self.call(self.client.build_find(query, projection), DbClient::parse_find::<D>)
            .await
    }

    pub async fn find_one<D, Q, P>(&self, query: &Q, projection: &P) -> Option<D>
    where
        D: DeserializeOwned,
        Q: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        self.call(
            self.client.build_find_one(query, projection),
            DbClient::parse_find_one::<D>,
        )
        .await
    }

    pub async fn count<Q>(&self, query: &Q) -> u64
    where
        Q: Serialize + ?Sized,
    {
        self.call(self.client.build_count(query), DbClient::parse_count)
            .await
    }

    /// Returns the number of documents updated.
    pub async fn update<Q, U, O>(&self, query: &Q, update: &U, options: &O) -> u64
    where
        Q: Serialize + ?Sized,
        U: Serialize + ?Sized,
        O: Serialize + ?Sized,
    {
        self.call(
            self.client.build_update(query, update, options),
            DbClient::parse_update,
        )
        .await
    }

    /// Returns the number of documents removed.
    pub async fn remove<Q, O>(&self, query: &Q, options: &O) -> u64
    where
        Q: Serialize + ?Sized,
        O: Serialize + ?Sized,
    {
        self.call(self.client.build_remove(query, options), DbClient::parse_remove)
            .await
    }

    /// Asks the server to persist the database.
    pub async fn save(&self) -> bool {
        self.call(Ok(self.client.build_save()), DbClient::parse_save)
            .await
    }

    async fn call<R, F>(&self, request: Result<HttpRequest, BuildError>, parse: F) -> R
    where
        R: Default,
        F: FnOnce(&DbClient, Outcome) -> R,
    {
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                tracing::error!(target: REQUEST_TARGET, error = %err, "request not sent");
                return R::default();
            }
        };
        let operation = request.operation;
        tracing::debug!(target: REQUEST_TARGET, %operation, url = %request.url, "sending");
        let outcome = self.transport.post_form(request).await;
        parse(&self.client, outcome)
    }
}
