//! Session facade
//!
//! One method per command kind. Each builds a [`ServiceCommand`] scoped to the
//! session's realm context and runs it over the owned connection.

use std::collections::BTreeMap;

use introspection::Snapshot;
use ipc::{Connection, Dispatcher, Exchange, FrameTransport, Value, WebSocketTransport};
use tracing::info;

use crate::bootstrap::retrieve_realm_context;
use crate::command::{CommandKind, EchoReply, Reply, ServiceCommand};
use crate::config::SessionConfig;
use crate::error::Result;

/// A registered session over a single connection
///
/// Methods take `&mut self`; responses are paired with requests in wire
/// order. Use [`Session::into_dispatcher`] when several tasks need to share
/// the connection.
#[derive(Debug)]
pub struct Session<T = WebSocketTransport> {
    connection: Connection<T>,
    context_id: String,
    config: SessionConfig,
}

impl Session<WebSocketTransport> {
    /// Look up the realm context, open the socket and register
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::new();
        let context_id = retrieve_realm_context(&http, &config).await?;

        info!(url = %config.server_url, "Connecting");
        let transport = WebSocketTransport::connect(&config.server_url).await?;
        Self::with_transport(transport, context_id, config).await
    }
}

impl<T: FrameTransport> Session<T> {
    /// Register over an already connected transport
    pub async fn with_transport(
        transport: T,
        context_id: impl Into<String>,
        config: SessionConfig,
    ) -> Result<Self> {
        let mut session = Self {
            connection: Connection::new(transport),
            context_id: context_id.into(),
            config,
        };
        session.registration().await?;
        Ok(session)
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Build a command scoped to this session's context
    pub fn command(&self, kind: CommandKind) -> ServiceCommand {
        ServiceCommand::new(self.context_id.clone(), kind)
    }

    async fn perform(&mut self, kind: CommandKind) -> Result<Reply> {
        let command = self.command(kind);
        Ok(self.connection.perform(command).await?)
    }

    async fn start(&mut self, kind: CommandKind) -> Result<Exchange<ServiceCommand>> {
        let command = self.command(kind);
        Ok(self.connection.send(command).await?)
    }

    async fn registration(&mut self) -> Result<()> {
        info!(name = %self.config.client_name, "Registering");
        let kind = CommandKind::Registration {
            name: self.config.client_name.clone(),
            api_url: self.config.api_url.clone(),
            access_token: self.config.api_token.clone(),
        };
        self.perform(kind).await?;
        Ok(())
    }

    /// Fetch an object's value
    pub async fn get_iss_object(
        &mut self,
        object_id: &str,
        ignore_upgrades: bool,
    ) -> Result<Value> {
        info!(object_id, "Getting ISS object");
        let kind = CommandKind::IssObject {
            object_id: object_id.to_string(),
            ignore_upgrades,
        };
        Ok(self.perform(kind).await?.into_value()?)
    }

    /// Resolve an object ID to its immutable ID
    pub async fn resolve_iss_object(
        &mut self,
        object_id: &str,
        ignore_upgrades: bool,
    ) -> Result<String> {
        info!(object_id, "Resolving ISS object");
        let kind = CommandKind::ResolveIssObject {
            object_id: object_id.to_string(),
            ignore_upgrades,
        };
        Ok(self.perform(kind).await?.into_id()?)
    }

    pub async fn get_iss_object_metadata(
        &mut self,
        object_id: &str,
    ) -> Result<BTreeMap<String, String>> {
        info!(object_id, "Getting ISS object metadata");
        let kind = CommandKind::IssObjectMetadata {
            object_id: object_id.to_string(),
        };
        Ok(self.perform(kind).await?.into_metadata()?)
    }

    /// Store `object` under `schema` and return its ID
    pub async fn post_iss_object(&mut self, schema: &str, object: Value) -> Result<String> {
        info!(schema, "Posting ISS object");
        let kind = CommandKind::PostIssObject {
            schema: schema.to_string(),
            object,
        };
        Ok(self.perform(kind).await?.into_id()?)
    }

    pub async fn copy_iss_object(
        &mut self,
        destination_context_id: &str,
        object_id: &str,
    ) -> Result<()> {
        info!(object_id, destination_context_id, "Copying ISS object");
        let kind = CommandKind::CopyIssObject {
            destination_context_id: destination_context_id.to_string(),
            object_id: object_id.to_string(),
        };
        self.perform(kind).await?;
        Ok(())
    }

    /// Submit a calculation and return its ID
    pub async fn post_calculation(&mut self, calculation: Value) -> Result<String> {
        info!("Posting calculation");
        let kind = CommandKind::PostCalculation { calculation };
        Ok(self.perform(kind).await?.into_id()?)
    }

    pub async fn copy_calculation(
        &mut self,
        destination_context_id: &str,
        calculation_id: &str,
    ) -> Result<()> {
        info!(calculation_id, destination_context_id, "Copying calculation");
        let kind = CommandKind::CopyCalculation {
            destination_context_id: destination_context_id.to_string(),
            calculation_id: calculation_id.to_string(),
        };
        self.perform(kind).await?;
        Ok(())
    }

    /// Evaluate a meta generator and return the resulting calculation ID
    pub async fn resolve_meta_chain(&mut self, generator: Value) -> Result<String> {
        info!("Resolving meta chain");
        let kind = CommandKind::ResolveMetaChain { generator };
        Ok(self.perform(kind).await?.into_id()?)
    }

    /// Evaluate a calculation on the server and return its result
    pub async fn perform_local_calc(&mut self, calculation: Value) -> Result<Value> {
        info!("Performing local calc");
        let kind = CommandKind::PerformLocalCalc { calculation };
        Ok(self.perform(kind).await?.into_value()?)
    }

    /// Pipeline `count` copies of a local calc
    ///
    /// All requests are sent before any response is read. Results are
    /// returned in send order.
    pub async fn perform_local_calc_repeated(
        &mut self,
        calculation: Value,
        count: usize,
    ) -> Result<Vec<Value>> {
        info!(count, "Performing repeated local calc");
        let mut exchanges = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = CommandKind::PerformLocalCalc {
                calculation: calculation.clone(),
            };
            exchanges.push(self.start(kind).await?);
        }

        let mut results = Vec::with_capacity(count);
        for exchange in exchanges {
            results.push(self.receive(exchange).await?.into_value()?);
        }
        Ok(results)
    }

    /// Send a local calc without waiting for its result
    pub async fn start_local_calc(
        &mut self,
        calculation: Value,
    ) -> Result<Exchange<ServiceCommand>> {
        info!("Starting local calc");
        self.start(CommandKind::PerformLocalCalc { calculation }).await
    }

    /// Fetch the request a calculation ID stands for
    pub async fn calculation_request(&mut self, calculation_id: &str) -> Result<Value> {
        info!(calculation_id, "Getting calculation request");
        let kind = CommandKind::CalculationRequest {
            calculation_id: calculation_id.to_string(),
        };
        Ok(self.perform(kind).await?.into_value()?)
    }

    /// Send a calculation request query without waiting for its result
    pub async fn start_calculation_request(
        &mut self,
        calculation_id: &str,
    ) -> Result<Exchange<ServiceCommand>> {
        info!(calculation_id, "Starting calculation request");
        let kind = CommandKind::CalculationRequest {
            calculation_id: calculation_id.to_string(),
        };
        self.start(kind).await
    }

    /// IDs of subcalculations calling a function matching `search_string`
    pub async fn calculation_search(
        &mut self,
        calculation_id: &str,
        search_string: &str,
    ) -> Result<Vec<String>> {
        info!(calculation_id, search_string, "Searching calculation");
        let kind = CommandKind::CalculationSearch {
            calculation_id: calculation_id.to_string(),
            search_string: search_string.to_string(),
        };
        Ok(self.perform(kind).await?.into_matches()?)
    }

    pub async fn iss_diff(&mut self, id_a: &str, id_b: &str) -> Result<Value> {
        info!(id_a, id_b, "Diffing ISS objects");
        let kind = CommandKind::IssDiff {
            id_a: id_a.to_string(),
            id_b: id_b.to_string(),
        };
        Ok(self.perform(kind).await?.into_value()?)
    }

    pub async fn calculation_diff(&mut self, id_a: &str, id_b: &str) -> Result<Value> {
        info!(id_a, id_b, "Diffing calculations");
        let kind = CommandKind::CalculationDiff {
            id_a: id_a.to_string(),
            id_b: id_b.to_string(),
        };
        Ok(self.perform(kind).await?.into_value()?)
    }

    pub async fn query_introspection_status(&mut self, include_finished: bool) -> Result<Snapshot> {
        info!(include_finished, "Querying introspection status");
        let kind = CommandKind::IntrospectionStatus { include_finished };
        Ok(self.perform(kind).await?.into_snapshot()?)
    }

    pub async fn introspection_set_enabled(&mut self, enabled: bool) -> Result<()> {
        info!(enabled, "Setting introspection");
        self.perform(CommandKind::IntrospectionSetEnabled { enabled }).await?;
        Ok(())
    }

    pub async fn introspection_clear_admin(&mut self) -> Result<()> {
        info!("Clearing introspection admin");
        self.perform(CommandKind::IntrospectionClearAdmin).await?;
        Ok(())
    }

    /// Round-trip a message through the server
    pub async fn echo(&mut self, message: &str) -> Result<EchoReply> {
        info!(message, "Echo");
        let kind = CommandKind::Echo {
            message: message.to_string(),
        };
        Ok(self.perform(kind).await?.into_echo()?)
    }

    /// Complete a started exchange, checking its request ID
    pub async fn receive(&mut self, exchange: Exchange<ServiceCommand>) -> Result<Reply> {
        Ok(self.connection.receive(exchange).await?)
    }

    /// Decode the next response with `command`, without an ID check
    ///
    /// Calling this more times than requests were sent waits for a frame
    /// that never comes, or fails once the transport closes.
    pub async fn receive_unchecked(&mut self, command: &ServiceCommand) -> Result<Reply> {
        Ok(self.connection.receive_unchecked(command).await?)
    }
}

impl<T: FrameTransport + 'static> Session<T> {
    /// Hand the connection to a dispatch task
    ///
    /// Every exchange still in flight must be received first; frames that
    /// belong to earlier sends would be dropped as unknown.
    pub fn into_dispatcher(self) -> SharedSession {
        SharedSession {
            dispatcher: Dispatcher::spawn(self.connection.into_transport()),
            context_id: self.context_id,
        }
    }
}

/// Session whose responses are routed by request ID
///
/// Clone it into as many tasks as needed.
#[derive(Debug, Clone)]
pub struct SharedSession {
    dispatcher: Dispatcher,
    context_id: String,
}

impl SharedSession {
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run any command kind in this session's context
    pub async fn perform(&self, kind: CommandKind) -> Result<Reply> {
        let command = ServiceCommand::new(self.context_id.clone(), kind);
        Ok(self.dispatcher.perform(command).await?)
    }
}
