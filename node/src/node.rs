//! Node wiring: storage, contract client, workflows, servers and
//! background tasks.

use std::sync::Arc;
use std::time::Duration;

use chainvote_contract::{
    ChainProvider, JsonRpcClient, LoggedEvent, RpcVotingContract, VotingContract,
};
use chainvote_rpc::{ApiMetrics, ApiState, CaptureSettings, RpcServer};
use chainvote_store::HiddenCandidateStore;
use chainvote_store_lmdb::LmdbEnvironment;
use chainvote_types::{Clock, SystemClock};
use chainvote_verification::{OtpService, RandomSource, SimulatedBiometricVerifier, SystemRandom};
use chainvote_websocket::{WebSocketServer, WsState};
use chainvote_workflow::{
    AdminWorkflow, Ballot, IdentityCheck, RegistrationEvent, VoterRegistry, VotingDesk,
    WalletSessions,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::events::EventPoller;
use crate::tracing_spans::{contract_call_span, node_task_span};
use crate::{NodeConfig, NodeError, ShutdownController};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_DBS: u32 = 8;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A running chainvote back end.
pub struct ChainvoteNode {
    pub config: NodeConfig,
    pub environment: Arc<LmdbEnvironment>,
    pub api: Arc<ApiState>,
    pub ws_state: Arc<WsState>,
    pub shutdown: Arc<ShutdownController>,
    contract: Arc<dyn VotingContract>,
    chain: Arc<dyn ChainProvider>,
    registration_tx: broadcast::Sender<RegistrationEvent>,
    contract_event_tx: broadcast::Sender<LoggedEvent>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ChainvoteNode {
    /// Build a node talking to the configured Ethereum endpoint.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let contract_address = config.contract_address()?;
        let contract = RpcVotingContract::new(
            JsonRpcClient::new(config.eth_rpc_url.clone(), config.rpc_timeout())?,
            contract_address,
            config.receipt_polling(),
        )
        .with_log_window(config.event_block_window);
        let chain = JsonRpcClient::new(config.eth_rpc_url.clone(), config.rpc_timeout())?;
        Self::with_contract(config, Arc::new(contract), Arc::new(chain))
    }

    /// Build a node over any contract and chain implementation.
    pub fn with_contract(
        config: NodeConfig,
        contract: Arc<dyn VotingContract>,
        chain: Arc<dyn ChainProvider>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let environment = Arc::new(LmdbEnvironment::open(
            &config.data_dir,
            MAX_DBS,
            config.lmdb_map_size,
        )?);

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let random: Arc<dyn RandomSource> = Arc::new(SystemRandom);
        let (registration_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (contract_event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let registry = Arc::new(
            VoterRegistry::new(Arc::new(environment.registration_store()), clock.clone())
                .with_events(registration_tx.clone()),
        );
        let otp = Arc::new(OtpService::new(
            Arc::new(environment.otp_store()),
            clock,
            random.clone(),
            config.otp_ttl_secs,
            config.otp_demo_mode,
        ));
        let hidden: Arc<dyn HiddenCandidateStore> =
            Arc::new(environment.hidden_candidate_store());
        let mut desk = VotingDesk::new(contract.clone()).with_hidden_candidates(hidden.clone());
        if config.require_otp_for_vote {
            desk = desk.with_otp(otp.clone());
        }
        let verifier = Arc::new(SimulatedBiometricVerifier::new(
            config.biometric_failure_rate,
            random.clone(),
        ));
        let metrics = ApiMetrics::new().map_err(|e| NodeError::Metrics(e.to_string()))?;

        let api = Arc::new(ApiState {
            admin: AdminWorkflow::new(registry.clone(), contract.clone()),
            ballot: Ballot::new(contract.clone(), hidden),
            desk,
            sessions: WalletSessions::new(
                chain.clone(),
                contract.clone(),
                config.expected_chain(),
            ),
            identity: IdentityCheck::new(registry.clone(), verifier),
            registry,
            otp,
            contract: contract.clone(),
            random,
            capture: CaptureSettings {
                face_demo_mode: config.face_demo_mode,
                fingerprint_mode: config.fingerprint_mode,
            },
            metrics,
        });

        Ok(Self {
            config,
            environment,
            api,
            ws_state: Arc::new(WsState::new(EVENT_CHANNEL_CAPACITY)),
            shutdown: Arc::new(ShutdownController::new()),
            contract,
            chain,
            registration_tx,
            contract_event_tx,
            task_handles: Vec::new(),
        })
    }

    /// Spawn the servers and background tasks, then return.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        tracing::info!(
            http = %self.config.http_addr(),
            rpc_url = %self.config.eth_rpc_url,
            contract = %self.config.contract_address,
            "chainvote node starting"
        );
        self.check_chain().await;

        // Registry and contract events fan out to WebSocket clients.
        let ws = self.ws_state.clone();
        let rx = self.registration_tx.subscribe();
        self.spawn_bridge("registration_bridge", rx, move |e| ws.publish_registration(e));
        let ws = self.ws_state.clone();
        let rx = self.contract_event_tx.subscribe();
        self.spawn_bridge("contract_bridge", rx, move |e| ws.publish_contract(e));

        let poller = EventPoller::new(
            self.contract.clone(),
            Arc::new(self.environment.meta_store()),
            self.config.event_start_block,
            self.contract_event_tx.clone(),
        );
        let interval = self.config.event_poll_interval();
        let shutdown_rx = self.shutdown.subscribe();
        self.task_handles.push(tokio::spawn(
            poller
                .run(interval, shutdown_rx)
                .instrument(node_task_span("event_poller")),
        ));

        let rpc_server = RpcServer::new(self.config.http_addr(), self.api.clone());
        let shutdown_rx = self.shutdown.subscribe();
        let shutdown = self.shutdown.clone();
        self.task_handles.push(tokio::spawn(
            async move {
                if let Err(e) = rpc_server.start(shutdown_rx).await {
                    tracing::error!(error = %e, "HTTP server failed");
                    shutdown.shutdown();
                }
            }
            .instrument(node_task_span("http")),
        ));

        if self.config.enable_websocket {
            let ws_server =
                WebSocketServer::with_state(self.config.websocket_addr(), self.ws_state.clone());
            let shutdown_rx = self.shutdown.subscribe();
            self.task_handles.push(tokio::spawn(
                async move {
                    if let Err(e) = ws_server.start(shutdown_rx).await {
                        tracing::error!(error = %e, "WebSocket server failed");
                    }
                }
                .instrument(node_task_span("websocket")),
            ));
        }

        tracing::info!("chainvote node started");
        Ok(())
    }

    /// Start, wait for SIGINT/SIGTERM (or an internal shutdown), then stop.
    pub async fn run(&mut self) -> Result<(), NodeError> {
        let mut internal = self.shutdown.subscribe();
        self.start().await?;
        tokio::select! {
            res = self.shutdown.wait_for_signal() => res?,
            _ = internal.recv() => tracing::warn!("shutdown requested by a node task"),
        }
        self.stop().await
    }

    /// Stop the node gracefully.
    ///
    /// Signals every task, flushes LMDB and waits for tasks with a timeout.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("chainvote node stopping");
        self.shutdown.shutdown();

        if let Err(e) = self.environment.force_sync() {
            tracing::warn!(error = %e, "LMDB force_sync failed");
        }

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(timeout = ?SHUTDOWN_TIMEOUT, "tasks still running after shutdown timeout");
            return Err(NodeError::ShutdownTimeout);
        }

        tracing::info!("chainvote node stopped");
        Ok(())
    }

    /// Log the connected chain and contract admin. Failures only warn: the
    /// Ethereum node may come up after this service.
    async fn check_chain(&self) {
        match self.chain.chain_id().instrument(contract_call_span("eth_chainId")).await {
            Ok(id) if id == self.config.expected_chain() => {
                tracing::info!(chain = %id.network_name(), "connected to chain");
            }
            Ok(id) => tracing::warn!(
                connected = %id.network_name(),
                expected = %self.config.expected_chain().network_name(),
                "Ethereum node is on an unexpected chain"
            ),
            Err(e) => tracing::warn!(error = %e, "could not query chain id"),
        }
        match self.contract.admin().instrument(contract_call_span("admin")).await {
            Ok(admin) => tracing::info!(%admin, "voting contract reachable"),
            Err(e) => tracing::warn!(error = %e, "could not read contract admin"),
        }
    }

    fn spawn_bridge<T, F>(&mut self, name: &'static str, mut rx: broadcast::Receiver<T>, publish: F)
    where
        T: Clone + Send + 'static,
        F: Fn(&T) + Send + 'static,
    {
        let mut shutdown_rx = self.shutdown.subscribe();
        let handle = tokio::spawn(
            async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.recv() => break,
                        msg = rx.recv() => match msg {
                            Ok(event) => publish(&event),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!(skipped = n, "event bridge lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
            }
            .instrument(node_task_span(name)),
        );
        self.task_handles.push(handle);
    }
}
