use std::sync::Arc;

use relay_core::{EventBus, RelayError, RunEngine, SessionDirectory};
use relay_settings::AgentSettings;
use tracing::{debug, info, instrument};

use crate::connection::ProtocolConnection;
use crate::schema::{
    AgentCapabilities, AuthenticateRequest, CancelNotification, InitializeRequest, InitializeResponse,
    LoadSessionRequest, NewSessionRequest, NewSessionResponse, PromptCapabilities, PromptRequest, PromptResponse,
};
use crate::turn::TurnRelay;

/// Agent-side request handlers. The transport decodes requests and calls
/// these; prompt streaming goes out through the attached connection.
pub struct AcpAgent {
    settings: AgentSettings,
    sessions: Arc<dyn SessionDirectory>,
    relay: TurnRelay,
}

impl AcpAgent {
    pub fn new(
        settings: AgentSettings,
        sessions: Arc<dyn SessionDirectory>,
        engine: Arc<dyn RunEngine>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        let relay = TurnRelay::new(Arc::clone(&sessions), engine, bus);
        Self {
            settings,
            sessions,
            relay,
        }
    }

    pub fn set_connection(&self, connection: Arc<dyn ProtocolConnection>) {
        self.relay.set_connection(connection);
    }

    pub fn relay(&self) -> &TurnRelay {
        &self.relay
    }

    pub fn initialize(&self, request: InitializeRequest) -> InitializeResponse {
        debug!(client_version = request.protocol_version, "initialize");
        InitializeResponse {
            protocol_version: self.settings.protocol_version,
            agent_capabilities: AgentCapabilities {
                load_session: self.settings.load_session,
                prompt_capabilities: PromptCapabilities {
                    embedded_context: self.settings.embedded_context,
                },
            },
            auth_methods: Vec::new(),
        }
    }

    pub fn authenticate(&self, request: AuthenticateRequest) -> Result<(), RelayError> {
        debug!(method_id = %request.method_id, "authenticate accepted");
        Ok(())
    }

    #[instrument(skip_all, fields(cwd = %request.cwd))]
    pub async fn new_session(&self, request: NewSessionRequest) -> Result<NewSessionResponse, RelayError> {
        let session = self.sessions.create(&self.settings.session_title).await?;
        info!(session_id = %session.id, "session created");
        Ok(NewSessionResponse { session_id: session.id })
    }

    /// Loading is not advertised; the request is accepted and ignored.
    pub fn load_session(&self, request: LoadSessionRequest) -> Result<(), RelayError> {
        debug!(session_id = %request.session_id, "load_session ignored");
        Ok(())
    }

    pub async fn cancel(&self, notification: CancelNotification) -> Result<(), RelayError> {
        self.relay.cancel_turn(&notification.session_id).await
    }

    pub async fn prompt(&self, request: PromptRequest) -> Result<PromptResponse, RelayError> {
        let stop_reason = self.relay.start_turn(&request.session_id, &request.prompt).await?;
        Ok(PromptResponse { stop_reason })
    }
}
