// ABOUTME: Builder for session clients: engine, runtime, configuration and initial credentials
// ABOUTME: Initial values go through the regular setters so they reach the engine like any later change

use crate::client::config::SessionConfig;
use crate::client::error::{SessionError, SessionResult};
use crate::client::session::SessionClient;
use crate::datatypes::MessageSettings;
use crate::engine::ProtocolEngine;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Builder for [`SessionClient`]
///
/// ```rust,no_run
/// use smpp_session::client::{DrainPolicy, SessionClient, SessionConfig};
/// use smpp_session::datatypes::{DataCoding, MessageSettings};
/// # use smpp_session::engine::ProtocolEngine;
/// # use std::sync::Arc;
///
/// # fn example(engine: Arc<dyn ProtocolEngine>, runtime: tokio::runtime::Handle)
/// #     -> Result<(), Box<dyn std::error::Error>> {
/// let session = SessionClient::builder(engine)
///     .runtime(runtime)
///     .config(SessionConfig::new().with_drain_policy(DrainPolicy::Discard))
///     .system_id("esme")
///     .password("secret")
///     .system_type("MYAPP")
///     .addresses(["1000-1099", "2000"])
///     .settings(MessageSettings::default().with_deliver_data_coding(DataCoding::Latin1))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    engine: Arc<dyn ProtocolEngine>,
    config: SessionConfig,
    runtime: Option<Handle>,
    system_id: Option<String>,
    password: Option<String>,
    system_type: Option<String>,
    addresses: Vec<String>,
    settings: Option<MessageSettings>,
}

impl SessionBuilder {
    /// Start a builder for a session on top of `engine`
    pub fn new(engine: Arc<dyn ProtocolEngine>) -> Self {
        Self {
            engine,
            config: SessionConfig::default(),
            runtime: None,
            system_id: None,
            password: None,
            system_type: None,
            addresses: Vec::new(),
            settings: None,
        }
    }

    /// Use this configuration instead of the default
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Run dispatch workers on this runtime instead of the current one
    ///
    /// The runtime must outlive the session. Once it shuts down, inbound
    /// messages and connection-loss events are dropped with a warning.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Initial system id
    pub fn system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = Some(system_id.into());
        self
    }

    /// Initial password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Initial system type
    pub fn system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = Some(system_type.into());
        self
    }

    /// Add one address-range pattern
    pub fn address(mut self, pattern: impl Into<String>) -> Self {
        self.addresses.push(pattern.into());
        self
    }

    /// Add several address-range patterns
    pub fn addresses<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.addresses.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Initial message settings
    pub fn settings(mut self, settings: MessageSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Create the session and allocate its engine handle
    ///
    /// Fails with `NoRuntime` when no runtime was given and none is
    /// running, and with `InvalidAddress` for a malformed pattern; in the
    /// latter case the engine handle is released again.
    pub fn build(self) -> SessionResult<SessionClient> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| SessionError::NoRuntime)?,
        };

        let client = SessionClient::create(self.engine, self.config, runtime);
        let applied = Self::apply_initial(
            &client,
            self.system_id,
            self.password,
            self.system_type,
            &self.addresses,
            self.settings,
        );
        if let Err(err) = applied {
            // Release the handle even when drop would not
            client.dispose();
            return Err(err);
        }
        Ok(client)
    }

    fn apply_initial(
        client: &SessionClient,
        system_id: Option<String>,
        password: Option<String>,
        system_type: Option<String>,
        addresses: &[String],
        settings: Option<MessageSettings>,
    ) -> SessionResult<()> {
        if let Some(system_id) = system_id {
            client.set_system_id(system_id)?;
        }
        if let Some(password) = password {
            client.set_password(password)?;
        }
        if let Some(system_type) = system_type {
            client.set_system_type(system_type)?;
        }
        for pattern in addresses {
            client.add_address(pattern)?;
        }
        if let Some(settings) = settings {
            client.set_settings(settings)?;
        }
        Ok(())
    }
}
