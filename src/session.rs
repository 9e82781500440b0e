//! Per-connection session state machine
//!
//! Turns inbound lines into login, rename, chat, whisper, list and exit
//! operations against the `ChatServer`. A session moves
//! `Unauthenticated -> Active -> Terminated` and never leaves `Terminated`.

use tracing::{debug, info, warn};

use crate::command::{self, Command};
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::participant::Outbound;
use crate::server::{ServerHandle, WhisperOutcome};
use crate::types::ClientId;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no name claimed yet
    Unauthenticated,
    /// Registered under `name`
    Active { name: String },
    /// Finished; no further registry operations except unregister
    Terminated,
}

/// One client's protocol driver
pub struct ClientSession {
    client_id: ClientId,
    server: ServerHandle,
    outbound: Outbound,
    state: SessionState,
}

impl ClientSession {
    pub fn new(client_id: ClientId, server: ServerHandle, outbound: Outbound) -> Self {
        Self {
            client_id,
            server,
            outbound,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Greet a freshly opened connection with the login prompt
    pub fn open(&self) -> Result<(), AppError> {
        self.send(ServerMessage::Prompt)
    }

    /// Process one inbound line
    pub async fn handle_line(&mut self, line: &str) -> Result<(), AppError> {
        match self.state {
            SessionState::Unauthenticated => self.login(line).await,
            SessionState::Active { .. } => self.dispatch(command::parse(line)).await,
            SessionState::Terminated => {
                debug!("Ignoring line from terminated session {}", self.client_id);
                Ok(())
            }
        }
    }

    /// Leave the registry silently and terminate; idempotent
    pub async fn close(&mut self) -> Result<(), AppError> {
        if let SessionState::Active { name } = &self.state {
            debug!("Closing session {} ('{}')", self.client_id, name);
        }
        self.state = SessionState::Terminated;
        self.server.unregister(self.client_id).await?;
        Ok(())
    }

    async fn login(&mut self, candidate: &str) -> Result<(), AppError> {
        match self
            .server
            .try_register(self.client_id, candidate, self.outbound.clone())
            .await?
        {
            Ok(registration) => {
                self.send(ServerMessage::NameAccepted {
                    name: registration.name.clone(),
                })?;
                self.state = SessionState::Active {
                    name: registration.name,
                };
                Ok(())
            }
            Err(rejection) => {
                self.send(rejection.into())?;
                self.send(ServerMessage::Prompt)
            }
        }
    }

    async fn dispatch(&mut self, command: Command<'_>) -> Result<(), AppError> {
        match command {
            Command::Blank => self.send(ServerMessage::Spam),
            Command::Say(text) => self.server.chat(self.client_id, text).await,
            Command::List => {
                let names = self.server.list_names().await?;
                self.send(ServerMessage::UserList { names })
            }
            Command::Whisper { target, body } => self.whisper(target, body).await,
            Command::Rename(candidate) => self.rename(candidate).await,
            Command::Exit => self.exit().await,
        }
    }

    async fn whisper(&mut self, target: &str, body: &str) -> Result<(), AppError> {
        match self.server.whisper(self.client_id, target, body).await? {
            WhisperOutcome::Delivered => Ok(()),
            WhisperOutcome::ToSelf => self.send(ServerMessage::Lonely),
            WhisperOutcome::NoRecipient => self.send(ServerMessage::NoSuchUser {
                name: target.to_string(),
            }),
            WhisperOutcome::NotMember => {
                if let SessionState::Active { name } = &self.state {
                    warn!("Client {} ('{}') is no longer registered", self.client_id, name);
                }
                self.state = SessionState::Terminated;
                Ok(())
            }
        }
    }

    /// The join or rename notice goes out with the registry change itself
    async fn rename(&mut self, candidate: &str) -> Result<(), AppError> {
        match self
            .server
            .try_register(self.client_id, candidate, self.outbound.clone())
            .await?
        {
            Ok(registration) => {
                self.send(ServerMessage::NameAccepted {
                    name: registration.name.clone(),
                })?;
                self.state = SessionState::Active {
                    name: registration.name,
                };
                Ok(())
            }
            Err(rejection) => self.send(rejection.into()),
        }
    }

    /// Terminal transition: nothing else on the line is executed
    async fn exit(&mut self) -> Result<(), AppError> {
        let state = std::mem::replace(&mut self.state, SessionState::Terminated);
        if let Some(name) = self.server.leave(self.client_id).await? {
            info!("Client {} ('{}') left the chat", self.client_id, name);
        } else if let SessionState::Active { name } = state {
            debug!("Client {} ('{}') was already gone on exit", self.client_id, name);
        }
        Ok(())
    }

    /// Queue a line for this client; a full queue means it stopped reading
    fn send(&self, msg: ServerMessage) -> Result<(), AppError> {
        if let Err(err) = self.outbound.send(msg) {
            self.outbound.evict();
            return Err(err.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ChatServer;
    use tokio::sync::mpsc;

    const QUEUE: usize = 64;

    struct TestClient {
        session: ClientSession,
        rx: mpsc::Receiver<ServerMessage>,
    }

    impl TestClient {
        fn connect(server: &ServerHandle) -> Self {
            let (tx, rx) = Outbound::channel(QUEUE);
            let session = ClientSession::new(ClientId::new(), server.clone(), tx);
            session.open().unwrap();
            let mut client = Self { session, rx };
            assert_eq!(client.next(), Some(ServerMessage::Prompt));
            client
        }

        async fn login(server: &ServerHandle, name: &str) -> Self {
            let mut client = Self::connect(server);
            client.line(name).await;
            assert_eq!(
                client.next(),
                Some(ServerMessage::NameAccepted { name: name.into() })
            );
            client
        }

        async fn line(&mut self, line: &str) {
            self.session.handle_line(line).await.unwrap();
        }

        fn next(&mut self) -> Option<ServerMessage> {
            self.rx.try_recv().ok()
        }
    }

    /// Wait until every command queued so far has been applied
    async fn settle(server: &ServerHandle) {
        server.list_names().await.unwrap();
    }

    #[tokio::test]
    async fn test_login_success() {
        let server = ChatServer::start(16);
        let alice = TestClient::login(&server, "alice").await;

        assert_eq!(
            alice.session.state(),
            &SessionState::Active {
                name: "alice".into()
            }
        );
    }

    #[tokio::test]
    async fn test_login_taken_reprompts() {
        let server = ChatServer::start(16);
        let _alice = TestClient::login(&server, "alice").await;
        let mut other = TestClient::connect(&server);

        other.line("alice").await;

        assert_eq!(other.next(), Some(ServerMessage::NameTaken));
        assert_eq!(other.next(), Some(ServerMessage::Prompt));
        assert_eq!(other.session.state(), &SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_invalid_and_reserved() {
        let server = ChatServer::start(16);
        let mut client = TestClient::connect(&server);

        client.line("two words").await;
        assert_eq!(client.next(), Some(ServerMessage::InvalidName));
        assert_eq!(client.next(), Some(ServerMessage::Prompt));

        client.line("Server").await;
        assert_eq!(client.next(), Some(ServerMessage::NameTaken));
        assert_eq!(client.next(), Some(ServerMessage::Prompt));

        // commands are just name attempts before login
        client.line("/exit").await;
        assert_eq!(client.next(), Some(ServerMessage::InvalidName));
        assert!(!client.session.is_terminated());
    }

    #[tokio::test]
    async fn test_join_broadcast_excludes_joiner() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;
        let mut bob = TestClient::login(&server, "bob").await;
        settle(&server).await;

        assert_eq!(
            alice.next(),
            Some(ServerMessage::UserJoined { name: "bob".into() })
        );
        assert_eq!(bob.next(), None);
    }

    #[tokio::test]
    async fn test_blank_line_is_spam() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;

        alice.line("   ").await;

        assert_eq!(alice.next(), Some(ServerMessage::Spam));
    }

    #[tokio::test]
    async fn test_say_reaches_others_only() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;
        let mut bob = TestClient::login(&server, "bob").await;
        settle(&server).await;
        alice.next();

        alice.line("hello").await;
        settle(&server).await;

        assert_eq!(
            bob.next(),
            Some(ServerMessage::Chat {
                from: "alice".into(),
                text: "hello".into()
            })
        );
        assert_eq!(alice.next(), None);
    }

    #[tokio::test]
    async fn test_whisper() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;
        let mut bob = TestClient::login(&server, "bob").await;
        let mut carol = TestClient::login(&server, "carol").await;
        settle(&server).await;
        while alice.next().is_some() {}
        while bob.next().is_some() {}

        alice.line("/whisper bob hi").await;

        assert_eq!(
            bob.next(),
            Some(ServerMessage::Private {
                from: "alice".into(),
                body: "hi".into()
            })
        );
        assert_eq!(alice.next(), None);
        assert_eq!(carol.next(), None);
    }

    #[tokio::test]
    async fn test_whisper_self_and_missing() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;

        alice.line("/whisper alice hi").await;
        assert_eq!(alice.next(), Some(ServerMessage::Lonely));

        alice.line("/whisper Nobody hi").await;
        assert_eq!(
            alice.next(),
            Some(ServerMessage::NoSuchUser {
                name: "Nobody".into()
            })
        );
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let server = ChatServer::start(16);
        let _carol = TestClient::login(&server, "carol").await;
        let mut alice = TestClient::login(&server, "alice").await;
        let _bob = TestClient::login(&server, "bob").await;
        settle(&server).await;
        while alice.next().is_some() {}

        alice.line("/list").await;

        assert_eq!(
            alice.next(),
            Some(ServerMessage::UserList {
                names: vec!["alice".into(), "bob".into(), "carol".into()]
            })
        );
    }

    #[tokio::test]
    async fn test_rename_broadcasts_change() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;
        let mut bob = TestClient::login(&server, "bob").await;
        settle(&server).await;
        alice.next();

        alice.line("/name alicia").await;
        settle(&server).await;

        assert_eq!(
            alice.next(),
            Some(ServerMessage::NameAccepted {
                name: "alicia".into()
            })
        );
        assert_eq!(
            bob.next(),
            Some(ServerMessage::UserRenamed {
                old: "alice".into(),
                new: "alicia".into()
            })
        );
        assert_eq!(
            alice.session.state(),
            &SessionState::Active {
                name: "alicia".into()
            }
        );
    }

    #[tokio::test]
    async fn test_rename_to_same_name_is_silent() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;
        let mut bob = TestClient::login(&server, "bob").await;
        settle(&server).await;
        alice.next();

        alice.line("/name alice").await;
        settle(&server).await;

        assert_eq!(
            alice.next(),
            Some(ServerMessage::NameAccepted {
                name: "alice".into()
            })
        );
        assert_eq!(bob.next(), None);
    }

    #[tokio::test]
    async fn test_rename_rejected_keeps_name() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;
        let _bob = TestClient::login(&server, "bob").await;
        settle(&server).await;
        alice.next();

        alice.line("/name BOB").await;
        assert_eq!(alice.next(), Some(ServerMessage::NameTaken));

        alice.line("/name").await;
        assert_eq!(alice.next(), Some(ServerMessage::InvalidName));

        assert_eq!(
            alice.session.state(),
            &SessionState::Active {
                name: "alice".into()
            }
        );
    }

    #[tokio::test]
    async fn test_exit_is_terminal() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;
        let mut bob = TestClient::login(&server, "bob").await;
        settle(&server).await;
        alice.next();

        alice.line("/exit carol").await;
        settle(&server).await;

        assert!(alice.session.is_terminated());
        assert_eq!(
            bob.next(),
            Some(ServerMessage::UserLeft {
                name: "alice".into()
            })
        );
        assert_eq!(bob.next(), None);
        assert_eq!(alice.next(), None);
        assert_eq!(server.list_names().await.unwrap(), vec!["bob".to_string()]);

        // further lines do nothing
        alice.line("/name carol").await;
        assert_eq!(server.list_names().await.unwrap(), vec!["bob".to_string()]);

        alice.session.close().await.unwrap();
        assert_eq!(server.list_names().await.unwrap(), vec!["bob".to_string()]);
    }

    #[tokio::test]
    async fn test_close_frees_name_without_broadcast() {
        let server = ChatServer::start(16);
        let mut alice = TestClient::login(&server, "alice").await;
        let mut bob = TestClient::login(&server, "bob").await;
        settle(&server).await;
        alice.next();

        bob.session.close().await.unwrap();
        bob.session.close().await.unwrap();

        assert_eq!(server.list_names().await.unwrap(), vec!["alice".to_string()]);
        assert_eq!(alice.next(), None);
        assert!(bob.session.is_terminated());
    }

    #[tokio::test]
    async fn test_full_queue_reports_slow_reader() {
        let server = ChatServer::start(16);
        let (tx, _rx) = Outbound::channel(1);
        let session = ClientSession::new(ClientId::new(), server, tx.clone());

        session.open().unwrap();
        let result = session.open();

        assert!(matches!(result, Err(AppError::SlowReader)));
        assert!(tx.is_evicted());
    }
}
