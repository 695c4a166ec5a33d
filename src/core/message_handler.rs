//! Event handlers of a connection session
//!
//! Every inbound event goes through the rate limiter, then its validator, then
//! the room registry and dispatcher. Failures stay inside the handler: they are
//! logged, optionally reported to the sender, and the connection keeps running.

use serde_json::Value;

use crate::core::message_types::{Envelope, EventKind, Outbound, ServerEvent};
use crate::core::session::Session;
use crate::core::validator::{
    CandidateRequest, ChatRequest, JoinRequest, LeaveRequest, SessionDescription, StartRequest,
};
use crate::error::{RelayError, Result};

impl Session {
    /// Process one inbound text frame
    pub fn handle_text(&mut self, text: &str) {
        if !self.is_connected() {
            log::debug!("Ignoring frame for disconnected session {}", self.id());
            return;
        }

        let max = self.relay.limits().max_message_size;
        if text.len() > max {
            log::warn!(
                "{} from {}",
                RelayError::MessageTooLarge(text.len()),
                self.id()
            );
            return;
        }

        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!(
                    "{} from {}",
                    RelayError::MessageParseError(e.to_string()),
                    self.id()
                );
                return;
            }
        };

        let Some(kind) = EventKind::from_name(&envelope.event) else {
            log::warn!("{} from {}", RelayError::UnknownEvent(envelope.event), self.id());
            return;
        };

        self.handle_event(kind, &envelope.data);
    }

    /// Run the handler for one event, containing any failure
    pub fn handle_event(&mut self, kind: EventKind, data: &Value) {
        let started = std::time::Instant::now();

        let relay = self.relay.clone();
        let timeline = relay.timeline();
        let result = match kind {
            EventKind::Subscribe => self.on_subscribe(data),
            EventKind::NewUserStart => self.on_new_user_start(data),
            EventKind::Sdp => self.on_sdp(data),
            EventKind::IceCandidates => self.on_ice_candidates(data),
            EventKind::Chat => self.on_chat(data),
            EventKind::LeaveRoom => self.on_leave_room(data),
        };

        if let Err(e) = result {
            self.report(kind, e);
        }
        drop(timeline);

        log::trace!(
            "Handled '{}' for {} in {}us",
            kind,
            self.id(),
            started.elapsed().as_micros()
        );
    }

    fn report(&self, kind: EventKind, error: RelayError) {
        if error.is_rejection() {
            log::warn!("Rejected '{}' from {}: {}", kind, self.id(), error);
        } else {
            log::error!(
                "Internal fault in '{}' handler for connection {}: {}",
                kind,
                self.id(),
                error
            );
        }

        if kind.surfaces_errors() {
            if let Some(message) = error.client_message() {
                self.reply(&ServerEvent::error(message));
            }
        }
    }

    fn admit(&self, kind: EventKind) -> Result<()> {
        if self.relay.rate_limiter().admit(self.id(), kind)? {
            Ok(())
        } else {
            Err(RelayError::RateLimited { event: kind })
        }
    }

    /// Participant ids are not authenticated; note when one looks borrowed
    fn note_sender(&self, sender: &str) {
        if sender != self.id() && !self.aliases.contains(sender) {
            log::debug!(
                "Connection {} sent as unregistered participant {}",
                self.id(),
                sender
            );
        }
    }

    fn on_subscribe(&mut self, data: &Value) -> Result<()> {
        self.admit(EventKind::Subscribe)?;
        let request = JoinRequest::from_value(data)?;

        let id = self.id().to_string();
        let sizes = self
            .relay
            .rooms()
            .join_all(&id, &[request.room.as_str(), request.participant_id.as_str()])?;

        self.rooms.insert(request.room.clone());
        self.aliases.insert(request.participant_id.clone());
        log::info!(
            "Client {} joined room {} as {} ({} members)",
            id,
            request.room,
            request.participant_id,
            sizes.first().copied().unwrap_or_default()
        );

        let notified = self.relay.dispatcher().to_room(
            &request.room,
            &id,
            Outbound::NewUser {
                socket_id: request.participant_id,
            },
        )?;
        log::debug!("new user notice sent to {} members of {}", notified, request.room);
        Ok(())
    }

    fn on_new_user_start(&mut self, data: &Value) -> Result<()> {
        self.admit(EventKind::NewUserStart)?;
        let request = StartRequest::from_value(data)?;
        self.note_sender(&request.sender);

        self.relay.dispatcher().to_participant(
            &request.to,
            Outbound::NewUserStart {
                sender: request.sender,
            },
        )?;
        Ok(())
    }

    fn on_sdp(&mut self, data: &Value) -> Result<()> {
        self.admit(EventKind::Sdp)?;
        let request = SessionDescription::from_value(data)?;
        self.note_sender(&request.sender);

        log::debug!(
            "Relaying {:?} from {} to {}",
            request.kind,
            request.sender,
            request.to
        );
        self.relay.dispatcher().to_participant(
            &request.to,
            Outbound::Sdp {
                description: request.description,
                sender: request.sender,
            },
        )?;
        Ok(())
    }

    fn on_ice_candidates(&mut self, data: &Value) -> Result<()> {
        self.admit(EventKind::IceCandidates)?;
        let request = CandidateRequest::from_value(data)?;
        self.note_sender(&request.sender);

        self.relay.dispatcher().to_participant(
            &request.to,
            Outbound::IceCandidates {
                candidate: request.candidate.into_value(),
                sender: request.sender,
            },
        )?;
        Ok(())
    }

    fn on_chat(&mut self, data: &Value) -> Result<()> {
        self.admit(EventKind::Chat)?;
        let request = ChatRequest::from_value(data)?;
        self.note_sender(&request.sender);

        let id = self.id().to_string();
        let sent = self.relay.dispatcher().to_room(
            &request.room,
            &id,
            Outbound::Chat {
                sender: request.sender,
                msg: request.msg,
            },
        )?;
        log::debug!("Chat from {} sent to {} users in room {}", id, sent, request.room);
        Ok(())
    }

    fn on_leave_room(&mut self, data: &Value) -> Result<()> {
        let Some(room) = LeaveRequest::from_value(data).room else {
            return Ok(());
        };

        let id = self.id().to_string();
        // The connection's own room lives as long as the connection
        if room == id {
            return Ok(());
        }

        let remaining = self.relay.rooms().leave(&id, &room)?;
        self.rooms.remove(&room);
        log::info!("Client {} left room {}", id, room);

        if remaining.is_some() {
            self.relay.dispatcher().to_room(
                &room,
                &id,
                Outbound::UserLeft {
                    socket_id: id.clone(),
                },
            )?;
        }
        Ok(())
    }
}
