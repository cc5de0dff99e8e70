//! Host-side endpoints of the three channels
//!
//! Each bridge holds one port per side, bound as handshakes arrive. A bridge
//! only accepts outgoing commands once its channel is available; commands
//! issued earlier are dropped, not queued.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::decoration::{Decoration, DecorationChange, DecorationTemplate};
use crate::error::ProtocolError;
use crate::protocol::{
    AreaEvent, ChannelName, DecorationCommand, FrameSide, MessagePort, SelectionCommand,
    SelectionReply,
};
use crate::selection::Selection;

/// Shared handling of per-side endpoints
pub trait ChannelBridge {
    fn channel(&self) -> ChannelName;

    /// Attach the endpoint a side transferred in its handshake
    fn bind(&mut self, side: FrameSide, port: MessagePort);

    /// Drop every endpoint and mark the channel unavailable
    fn reset(&mut self);

    fn set_available(&mut self, available: bool);

    fn is_available(&self) -> bool;
}

#[derive(Debug, Default)]
struct Endpoints {
    ports: BTreeMap<FrameSide, MessagePort>,
    available: bool,
}

impl Endpoints {
    fn port(&self, channel: ChannelName, side: FrameSide) -> Result<&MessagePort, ProtocolError> {
        if !self.available {
            return Err(ProtocolError::Unavailable { channel, side });
        }
        self.ports
            .get(&side)
            .ok_or(ProtocolError::Unavailable { channel, side })
    }
}

macro_rules! channel_bridge {
    ($bridge:ty, $channel:expr) => {
        impl ChannelBridge for $bridge {
            fn channel(&self) -> ChannelName {
                $channel
            }

            fn bind(&mut self, side: FrameSide, port: MessagePort) {
                self.endpoints.ports.insert(side, port);
                self.on_bind(side);
            }

            fn reset(&mut self) {
                self.endpoints = Endpoints::default();
                self.on_reset();
            }

            fn set_available(&mut self, available: bool) {
                self.endpoints.available = available;
            }

            fn is_available(&self) -> bool {
                self.endpoints.available
            }
        }
    };
}

/// Receives area events from every side
#[derive(Debug, Default)]
pub struct AreaBridge {
    endpoints: Endpoints,
}

channel_bridge!(AreaBridge, ChannelName::Area);

impl AreaBridge {
    fn on_bind(&mut self, _side: FrameSide) {}

    fn on_reset(&mut self) {}

    /// Every queued event, tagged with its side
    ///
    /// Events are read even before availability so a side's content size is
    /// not lost while the other side is still loading.
    pub fn drain(&mut self) -> Vec<(FrameSide, AreaEvent)> {
        let mut events = Vec::new();
        for (side, port) in self.endpoints.ports.iter_mut() {
            for event in port.drain::<AreaEvent>() {
                match event {
                    Ok(event) => events.push((*side, event)),
                    Err(e) => warn!(side = %side, "Dropping area message: {}", e),
                }
            }
        }
        events
    }
}

/// Issues selection requests and matches replies to them
#[derive(Debug, Default)]
pub struct SelectionBridge {
    endpoints: Endpoints,
    pending: HashMap<String, FrameSide>,
}

channel_bridge!(SelectionBridge, ChannelName::Selection);

impl SelectionBridge {
    fn on_bind(&mut self, _side: FrameSide) {}

    fn on_reset(&mut self) {
        self.pending.clear();
    }

    /// Ask `side` for its selection; returns the request id the reply will carry
    pub fn request(&mut self, side: FrameSide) -> Result<String, ProtocolError> {
        let request_id = Uuid::new_v4().to_string();
        self.endpoints
            .port(ChannelName::Selection, side)?
            .post(&SelectionCommand::RequestSelection {
                request_id: request_id.clone(),
            })?;
        self.pending.insert(request_id.clone(), side);
        Ok(request_id)
    }

    pub fn clear(&mut self, side: FrameSide) -> Result<(), ProtocolError> {
        self.endpoints
            .port(ChannelName::Selection, side)?
            .post(&SelectionCommand::ClearSelection)
    }

    /// Replies to outstanding requests; unknown or answered ids are ignored
    pub fn drain(&mut self) -> Vec<(FrameSide, String, Option<Selection>)> {
        let mut replies = Vec::new();
        for (side, port) in self.endpoints.ports.iter_mut() {
            for reply in port.drain::<SelectionReply>() {
                match reply {
                    Ok(SelectionReply::SelectionAvailable {
                        request_id,
                        selection,
                    }) => match self.pending.remove(&request_id) {
                        Some(requested) if requested == *side => {
                            replies.push((*side, request_id, selection))
                        }
                        _ => debug!(side = %side, request_id = %request_id, "Ignoring unexpected selection reply"),
                    },
                    Err(e) => warn!(side = %side, "Dropping selection message: {}", e),
                }
            }
        }
        replies
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Sends decoration commands
///
/// Registered templates are remembered and sent to every side as soon as it
/// binds, so decorations added later always find their style.
#[derive(Debug, Default)]
pub struct DecorationBridge {
    endpoints: Endpoints,
    templates: BTreeMap<String, DecorationTemplate>,
}

channel_bridge!(DecorationBridge, ChannelName::Decorations);

impl DecorationBridge {
    fn on_bind(&mut self, side: FrameSide) {
        if self.templates.is_empty() {
            return;
        }
        if let Some(port) = self.endpoints.ports.get(&side) {
            let command = DecorationCommand::RegisterTemplates {
                templates: self.templates.clone(),
            };
            if let Err(e) = port.post(&command) {
                warn!(side = %side, "Failed to send decoration templates: {}", e);
            }
        }
    }

    fn on_reset(&mut self) {}

    /// Register templates with every bound side
    ///
    /// Keys already registered keep their first definition.
    pub fn register_templates(&mut self, templates: BTreeMap<String, DecorationTemplate>) {
        let mut fresh = BTreeMap::new();
        for (style, template) in templates {
            if self.templates.contains_key(&style) {
                warn!(style = %style, "Decoration template already registered, keeping the first");
                continue;
            }
            self.templates.insert(style.clone(), template.clone());
            fresh.insert(style, template);
        }
        if fresh.is_empty() {
            return;
        }

        let command = DecorationCommand::RegisterTemplates { templates: fresh };
        for (side, port) in &self.endpoints.ports {
            if let Err(e) = port.post(&command) {
                warn!(side = %side, "Failed to send decoration templates: {}", e);
            }
        }
    }

    pub fn add(&self, side: FrameSide, decoration: Decoration, group: &str) -> Result<(), ProtocolError> {
        self.send(
            side,
            &DecorationCommand::AddDecoration {
                decoration,
                group: group.to_string(),
            },
        )
    }

    pub fn remove(&self, side: FrameSide, id: &str, group: &str) -> Result<(), ProtocolError> {
        self.send(
            side,
            &DecorationCommand::RemoveDecoration {
                id: id.to_string(),
                group: group.to_string(),
            },
        )
    }

    /// Forward a diff to `side`
    ///
    /// Updates become remove-then-add. Moves have no visual effect and are
    /// not sent.
    pub fn apply_changes(
        &self,
        side: FrameSide,
        group: &str,
        changes: &[DecorationChange],
    ) -> Result<(), ProtocolError> {
        for change in changes {
            match change {
                DecorationChange::Added { decoration, .. } => {
                    self.add(side, decoration.clone(), group)?;
                }
                DecorationChange::Updated { decoration } => {
                    self.remove(side, &decoration.id, group)?;
                    self.add(side, decoration.clone(), group)?;
                }
                DecorationChange::Removed { id } => self.remove(side, id, group)?,
                DecorationChange::Moved { .. } => {}
            }
        }
        Ok(())
    }

    fn send(&self, side: FrameSide, command: &DecorationCommand) -> Result<(), ProtocolError> {
        self.endpoints
            .port(ChannelName::Decorations, side)
            .inspect_err(|_| debug!(side = %side, "Decorations unavailable, dropping command"))?
            .post(command)
    }
}
