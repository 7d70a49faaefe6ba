use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::context::{CommandSender, Location};
use crate::output::{Message, Painter};

/// Grant matching every permission.
pub const GRANT_ALL: &str = "*";

/// Where an interactive console user stands.
pub const CONSOLE_SPAWN: Location = Location { x: 0, y: 64, z: 0 };

/// The person (or script) at the console. Messages go to stdout.
pub struct ConsoleSender {
    name: String,
    grants: BTreeSet<String>,
    interactive: bool,
    painter: Painter,
}

impl ConsoleSender {
    pub fn new(
        name: impl Into<String>,
        grants: impl IntoIterator<Item = String>,
        interactive: bool,
        painter: Painter,
    ) -> Self {
        Self {
            name: name.into(),
            grants: grants.into_iter().collect(),
            interactive,
            painter,
        }
    }

    pub fn painter(&self) -> Painter {
        self.painter
    }
}

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.grants.contains(GRANT_ALL) || self.grants.contains(permission)
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn location(&self) -> Option<Location> {
        self.interactive.then_some(CONSOLE_SPAWN)
    }

    fn send(&self, message: Message) {
        println!("{}", self.painter.render(&message));
    }
}

/// Sender that keeps what it is sent, for hosts that render later and for
/// tests.
#[derive(Default)]
pub struct BufferedSender {
    name: String,
    grants: BTreeSet<String>,
    interactive: bool,
    location: Option<Location>,
    messages: Mutex<Vec<Message>>,
}

impl BufferedSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.grants.insert(permission.into());
        self
    }

    pub fn interactive(mut self, location: Option<Location>) -> Self {
        self.interactive = true;
        self.location = location;
        self
    }

    /// Drain everything sent so far.
    pub fn take(&self) -> Vec<Message> {
        match self.messages.lock() {
            Ok(mut messages) => std::mem::take(&mut *messages),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Everything sent so far as plain text, one message per entry.
    pub fn take_plain(&self) -> Vec<String> {
        self.take().iter().map(Message::plain).collect()
    }
}

impl CommandSender for BufferedSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.grants.contains(GRANT_ALL) || self.grants.contains(permission)
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn location(&self) -> Option<Location> {
        self.location
    }

    fn send(&self, message: Message) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

/// Split a line into tokens on whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Like [`tokenize`], but a line ending in whitespace gets a trailing empty
/// token so the next argument is completed rather than the last one.
pub fn tokenize_for_completion(line: &str) -> Vec<String> {
    let mut tokens = tokenize(line);
    if line.ends_with(char::is_whitespace) || tokens.is_empty() {
        tokens.push(String::new());
    }
    tokens
}
