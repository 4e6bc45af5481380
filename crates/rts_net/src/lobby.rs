//! Pre-game lobby lines.
//!
//! Client to host: `username <name>`, `color <rrggbb>`, `faction <name>`,
//! `start`, `terminate`.
//!
//! Host to client: `update <id>!!<player>!!<username>!!<color>!!<faction>`,
//! `terminate <id>` (someone left), `terminate` (lobby closed), `full`,
//! `start`.
//!
//! Names may contain spaces but never the `!!` separator.

use std::fmt;
use std::str::FromStr;

use rts_core::entity::PlayerId;

use crate::connection::ConnectionId;
use crate::error::ProtocolError;
use crate::protocol::Fields;

const SEPARATOR: &str = "!!";

/// Player colour as written on the wire (`rrggbb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Build from channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidField {
            verb: "color",
            field: "color",
            value: s.to_string(),
        };
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |at: usize| u8::from_str_radix(&s[at..at + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// One seat in the lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Connection id assigned by the host.
    pub id: ConnectionId,
    /// Player slot (1-based); slot 1 may start the game.
    pub player: PlayerId,
    /// Display name.
    pub username: String,
    /// Player colour.
    pub color: Color,
    /// Chosen faction.
    pub faction: String,
}

impl fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.id, self.player, self.username, self.color, self.faction
        )
    }
}

impl FromStr for RosterEntry {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(SEPARATOR);
        let mut next = |field: &'static str| {
            parts.next().ok_or(ProtocolError::MissingField {
                verb: "update",
                field,
            })
        };
        let invalid = |field: &'static str, value: &str| ProtocolError::InvalidField {
            verb: "update",
            field,
            value: value.to_string(),
        };

        let id = next("id")?;
        let player = next("player")?;
        let entry = Self {
            id: id.parse().map_err(|_| invalid("id", id))?,
            player: player.parse().map_err(|_| invalid("player", player))?,
            username: next("username")?.to_string(),
            color: next("color")?.parse()?,
            faction: next("faction")?.to_string(),
        };
        match parts.next() {
            None => Ok(entry),
            Some(_) => Err(ProtocolError::TrailingFields("update")),
        }
    }
}

/// Free-text field that runs to the end of the line.
fn text(verb: &'static str, field: &'static str, rest: &str) -> Result<String, ProtocolError> {
    let value = rest.trim();
    if value.is_empty() {
        return Err(ProtocolError::MissingField { verb, field });
    }
    if value.contains(SEPARATOR) {
        return Err(ProtocolError::InvalidField {
            verb,
            field,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

fn bare<T>(verb: &'static str, rest: &str, value: T) -> Result<T, ProtocolError> {
    Fields::new(verb, rest.split_whitespace()).finish(value)
}

/// A line from a client in the lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyRequest {
    /// Change display name.
    Username(String),
    /// Change colour.
    Color(Color),
    /// Change faction.
    Faction(String),
    /// Ask the host to start the game.
    Start,
    /// Leave the lobby.
    Terminate,
}

impl fmt::Display for LobbyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username(name) => write!(f, "username {name}"),
            Self::Color(color) => write!(f, "color {color}"),
            Self::Faction(faction) => write!(f, "faction {faction}"),
            Self::Start => f.write_str("start"),
            Self::Terminate => f.write_str("terminate"),
        }
    }
}

impl FromStr for LobbyRequest {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        match verb {
            "" => Err(ProtocolError::Empty),
            "username" => Ok(Self::Username(text("username", "name", rest)?)),
            "faction" => Ok(Self::Faction(text("faction", "name", rest)?)),
            "color" => {
                let mut fields = Fields::new("color", rest.split_whitespace());
                let color = fields.parse("color")?;
                fields.finish(Self::Color(color))
            }
            "start" => bare("start", rest, Self::Start),
            "terminate" => bare("terminate", rest, Self::Terminate),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

/// A line from the host to lobby clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyNotice {
    /// A roster entry was added or changed.
    Update(RosterEntry),
    /// The client with this connection id left.
    Left(ConnectionId),
    /// The lobby was closed.
    Terminate,
    /// No free slot; the connection will be closed.
    Full,
    /// The game is starting on this connection.
    Start,
}

impl fmt::Display for LobbyNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update(entry) => write!(f, "update {entry}"),
            Self::Left(id) => write!(f, "terminate {id}"),
            Self::Terminate => f.write_str("terminate"),
            Self::Full => f.write_str("full"),
            Self::Start => f.write_str("start"),
        }
    }
}

impl FromStr for LobbyNotice {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        match verb {
            "" => Err(ProtocolError::Empty),
            "update" => Ok(Self::Update(rest.trim().parse()?)),
            "terminate" => {
                if rest.trim().is_empty() {
                    return Ok(Self::Terminate);
                }
                let mut fields = Fields::new("terminate", rest.split_whitespace());
                let id = fields.parse("id")?;
                fields.finish(Self::Left(id))
            }
            "full" => bare("full", rest, Self::Full),
            "start" => bare("start", rest, Self::Start),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RosterEntry {
        RosterEntry {
            id: 3,
            player: 2,
            username: "Red Baron".into(),
            color: Color::rgb(0xd0, 0x20, 0x0a),
            faction: "vikings".into(),
        }
    }

    #[test]
    fn test_roster_entry_wire_round_trip() {
        let original = entry();
        let line = LobbyNotice::Update(original.clone()).to_string();
        assert_eq!(line, "update 3!!2!!Red Baron!!d0200a!!vikings");

        let LobbyNotice::Update(parsed) = line.parse().unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(parsed.id, original.id);
        assert_eq!(parsed.player, original.player);
        assert_eq!(parsed.username, original.username);
        assert_eq!(parsed.color, original.color);
        assert_eq!(parsed.faction, original.faction);
    }

    #[test]
    fn test_roster_entry_rejects_wrong_arity() {
        assert!(matches!(
            "1!!1!!bob!!ffffff".parse::<RosterEntry>(),
            Err(ProtocolError::MissingField { field: "faction", .. })
        ));
        assert_eq!(
            "1!!1!!bob!!ffffff!!elves!!extra".parse::<RosterEntry>(),
            Err(ProtocolError::TrailingFields("update"))
        );
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("00ff7f".parse::<Color>(), Ok(Color::rgb(0, 255, 127)));
        assert!("00ff7".parse::<Color>().is_err());
        assert!("zzzzzz".parse::<Color>().is_err());
        assert_eq!(Color::rgb(1, 2, 3).to_string(), "010203");
    }

    #[test]
    fn test_requests() {
        assert_eq!(
            "username  Lady Ada ".parse::<LobbyRequest>(),
            Ok(LobbyRequest::Username("Lady Ada".into()))
        );
        assert!("username a!!b".parse::<LobbyRequest>().is_err());
        assert!(matches!(
            "username".parse::<LobbyRequest>(),
            Err(ProtocolError::MissingField { .. })
        ));
        assert_eq!(
            "color 112233".parse::<LobbyRequest>(),
            Ok(LobbyRequest::Color(Color::rgb(0x11, 0x22, 0x33)))
        );
        assert_eq!("start".parse::<LobbyRequest>(), Ok(LobbyRequest::Start));
        assert_eq!(
            "start now".parse::<LobbyRequest>(),
            Err(ProtocolError::TrailingFields("start"))
        );
    }

    #[test]
    fn test_terminate_forms() {
        assert_eq!("terminate".parse::<LobbyNotice>(), Ok(LobbyNotice::Terminate));
        assert_eq!("terminate 4".parse::<LobbyNotice>(), Ok(LobbyNotice::Left(4)));
        assert_eq!(LobbyNotice::Left(4).to_string(), "terminate 4");
        assert_eq!("full".parse::<LobbyNotice>(), Ok(LobbyNotice::Full));
    }
}
