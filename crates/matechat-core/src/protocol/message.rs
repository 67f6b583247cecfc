//! Typed message vocabulary.
//!
//! Narrowing rules:
//! - Name payloads (`InviteRequest`, `InviteAccept`, `InviteRefuse`) must be a
//!   non-empty JSON string.
//! - `Chat` must be a JSON string (may be empty).
//! - `OnlineUsers` is a string, or a list of strings joined with `\n`.
//! - Types without payload ignore whatever `Data` carries.

use serde_json::{json, Value};

use crate::error::{MateChatError, Result};
use crate::protocol::envelope::{Envelope, OutEnvelope};

/// Requests sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMsg {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Invite { target: String },
    /// Accept an invitation from `from`.
    InviteCrush { from: String },
    /// Decline an invitation from `from`.
    InvitePass { from: String },
    Chat { text: String },
}

impl ClientMsg {
    pub fn msg_type(&self) -> &'static str {
        match self {
            ClientMsg::Register { .. } => "Register",
            ClientMsg::Login { .. } => "Login",
            ClientMsg::Invite { .. } => "Invite",
            ClientMsg::InviteCrush { .. } => "InviteCrush",
            ClientMsg::InvitePass { .. } => "InvitePass",
            ClientMsg::Chat { .. } => "Chat",
        }
    }

    /// `Register`/`Login` expect exactly one [`AuthReply`].
    pub fn expects_auth_reply(&self) -> bool {
        matches!(self, ClientMsg::Register { .. } | ClientMsg::Login { .. })
    }

    /// Encode as one JSON text frame.
    pub fn encode(&self) -> Result<String> {
        let data = match self {
            ClientMsg::Register { username, password } | ClientMsg::Login { username, password } => {
                json!([username, password])
            }
            ClientMsg::Invite { target } => Value::from(target.as_str()),
            ClientMsg::InviteCrush { from } | ClientMsg::InvitePass { from } => {
                Value::from(from.as_str())
            }
            ClientMsg::Chat { text } => Value::from(text.as_str()),
        };
        OutEnvelope {
            msg_type: self.msg_type(),
            data,
        }
        .to_json()
    }
}

/// Replies to `Register`/`Login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthReply {
    /// Registration collided with an existing account.
    UserExist,
    AlreadyOnline,
    WrongPassword,
    Logged,
    Registered,
}

impl AuthReply {
    pub fn from_type(msg_type: &str) -> Option<Self> {
        match msg_type {
            "UserExist" => Some(AuthReply::UserExist),
            "AlreadyOnline" => Some(AuthReply::AlreadyOnline),
            "WrongPassword" => Some(AuthReply::WrongPassword),
            "Logged" => Some(AuthReply::Logged),
            "Registered" => Some(AuthReply::Registered),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthReply::UserExist => "UserExist",
            AuthReply::AlreadyOnline => "AlreadyOnline",
            AuthReply::WrongPassword => "WrongPassword",
            AuthReply::Logged => "Logged",
            AuthReply::Registered => "Registered",
        }
    }
}

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMsg {
    Auth(AuthReply),
    InviteRequest { from: String },
    InviteAccept { peer: String },
    InviteRefuse { peer: String },
    Chat { text: String },
    /// The current mate disconnected or left.
    MateClosed,
    OnlineUsers { roster: String },
}

impl ServerMsg {
    /// Narrow an envelope to a typed message.
    pub fn from_envelope(env: &Envelope) -> Result<Self> {
        let ty = env.msg_type.as_str();
        if let Some(reply) = AuthReply::from_type(ty) {
            return Ok(ServerMsg::Auth(reply));
        }
        match ty {
            "InviteRequest" => Ok(ServerMsg::InviteRequest {
                from: name_data(env)?,
            }),
            "InviteAccept" => Ok(ServerMsg::InviteAccept {
                peer: name_data(env)?,
            }),
            "InviteRefuse" => Ok(ServerMsg::InviteRefuse {
                peer: name_data(env)?,
            }),
            "Chat" => Ok(ServerMsg::Chat {
                text: string_data(env)?,
            }),
            "MateClosed" => Ok(ServerMsg::MateClosed),
            "OnlineUsers" => Ok(ServerMsg::OnlineUsers {
                roster: roster_data(env)?,
            }),
            other => Err(MateChatError::UnknownType(other.to_string())),
        }
    }

    pub fn msg_type(&self) -> &'static str {
        match self {
            ServerMsg::Auth(reply) => reply.as_str(),
            ServerMsg::InviteRequest { .. } => "InviteRequest",
            ServerMsg::InviteAccept { .. } => "InviteAccept",
            ServerMsg::InviteRefuse { .. } => "InviteRefuse",
            ServerMsg::Chat { .. } => "Chat",
            ServerMsg::MateClosed => "MateClosed",
            ServerMsg::OnlineUsers { .. } => "OnlineUsers",
        }
    }
}

fn data_value(env: &Envelope) -> Result<Value> {
    let raw = env
        .data_str()
        .ok_or_else(|| MateChatError::malformed(&env.msg_type, "missing data"))?;
    serde_json::from_str(raw).map_err(|e| MateChatError::malformed(&env.msg_type, e.to_string()))
}

fn string_data(env: &Envelope) -> Result<String> {
    match data_value(env)? {
        Value::String(s) => Ok(s),
        other => Err(MateChatError::malformed(
            &env.msg_type,
            format!("expected string, got {}", kind(&other)),
        )),
    }
}

fn name_data(env: &Envelope) -> Result<String> {
    let name = string_data(env)?;
    if name.trim().is_empty() {
        return Err(MateChatError::malformed(&env.msg_type, "empty username"));
    }
    Ok(name)
}

fn roster_data(env: &Envelope) -> Result<String> {
    match data_value(env)? {
        Value::String(s) => Ok(s),
        Value::Array(items) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => names.push(s),
                    other => {
                        return Err(MateChatError::malformed(
                            &env.msg_type,
                            format!("expected list of strings, found {}", kind(&other)),
                        ))
                    }
                }
            }
            Ok(names.join("\n"))
        }
        other => Err(MateChatError::malformed(
            &env.msg_type,
            format!("expected string or list, got {}", kind(&other)),
        )),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Result<ServerMsg> {
        ServerMsg::from_envelope(&Envelope::parse(text)?)
    }

    #[test]
    fn credentials_travel_as_a_pair() {
        let msg = ClientMsg::Register {
            username: "alice".into(),
            password: "pw".into(),
        };
        assert_eq!(
            msg.encode().unwrap(),
            r#"{"Type":"Register","Data":["alice","pw"]}"#
        );
        assert!(msg.expects_auth_reply());
        assert!(!ClientMsg::Chat { text: "hi".into() }.expects_auth_reply());
    }

    #[test]
    fn auth_replies_ignore_data() {
        assert_eq!(
            decode(r#"{"Type":"Logged","Data":{"junk":1}}"#).unwrap(),
            ServerMsg::Auth(AuthReply::Logged)
        );
    }

    #[test]
    fn invite_request_needs_a_name() {
        assert_eq!(
            decode(r#"{"Type":"InviteRequest","Data":"bob"}"#).unwrap(),
            ServerMsg::InviteRequest { from: "bob".into() }
        );
        assert!(matches!(
            decode(r#"{"Type":"InviteRequest","Data":42}"#),
            Err(MateChatError::MalformedPayload { .. })
        ));
        assert!(matches!(
            decode(r#"{"Type":"InviteRequest","Data":"  "}"#),
            Err(MateChatError::MalformedPayload { .. })
        ));
        assert!(matches!(
            decode(r#"{"Type":"InviteRequest"}"#),
            Err(MateChatError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn roster_accepts_text_or_list() {
        assert_eq!(
            decode(r#"{"Type":"OnlineUsers","Data":"alice\nbob"}"#).unwrap(),
            ServerMsg::OnlineUsers {
                roster: "alice\nbob".into()
            }
        );
        assert_eq!(
            decode(r#"{"Type":"OnlineUsers","Data":["alice","bob"]}"#).unwrap(),
            ServerMsg::OnlineUsers {
                roster: "alice\nbob".into()
            }
        );
        assert!(decode(r#"{"Type":"OnlineUsers","Data":["alice",3]}"#).is_err());
    }

    #[test]
    fn unknown_type_is_reported_not_fatal() {
        let err = decode(r#"{"Type":"Dance","Data":"now"}"#).unwrap_err();
        assert!(matches!(err, MateChatError::UnknownType(ref t) if t == "Dance"));
        assert_eq!(err.severity(), crate::Severity::Recoverable);
    }
}
