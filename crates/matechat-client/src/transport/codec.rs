//! Frame codec for the transport layer.
//!
//! - Text frames => Envelope (lazy `RawValue` for data)
//! - Ping/Pong are surfaced as control traffic, Close as end of session
//! - Binary and raw frames are not part of the protocol and are skipped

use tokio_tungstenite::tungstenite::Message;
use matechat_core::{
    error::Result,
    protocol::{ClientMsg, Envelope},
};

#[derive(Debug)]
pub enum Inbound {
    Text { env: Envelope, bytes_len: usize },
    Control,
    Close,
    Ignored { bytes_len: usize },
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => {
            let bytes_len = s.len();
            let env = Envelope::parse(&s)?;
            Ok(Inbound::Text { env, bytes_len })
        }
        Message::Binary(b) => Ok(Inbound::Ignored { bytes_len: b.len() }),
        Message::Ping(_) | Message::Pong(_) => Ok(Inbound::Control),
        Message::Close(_) => Ok(Inbound::Close),
        Message::Frame(f) => Ok(Inbound::Ignored { bytes_len: f.len() }),
    }
}

pub fn encode(msg: &ClientMsg) -> Result<Message> {
    Ok(Message::Text(msg.encode()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use matechat_core::MateChatError;

    #[test]
    fn text_frames_become_envelopes() {
        let decoded = decode(Message::Text(r#"{"Type":"MateClosed"}"#.into())).unwrap();
        match decoded {
            Inbound::Text { env, bytes_len } => {
                assert_eq!(env.msg_type, "MateClosed");
                assert_eq!(bytes_len, 21);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_text_is_an_envelope_error() {
        let err = decode(Message::Text("{oops".into())).unwrap_err();
        assert!(matches!(err, MateChatError::InvalidEnvelope(_)));
    }

    #[test]
    fn control_and_binary_frames() {
        assert!(matches!(decode(Message::Ping(vec![1])).unwrap(), Inbound::Control));
        assert!(matches!(decode(Message::Close(None)).unwrap(), Inbound::Close));
        assert!(matches!(
            decode(Message::Binary(vec![0; 3])).unwrap(),
            Inbound::Ignored { bytes_len: 3 }
        ));
    }

    #[test]
    fn encode_uses_text_frames() {
        let frame = encode(&ClientMsg::Invite { target: "bob".into() }).unwrap();
        assert_eq!(frame, Message::Text(r#"{"Type":"Invite","Data":"bob"}"#.into()));
    }
}
