//! Line-oriented terminal adapter.
//!
//! Output is incremental: each render prints only what changed since the
//! previous one (new transcript lines, a new notice, the prompt of a new
//! phase). Input is one line per event, interpreted by the current phase.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use crate::session::{Phase, Session, UiEvent};

/// Where the session loop renders after every step.
pub trait Surface: Send {
    fn render(&mut self, session: &Session);
}

pub struct TerminalSurface<W> {
    out: W,
    phase: Option<Phase>,
    notice: Option<String>,
    shown_lines: usize,
    roster: Option<String>,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            phase: None,
            notice: None,
            shown_lines: 0,
            roster: None,
        }
    }

    fn draw(&mut self, s: &Session) -> io::Result<()> {
        let phase_changed = self.phase != Some(s.phase());

        let lines = s.transcript();
        for line in lines.iter().skip(self.shown_lines) {
            writeln!(self.out, "{line}")?;
        }
        self.shown_lines = lines.len();

        if s.phase() == Phase::Browsing
            && (phase_changed || self.roster.as_deref() != Some(s.online_roster()))
        {
            writeln!(self.out, "Online users:")?;
            if s.online_roster().is_empty() {
                writeln!(self.out, "  (nobody)")?;
            }
            for name in s.online_roster().lines() {
                writeln!(self.out, "  {name}")?;
            }
            self.roster = Some(s.online_roster().to_string());
        }

        if s.last_notice() != self.notice.as_deref() {
            if let Some(notice) = s.last_notice() {
                let label = if s.phase().is_logged_in() { "Notice" } else { "Error" };
                writeln!(self.out, "{label}: {notice}")?;
            }
            self.notice = s.last_notice().map(str::to_owned);
        }

        if phase_changed {
            if let Some(prompt) = prompt(s) {
                writeln!(self.out, "{prompt}")?;
            }
            self.phase = Some(s.phase());
        }

        self.out.flush()
    }
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn render(&mut self, session: &Session) {
        if let Err(e) = self.draw(session) {
            tracing::warn!(error = %e, "terminal write failed");
        }
    }
}

fn prompt(s: &Session) -> Option<String> {
    match s.phase() {
        Phase::LoggedOut => Some("Enter your credentials: <username> <password>".into()),
        Phase::Browsing => Some("Invite user to chat:".into()),
        Phase::AwaitingDecision => Some(format!(
            "Invite from {}. Accept? (y/n)",
            s.invite_from().unwrap_or("?")
        )),
        Phase::Chatting => Some(format!(
            "Chatting with {}. Type /quit or press Ctrl+C to exit.",
            s.peer().unwrap_or("mate")
        )),
        Phase::Closed => None,
    }
}

/// Turn one input line into an event for `phase`. Blank lines mean nothing
/// except in a chat, where the session answers them with a notice.
pub fn parse_line(phase: Phase, line: &str) -> Option<UiEvent> {
    let trimmed = line.trim();
    if trimmed == "/quit" {
        return Some(UiEvent::Quit);
    }
    match phase {
        Phase::LoggedOut => {
            let (username, password) = trimmed.split_once(char::is_whitespace)?;
            Some(UiEvent::SubmitCredentials {
                username: username.to_string(),
                password: password.trim().to_string(),
            })
        }
        Phase::Browsing if !trimmed.is_empty() => {
            Some(UiEvent::SubmitInviteTarget(trimmed.to_string()))
        }
        Phase::AwaitingDecision => Some(UiEvent::SubmitDecision(trimmed.to_string())),
        Phase::Chatting => Some(UiEvent::SubmitChatText(line.to_string())),
        Phase::Browsing | Phase::Closed => None,
    }
}

/// Forward stdin lines and Ctrl-C to the session loop. End of input counts
/// as a quit.
pub async fn read_terminal_input(phase: watch::Receiver<Phase>, events: mpsc::Sender<UiEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let event = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let current = *phase.borrow();
                    match parse_line(current, &line) {
                        Some(event) => event,
                        None => {
                            if current == Phase::LoggedOut && !line.trim().is_empty() {
                                println!("Error: expected <username> <password>");
                            }
                            continue;
                        }
                    }
                }
                Ok(None) => UiEvent::Quit,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    UiEvent::Quit
                }
            },
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "ctrl-c handler failed");
                }
                UiEvent::Quit
            }
        };

        let quit = event == UiEvent::Quit;
        if events.send(event).await.is_err() || quit {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matechat_core::protocol::{AuthReply, ServerMsg};

    use crate::session::AuthOutcome;

    fn output(surface: &TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8_lossy(&surface.out).into_owned()
    }

    #[test]
    fn credentials_need_two_words() {
        assert_eq!(
            parse_line(Phase::LoggedOut, "alice  s3cret "),
            Some(UiEvent::SubmitCredentials {
                username: "alice".into(),
                password: "s3cret".into()
            })
        );
        assert_eq!(parse_line(Phase::LoggedOut, "alice"), None);
    }

    #[test]
    fn lines_follow_the_phase() {
        assert_eq!(
            parse_line(Phase::Browsing, " bob "),
            Some(UiEvent::SubmitInviteTarget("bob".into()))
        );
        assert_eq!(parse_line(Phase::Browsing, "  "), None);
        assert_eq!(
            parse_line(Phase::AwaitingDecision, "Y"),
            Some(UiEvent::SubmitDecision("Y".into()))
        );
        assert_eq!(
            parse_line(Phase::Chatting, "  spaced out "),
            Some(UiEvent::SubmitChatText("  spaced out ".into()))
        );
        assert_eq!(parse_line(Phase::Closed, "anything"), None);
        assert_eq!(parse_line(Phase::Chatting, "/quit"), Some(UiEvent::Quit));
    }

    #[test]
    fn only_changes_are_printed() {
        let mut surface = TerminalSurface::new(Vec::new());
        let mut s = Session::new();
        surface.render(&s);
        surface.render(&s);
        assert_eq!(output(&surface).matches("Enter your credentials").count(), 1);

        s.handle_ui(UiEvent::SubmitCredentials {
            username: "alice".into(),
            password: "pw".into(),
        });
        s.handle_auth_outcome(AuthOutcome::Reply(AuthReply::UserExist));
        s.handle_auth_outcome(AuthOutcome::Reply(AuthReply::WrongPassword));
        surface.render(&s);
        assert!(output(&surface).contains("Error: Wrong password"));

        s.handle_ui(UiEvent::SubmitCredentials {
            username: "alice".into(),
            password: "pw2".into(),
        });
        s.handle_auth_outcome(AuthOutcome::Reply(AuthReply::Registered));
        s.handle_server(ServerMsg::OnlineUsers { roster: "bob\ncarol".into() });
        surface.render(&s);
        surface.render(&s);
        let text = output(&surface);
        assert_eq!(text.matches("Online users:").count(), 1);
        assert!(text.contains("  bob\n  carol\n"));
        assert!(text.contains("Invite user to chat:"));
    }

    #[test]
    fn chat_lines_print_once_and_notices_are_labelled() {
        let mut surface = TerminalSurface::new(Vec::new());
        let mut s = Session::new();
        s.handle_ui(UiEvent::SubmitCredentials {
            username: "alice".into(),
            password: "pw".into(),
        });
        s.handle_auth_outcome(AuthOutcome::Reply(AuthReply::Logged));
        s.handle_server(ServerMsg::InviteRequest { from: "bob".into() });
        surface.render(&s);
        assert!(output(&surface).contains("Notice: Invite from: bob (y/n)"));
        assert!(output(&surface).contains("Invite from bob. Accept? (y/n)"));

        s.handle_ui(UiEvent::SubmitDecision("y".into()));
        s.handle_server(ServerMsg::Chat { text: "hello".into() });
        surface.render(&s);
        s.handle_server(ServerMsg::Chat { text: "again".into() });
        surface.render(&s);

        let text = output(&surface);
        assert_eq!(text.matches("bob: hello").count(), 1);
        assert_eq!(text.matches("bob: again").count(), 1);
        assert!(text.contains("Chatting with bob."));
    }
}
