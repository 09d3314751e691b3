use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio::sync::Mutex;

use crate::appsettings::IrcSettings;
use crate::delivery::DeliveryChannel;

/// An inbound chat message, after keepalives and protocol noise have been
/// filtered out.
#[derive(Debug, PartialEq, Eq)]
pub struct Privmsg {
    pub author: String,
    pub target: String,
    pub body: String,
}

/// A registered connection to the IRC server. The read half stays here; the
/// cloneable [`IrcSender`] carries the write half everywhere else.
pub struct IrcConnection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    sender: IrcSender,
}

#[derive(Clone)]
pub struct IrcSender {
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl IrcSender {
    async fn send_raw(&self, line: &str) -> anyhow::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        Ok(())
    }

    pub async fn send_notice(&self, target: &str, text: &str) -> anyhow::Result<()> {
        self.send_raw(&format!("NOTICE {target} :{text}")).await
    }
}

#[async_trait]
impl DeliveryChannel for IrcSender {
    /// Reminders go out as notices; the convention is that notices never
    /// trigger automated replies, which keeps bots from looping.
    async fn deliver(&self, target: &str, text: &str) -> anyhow::Result<()> {
        self.send_notice(target, text).await
    }
}

impl IrcConnection {
    pub async fn connect(settings: &IrcSettings) -> anyhow::Result<Self> {
        let stream = TcpStream::connect((settings.server.as_str(), settings.port))
            .await
            .with_context(|| format!("connecting to {}:{}", settings.server, settings.port))?;
        let (read_half, write_half) = stream.into_split();
        let sender = IrcSender {
            writer: Arc::new(Mutex::new(write_half)),
        };

        sender.send_raw(&format!("NICK {}", settings.nick)).await?;
        sender
            .send_raw(&format!("USER {} 0 * :{}", settings.user, settings.gecos))
            .await?;

        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            sender,
        })
    }

    pub fn sender(&self) -> IrcSender {
        self.sender.clone()
    }

    pub async fn join(&self, channel: &str) -> anyhow::Result<()> {
        self.sender.send_raw(&format!("JOIN {channel}")).await
    }

    /// The next chat message, answering PINGs along the way. `None` when the
    /// server closes the connection.
    pub async fn next_message(&mut self) -> anyhow::Result<Option<Privmsg>> {
        while let Some(line) = self.lines.next_line().await? {
            if let Some(token) = line.strip_prefix("PING ") {
                self.sender.send_raw(&format!("PONG {token}")).await?;
                continue;
            }
            if let Some(message) = parse_privmsg(&line) {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }
}

/// `:nick!user@host PRIVMSG #channel :text` becomes `(nick, #channel, text)`.
fn parse_privmsg(line: &str) -> Option<Privmsg> {
    let rest = line.strip_prefix(':')?;
    let (prefix, rest) = rest.split_once(' ')?;
    let author = prefix.split('!').next()?.to_owned();
    let rest = rest.strip_prefix("PRIVMSG ")?;
    let (target, body) = rest.split_once(" :")?;

    Some(Privmsg {
        author,
        target: target.to_owned(),
        body: body.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_message_is_parsed() {
        let message = parse_privmsg(":alex!alex@example.org PRIVMSG #random :RemindMe! in 1 hour");

        assert_eq!(
            message,
            Some(Privmsg {
                author: "alex".to_owned(),
                target: "#random".to_owned(),
                body: "RemindMe! in 1 hour".to_owned(),
            })
        );
    }

    #[test]
    fn direct_message_is_parsed() {
        let message = parse_privmsg(":alex!alex@example.org PRIVMSG reminder-bot :hello");

        assert_eq!(message.unwrap().target, "reminder-bot");
    }

    #[test]
    fn body_may_contain_colons() {
        let message = parse_privmsg(":alex!a@b PRIVMSG #random :meeting at 15:00");

        assert_eq!(message.unwrap().body, "meeting at 15:00");
    }

    #[test]
    fn non_privmsg_lines_are_skipped() {
        assert_eq!(parse_privmsg(":server 001 reminder-bot :Welcome"), None);
        assert_eq!(parse_privmsg("PING :server"), None);
        assert_eq!(parse_privmsg(""), None);
    }
}
