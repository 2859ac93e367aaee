use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncBufRead;
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::consumer::{Command, render};
use crate::transport::codec::{ContentCodec, RequestCodec};
use crate::transport::message::ClientRequest;
use crate::transport::server::ControlLines;
use crate::utils::Result;

/// Connects to the broker at `server`, logs in as `identity` and relays
/// commands from `control` until `exit` or until the broker hangs up.
pub async fn run<C>(server: SocketAddr, identity: &str, tcp_nodelay: bool, control: C) -> Result<()>
where
    C: AsyncBufRead + Unpin,
{
    let stream = connect(server, tcp_nodelay).await?;
    let (read_half, write_half) = stream.into_split();
    let mut deliveries = FramedRead::new(read_half, ContentCodec);
    let mut requests = FramedWrite::new(write_half, RequestCodec);

    requests
        .send(ClientRequest::Login {
            identity: identity.to_string(),
        })
        .await?;
    tracing::debug!(%server, identity, "Login sent");

    let mut control = ControlLines::new(control);
    loop {
        tokio::select! {
            line = control.next_line() => match line? {
                Some(line) => match Command::parse(&line) {
                    Ok(Some(Command::Exit)) => break,
                    Ok(Some(command)) => {
                        if let Command::Subscribe { flag, .. } = command {
                            if flag != 0 && flag != 1 {
                                eprintln!("SF argument needs to be 0 or 1.");
                            }
                        }
                        if let Some(request) = command.to_request() {
                            requests.send(request).await?;
                        }
                        match command {
                            Command::Subscribe { .. } => println!("Subscribed to topic."),
                            Command::Unsubscribe { .. } => println!("Unsubscribed from topic."),
                            Command::Exit => {}
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{e}"),
                },
                None => tracing::debug!("Control input closed"),
            },
            delivery = deliveries.next() => match delivery {
                Some(Ok(message)) => match render(&message) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(topic = %message.topic, error = %e, "Undecodable delivery"),
                },
                Some(Err(e)) => return Err(e),
                None => {
                    tracing::info!(%server, "Broker closed the connection");
                    break;
                }
            },
        }
    }

    Ok(())
}

pub(crate) async fn connect(server: SocketAddr, tcp_nodelay: bool) -> Result<TcpStream> {
    let stream = TcpStream::connect(server).await?;
    stream.set_nodelay(tcp_nodelay)?;
    Ok(stream)
}
